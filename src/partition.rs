//! Partition configuration and the predicate builder that turns it into a
//! filter expression over the resolved column descriptors.

use chrono::{Months, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QueryError, Result};
use crate::metadata::{ColumnDescriptor, ColumnType};
use crate::query::{col, Expr, Literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntervalUnit {
    Hour,
    Day,
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartitionKind {
    /// Rows whose time column falls within the last `interval` units.
    TimeUnit { interval: u32, unit: IntervalUnit },
    /// Same window, over a load-time column maintained by the backend.
    IngestionTime { interval: u32, unit: IntervalUnit },
    IntegerRange { start: i64, end: i64 },
    ColumnValues { values: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub column: String,
    #[serde(flatten)]
    pub kind: PartitionKind,
}

impl PartitionSpec {
    pub fn new(column: impl Into<String>, kind: PartitionKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }

    /// Checks the bounds that do not depend on the table's columns.
    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            PartitionKind::TimeUnit { interval, .. }
            | PartitionKind::IngestionTime { interval, .. }
                if *interval == 0 =>
            {
                Err(QueryError::configuration(format!(
                    "Partition interval for column '{}' must be greater than 0",
                    self.column
                )))
            }
            PartitionKind::IntegerRange { start, end } if start > end => {
                Err(QueryError::configuration(format!(
                    "Partition range for column '{}' is empty: {} > {}",
                    self.column, start, end
                )))
            }
            PartitionKind::ColumnValues { values } if values.is_empty() => {
                Err(QueryError::configuration(format!(
                    "Partition values for column '{}' must not be empty",
                    self.column
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Builds the partition predicate relative to the current time.
pub fn build_partition_predicate(spec: &PartitionSpec, columns: &[ColumnDescriptor]) -> Result<Expr> {
    build_partition_predicate_at(spec, columns, Utc::now().naive_utc())
}

pub fn build_partition_predicate_at(
    spec: &PartitionSpec,
    columns: &[ColumnDescriptor],
    now: NaiveDateTime,
) -> Result<Expr> {
    let column = columns
        .iter()
        .find(|c| c.name == spec.column)
        .ok_or_else(|| {
            QueryError::configuration(format!(
                "Partition column '{}' not found in table columns",
                spec.column
            ))
        })?;
    spec.validate()?;

    let target = col(column.name.as_str());
    let predicate = match &spec.kind {
        PartitionKind::TimeUnit { interval, unit }
        | PartitionKind::IngestionTime { interval, unit } => {
            let threshold = window_start(now, *interval, *unit)?;
            let bound = match column.data_type {
                ColumnType::Date => Literal::Date(threshold.date()),
                _ => Literal::Timestamp(threshold),
            };
            target.gt_eq(Expr::Literal(bound))
        }
        PartitionKind::IntegerRange { start, end } => target.between(
            Expr::Literal(Literal::Int(*start)),
            Expr::Literal(Literal::Int(*end)),
        ),
        PartitionKind::ColumnValues { values } => target.is_in(
            values
                .iter()
                .map(|v| Expr::Literal(Literal::from_json(v)))
                .collect(),
        ),
    };
    Ok(predicate)
}

fn window_start(now: NaiveDateTime, interval: u32, unit: IntervalUnit) -> Result<NaiveDateTime> {
    let start = match unit {
        IntervalUnit::Hour => now.checked_sub_signed(chrono::Duration::hours(i64::from(interval))),
        IntervalUnit::Day => now.checked_sub_signed(chrono::Duration::days(i64::from(interval))),
        IntervalUnit::Month => now.checked_sub_months(Months::new(interval)),
        IntervalUnit::Year => interval
            .checked_mul(12)
            .and_then(|months| now.checked_sub_months(Months::new(months))),
    };
    start.ok_or_else(|| {
        QueryError::configuration(format!(
            "Partition interval of {} {:?} is out of range",
            interval, unit
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Dialect;
    use chrono::NaiveDate;
    use serde_json::json;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", ColumnType::Integer),
            ColumnDescriptor::new("created_at", ColumnType::Timestamp),
            ColumnDescriptor::new("load_date", ColumnType::Date),
            ColumnDescriptor::new("region", ColumnType::String),
        ]
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_missing_column_is_configuration_error() {
        let spec = PartitionSpec::new("missing", PartitionKind::IntegerRange { start: 1, end: 2 });
        let err = build_partition_predicate(&spec, &columns()).unwrap_err();
        assert!(matches!(err, QueryError::Configuration(_)));
    }

    #[test]
    fn test_time_unit_predicate() {
        let spec = PartitionSpec::new(
            "created_at",
            PartitionKind::TimeUnit {
                interval: 2,
                unit: IntervalUnit::Day,
            },
        );
        let expr = build_partition_predicate_at(&spec, &columns(), now()).unwrap();
        assert_eq!(
            expr.to_sql(Dialect::Postgres),
            "(\"created_at\" >= TIMESTAMP '2024-03-29 12:00:00')"
        );
    }

    #[test]
    fn test_month_window_on_date_column() {
        let spec = PartitionSpec::new(
            "load_date",
            PartitionKind::IngestionTime {
                interval: 1,
                unit: IntervalUnit::Month,
            },
        );
        let expr = build_partition_predicate_at(&spec, &columns(), now()).unwrap();
        // March 31st minus one month clamps to the end of February.
        assert_eq!(
            expr.to_sql(Dialect::BigQuery),
            "(`load_date` >= DATE '2024-02-29')"
        );
    }

    #[test]
    fn test_range_and_values_predicates() {
        let range = PartitionSpec::new("id", PartitionKind::IntegerRange { start: 10, end: 20 });
        assert_eq!(
            build_partition_predicate(&range, &columns())
                .unwrap()
                .to_sql(Dialect::Generic),
            "(\"id\" BETWEEN 10 AND 20)"
        );

        let values = PartitionSpec::new(
            "region",
            PartitionKind::ColumnValues {
                values: vec![json!("eu"), json!("us")],
            },
        );
        assert_eq!(
            build_partition_predicate(&values, &columns())
                .unwrap()
                .to_sql(Dialect::Generic),
            "(\"region\" IN ('eu', 'us'))"
        );
    }

    #[test]
    fn test_invalid_bounds() {
        let zero = PartitionSpec::new(
            "created_at",
            PartitionKind::TimeUnit {
                interval: 0,
                unit: IntervalUnit::Hour,
            },
        );
        assert!(zero.validate().is_err());

        let inverted = PartitionSpec::new("id", PartitionKind::IntegerRange { start: 5, end: 1 });
        assert!(build_partition_predicate(&inverted, &columns()).is_err());

        let empty = PartitionSpec::new("region", PartitionKind::ColumnValues { values: vec![] });
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_deserialize_spec() {
        let spec: PartitionSpec = serde_json::from_value(json!({
            "column": "created_at",
            "type": "time_unit",
            "interval": 30,
            "unit": "DAY"
        }))
        .unwrap();
        assert_eq!(
            spec.kind,
            PartitionKind::TimeUnit {
                interval: 30,
                unit: IntervalUnit::Day
            }
        );
    }
}

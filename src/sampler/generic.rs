//! Random sampling that works on any backend with a random function.
//!
//! Percentage: `{t}_rnd` tags every row with `RANDOM() * 100`, `{t}_sample`
//! keeps rows whose tag is within the percentage.
//! Rows: `{t}_sample` orders by a random tag and keeps the first `n` rows.

use super::strategy::SamplingStrategy;
use super::{SampleConfig, SampleFragment, SampleSource, Sampler};
use crate::error::{QueryError, Result};
use crate::metadata::{ColumnDescriptor, ColumnType, TableHandle};
use crate::partition::build_partition_predicate;
use crate::query::{col, lit, Cte, Expr, FromItem, OrderBy, Select};

pub const RANDOM_LABEL: &str = "random";

#[derive(Debug, Default, Clone, Copy)]
pub struct GenericSampler;

impl SamplingStrategy for GenericSampler {
    fn name(&self) -> &'static str {
        "generic"
    }
}

pub fn resolve_column(table: &TableHandle, name: &str) -> Result<ColumnDescriptor> {
    table.column(name).cloned().ok_or_else(|| {
        QueryError::configuration(format!("Column '{}' not found in {}", name, table))
    })
}

pub fn base_sample_query(
    sampler: &Sampler,
    column: Option<ColumnDescriptor>,
    label: Option<Expr>,
) -> Result<SampleFragment> {
    let table = sampler.table();
    let (mut projection, mut columns) = match column {
        Some(column) => {
            let mut columns = vec![column];
            // Keep the partition column visible so a bound sample can still be filtered.
            if let Some(partition_column) = sampler.partition().and_then(|p| table.column(&p.column)) {
                if columns[0].name != partition_column.name {
                    columns.push(partition_column.clone());
                }
            }
            let projection = columns.iter().map(|c| col(c.name.as_str())).collect();
            (projection, columns)
        }
        None => (vec![Expr::Wildcard], table.columns().to_vec()),
    };
    if let Some(label) = label {
        projection.push(label.alias(RANDOM_LABEL));
        columns.push(ColumnDescriptor::new(RANDOM_LABEL, ColumnType::Float));
    }

    let mut query = Select::new(projection).from(FromItem::table(table));
    if let Some(partition) = sampler.partition() {
        query = query.filter(build_partition_predicate(partition, table.columns())?);
    }
    Ok(SampleFragment { query, columns })
}

pub fn random_sample_query(sampler: &Sampler, column: Option<&str>) -> Result<SampleSource> {
    let table_name = sampler.table().name();
    let sample_name = format!("{}_sample", table_name);

    match sampler.require_sample_config()? {
        SampleConfig::Percentage(percent) => {
            let rnd_name = format!("{}_rnd", table_name);
            let fragment =
                sampler.build_sample_query(column, Some(Expr::Random.multiply(lit(100))))?;
            let sample = Select::new(vec![])
                .from(FromItem::Cte(rnd_name.clone()))
                .filter(col(RANDOM_LABEL).lt_eq(lit(percent)));
            Ok(SampleSource::new(
                sample_name.clone(),
                vec![
                    Cte {
                        name: rnd_name,
                        query: fragment.query,
                    },
                    Cte {
                        name: sample_name,
                        query: sample,
                    },
                ],
                fragment.columns,
            ))
        }
        SampleConfig::Rows(rows) => {
            let fragment = sampler.build_sample_query(column, Some(Expr::Random))?;
            let sample = fragment
                .query
                .order_by([OrderBy::asc(col(RANDOM_LABEL))])
                .limit(rows);
            Ok(SampleSource::new(
                sample_name.clone(),
                vec![Cte {
                    name: sample_name,
                    query: sample,
                }],
                fragment.columns,
            ))
        }
    }
}

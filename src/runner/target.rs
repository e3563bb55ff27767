//! Query target resolution: the one place deciding whether a query runs
//! against the table, the sample, or the user's custom query.

use crate::metadata::{ColumnDescriptor, TableHandle};
use crate::query::{Expr, FromItem, Select};
use crate::sampler::SampleSource;

pub const CUSTOM_QUERY_ALIAS: &str = "subquery";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Table,
    Sample,
    CustomQuery,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryTarget<'a> {
    Table(&'a TableHandle),
    Sample(&'a SampleSource),
    /// Raw query text; columns are taken from the table it profiles.
    CustomQuery {
        sql: &'a str,
        table: &'a TableHandle,
    },
}

/// Custom query wins, then a bound sample, then the table.
pub fn resolve_target<'a>(
    table: &'a TableHandle,
    custom_query: Option<&'a str>,
    sample: Option<&'a SampleSource>,
) -> QueryTarget<'a> {
    match (custom_query, sample) {
        (Some(sql), _) => QueryTarget::CustomQuery { sql, table },
        (None, Some(source)) => QueryTarget::Sample(source),
        (None, None) => QueryTarget::Table(table),
    }
}

/// Trims whitespace and a trailing `;` so the text can be wrapped as a
/// derived table. Blank text means no custom query.
pub fn normalize_custom_query(sql: &str) -> Option<String> {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl<'a> QueryTarget<'a> {
    pub fn kind(&self) -> TargetKind {
        match self {
            QueryTarget::Table(_) => TargetKind::Table,
            QueryTarget::Sample(_) => TargetKind::Sample,
            QueryTarget::CustomQuery { .. } => TargetKind::CustomQuery,
        }
    }

    /// Column descriptors visible through this target.
    pub fn columns(&self) -> &'a [ColumnDescriptor] {
        match *self {
            QueryTarget::Table(table) | QueryTarget::CustomQuery { table, .. } => table.columns(),
            QueryTarget::Sample(source) => source.columns(),
        }
    }

    /// Starts a select of `entities` from this target.
    pub fn select(&self, entities: Vec<Expr>) -> Select {
        let query = Select::new(entities);
        match self {
            QueryTarget::Table(table) => query.from(FromItem::table(table)),
            QueryTarget::Sample(source) => query
                .with_ctes(source.ctes().to_vec())
                .from(FromItem::Cte(source.name().to_string())),
            QueryTarget::CustomQuery { sql, .. } => query.from(FromItem::Subquery {
                sql: sql.to_string(),
                alias: CUSTOM_QUERY_ALIAS.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnType;
    use crate::query::{col, Dialect};

    fn table() -> TableHandle {
        TableHandle::new("orders", vec![ColumnDescriptor::new("id", ColumnType::Integer)])
    }

    fn sample() -> SampleSource {
        SampleSource::new(
            "orders_sample",
            vec![],
            vec![ColumnDescriptor::new("random", ColumnType::Float)],
        )
    }

    #[test]
    fn test_custom_query_wins_over_sample() {
        let table = table();
        let sample = sample();
        let target = resolve_target(&table, Some("SELECT 1"), Some(&sample));
        assert_eq!(target.kind(), TargetKind::CustomQuery);
        assert_eq!(target.columns()[0].name, "id");
    }

    #[test]
    fn test_sample_then_table() {
        let table = table();
        let sample = sample();
        assert_eq!(resolve_target(&table, None, Some(&sample)).kind(), TargetKind::Sample);
        assert_eq!(resolve_target(&table, None, None).kind(), TargetKind::Table);
        assert_eq!(resolve_target(&table, None, Some(&sample)).columns()[0].name, "random");
    }

    #[test]
    fn test_normalize_custom_query() {
        assert_eq!(
            normalize_custom_query("  SELECT * FROM t WHERE x = 1;\n"),
            Some("SELECT * FROM t WHERE x = 1".to_string())
        );
        assert_eq!(normalize_custom_query(" ;; "), None);
    }

    #[test]
    fn test_custom_query_select() {
        let table = table();
        let target = resolve_target(&table, Some("SELECT id FROM orders"), None);
        assert_eq!(
            target.select(vec![col("id")]).to_sql(Dialect::Postgres),
            "SELECT \"id\" FROM (SELECT id FROM orders) AS subquery"
        );
    }
}

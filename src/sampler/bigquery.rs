//! BigQuery sampling.
//!
//! Percentage samples on ordinary tables use `TABLESAMPLE SYSTEM`, which
//! BigQuery rejects on views; views and row-count samples take the generic
//! path. `TABLESAMPLE` cannot reference nested fields either, so a requested
//! `parent.child` column is sampled through its top-level `parent` struct and
//! the nested projection happens later, outside this layer.

use tracing::info;

use super::generic;
use super::strategy::SamplingStrategy;
use super::{SampleConfig, SampleFragment, SampleSource, Sampler};
use crate::error::Result;
use crate::metadata::{ColumnDescriptor, ColumnType, TableHandle};
use crate::query::{Cte, Expr, TableSample};

#[derive(Debug, Default, Clone, Copy)]
pub struct BigQuerySampler;

impl SamplingStrategy for BigQuerySampler {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn build_sample_query(
        &self,
        sampler: &Sampler,
        column: Option<&str>,
        label: Option<Expr>,
    ) -> Result<SampleFragment> {
        let column = column
            .map(|name| sampled_column(sampler.table(), name))
            .transpose()?;
        generic::base_sample_query(sampler, column, label)
    }

    fn get_sample_query(&self, sampler: &Sampler, column: Option<&str>) -> Result<SampleSource> {
        let config = sampler.require_sample_config()?;
        let table = sampler.table();
        match config {
            SampleConfig::Percentage(percent) if !table.is_view() => {
                let fragment = self.build_sample_query(sampler, column, None)?;
                let query = fragment
                    .query
                    .with_table_sample(TableSample::SystemPercent(percent));
                let name = format!("{}_sample", table.name());
                Ok(SampleSource::new(
                    name.clone(),
                    vec![Cte { name, query }],
                    fragment.columns,
                ))
            }
            SampleConfig::Percentage(_) => {
                info!("{} is a view, TABLESAMPLE unavailable; using random sampling", table);
                generic::random_sample_query(sampler, column)
            }
            SampleConfig::Rows(_) => generic::random_sample_query(sampler, column),
        }
    }
}

/// The column physically sampled for `name`: the parent struct for nested
/// fields, the column itself otherwise. A parent missing from the table is
/// registered as a `Struct` column of the sample.
fn sampled_column(table: &TableHandle, name: &str) -> Result<ColumnDescriptor> {
    match name.split_once('.') {
        Some((parent, _)) => Ok(table
            .column(parent)
            .cloned()
            .unwrap_or_else(|| ColumnDescriptor::new(parent, ColumnType::Struct))),
        None => generic::resolve_column(table, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TableKind;
    use crate::partition::{PartitionKind, PartitionSpec};
    use crate::query::{Dialect, FromItem, Select};
    use crate::sampler::SamplerOptions;

    fn customers(kind: TableKind) -> TableHandle {
        TableHandle::new(
            "customers",
            vec![
                ColumnDescriptor::new("id", ColumnType::Integer),
                ColumnDescriptor::new("address.city", ColumnType::String),
            ],
        )
        .with_schema("crm")
        .with_kind(kind)
    }

    fn sampler(kind: TableKind, config: SampleConfig) -> Sampler {
        Sampler::new(
            Dialect::BigQuery,
            customers(kind),
            SamplerOptions {
                sample_config: Some(config),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn render(source: &SampleSource) -> String {
        Select::new(vec![])
            .with_ctes(source.ctes().to_vec())
            .from(FromItem::Cte(source.name().to_string()))
            .to_sql(Dialect::BigQuery)
    }

    #[test]
    fn test_system_sample_on_table() {
        let sampler = sampler(TableKind::Table, SampleConfig::Percentage(50.0));
        assert_eq!(sampler.strategy_name(), "bigquery");
        let source = sampler.get_sample_query(None).unwrap();
        assert_eq!(
            render(&source),
            "WITH `customers_sample` AS (SELECT * FROM `crm`.`customers` TABLESAMPLE SYSTEM (50 PERCENT)) \
             SELECT * FROM `customers_sample`"
        );
    }

    #[test]
    fn test_view_falls_back_to_random_sampling() {
        let source = sampler(TableKind::View, SampleConfig::Percentage(50.0))
            .get_sample_query(None)
            .unwrap();
        let sql = render(&source);
        assert!(!sql.contains("TABLESAMPLE"));
        assert!(sql.contains("`customers_rnd` AS (SELECT *, (RAND() * 100) AS `random`"));
        assert!(sql.contains("WHERE (`random` <= 50.0)"));
    }

    #[test]
    fn test_nested_column_samples_parent_struct() {
        let source = sampler(TableKind::Table, SampleConfig::Percentage(10.0))
            .get_sample_query(Some("address.city"))
            .unwrap();
        let sql = render(&source);
        assert!(sql.contains("SELECT `address` FROM `crm`.`customers` TABLESAMPLE SYSTEM (10 PERCENT)"));
        assert!(!sql.contains("address.city"));
        assert_eq!(
            source.columns(),
            &[ColumnDescriptor::new("address", ColumnType::Struct)]
        );
    }

    #[test]
    fn test_nested_column_sample_keeps_partition_column() {
        let sampler = Sampler::new(
            Dialect::BigQuery,
            customers(TableKind::Table),
            SamplerOptions {
                sample_config: Some(SampleConfig::Percentage(10.0)),
                partition: Some(PartitionSpec::new(
                    "id",
                    PartitionKind::IntegerRange { start: 1, end: 5 },
                )),
                ..Default::default()
            },
        )
        .unwrap();
        let source = sampler.get_sample_query(Some("address.city")).unwrap();
        assert!(render(&source).contains(
            "SELECT `address`, `id` FROM `crm`.`customers` TABLESAMPLE SYSTEM (10 PERCENT) \
             WHERE (`id` BETWEEN 1 AND 5)"
        ));
        let names: Vec<&str> = source.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["address", "id"]);
    }

    #[test]
    fn test_nested_column_flattened_on_fallback_path() {
        let source = sampler(TableKind::View, SampleConfig::Rows(20))
            .get_sample_query(Some("address.city"))
            .unwrap();
        let sql = render(&source);
        assert!(sql.contains("SELECT `address`, RAND() AS `random`"));
        assert!(sql.contains("LIMIT 20"));
    }
}

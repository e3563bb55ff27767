//! Sampling: which rows of a table the profiler looks at.
//!
//! A `Sampler` is built once per table with a backend-specific
//! `SamplingStrategy` and produces the `SampleHandle` the runner binds.

pub mod bigquery;
pub mod generic;
pub mod strategy;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{QueryError, Result};
use crate::execution::{ExecutionHandle, TableData};
use crate::metadata::{ColumnDescriptor, TableHandle};
use crate::partition::{build_partition_predicate, PartitionSpec};
use crate::query::{col, Cte, Dialect, Expr, Select};
use crate::runner::target::{normalize_custom_query, resolve_target, QueryTarget};

pub use bigquery::BigQuerySampler;
pub use generic::{GenericSampler, RANDOM_LABEL};
pub use strategy::{strategy_for, SamplingStrategy};

pub const SAMPLE_DATA_DEFAULT_COUNT: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "UPPERCASE")]
pub enum SampleConfig {
    /// Share of the table to sample, in `(0, 100]`.
    Percentage(f64),
    /// Fixed number of rows.
    Rows(u64),
}

impl SampleConfig {
    pub fn validate(&self) -> Result<()> {
        match *self {
            SampleConfig::Percentage(p) if !(p > 0.0 && p <= 100.0) => Err(
                QueryError::configuration(format!("Sample percentage must be in (0, 100], got {}", p)),
            ),
            SampleConfig::Rows(0) => Err(QueryError::configuration(
                "Sample row count must be greater than 0",
            )),
            _ => Ok(()),
        }
    }

    /// A 100% sample is the table itself.
    pub fn is_full_table(&self) -> bool {
        matches!(self, SampleConfig::Percentage(p) if *p >= 100.0)
    }
}

/// Where sample data would be uploaded. Carried for the caller; this layer
/// never writes to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket_name: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub overwrite_data: bool,
}

/// A queryable sampled view of the table, expressed as common table expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSource {
    name: String,
    ctes: Vec<Cte>,
    columns: Vec<ColumnDescriptor>,
}

impl SampleSource {
    pub fn new(name: impl Into<String>, ctes: Vec<Cte>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            ctes,
            columns,
        }
    }

    /// Name of the CTE queries select from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SampleHandle {
    #[default]
    NoSample,
    Sampled(SampleSource),
}

impl SampleHandle {
    pub fn source(&self) -> Option<&SampleSource> {
        match self {
            SampleHandle::NoSample => None,
            SampleHandle::Sampled(source) => Some(source),
        }
    }

    pub fn is_sampled(&self) -> bool {
        matches!(self, SampleHandle::Sampled(_))
    }
}

/// Base select plus the columns it exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFragment {
    pub query: Select,
    pub columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Clone)]
pub struct SamplerOptions {
    pub sample_config: Option<SampleConfig>,
    pub partition: Option<PartitionSpec>,
    pub sample_query: Option<String>,
    pub storage_config: Option<StorageConfig>,
    pub sample_data_count: u64,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            sample_config: None,
            partition: None,
            sample_query: None,
            storage_config: None,
            sample_data_count: SAMPLE_DATA_DEFAULT_COUNT,
        }
    }
}

#[derive(Debug)]
pub struct Sampler {
    table: TableHandle,
    dialect: Dialect,
    sample_config: Option<SampleConfig>,
    partition: Option<PartitionSpec>,
    sample_query: Option<String>,
    storage_config: Option<StorageConfig>,
    sample_data_count: u64,
    strategy: Box<dyn SamplingStrategy>,
}

impl Sampler {
    /// Validates the sample and partition configuration and picks the
    /// strategy for `dialect`.
    pub fn new(dialect: Dialect, table: TableHandle, options: SamplerOptions) -> Result<Self> {
        Self::with_strategy(strategy_for(dialect), dialect, table, options)
    }

    pub fn with_strategy(
        strategy: Box<dyn SamplingStrategy>,
        dialect: Dialect,
        table: TableHandle,
        options: SamplerOptions,
    ) -> Result<Self> {
        if let Some(config) = &options.sample_config {
            config.validate()?;
        }
        if let Some(partition) = &options.partition {
            partition.validate()?;
        }
        debug!("Sampler for {} uses the {} strategy", table, strategy.name());
        Ok(Self {
            table,
            dialect,
            sample_config: options.sample_config,
            partition: options.partition,
            sample_query: options.sample_query.as_deref().and_then(normalize_custom_query),
            storage_config: options.storage_config,
            sample_data_count: options.sample_data_count,
            strategy,
        })
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn sample_config(&self) -> Option<&SampleConfig> {
        self.sample_config.as_ref()
    }

    pub fn partition(&self) -> Option<&PartitionSpec> {
        self.partition.as_ref()
    }

    pub fn sample_query(&self) -> Option<&str> {
        self.sample_query.as_deref()
    }

    pub fn storage_config(&self) -> Option<&StorageConfig> {
        self.storage_config.as_ref()
    }

    pub fn sample_data_count(&self) -> u64 {
        self.sample_data_count
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn require_sample_config(&self) -> Result<SampleConfig> {
        let config = self.sample_config.ok_or_else(|| {
            QueryError::configuration(format!("No sample configured for {}", self.table))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Base select the sample is drawn from, restricted to `column` when given.
    pub fn build_sample_query(&self, column: Option<&str>, label: Option<Expr>) -> Result<SampleFragment> {
        self.strategy.build_sample_query(self, column, label)
    }

    pub fn get_sample_query(&self, column: Option<&str>) -> Result<SampleSource> {
        self.strategy.get_sample_query(self, column)
    }

    /// Resolves the handle a runner binds for the whole table.
    pub fn random_sample(&self) -> Result<SampleHandle> {
        if self.sample_query.is_some() {
            debug!("Custom query set for {}, skipping sampling", self.table);
            return Ok(SampleHandle::NoSample);
        }
        match &self.sample_config {
            Some(config) if !config.is_full_table() => {
                let source = self.get_sample_query(None)?;
                info!("Sampling {} with {:?} via {}", self.table, config, source.name());
                Ok(SampleHandle::Sampled(source))
            }
            _ => Ok(SampleHandle::NoSample),
        }
    }

    /// First `sample_data_count` rows of the resolved source, projecting
    /// `columns` (all columns when empty).
    pub async fn fetch_sample_data(
        &self,
        handle: &dyn ExecutionHandle,
        columns: &[String],
    ) -> Result<TableData> {
        let sample = self.random_sample()?;
        let target = resolve_target(&self.table, self.sample_query(), sample.source());
        let entities = columns.iter().map(|c| col(c.as_str())).collect();
        let mut query = target.select(entities);
        if !matches!(target, QueryTarget::Sample(_)) {
            if let Some(partition) = &self.partition {
                query = query.filter(build_partition_predicate(partition, target.columns())?);
            }
        }
        let sql = query.limit(self.sample_data_count).to_sql(handle.dialect());
        debug!("Fetching sample data: {}", sql);
        let rows = handle.execute(&sql).await?;
        Ok(TableData::from_rows(columns.to_vec(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnType;

    fn orders() -> TableHandle {
        TableHandle::new("orders", vec![ColumnDescriptor::new("id", ColumnType::Integer)])
    }

    fn sampler(config: SampleConfig) -> Result<Sampler> {
        Sampler::new(
            Dialect::Postgres,
            orders(),
            SamplerOptions {
                sample_config: Some(config),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_percentage_out_of_bounds_is_rejected() {
        for percent in [0.0, -5.0, 100.5, f64::NAN] {
            let err = sampler(SampleConfig::Percentage(percent)).unwrap_err();
            assert!(
                matches!(err, QueryError::Configuration(_)),
                "percentage {} accepted",
                percent
            );
        }
        assert!(sampler(SampleConfig::Rows(0)).is_err());
    }

    #[test]
    fn test_percentage_bounds_are_inclusive_of_100() {
        assert!(sampler(SampleConfig::Percentage(0.5)).is_ok());
        assert!(sampler(SampleConfig::Percentage(100.0)).is_ok());
    }

    #[test]
    fn test_full_percentage_means_no_sample() {
        let sample = sampler(SampleConfig::Percentage(100.0))
            .unwrap()
            .random_sample()
            .unwrap();
        assert_eq!(sample, SampleHandle::NoSample);
    }

    #[test]
    fn test_custom_query_or_missing_config_means_no_sample() {
        let custom = Sampler::new(
            Dialect::Postgres,
            orders(),
            SamplerOptions {
                sample_config: Some(SampleConfig::Rows(10)),
                sample_query: Some("SELECT * FROM orders".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(custom.random_sample().unwrap(), SampleHandle::NoSample);

        let unconfigured = Sampler::new(Dialect::Postgres, orders(), SamplerOptions::default()).unwrap();
        assert_eq!(unconfigured.random_sample().unwrap(), SampleHandle::NoSample);
        assert!(unconfigured.get_sample_query(None).is_err());
    }

    #[test]
    fn test_row_sample_is_bound() {
        let sample = sampler(SampleConfig::Rows(10)).unwrap().random_sample().unwrap();
        assert_eq!(sample.source().map(SampleSource::name), Some("orders_sample"));
    }
}

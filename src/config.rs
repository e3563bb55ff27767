//! Runtime and per-table configuration.
//!
//! `RunnerConfig` comes from the environment (a `.env` file is honoured),
//! `TableProfileConfig` from a JSON document describing one table's profile.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{QueryError, Result};
use crate::partition::PartitionSpec;
use crate::query::Dialect;
use crate::runner::DEFAULT_BATCH_SIZE;
use crate::sampler::{SampleConfig, SamplerOptions, StorageConfig, SAMPLE_DATA_DEFAULT_COUNT};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub database_url: Option<String>,
    pub backend: Dialect,
    pub query_timeout: Option<Duration>,
    pub batch_size: usize,
    pub sample_data_count: u64,
    pub max_connections: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            backend: Dialect::Postgres,
            query_timeout: None,
            batch_size: DEFAULT_BATCH_SIZE,
            sample_data_count: SAMPLE_DATA_DEFAULT_COUNT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl RunnerConfig {
    /// Load `.env` if present, then read `PROFILER_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let query_timeout = match var("PROFILER_QUERY_TIMEOUT_SECS") {
            Some(raw) => match parse_number::<u64>("PROFILER_QUERY_TIMEOUT_SECS", &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        let batch_size = match var("PROFILER_BATCH_SIZE") {
            Some(raw) => parse_number::<usize>("PROFILER_BATCH_SIZE", &raw)?,
            None => defaults.batch_size,
        };
        if batch_size == 0 {
            return Err(QueryError::configuration("PROFILER_BATCH_SIZE must be greater than 0"));
        }

        Ok(Self {
            database_url: var("PROFILER_DATABASE_URL").or_else(|| var("DATABASE_URL")),
            backend: match var("PROFILER_BACKEND") {
                Some(raw) => raw.parse()?,
                None => defaults.backend,
            },
            query_timeout,
            batch_size,
            sample_data_count: match var("PROFILER_SAMPLE_DATA_COUNT") {
                Some(raw) => parse_number("PROFILER_SAMPLE_DATA_COUNT", &raw)?,
                None => defaults.sample_data_count,
            },
            max_connections: match var("PROFILER_MAX_CONNECTIONS") {
                Some(raw) => parse_number("PROFILER_MAX_CONNECTIONS", &raw)?,
                None => defaults.max_connections,
            },
        })
    }

    /// Sampling syntax follows `backend`, so it must be the dialect of the
    /// handle the queries run on.
    pub fn check_backend(&self, handle_dialect: Dialect) -> Result<()> {
        if self.backend == handle_dialect || self.backend == Dialect::Generic {
            Ok(())
        } else {
            Err(QueryError::configuration(format!(
                "PROFILER_BACKEND is {} but queries run on a {} handle",
                self.backend, handle_dialect
            )))
        }
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            QueryError::configuration("PROFILER_DATABASE_URL (or DATABASE_URL) is not set")
        })
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| QueryError::configuration(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

/// Profile settings for one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProfileConfig {
    #[serde(default)]
    pub sample_config: Option<SampleConfig>,
    #[serde(default)]
    pub partition: Option<PartitionSpec>,
    #[serde(default)]
    pub custom_query: Option<String>,
    #[serde(default)]
    pub storage_config: Option<StorageConfig>,
    #[serde(default)]
    pub sample_data_count: Option<u64>,
}

impl TableProfileConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(sample) = &self.sample_config {
            sample.validate()?;
        }
        if let Some(partition) = &self.partition {
            partition.validate()?;
        }
        Ok(())
    }

    /// Sampler options, with `runtime` supplying the sample-data count
    /// when the table does not set one.
    pub fn sampler_options(&self, runtime: &RunnerConfig) -> SamplerOptions {
        SamplerOptions {
            sample_config: self.sample_config,
            partition: self.partition.clone(),
            sample_query: self.custom_query.clone(),
            storage_config: self.storage_config.clone(),
            sample_data_count: self.sample_data_count.unwrap_or(runtime.sample_data_count),
        }
    }
}

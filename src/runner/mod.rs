//! Query Runner
//!
//! Binds one table, an optional sample, an optional partition spec and an
//! optional custom query to a caller-owned execution handle, and exposes
//! the fetch operations the profiler uses. Every fetch except the prebuilt
//! pair goes through `run`, driven by a `FetchPolicy`.

pub mod policy;
pub mod stream;
pub mod target;
pub mod timeout;

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::execution::{ExecutionHandle, Row};
use crate::metadata::TableHandle;
use crate::partition::{build_partition_predicate, PartitionSpec};
use crate::query::{Expr, QueryArgs, Select};
use crate::sampler::SampleHandle;

pub use policy::{Cardinality, FetchPolicy, SourceKind};
pub use stream::{BatchStream, DEFAULT_BATCH_SIZE};
pub use target::{normalize_custom_query, resolve_target, QueryTarget, TargetKind, CUSTOM_QUERY_ALIAS};
pub use timeout::with_deadline;

pub struct QueryRunner {
    handle: Arc<dyn ExecutionHandle>,
    table: TableHandle,
    sample: SampleHandle,
    partition: Option<PartitionSpec>,
    custom_query: Option<String>,
    timeout: Option<Duration>,
    batch_size: usize,
}

impl QueryRunner {
    pub fn new(handle: Arc<dyn ExecutionHandle>, table: TableHandle) -> Self {
        Self {
            handle,
            table,
            sample: SampleHandle::NoSample,
            partition: None,
            custom_query: None,
            timeout: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_sample(mut self, sample: SampleHandle) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_partition(mut self, partition: Option<PartitionSpec>) -> Self {
        self.partition = partition;
        self
    }

    /// Blank text leaves the runner without a custom query.
    pub fn with_custom_query(mut self, sql: Option<&str>) -> Self {
        self.custom_query = sql.and_then(normalize_custom_query);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    pub fn sample(&self) -> &SampleHandle {
        &self.sample
    }

    pub fn partition(&self) -> Option<&PartitionSpec> {
        self.partition.as_ref()
    }

    pub fn custom_query(&self) -> Option<&str> {
        self.custom_query.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Select of `entities` over the table, or the custom query when set.
    /// No filters are applied.
    pub fn build_query(&self, entities: Vec<Expr>) -> Select {
        resolve_target(&self.table, self.custom_query(), None).select(entities)
    }

    /// The resolved target for `source`. Table fetches never see the sample.
    fn target(&self, source: SourceKind) -> QueryTarget<'_> {
        let sample = match source {
            SourceKind::Table => None,
            SourceKind::Sample => self.sample.source(),
        };
        resolve_target(&self.table, self.custom_query(), sample)
    }

    fn build_statement(&self, policy: FetchPolicy, entities: Vec<Expr>, args: &QueryArgs) -> Result<Select> {
        let target = self.target(policy.source);
        let mut query = target.select(entities);
        if let Some(filter) = args.filter_expr() {
            query = query.filter(filter);
        }
        if policy.apply_partition {
            if let Some(partition) = &self.partition {
                query = query.filter(build_partition_predicate(partition, target.columns())?);
            }
        }
        if !args.group_by.is_empty() {
            query = query.group_by(args.group_by.clone());
        }
        if !args.order_by.is_empty() {
            query = query.order_by(args.order_by.iter().cloned());
        }
        if policy.cardinality == Cardinality::First {
            query = query.limit(1);
        }
        Ok(query)
    }

    /// Single execution path behind every policy-driven fetch.
    pub async fn run(&self, policy: FetchPolicy, entities: Vec<Expr>, args: &QueryArgs) -> Result<Vec<Row>> {
        let query = self.build_statement(policy, entities, args)?;
        self.execute(&query).await
    }

    async fn execute(&self, query: &Select) -> Result<Vec<Row>> {
        let sql = query.to_sql(self.handle.dialect());
        debug!("Executing on {}: {}", self.handle.name(), sql);
        with_deadline(self.timeout, self.handle.execute(&sql)).await
    }

    pub async fn select_first_from_table(&self, entities: Vec<Expr>, args: &QueryArgs) -> Result<Option<Row>> {
        let rows = self.run(FetchPolicy::FIRST_FROM_TABLE, entities, args).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn select_all_from_table(&self, entities: Vec<Expr>, args: &QueryArgs) -> Result<Vec<Row>> {
        self.run(FetchPolicy::ALL_FROM_TABLE, entities, args).await
    }

    pub async fn select_first_from_sample(&self, entities: Vec<Expr>, args: &QueryArgs) -> Result<Option<Row>> {
        let rows = self.run(FetchPolicy::FIRST_FROM_SAMPLE, entities, args).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn select_all_from_sample(&self, entities: Vec<Expr>, args: &QueryArgs) -> Result<Vec<Row>> {
        self.run(FetchPolicy::ALL_FROM_SAMPLE, entities, args).await
    }

    /// First row from the sample when one is bound, from the table otherwise.
    pub async fn dispatch_select_first(&self, entities: Vec<Expr>, args: &QueryArgs) -> Result<Option<Row>> {
        if self.sample.is_sampled() {
            self.select_first_from_sample(entities, args).await
        } else {
            self.select_first_from_table(entities, args).await
        }
    }

    /// Opens a fresh cursor over the filtered sample query. Each call is
    /// independent of earlier streams.
    pub async fn stream_from_sample(&self, entities: Vec<Expr>, args: &QueryArgs) -> Result<BatchStream> {
        let query = self.build_statement(FetchPolicy::ALL_FROM_SAMPLE, entities, args)?;
        let sql = query.to_sql(self.handle.dialect());
        debug!("Streaming on {} in batches of {}: {}", self.handle.name(), self.batch_size, sql);
        let cursor = with_deadline(self.timeout, self.handle.open_cursor(&sql)).await?;
        Ok(BatchStream::new(cursor, self.batch_size, self.timeout))
    }

    /// Runs a prebuilt query with `LIMIT 1`. Filters are assumed applied.
    pub async fn select_first_from_query(&self, query: &Select) -> Result<Option<Row>> {
        let rows = self.execute(&query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn select_all_from_query(&self, query: &Select) -> Result<Vec<Row>> {
        self.execute(query).await
    }
}

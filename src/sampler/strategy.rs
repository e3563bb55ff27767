//! Backend sampling strategies. One implementation per dialect, chosen when
//! the `Sampler` is built.

use std::fmt;

use super::generic::{self, GenericSampler};
use super::{BigQuerySampler, SampleFragment, SampleSource, Sampler};
use crate::error::Result;
use crate::query::{Dialect, Expr};

pub trait SamplingStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Base select over the table, with the partition predicate applied and
    /// `label` projected as the random column when given.
    fn build_sample_query(
        &self,
        sampler: &Sampler,
        column: Option<&str>,
        label: Option<Expr>,
    ) -> Result<SampleFragment> {
        let column = column
            .map(|name| generic::resolve_column(sampler.table(), name))
            .transpose()?;
        generic::base_sample_query(sampler, column, label)
    }

    fn get_sample_query(&self, sampler: &Sampler, column: Option<&str>) -> Result<SampleSource> {
        generic::random_sample_query(sampler, column)
    }
}

pub fn strategy_for(dialect: Dialect) -> Box<dyn SamplingStrategy> {
    match dialect {
        Dialect::BigQuery => Box::new(BigQuerySampler),
        Dialect::Generic | Dialect::Postgres | Dialect::Polars => Box::new(GenericSampler),
    }
}

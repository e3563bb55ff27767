mod common;

use common::MockHandle;
use std::sync::Arc;

use profiler_query::error::QueryError;
use profiler_query::execution::ExecutionHandle;
use profiler_query::metadata::{ColumnDescriptor, ColumnType, TableHandle};
use profiler_query::partition::{PartitionKind, PartitionSpec};
use profiler_query::query::{Dialect, QueryArgs};
use profiler_query::runner::QueryRunner;
use profiler_query::sampler::{SampleConfig, SampleHandle, Sampler, SamplerOptions};

fn orders() -> TableHandle {
    TableHandle::new(
        "orders",
        vec![
            ColumnDescriptor::new("id", ColumnType::Integer),
            ColumnDescriptor::new("amount", ColumnType::Float),
        ],
    )
}

fn id_range() -> PartitionSpec {
    PartitionSpec::new("id", PartitionKind::IntegerRange { start: 1, end: 9 })
}

#[tokio::test]
async fn test_sample_data_is_rendered_for_the_handle() {
    let handle = MockHandle::new(3);
    let sampler = Sampler::new(
        Dialect::BigQuery,
        orders(),
        SamplerOptions {
            sample_data_count: 3,
            ..Default::default()
        },
    )
    .unwrap();

    let data = sampler
        .fetch_sample_data(&handle, &["amount".to_string()])
        .await
        .unwrap();
    assert_eq!(data.rows.len(), 3);
    assert_eq!(handle.last_statement(), "SELECT \"amount\" FROM \"orders\" LIMIT 3");
}

#[tokio::test]
async fn test_invalid_sample_size_fails_before_any_query() {
    let handle = MockHandle::new(3);
    for config in [
        SampleConfig::Percentage(0.0),
        SampleConfig::Percentage(-5.0),
        SampleConfig::Percentage(100.5),
        SampleConfig::Percentage(f64::NAN),
        SampleConfig::Rows(0),
    ] {
        let result = Sampler::new(
            Dialect::Postgres,
            orders(),
            SamplerOptions {
                sample_config: Some(config),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(QueryError::Configuration(_))));
    }
    assert!(handle.statements().is_empty());
}

#[tokio::test]
async fn test_full_percentage_reads_the_table() {
    let handle = MockHandle::new(3);
    let sampler = Sampler::new(
        Dialect::Postgres,
        orders(),
        SamplerOptions {
            sample_config: Some(SampleConfig::Percentage(100.0)),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(sampler.random_sample().unwrap(), SampleHandle::NoSample);

    sampler.fetch_sample_data(&handle, &[]).await.unwrap();
    assert_eq!(handle.last_statement(), "SELECT * FROM \"orders\" LIMIT 50");
}

#[tokio::test]
async fn test_column_sample_can_be_bound_to_partitioned_runner() {
    let handle = Arc::new(MockHandle::new(3));
    let sampler = Sampler::new(
        Dialect::Postgres,
        orders(),
        SamplerOptions {
            sample_config: Some(SampleConfig::Rows(100)),
            partition: Some(id_range()),
            ..Default::default()
        },
    )
    .unwrap();
    let source = sampler.get_sample_query(Some("amount")).unwrap();

    let exec: Arc<dyn ExecutionHandle> = handle.clone();
    let runner = QueryRunner::new(exec, orders())
        .with_sample(SampleHandle::Sampled(source))
        .with_partition(Some(id_range()));

    let rows = runner
        .select_all_from_sample(vec![], &QueryArgs::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert!(handle
        .last_statement()
        .ends_with("SELECT * FROM \"orders_sample\" WHERE (\"id\" BETWEEN 1 AND 9)"));
}

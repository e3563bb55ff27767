use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use profiler_query::db;
use profiler_query::query::{col, Expr};
use profiler_query::{
    ExecutionHandle, PostgresHandle, QueryArgs, QueryRunner, RunnerConfig, Sampler, TableData,
    TableProfileConfig,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// First row of the sample (or table when unsampled)
    First,
    /// All rows of the sample
    All,
    /// Stream the sample in batches, printing one JSON line per batch
    Stream,
    /// Preview rows of the resolved source
    SampleData,
}

#[derive(Parser)]
#[command(name = "profiler-query")]
#[command(about = "Run profiler queries against a table, its sample, or a custom query")]
struct Args {
    /// Schema of the table to profile
    #[arg(long, default_value = "public")]
    schema: String,

    /// Table to profile
    #[arg(long)]
    table: String,

    /// Path to a JSON table profile config (sample, partition, custom query)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "first")]
    mode: Mode,

    /// Columns to project (all columns when omitted)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    profiler_query::logging::init();

    let args = Args::parse();
    let runtime = RunnerConfig::from_env()?;
    let profile = match &args.config {
        Some(path) => TableProfileConfig::from_path(path)
            .with_context(|| format!("loading profile config {}", path.display()))?,
        None => TableProfileConfig::default(),
    };

    let pool = db::init_pool(runtime.require_database_url()?, runtime.max_connections).await?;
    let postgres = Arc::new(PostgresHandle::new(pool));
    runtime.check_backend(postgres.dialect())?;
    let table = postgres.describe_table(&args.schema, &args.table).await?;
    info!("Profiling {} ({:?})", table, table.kind());

    let sampler = Sampler::new(runtime.backend, table.clone(), profile.sampler_options(&runtime))?;

    let handle: Arc<dyn ExecutionHandle> = postgres;
    let runner = QueryRunner::new(handle.clone(), table)
        .with_sample(sampler.random_sample()?)
        .with_partition(profile.partition.clone())
        .with_custom_query(profile.custom_query.as_deref())
        .with_timeout(runtime.query_timeout)
        .with_batch_size(runtime.batch_size);

    let entities: Vec<Expr> = args.columns.iter().map(|c| col(c.as_str())).collect();
    let query_args = QueryArgs::default();

    match args.mode {
        Mode::First => {
            let row = runner.dispatch_select_first(entities, &query_args).await?;
            let value = row.map(|r| r.to_json()).unwrap_or(serde_json::Value::Null);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Mode::All => {
            let rows = runner.select_all_from_sample(entities, &query_args).await?;
            let data = TableData::from_rows(args.columns.clone(), rows);
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Mode::Stream => {
            let mut stream = runner.stream_from_sample(entities, &query_args).await?;
            let mut batch_no = 0usize;
            while let Some(batch) = stream.next_batch().await? {
                batch_no += 1;
                let rows: Vec<_> = batch.iter().map(|r| r.to_json()).collect();
                println!("{}", json!({ "batch": batch_no, "rows": rows }));
            }
            info!("Streamed {} rows in {} batches", stream.rows_fetched(), batch_no);
        }
        Mode::SampleData => {
            let data = sampler.fetch_sample_data(handle.as_ref(), &args.columns).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
    }

    Ok(())
}

pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod logging;
pub mod metadata;
pub mod partition;
pub mod query;
pub mod runner;
pub mod sampler;

pub use config::{RunnerConfig, TableProfileConfig};
pub use error::{QueryError, Result};
pub use execution::{Cursor, ExecutionHandle, PolarsHandle, PostgresHandle, Row, TableData};
pub use metadata::{ColumnDescriptor, ColumnType, TableHandle, TableKind};
pub use partition::{build_partition_predicate, IntervalUnit, PartitionKind, PartitionSpec};
pub use query::{Dialect, QueryArgs, QueryFilter};
pub use runner::{BatchStream, FetchPolicy, QueryRunner};
pub use sampler::{SampleConfig, SampleHandle, Sampler, SamplerOptions};

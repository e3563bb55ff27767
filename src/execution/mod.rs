//! Execution Module - pluggable handles the runner executes against
//!
//! - ExecutionHandle / Cursor traits
//! - Row and TableData result shapes
//! - Handle implementations (PostgreSQL via sqlx, in-process Polars)

pub mod handle;
pub mod row;

// Handle implementations
pub mod polars_engine;
pub mod postgres;

pub use handle::{Cursor, ExecutionHandle};
pub use polars_engine::PolarsHandle;
pub use postgres::PostgresHandle;
pub use row::{Row, TableData};

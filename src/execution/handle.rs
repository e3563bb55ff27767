//! Execution handle contract - the live session a runner executes against.
//!
//! Handles are owned by the caller; runners only hold an `Arc` to them.

use async_trait::async_trait;

use crate::error::Result;
use crate::execution::row::Row;
use crate::query::Dialect;

#[async_trait]
pub trait ExecutionHandle: Send + Sync {
    /// Handle name (e.g., "postgres", "polars")
    fn name(&self) -> &'static str;

    /// Dialect the generated SQL must be rendered in
    fn dialect(&self) -> Dialect;

    /// Execute query text and materialize every row
    async fn execute(&self, sql: &str) -> Result<Vec<Row>>;

    /// Open a forward-only cursor over the query's result set
    async fn open_cursor(&self, sql: &str) -> Result<Box<dyn Cursor>>;
}

/// Forward-only cursor. Implementations release their resources on drop, so
/// abandoning a cursor half-way never leaks it; `close` releases eagerly and
/// reports any error doing so.
#[async_trait]
pub trait Cursor: Send {
    /// Fetch up to `batch_size` rows. An empty batch means exhaustion.
    async fn fetch_next(&mut self, batch_size: usize) -> Result<Vec<Row>>;

    async fn close(self: Box<Self>) -> Result<()>;
}

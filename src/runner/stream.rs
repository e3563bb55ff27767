//! Lazy batch stream over a forward-only cursor.

use std::time::Duration;
use tracing::{debug, warn};

use super::timeout::with_deadline;
use crate::error::Result;
use crate::execution::{Cursor, Row};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Finite sequence of row batches. Each batch is owned by the caller and
/// stays valid after the stream ends or fails. Dropping the stream releases
/// the cursor; `close` does so eagerly and surfaces release errors.
pub struct BatchStream {
    cursor: Option<Box<dyn Cursor>>,
    batch_size: usize,
    timeout: Option<Duration>,
    rows_fetched: usize,
}

impl BatchStream {
    pub(crate) fn new(cursor: Box<dyn Cursor>, batch_size: usize, timeout: Option<Duration>) -> Self {
        Self {
            cursor: Some(cursor),
            batch_size,
            timeout,
            rows_fetched: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn rows_fetched(&self) -> usize {
        self.rows_fetched
    }

    pub fn is_finished(&self) -> bool {
        self.cursor.is_none()
    }

    /// Next batch, or `None` once the cursor is exhausted. A failed fetch
    /// ends the stream: the cursor is released and later calls return `None`.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Row>>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };

        let fetched = with_deadline(self.timeout, cursor.fetch_next(self.batch_size)).await;
        match fetched {
            Ok(rows) if rows.is_empty() => {
                debug!("Stream exhausted after {} rows", self.rows_fetched);
                self.release().await?;
                Ok(None)
            }
            Ok(rows) => {
                self.rows_fetched += rows.len();
                Ok(Some(rows))
            }
            Err(err) => {
                warn!("Batch fetch failed after {} rows: {}", self.rows_fetched, err);
                self.cursor = None;
                Err(err)
            }
        }
    }

    /// Release the cursor without consuming the remaining rows.
    pub async fn close(mut self) -> Result<()> {
        self.release().await
    }

    async fn release(&mut self) -> Result<()> {
        match self.cursor.take() {
            Some(cursor) => with_deadline(self.timeout, cursor.close()).await,
            None => Ok(()),
        }
    }
}

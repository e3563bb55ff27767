//! Recording execution handle shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use profiler_query::error::{QueryError, Result};
use profiler_query::execution::{Cursor, ExecutionHandle, Row};
use profiler_query::query::Dialect;

/// Serves `rows` single-column rows for every statement and records the SQL
/// it was asked to run. Cursors count their releases in `released`.
pub struct MockHandle {
    rows: usize,
    delay: Option<Duration>,
    fail_on_batch: Option<usize>,
    statements: Mutex<Vec<String>>,
    released: Arc<AtomicUsize>,
    opened: AtomicUsize,
}

impl MockHandle {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            delay: None,
            fail_on_batch: None,
            statements: Mutex::new(Vec::new()),
            released: Arc::new(AtomicUsize::new(0)),
            opened: AtomicUsize::new(0),
        }
    }

    /// Every execute and fetch sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cursor fetch number `batch` (0-based) fails.
    pub fn failing_on_batch(mut self, batch: usize) -> Self {
        self.fail_on_batch = Some(batch);
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn last_statement(&self) -> String {
        self.statements().last().cloned().unwrap_or_default()
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn record(&self, sql: &str) {
        self.statements.lock().unwrap().push(sql.to_string());
    }
}

fn rows(range: std::ops::Range<usize>) -> Vec<Row> {
    let columns: Arc<[String]> = vec!["id".to_string()].into();
    range
        .map(|i| Row::new(columns.clone(), vec![Value::from(i as u64)]))
        .collect()
}

#[async_trait]
impl ExecutionHandle for MockHandle {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.record(sql);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let count = if sql.ends_with("LIMIT 1") {
            self.rows.min(1)
        } else {
            self.rows
        };
        Ok(rows(0..count))
    }

    async fn open_cursor(&self, sql: &str) -> Result<Box<dyn Cursor>> {
        self.record(sql);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCursor {
            total: self.rows,
            position: 0,
            batches: 0,
            delay: self.delay,
            fail_on_batch: self.fail_on_batch,
            released: self.released.clone(),
        }))
    }
}

struct MockCursor {
    total: usize,
    position: usize,
    batches: usize,
    delay: Option<Duration>,
    fail_on_batch: Option<usize>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl Cursor for MockCursor {
    async fn fetch_next(&mut self, batch_size: usize) -> Result<Vec<Row>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_batch == Some(self.batches) {
            return Err(QueryError::Execution("connection reset".to_string()));
        }
        self.batches += 1;
        let end = (self.position + batch_size).min(self.total);
        let batch = rows(self.position..end);
        self.position = end;
        Ok(batch)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl Drop for MockCursor {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

//! Polars Execution Handle (in-process)
//!
//! Runs generated SQL over DataFrames registered in a polars `SQLContext`.
//! Used for local profiling of files already loaded into memory and as a
//! real backend in tests.
//!
//! Polars SQL has no random function, so queries referencing
//! `POLARS_RANDOM_COLUMN` are planned against copies of the frames carrying
//! a fresh uniform column. A cursor evaluates its plan once and pages
//! through that result, so every batch comes from the same sample.

use async_trait::async_trait;
use polars::prelude::*;
use polars::sql::SQLContext;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{QueryError, Result};
use crate::execution::handle::{Cursor, ExecutionHandle};
use crate::execution::row::Row;
use crate::query::{Dialect, POLARS_RANDOM_COLUMN};

struct PolarsState {
    context: SQLContext,
    frames: HashMap<String, DataFrame>,
}

pub struct PolarsHandle {
    state: Mutex<PolarsState>,
}

impl PolarsHandle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PolarsState {
                context: SQLContext::new(),
                frames: HashMap::new(),
            }),
        }
    }

    /// Register a frame under `name` so queries can select from it.
    pub fn register(&self, name: &str, frame: DataFrame) -> Result<()> {
        let mut state = self.lock()?;
        info!("Registering table {} ({} rows)", name, frame.height());
        state.context.register(name, frame.clone().lazy());
        state.frames.insert(name.to_string(), frame);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PolarsState>> {
        self.state
            .lock()
            .map_err(|_| QueryError::Execution("Polars SQL context lock poisoned".to_string()))
    }

    fn plan(&self, sql: &str) -> Result<LazyFrame> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if !sql.contains(POLARS_RANDOM_COLUMN) {
            return Ok(state.context.execute(sql)?);
        }

        for (name, frame) in &state.frames {
            state.context.register(name, with_random_column(frame)?.lazy());
        }
        let plan = state.context.execute(sql);
        // The plan holds the tagged frames; later queries see the originals.
        for (name, frame) in &state.frames {
            state.context.register(name, frame.clone().lazy());
        }
        Ok(plan?)
    }
}

impl Default for PolarsHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionHandle for PolarsHandle {
    fn name(&self) -> &'static str {
        "polars"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Polars
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        let df = self.plan(sql)?.collect()?;
        dataframe_to_rows(&df)
    }

    async fn open_cursor(&self, sql: &str) -> Result<Box<dyn Cursor>> {
        let plan = self.plan(sql)?;
        Ok(Box::new(PolarsCursor {
            plan: Some(plan),
            result: None,
            offset: 0,
        }))
    }
}

fn with_random_column(frame: &DataFrame) -> Result<DataFrame> {
    let mut rng = rand::thread_rng();
    let values: Vec<f64> = (0..frame.height()).map(|_| rng.gen::<f64>()).collect();
    let mut tagged = frame.clone();
    tagged.with_column(Series::new(POLARS_RANDOM_COLUMN, values))?;
    Ok(tagged)
}

/// Evaluates the plan on the first fetch and slices the result afterwards.
struct PolarsCursor {
    plan: Option<LazyFrame>,
    result: Option<DataFrame>,
    offset: usize,
}

#[async_trait]
impl Cursor for PolarsCursor {
    async fn fetch_next(&mut self, batch_size: usize) -> Result<Vec<Row>> {
        if let Some(plan) = self.plan.take() {
            self.result = Some(plan.collect()?);
        }
        let Some(result) = self.result.as_ref() else {
            return Ok(Vec::new());
        };
        let batch = result.slice(self.offset as i64, batch_size);
        self.offset += batch.height();
        debug!("Fetched {} rows, cursor at {}", batch.height(), self.offset);
        dataframe_to_rows(&batch)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Convert DataFrame to rows, leaving out the internal random column.
fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<Row>> {
    let series: Vec<&Series> = df
        .get_columns()
        .iter()
        .filter(|s| s.name() != POLARS_RANDOM_COLUMN)
        .collect();
    let columns: Arc<[String]> = series
        .iter()
        .map(|s| s.name().to_string())
        .collect::<Vec<_>>()
        .into();

    let mut rows = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let values = series
            .iter()
            .map(|series| series_to_json_value(series, row_idx))
            .collect::<Result<Vec<_>>>()?;
        rows.push(Row::new(columns.clone(), values));
    }
    Ok(rows)
}

fn series_to_json_value(series: &Series, row_idx: usize) -> Result<Value> {
    let any_val = series.get(row_idx)?;

    let value = match any_val {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::Int8(i) => Value::from(i),
        AnyValue::Int16(i) => Value::from(i),
        AnyValue::Int32(i) => Value::from(i),
        AnyValue::Int64(i) => Value::from(i),
        AnyValue::UInt8(u) => Value::from(u),
        AnyValue::UInt16(u) => Value::from(u),
        AnyValue::UInt32(u) => Value::from(u),
        AnyValue::UInt64(u) => Value::from(u),
        AnyValue::Float32(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnyValue::Float64(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    };
    Ok(value)
}

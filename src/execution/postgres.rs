//! PostgreSQL execution handle backed by a sqlx pool.
//!
//! Cursors are server-side (`DECLARE ... NO SCROLL CURSOR`) inside a
//! dedicated transaction, so dropping a cursor rolls the transaction back
//! and returns its connection to the pool.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{Column, Row as SqlxRow, Transaction, TypeInfo};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{QueryError, Result};
use crate::execution::handle::{Cursor, ExecutionHandle};
use crate::execution::row::Row;
use crate::metadata::{ColumnDescriptor, ColumnType, TableHandle, TableKind};
use crate::query::Dialect;

pub struct PostgresHandle {
    pool: PgPool,
}

impl PostgresHandle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Read a table's kind and column descriptors from `information_schema`.
    pub async fn describe_table(&self, schema: &str, name: &str) -> Result<TableHandle> {
        let kind_row = sqlx::query(
            "SELECT table_type::text AS table_type FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2",
        )
        .bind(schema)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            QueryError::configuration(format!("Table not found: {}.{}", schema, name))
        })?;
        let table_type: String = kind_row.try_get("table_type")?;
        let kind = if table_type.eq_ignore_ascii_case("VIEW") {
            TableKind::View
        } else {
            TableKind::Table
        };

        let column_rows = sqlx::query(
            "SELECT column_name::text AS column_name, data_type::text AS data_type \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let columns = column_rows
            .iter()
            .map(|row| {
                let column_name: String = row.try_get("column_name")?;
                let data_type: String = row.try_get("data_type")?;
                Ok(ColumnDescriptor::new(
                    column_name,
                    ColumnType::from_sql_name(&data_type),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Described {}.{}: {:?} with {} columns", schema, name, kind, columns.len());
        Ok(TableHandle::new(name, columns)
            .with_schema(schema)
            .with_kind(kind))
    }
}

#[async_trait]
impl ExecutionHandle for PostgresHandle {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        convert_rows(&rows)
    }

    async fn open_cursor(&self, sql: &str) -> Result<Box<dyn Cursor>> {
        let mut tx = self.pool.begin().await?;
        let name = format!("profiler_cursor_{}", Uuid::new_v4().simple());
        let declare = format!("DECLARE {} NO SCROLL CURSOR FOR {}", name, sql);
        sqlx::query(&declare).execute(&mut *tx).await?;
        debug!("Opened cursor {}", name);
        Ok(Box::new(PgCursor { name, tx: Some(tx) }))
    }
}

struct PgCursor {
    name: String,
    tx: Option<Transaction<'static, Postgres>>,
}

#[async_trait]
impl Cursor for PgCursor {
    async fn fetch_next(&mut self, batch_size: usize) -> Result<Vec<Row>> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| QueryError::Execution(format!("Cursor {} is closed", self.name)))?;
        let fetch = format!("FETCH FORWARD {} FROM {}", batch_size, self.name);
        let rows = sqlx::query(&fetch).fetch_all(&mut **tx).await?;
        convert_rows(&rows)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = self;
        if let Some(mut tx) = this.tx.take() {
            let close = format!("CLOSE {}", this.name);
            sqlx::query(&close).execute(&mut *tx).await?;
            tx.commit().await?;
            debug!("Closed cursor {}", this.name);
        }
        Ok(())
    }
}

fn convert_rows(rows: &[PgRow]) -> Result<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Arc<[String]> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>()
        .into();
    let types: Vec<String> = first
        .columns()
        .iter()
        .map(|c| c.type_info().name().to_string())
        .collect();

    rows.iter()
        .map(|row| {
            let values = types
                .iter()
                .enumerate()
                .map(|(idx, type_name)| decode_value(row, idx, type_name))
                .collect::<Result<Vec<_>>>()?;
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

fn decode_value(row: &PgRow, idx: usize, type_name: &str) -> Result<Value> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .and_then(|v| serde_json::Number::from_f64(f64::from(v)))
            .map(Value::Number),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)?
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(idx)?.map(Value::String)
        }
        "UUID" => row
            .try_get::<Option<Uuid>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)?
            .map(|v| Value::String(v.to_rfc3339())),
        other => {
            debug!("No decoder for column type {}, returning null", other);
            None
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

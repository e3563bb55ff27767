//! Table handle and column descriptors bound to a profiling run.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Table,
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Decimal,
    String,
    Boolean,
    Date,
    Timestamp,
    Struct,
    Array,
    Other(String),
}

impl ColumnType {
    /// Maps a backend type name (`INT8`, `TIMESTAMPTZ`, `STRUCT<...>`) onto a column type.
    pub fn from_sql_name(name: &str) -> Self {
        let upper = name.trim().to_uppercase();
        let base = upper.split(['(', '<']).next().unwrap_or("").trim();
        match base {
            "SMALLINT" | "INT" | "INT2" | "INT4" | "INT8" | "INTEGER" | "BIGINT" | "INT64" => {
                ColumnType::Integer
            }
            "REAL" | "FLOAT" | "FLOAT4" | "FLOAT8" | "FLOAT64" | "DOUBLE" | "DOUBLE PRECISION" => {
                ColumnType::Float
            }
            "NUMERIC" | "DECIMAL" | "BIGNUMERIC" => ColumnType::Decimal,
            "TEXT" | "VARCHAR" | "CHARACTER VARYING" | "CHAR" | "CHARACTER" | "BPCHAR" | "STRING"
            | "NAME" | "UUID" => ColumnType::String,
            "BOOL" | "BOOLEAN" => ColumnType::Boolean,
            "DATE" => ColumnType::Date,
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" | "TIMESTAMP WITH TIME ZONE"
            | "TIMESTAMP WITHOUT TIME ZONE" => ColumnType::Timestamp,
            "STRUCT" | "RECORD" | "JSON" | "JSONB" => ColumnType::Struct,
            "ARRAY" => ColumnType::Array,
            _ if upper.ends_with("[]") => ColumnType::Array,
            _ => ColumnType::Other(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Identifies the relation a runner queries. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHandle {
    schema: Option<String>,
    name: String,
    #[serde(default)]
    kind: TableKind,
    columns: Vec<ColumnDescriptor>,
}

impl TableHandle {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            kind: TableKind::Table,
            columns,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn is_view(&self) -> bool {
        self.kind == TableKind::View
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

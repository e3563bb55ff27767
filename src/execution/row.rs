//! Row - Standardized row format returned by every execution handle

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// `columns` is shared by every row of one result set.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map = self
            .columns
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect::<serde_json::Map<String, Value>>();
        Value::Object(map)
    }
}

/// Sample rows handed back to the profiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TableData {
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let columns = match rows.first() {
            Some(row) if columns.is_empty() => row.columns().to_vec(),
            _ => columns,
        };
        Self {
            columns,
            rows: rows.into_iter().map(Row::into_values).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_lookup() {
        let columns: Arc<[String]> = vec!["id".to_string(), "name".to_string()].into();
        let row = Row::new(columns, vec![json!(1), json!("a")]);
        assert_eq!(row.get("name"), Some(&json!("a")));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.to_json(), json!({"id": 1, "name": "a"}));
    }

    #[test]
    fn test_table_data_takes_columns_from_rows() {
        let columns: Arc<[String]> = vec!["id".to_string()].into();
        let data = TableData::from_rows(vec![], vec![Row::new(columns, vec![json!(7)])]);
        assert_eq!(data.columns, vec!["id".to_string()]);
        assert_eq!(data.rows, vec![vec![json!(7)]]);
    }
}

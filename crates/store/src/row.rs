//! Owned result rows returned by [`Store::query`](crate::Store::query).

use std::sync::Arc;

use rusqlite::types::Value as SqlValue;

use crate::error::{Result, StoreError};

/// One fetched row. Column names are shared between all rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw value by column name.
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Raw value by position.
    pub fn value_at(&self, idx: usize) -> Option<&SqlValue> {
        self.values.get(idx)
    }

    fn require(&self, column: &str) -> Result<&SqlValue> {
        self.value(column)
            .ok_or_else(|| StoreError::MissingColumn(column.to_string()))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        match self.get_opt_i64(column)? {
            Some(v) => Ok(v),
            None => Err(type_error(column, "integer", &SqlValue::Null)),
        }
    }

    pub fn get_opt_i64(&self, column: &str) -> Result<Option<i64>> {
        let value = self.require(column)?;
        match value {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(v) => Ok(Some(*v)),
            SqlValue::Real(v) => Ok(Some(*v as i64)),
            SqlValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| type_error(column, "integer", value)),
            SqlValue::Blob(_) => Err(type_error(column, "integer", value)),
        }
    }

    pub fn get_string(&self, column: &str) -> Result<String> {
        match self.get_opt_string(column)? {
            Some(v) => Ok(v),
            None => Err(type_error(column, "text", &SqlValue::Null)),
        }
    }

    /// Text value; integers and reals are rendered, blobs must be UTF-8.
    pub fn get_opt_string(&self, column: &str) -> Result<Option<String>> {
        let value = self.require(column)?;
        match value {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s.clone())),
            SqlValue::Integer(v) => Ok(Some(v.to_string())),
            SqlValue::Real(v) => Ok(Some(v.to_string())),
            SqlValue::Blob(bytes) => String::from_utf8(bytes.clone())
                .map(Some)
                .map_err(|_| type_error(column, "text", value)),
        }
    }
}

fn type_error(column: &str, expected: &'static str, found: &SqlValue) -> StoreError {
    StoreError::ColumnType {
        column: column.to_string(),
        expected,
        found: match found {
            SqlValue::Null => "NULL",
            SqlValue::Integer(_) => "an integer",
            SqlValue::Real(_) => "a real",
            SqlValue::Text(_) => "text",
            SqlValue::Blob(_) => "a blob",
        },
    }
}

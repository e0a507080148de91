//! Column schema inference
//!
//! Columns are registered in first-seen order across all flattened records
//! of a result set. The type of a column is fixed by the first value seen
//! for it, except for the timestamp column which is always `time`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::flatten::FlatRecord;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Time,
    Number,
    Boolean,
    String,
    /// Null, arrays, or anything else without a scalar type
    Other,
}

impl FieldType {
    /// Type of a JSON value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(_) => FieldType::Number,
            Value::String(_) => FieldType::String,
            Value::Null | Value::Array(_) | Value::Object(_) => FieldType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Time => "time",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::String => "string",
            FieldType::Other => "other",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Ordered column set for one query result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<Column>,
    positions: HashMap<String, usize>,
}

impl ColumnSchema {
    /// Infer the schema of a set of flattened records
    pub fn infer(records: &[FlatRecord], timestamp_field: Option<&str>) -> Self {
        let mut schema = Self::default();

        for record in records {
            for (key, value) in record {
                if schema.positions.contains_key(key) {
                    continue;
                }
                let field_type = if timestamp_field == Some(key.as_str()) {
                    FieldType::Time
                } else {
                    FieldType::of(value)
                };
                schema.push(Column {
                    name: key.clone(),
                    field_type,
                });
            }
        }

        schema
    }

    fn push(&mut self, column: Column) {
        self.positions.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
    }

    /// Columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Position of a column by name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

//! Normalized export rows
//!
//! Source rows arrive as arbitrary JSON-shaped records. Before any writer
//! sees them they are normalized into a [`Row`]: an ordered list of
//! `field -> scalar text` pairs with no nested containers. Arrays and
//! objects are serialized to compact JSON at this boundary.

use crate::domain::{QuireError, Result};
use serde::Serialize;
use serde_json::Value;

/// One flat, ordered row ready for a row writer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    /// Builds a row from already-flat pairs, keeping their order
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Normalizes a JSON record into a flat row
    ///
    /// # Errors
    ///
    /// Returns a serialization error when the value is not a JSON object.
    ///
    /// # Examples
    ///
    /// ```
    /// use quire::domain::row::Row;
    /// use serde_json::json;
    ///
    /// let row = Row::from_value(json!({"id": 1, "tags": ["a", "b"]})).unwrap();
    /// assert_eq!(row.get("id"), Some("1"));
    /// assert_eq!(row.get("tags"), Some(r#"["a","b"]"#));
    /// ```
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                let mut fields = Vec::with_capacity(map.len());
                for (key, value) in map {
                    fields.push((key, scalar_text(value)?));
                }
                Ok(Self { fields })
            }
            other => Err(QuireError::Serialization(format!(
                "Row must be a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Normalizes any serializable record (structs, maps) into a flat row
    pub fn from_serialize<T: Serialize>(record: &T) -> Result<Self> {
        Self::from_value(serde_json::to_value(record)?)
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    /// Looks up a field value by column name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn scalar_text(value: Value) -> Result<String> {
    Ok(match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s,
        nested @ (Value::Array(_) | Value::Object(_)) => serde_json::to_string(&nested)?,
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

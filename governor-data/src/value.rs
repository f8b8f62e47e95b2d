//! Backend-agnostic query parameters and result rows.

use std::collections::BTreeMap;

/// A bound query parameter. Deliberately small — Governor's services only
/// ever need these primitives for the relation/API-key/ACL schemas they own.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

/// A single result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub BTreeMap<String, serde_json::Value>);

impl Row {
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.0.get(column)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(|v| v.as_str())
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(|v| v.as_i64())
    }
}

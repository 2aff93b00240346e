//! Neo4j wire-independent models shared by the graph store implementations

use serde_json::Value;
use std::collections::BTreeMap;

/// One result row, keyed by the column names of the `RETURN` clause.
pub type Record = serde_json::Map<String, Value>;

/// Named query parameters (`$name` in Cypher).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(BTreeMap<String, Value>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Escape an identifier (label, relationship type, property key) for use
/// inside backticks.
pub fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

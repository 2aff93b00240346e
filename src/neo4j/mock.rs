//! In-memory mock implementation of GraphStore for testing.
//!
//! Responses are scripted by substring: the first rule whose needle occurs in
//! the statement (and whose parameter, if any, matches) wins. Every call is
//! recorded so tests can assert what reached the "database".

use crate::neo4j::models::{QueryParams, Record};
use crate::neo4j::traits::GraphStore;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// A scripted answer to `query`
#[derive(Debug, Clone)]
struct ResponseRule {
    needle: String,
    param: Option<(String, Value)>,
    outcome: std::result::Result<Vec<Record>, String>,
}

impl ResponseRule {
    fn matches(&self, statement: &str, params: &QueryParams) -> bool {
        if !statement.contains(&self.needle) {
            return false;
        }
        match &self.param {
            None => true,
            Some((key, expected)) => match (params.get(key), expected) {
                (Some(Value::String(actual)), Value::String(expected)) => {
                    actual.to_lowercase() == expected.to_lowercase()
                }
                (Some(actual), expected) => actual == expected,
                (None, _) => false,
            },
        }
    }
}

/// In-memory mock implementation of GraphStore for testing.
#[derive(Default)]
pub struct MockGraphStore {
    syntax_errors: RwLock<Vec<(String, String)>>,
    explain_failure: RwLock<Option<String>>,
    rules: RwLock<Vec<ResponseRule>>,
    /// Statements passed to `explain`, in call order
    pub explained: RwLock<Vec<String>>,
    /// Statements passed to `query`, in call order
    pub queries: RwLock<Vec<(String, QueryParams)>>,
}

impl MockGraphStore {
    /// Create a new empty MockGraphStore: every statement plans cleanly and
    /// every query returns no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// `explain` reports `message` for any statement containing `needle`
    pub fn with_syntax_error(mut self, needle: &str, message: &str) -> Self {
        self.syntax_errors
            .get_mut()
            .push((needle.to_string(), message.to_string()));
        self
    }

    /// `explain` fails at the transport level for every statement
    pub fn with_unreachable_explain(mut self, message: &str) -> Self {
        *self.explain_failure.get_mut() = Some(message.to_string());
        self
    }

    /// `query` returns `rows` for statements containing `needle`
    pub fn with_rows(mut self, needle: &str, rows: Vec<Record>) -> Self {
        self.rules.get_mut().push(ResponseRule {
            needle: needle.to_string(),
            param: None,
            outcome: Ok(rows),
        });
        self
    }

    /// `query` returns `rows` for statements containing `needle` whose
    /// parameter `key` equals `value` (strings compare case-insensitively)
    pub fn with_rows_for_param(
        mut self,
        needle: &str,
        key: &str,
        value: impl Into<Value>,
        rows: Vec<Record>,
    ) -> Self {
        self.rules.get_mut().push(ResponseRule {
            needle: needle.to_string(),
            param: Some((key.to_string(), value.into())),
            outcome: Ok(rows),
        });
        self
    }

    /// `query` fails for statements containing `needle`
    pub fn with_query_failure(mut self, needle: &str, message: &str) -> Self {
        self.rules.get_mut().push(ResponseRule {
            needle: needle.to_string(),
            param: None,
            outcome: Err(message.to_string()),
        });
        self
    }

    /// Statements sent to `query` that contain `needle`
    pub async fn queries_containing(&self, needle: &str) -> Vec<String> {
        self.queries
            .read()
            .await
            .iter()
            .filter(|(statement, _)| statement.contains(needle))
            .map(|(statement, _)| statement.clone())
            .collect()
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn explain(&self, statement: &str) -> Result<Option<String>> {
        self.explained.write().await.push(statement.to_string());

        if let Some(message) = self.explain_failure.read().await.as_ref() {
            anyhow::bail!("{}", message);
        }

        let syntax_errors = self.syntax_errors.read().await;
        Ok(syntax_errors
            .iter()
            .find(|(needle, _)| statement.contains(needle.as_str()))
            .map(|(_, message)| message.clone()))
    }

    async fn query(&self, statement: &str, params: &QueryParams) -> Result<Vec<Record>> {
        self.queries
            .write()
            .await
            .push((statement.to_string(), params.clone()));

        let rules = self.rules.read().await;
        match rules.iter().find(|r| r.matches(statement, params)) {
            Some(rule) => rule.outcome.clone().map_err(|e| anyhow::anyhow!(e)),
            None => Ok(Vec::new()),
        }
    }
}

/// Build a record from `(column, value)` pairs
pub fn record<const N: usize>(fields: [(&str, Value); N]) -> Record {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

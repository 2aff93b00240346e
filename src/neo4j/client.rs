//! Neo4j client backed by `neo4rs`

use super::models::{QueryParams, Record};
use anyhow::{Context, Result};
use neo4rs::{query, BoltMap, BoltNull, BoltString, BoltType, Graph, Query};
use serde_json::Value;
use std::sync::Arc;

/// Error codes under this prefix mean "the engine rejected the statement",
/// as opposed to a transport or server failure.
const STATEMENT_ERROR_PREFIX: &str = "Neo.ClientError.Statement.";

/// Client for Neo4j operations
pub struct Neo4jClient {
    graph: Arc<Graph>,
}

impl Neo4jClient {
    /// Create a new Neo4j client
    pub async fn new(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;

        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    /// Execute a parameterized Cypher query and collect the raw rows
    pub(crate) async fn execute_with_params(&self, q: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Plan a statement with `EXPLAIN`, returning the engine's message when it
    /// refuses the statement.
    pub async fn explain(&self, statement: &str) -> Result<Option<String>> {
        let q = query(&format!("EXPLAIN {}", statement));
        match self.execute_with_params(q).await {
            Ok(_) => Ok(None),
            Err(e) => match e.downcast_ref::<neo4rs::Error>().and_then(statement_fault) {
                Some(message) => Ok(Some(message)),
                None => Err(e.context("Failed to explain Cypher statement")),
            },
        }
    }

    /// Run a statement and convert every row into a JSON record
    pub async fn query(&self, statement: &str, params: &QueryParams) -> Result<Vec<Record>> {
        let mut q = query(statement);
        for (key, value) in params.iter() {
            q = q.param(key, json_to_bolt(value));
        }

        let rows = self.execute_with_params(q).await?;
        rows.iter()
            .map(|row| {
                row.to::<Record>()
                    .context("Failed to convert Neo4j row into a record")
            })
            .collect()
    }
}

/// Extract the engine message from a statement-level error, if it is one.
fn statement_fault(err: &neo4rs::Error) -> Option<String> {
    match err {
        neo4rs::Error::Neo4j(e) if e.code().starts_with(STATEMENT_ERROR_PREFIX) => {
            Some(e.message().to_string())
        }
        // Older servers surface failures as raw FAILURE messages
        other => {
            let text = other.to_string();
            text.contains(STATEMENT_ERROR_PREFIX).then_some(text)
        }
    }
}

/// Convert a JSON parameter into a Bolt value
fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            BoltType::from(items.iter().map(json_to_bolt).collect::<Vec<BoltType>>())
        }
        Value::Object(map) => {
            let mut bolt = BoltMap::new();
            for (k, v) in map {
                bolt.put(BoltString::from(k.as_str()), json_to_bolt(v));
            }
            BoltType::Map(bolt)
        }
    }
}

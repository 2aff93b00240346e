//! GraphStore trait definition
//!
//! Defines the abstract interface for every graph database call the
//! text2cypher loop makes: dry-run planning, parameterised reads used for
//! schema introspection and value probes, and the final execution.
//! Implemented by `Neo4jClient` and by the in-memory `MockGraphStore`.

use crate::neo4j::models::{QueryParams, Record};
use anyhow::Result;
use async_trait::async_trait;

/// Abstract interface for graph database operations.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Ask the engine to plan `statement` without running it (`EXPLAIN`).
    ///
    /// Returns `Ok(Some(message))` when the engine rejects the statement
    /// (syntax or semantic fault), `Ok(None)` when it plans cleanly, and
    /// `Err` when the database itself could not be reached.
    async fn explain(&self, statement: &str) -> Result<Option<String>>;

    /// Run a statement with parameters and collect every row.
    async fn query(&self, statement: &str, params: &QueryParams) -> Result<Vec<Record>>;
}

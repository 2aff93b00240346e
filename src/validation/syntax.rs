//! Syntax check through a dry-run `EXPLAIN`

use crate::neo4j::GraphStore;
use anyhow::{Context, Result};
use tracing::debug;

/// Plan the statement without running it.
///
/// `Ok(Some(message))` carries the engine's syntax/semantic complaint, which is
/// recoverable and fed to the correction step. `Err` means the database could
/// not be reached at all.
pub async fn check_syntax(graph: &dyn GraphStore, statement: &str) -> Result<Option<String>> {
    let fault = graph
        .explain(statement)
        .await
        .context("EXPLAIN dry run failed")?;

    if let Some(message) = &fault {
        debug!(error = %message, "Statement rejected by EXPLAIN");
    }
    Ok(fault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neo4j::MockGraphStore;

    #[tokio::test]
    async fn test_clean_statement() {
        let graph = MockGraphStore::new();
        let result = check_syntax(&graph, "MATCH (n) RETURN n").await.unwrap();
        assert!(result.is_none());
        assert_eq!(
            graph.explained.read().await.as_slice(),
            ["MATCH (n) RETURN n".to_string()]
        );
    }

    #[tokio::test]
    async fn test_syntax_error_is_returned_as_message() {
        let graph = MockGraphStore::new().with_syntax_error("RETRN", "Invalid input 'RETRN'");
        let result = check_syntax(&graph, "MATCH (n) RETRN n").await.unwrap();
        assert_eq!(result.as_deref(), Some("Invalid input 'RETRN'"));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_an_error() {
        let graph = MockGraphStore::new().with_unreachable_explain("connection refused");
        let err = check_syntax(&graph, "MATCH (n) RETURN n").await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
    }
}

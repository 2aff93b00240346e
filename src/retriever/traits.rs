//! ExampleRetriever trait definition

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A question paired with the Cypher statement that answers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CypherExample {
    pub question: String,
    #[serde(rename = "cql")]
    pub statement: String,
}

impl CypherExample {
    pub fn new(question: &str, statement: &str) -> Self {
        Self {
            question: question.to_string(),
            statement: statement.to_string(),
        }
    }
}

/// Source of few-shot examples for the generation prompt.
///
/// Implementations must be thread-safe to be shared across concurrent runs
/// via `Arc<dyn ExampleRetriever>`.
#[async_trait]
pub trait ExampleRetriever: Send + Sync {
    /// Examples relevant to `question`, most relevant first
    async fn get_examples(&self, question: &str) -> Result<Vec<CypherExample>>;
}

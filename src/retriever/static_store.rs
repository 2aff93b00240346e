//! In-memory example store, optionally loaded from a YAML query file
//!
//! File format:
//!
//! ```yaml
//! queries:
//!   - question: How many vehicles are there?
//!     cql: MATCH (v:Vehicle) RETURN count(v)
//! ```

use super::traits::{CypherExample, ExampleRetriever};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct QueryFile {
    #[serde(default)]
    queries: Vec<CypherExample>,
}

/// Fixed set of examples ranked by word overlap with the question
#[derive(Debug, Clone)]
pub struct StaticExampleRetriever {
    examples: Vec<CypherExample>,
    limit: usize,
}

impl StaticExampleRetriever {
    pub const DEFAULT_LIMIT: usize = 5;

    pub fn new(examples: Vec<CypherExample>) -> Self {
        Self {
            examples,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    /// No examples at all
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Return at most `limit` examples per question
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let file: QueryFile =
            serde_yaml::from_str(contents).context("Invalid example query YAML")?;
        Ok(Self::new(file.queries))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read example queries from {}", path.display()))?;
        let retriever = Self::from_yaml_str(&contents)?;
        info!(
            count = retriever.examples.len(),
            "Loaded example queries from {}",
            path.display()
        );
        Ok(retriever)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl ExampleRetriever for StaticExampleRetriever {
    async fn get_examples(&self, question: &str) -> Result<Vec<CypherExample>> {
        let asked = words(question);
        let mut scored: Vec<(usize, usize, &CypherExample)> = self
            .examples
            .iter()
            .enumerate()
            .map(|(i, e)| (words(&e.question).intersection(&asked).count(), i, e))
            .collect();

        // Highest overlap first, file order among equals
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(scored
            .into_iter()
            .take(self.limit)
            .map(|(_, _, e)| e.clone())
            .collect())
    }
}

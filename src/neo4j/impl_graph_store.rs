//! `GraphStore` implementation for `Neo4jClient`.
//!
//! Every method simply delegates to the corresponding inherent method on `Neo4jClient`.

use async_trait::async_trait;

use super::client::Neo4jClient;
use super::models::{QueryParams, Record};
use super::traits::GraphStore;

#[async_trait]
impl GraphStore for Neo4jClient {
    async fn explain(&self, statement: &str) -> anyhow::Result<Option<String>> {
        self.explain(statement).await
    }

    async fn query(&self, statement: &str, params: &QueryParams) -> anyhow::Result<Vec<Record>> {
        self.query(statement, params).await
    }
}

//! LanguageModel trait definition
//!
//! Defines the abstract interface for the language model collaborator.
//! This trait follows the same pattern as `GraphStore`: async trait +
//! Send + Sync for `Arc<dyn LanguageModel>` usage.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Abstract interface for a prompt-in, text-out language model.
///
/// # Implementations
///
/// - [`HttpLanguageModel`](super::HttpLanguageModel): HTTP client for any
///   OpenAI-compatible `/v1/chat/completions` endpoint
/// - [`MockLanguageModel`](super::MockLanguageModel): scripted responses for tests
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-text completion of a single prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Completion constrained to a JSON object.
    ///
    /// # Errors
    ///
    /// Fails when the call fails or the reply is not valid JSON.
    async fn complete_json(&self, prompt: &str) -> Result<serde_json::Value>;

    /// The name of the model being used, for logs.
    fn model_name(&self) -> &str;
}

/// Ask for JSON and deserialize it into `T`
pub async fn complete_structured<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    prompt: &str,
) -> Result<T> {
    let value = model.complete_json(prompt).await?;
    serde_json::from_value(value).context("Model reply does not match the expected structure")
}

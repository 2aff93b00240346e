//! HTTP language model implementation
//!
//! Implements `LanguageModel` using any OpenAI-compatible `/v1/chat/completions`
//! endpoint (OpenAI, Ollama, LiteLLM, vLLM, ...). JSON completions ask for
//! `response_format: {"type": "json_object"}`.

use super::traits::LanguageModel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// HTTP-based language model using the OpenAI chat completions format.
///
/// Thread-safe and cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct HttpLanguageModel {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl HttpLanguageModel {
    /// Create a client for `url`, the full chat completions endpoint
    /// (e.g. `https://api.openai.com/v1/chat/completions`).
    pub fn new(
        url: String,
        model: String,
        api_key: Option<String>,
        temperature: f32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            model,
            api_key: api_key.filter(|k| !k.is_empty()),
            temperature,
        })
    }

    async fn chat(&self, prompt: &str, json: bool) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            response_format: json.then_some(ResponseFormat {
                r#type: "json_object",
            }),
        };

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        debug!(model = %self.model, json, prompt_len = prompt.len(), "Calling language model");
        let response = req
            .send()
            .await
            .with_context(|| format!("Failed to connect to language model at {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
                if let Some(detail) = err.error {
                    anyhow::bail!(
                        "Language model API error ({}): {}",
                        status.as_u16(),
                        detail.message
                    );
                }
            }
            anyhow::bail!("Language model API returned {}: {}", status.as_u16(), body);
        }

        let resp: ChatResponse = response
            .json()
            .await
            .context("Failed to parse language model response")?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("Language model returned no content")
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(prompt, false).await
    }

    async fn complete_json(&self, prompt: &str) -> Result<serde_json::Value> {
        let content = self.chat(prompt, true).await?;
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        serde_json::from_str(trimmed).context("Language model reply is not valid JSON")
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

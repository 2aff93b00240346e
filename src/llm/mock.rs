//! Mock language model for tests
//!
//! Replies are scripted by substring, like `MockGraphStore`: the first rule
//! whose needle occurs in the prompt answers. A rule holding several replies
//! hands them out in order and then keeps repeating the last one, which makes
//! "wrong first, right after correction" scenarios easy to express.
//! Unscripted prompts fail, so a test notices calls it did not expect.

use super::traits::LanguageModel;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Json(Value),
    Failure(String),
}

#[derive(Debug)]
struct ReplyRule {
    needle: String,
    replies: VecDeque<Reply>,
}

impl ReplyRule {
    fn next(&mut self) -> Option<Reply> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

/// Scripted mock language model for tests.
#[derive(Debug, Default)]
pub struct MockLanguageModel {
    rules: Mutex<Vec<ReplyRule>>,
    /// Every prompt received, in call order
    pub prompts: RwLock<Vec<String>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_rule(mut self, needle: &str, replies: Vec<Reply>) -> Self {
        self.rules.get_mut().push(ReplyRule {
            needle: needle.to_string(),
            replies: replies.into(),
        });
        self
    }

    /// Prompts containing `needle` get `text`
    pub fn with_reply(self, needle: &str, text: &str) -> Self {
        self.push_rule(needle, vec![Reply::Text(text.to_string())])
    }

    /// Prompts containing `needle` get each of `texts` in turn, then the last
    /// one forever
    pub fn with_replies(self, needle: &str, texts: &[&str]) -> Self {
        let replies = texts.iter().map(|t| Reply::Text(t.to_string())).collect();
        self.push_rule(needle, replies)
    }

    /// Prompts containing `needle` get `value` as a JSON reply
    pub fn with_json_reply(self, needle: &str, value: Value) -> Self {
        self.push_rule(needle, vec![Reply::Json(value)])
    }

    /// Prompts containing `needle` fail with `message`
    pub fn with_failure(self, needle: &str, message: &str) -> Self {
        self.push_rule(needle, vec![Reply::Failure(message.to_string())])
    }

    /// Number of prompts containing `needle` received so far
    pub async fn calls_containing(&self, needle: &str) -> usize {
        self.prompts
            .read()
            .await
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }

    async fn answer(&self, prompt: &str) -> Result<Reply> {
        self.prompts.write().await.push(prompt.to_string());

        let mut rules = self.rules.lock().await;
        let reply = rules
            .iter_mut()
            .find(|r| prompt.contains(&r.needle))
            .and_then(ReplyRule::next);

        match reply {
            Some(Reply::Failure(message)) => anyhow::bail!("{}", message),
            Some(reply) => Ok(reply),
            None => anyhow::bail!("No scripted reply for prompt: {}", preview(prompt)),
        }
    }
}

fn preview(prompt: &str) -> String {
    prompt.chars().take(80).collect()
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.answer(prompt).await? {
            Reply::Text(text) => Ok(text),
            Reply::Json(value) => Ok(value.to_string()),
            Reply::Failure(message) => anyhow::bail!("{}", message),
        }
    }

    async fn complete_json(&self, prompt: &str) -> Result<Value> {
        match self.answer(prompt).await? {
            Reply::Json(value) => Ok(value),
            Reply::Text(text) => Ok(serde_json::from_str(&text)?),
            Reply::Failure(message) => anyhow::bail!("{}", message),
        }
    }

    fn model_name(&self) -> &str {
        "mock-language-model"
    }
}

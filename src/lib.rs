//! text2cypher
//!
//! Turns natural-language questions into Cypher and answers them from Neo4j:
//! - Schema introspection (labels, relationship types, enums, numeric ranges)
//! - Pattern-based statement parsing with static schema validation
//! - `EXPLAIN` syntax checks and relationship-direction correction
//! - Optional model-assisted validation with live value-mapping probes
//! - A bounded generate → validate → correct → execute loop

pub mod error;
pub mod llm;
pub mod neo4j;
pub mod retriever;
pub mod schema;
pub mod text2cypher;
pub mod validation;

pub use error::{Result as Text2CypherResult, Text2CypherError};

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::llm::{HttpLanguageModel, LanguageModel};
use crate::neo4j::{GraphStore, Neo4jClient};
use crate::retriever::{ExampleRetriever, StaticExampleRetriever};
use crate::schema::SchemaOptions;
use crate::text2cypher::{Text2Cypher, Text2CypherConfig};
use crate::validation::RangeBoundary;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub neo4j: Neo4jYamlConfig,
    pub llm: LlmYamlConfig,
    pub text2cypher: Text2CypherYamlConfig,
    pub schema: SchemaYamlConfig,
}

/// Neo4j configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jYamlConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for Neo4jYamlConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "password".into(),
        }
    }
}

/// Language model configuration section (any OpenAI-compatible endpoint)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmYamlConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl Default for LlmYamlConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o".into(),
            api_key: None,
            temperature: 0.0,
        }
    }
}

/// Loop configuration section
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Text2CypherYamlConfig {
    #[serde(flatten)]
    pub run: Text2CypherConfig,
    /// YAML file of `queries: [{question, cql}]` few-shot examples
    pub examples_path: Option<String>,
}

/// Schema introspection section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaYamlConfig {
    pub enum_value_limit: usize,
    pub sample_values: bool,
}

impl Default for SchemaYamlConfig {
    fn default() -> Self {
        let options = SchemaOptions::default();
        Self {
            enum_value_limit: options.enum_value_limit,
            sample_values: options.sample_values,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_temperature: f32,
    pub text2cypher: Text2CypherConfig,
    pub examples_path: Option<PathBuf>,
    pub schema: SchemaOptions,
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            None
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Ignoring invalid boolean for {}: {:?}", name, raw);
            None
        }
    }
}

fn env_range_boundary(name: &str) -> Option<RangeBoundary> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "exclusive" => Some(RangeBoundary::Exclusive),
        "inclusive" => Some(RangeBoundary::Inclusive),
        _ => {
            tracing::warn!("Ignoring invalid range boundary for {}: {:?}", name, raw);
            None
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);
        let run = yaml.text2cypher.run;

        Ok(Self {
            neo4j_uri: std::env::var("NEO4J_URI").unwrap_or(yaml.neo4j.uri),
            neo4j_user: std::env::var("NEO4J_USER").unwrap_or(yaml.neo4j.user),
            neo4j_password: std::env::var("NEO4J_PASSWORD").unwrap_or(yaml.neo4j.password),
            llm_url: std::env::var("LLM_URL").unwrap_or(yaml.llm.url),
            llm_model: std::env::var("LLM_MODEL").unwrap_or(yaml.llm.model),
            llm_api_key: std::env::var("LLM_API_KEY")
                .ok()
                .or(yaml.llm.api_key)
                .filter(|k| !k.is_empty()),
            llm_temperature: env_parse("LLM_TEMPERATURE").unwrap_or(yaml.llm.temperature),
            text2cypher: Text2CypherConfig {
                max_attempts: env_parse("TEXT2CYPHER_MAX_ATTEMPTS").unwrap_or(run.max_attempts),
                llm_validation: env_bool("TEXT2CYPHER_LLM_VALIDATION")
                    .unwrap_or(run.llm_validation),
                allow_execute_on_final_attempt: env_bool(
                    "TEXT2CYPHER_ALLOW_EXECUTE_ON_FINAL_ATTEMPT",
                )
                .unwrap_or(run.allow_execute_on_final_attempt),
                range_boundary: env_range_boundary("TEXT2CYPHER_RANGE_BOUNDARY")
                    .unwrap_or(run.range_boundary),
            },
            examples_path: std::env::var("TEXT2CYPHER_EXAMPLES_PATH")
                .ok()
                .or(yaml.text2cypher.examples_path)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            schema: SchemaOptions {
                enum_value_limit: env_parse("SCHEMA_ENUM_VALUE_LIMIT")
                    .unwrap_or(yaml.schema.enum_value_limit),
                sample_values: env_bool("SCHEMA_SAMPLE_VALUES").unwrap_or(yaml.schema.sample_values),
            },
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub neo4j: Arc<dyn GraphStore>,
    pub model: Arc<dyn LanguageModel>,
    pub retriever: Arc<dyn ExampleRetriever>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state with all services initialized
    pub async fn new(config: Config) -> Result<Self> {
        let neo4j = Arc::new(
            Neo4jClient::new(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
                .await?,
        );

        let model = Arc::new(HttpLanguageModel::new(
            config.llm_url.clone(),
            config.llm_model.clone(),
            config.llm_api_key.clone(),
            config.llm_temperature,
        )?);

        let retriever = Arc::new(match &config.examples_path {
            Some(path) => StaticExampleRetriever::from_yaml_file(path)?,
            None => StaticExampleRetriever::empty(),
        });

        Ok(Self {
            neo4j,
            model,
            retriever,
            config: Arc::new(config),
        })
    }

    /// Introspect the schema and build a runner over these services
    pub async fn text2cypher(&self) -> Text2CypherResult<Text2Cypher> {
        Text2Cypher::connect(
            self.neo4j.clone(),
            self.model.clone(),
            self.retriever.clone(),
            &self.config.schema,
            self.config.text2cypher.clone(),
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================

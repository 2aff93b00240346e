//! Model-assisted semantic validation with live value-mapping probes

use crate::llm::{complete_structured, LanguageModel};
use crate::neo4j::{escape_identifier, GraphStore, QueryParams};
use crate::schema::{EntityKind, PropertyType, SchemaModel};
use crate::text2cypher::prompts;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Structured reply expected from the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateCypherOutput {
    /// Problems the model found in the statement
    #[serde(default)]
    pub errors: Vec<String>,
    /// Literal values the statement filters on
    #[serde(default)]
    pub filters: Vec<PropertyFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub node_label: String,
    pub property_key: String,
    pub property_value: Value,
}

impl PropertyFilter {
    fn value_text(&self) -> String {
        match &self.property_value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmValidation {
    pub errors: Vec<String>,
    pub mapping_errors: Vec<String>,
}

/// Ask the model for semantic problems and filters, then probe every filter on
/// a STRING property for a case-insensitive match in the database.
pub async fn validate_with_model(
    model: &dyn LanguageModel,
    graph: &dyn GraphStore,
    question: &str,
    schema: &SchemaModel,
    statement: &str,
) -> Result<LlmValidation> {
    let prompt = prompts::validation_prompt(question, schema, statement);
    let output: ValidateCypherOutput = complete_structured(model, &prompt)
        .await
        .context("Validation model call failed")?;

    let mut result = LlmValidation {
        errors: output.errors,
        mapping_errors: Vec::new(),
    };

    for filter in &output.filters {
        let is_string = schema
            .property(EntityKind::Node, &filter.node_label, &filter.property_key)
            .is_some_and(|p| p.property_type == PropertyType::String);
        if !is_string {
            debug!(
                label = %filter.node_label,
                property = %filter.property_key,
                "Skipping mapping probe for non-STRING or unknown property"
            );
            continue;
        }

        let value = filter.value_text();
        let probe = format!(
            "MATCH (n:{}) WHERE toLower(n.{}) = toLower($value) RETURN 'yes' LIMIT 1",
            escape_identifier(&filter.node_label),
            escape_identifier(&filter.property_key)
        );
        let rows = graph
            .query(&probe, &QueryParams::new().with("value", value.as_str()))
            .await
            .context("Value mapping probe failed")?;

        if rows.is_empty() {
            result.mapping_errors.push(format!(
                "Missing value mapping for {} on property {} with value {}",
                filter.node_label, filter.property_key, value
            ));
        }
    }

    debug!(
        errors = result.errors.len(),
        mapping_errors = result.mapping_errors.len(),
        "Model validation finished"
    );
    Ok(result)
}

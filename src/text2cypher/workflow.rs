//! The generate → validate → (correct → validate)* → execute loop

use super::prompts;
use super::state::{
    decide, CypherState, NextAction, Outcome, Records, Step, Text2CypherConfig, Text2CypherOutput,
};
use crate::error::{Result, Text2CypherError};
use crate::llm::LanguageModel;
use crate::neo4j::{GraphStore, QueryParams};
use crate::retriever::{CypherExample, ExampleRetriever};
use crate::schema::{load_schema, SchemaModel, SchemaOptions};
use crate::validation::{check_syntax, validate_with_model, validate_with_schema, DirectionCorrector};
use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Error recorded when a typed relationship fits no declared triple
pub const SCHEMA_MISMATCH_ERROR: &str = "The generated Cypher statement doesn't fit the graph schema";

/// Answer one question end to end.
///
/// Executes at most once. Validation-time problems drive the correction loop
/// and end up in the output's `errors`; only collaborator failures and
/// execution faults are returned as `Err`.
pub async fn generate_validate_execute(
    graph: &dyn GraphStore,
    model: &dyn LanguageModel,
    question: &str,
    schema: &SchemaModel,
    examples: &[CypherExample],
    config: &Text2CypherConfig,
) -> Result<Text2CypherOutput> {
    let mut state = CypherState::new(question);

    generate(&mut state, model, schema, examples).await?;

    loop {
        validate(&mut state, graph, model, schema, config).await?;

        match state.next_action {
            NextAction::Correct => correct(&mut state, model, schema).await?,
            NextAction::Execute => {
                execute(&mut state, graph).await?;
                return Ok(state.into_output(Outcome::Executed));
            }
            NextAction::End => {
                warn!(
                    attempts = state.attempts,
                    errors = ?state.errors,
                    "Giving up without a valid statement"
                );
                return Ok(state.into_output(Outcome::GaveUp));
            }
        }
    }
}

async fn generate(
    state: &mut CypherState,
    model: &dyn LanguageModel,
    schema: &SchemaModel,
    examples: &[CypherExample],
) -> Result<()> {
    let prompt = prompts::generation_prompt(schema, examples, &state.question);
    let reply = model
        .complete(&prompt)
        .await
        .context("Generation failed")
        .map_err(Text2CypherError::Model)?;

    state.statement = prompts::extract_cypher(&reply);
    state.steps.push(Step::GenerateCypher);
    debug!(statement = %state.statement, "Generated statement");
    Ok(())
}

/// One validation pass: syntax, direction correction, then static schema
/// checks or model validation.
async fn validate(
    state: &mut CypherState,
    graph: &dyn GraphStore,
    model: &dyn LanguageModel,
    schema: &SchemaModel,
    config: &Text2CypherConfig,
) -> Result<()> {
    state.attempts += 1;
    state.steps.push(Step::ValidateCypher);

    let mut errors = Vec::new();

    if let Some(syntax_error) = check_syntax(graph, &state.statement)
        .await
        .map_err(Text2CypherError::Database)?
    {
        errors.push(syntax_error);
    }

    let correction = DirectionCorrector::new(schema).correct(&state.statement);
    if !correction.fits_schema() {
        debug!(mismatches = ?correction.mismatches, "Relationships outside the schema");
        errors.push(SCHEMA_MISMATCH_ERROR.to_string());
    }
    if correction.statement != state.statement {
        info!(attempt = state.attempts, "Relationship direction was corrected");
    }
    state.statement = correction.statement;

    if config.llm_validation {
        match validate_with_model(model, graph, &state.question, schema, &state.statement).await {
            Ok(result) => {
                errors.extend(result.errors);
                errors.extend(result.mapping_errors);
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Model validation failed");
                errors.push(format!("The Cypher statement could not be validated: {:#}", e));
            }
        }
    } else {
        errors.extend(validate_with_schema(
            &state.statement,
            schema,
            config.range_boundary,
        ));
    }

    state.errors = errors;
    state.next_action = decide(!state.errors.is_empty(), state.attempts, config);

    info!(
        attempt = state.attempts,
        errors = state.errors.len(),
        next_action = ?state.next_action,
        "Validated statement"
    );
    Ok(())
}

async fn correct(state: &mut CypherState, model: &dyn LanguageModel, schema: &SchemaModel) -> Result<()> {
    let prompt = prompts::correction_prompt(schema, &state.question, &state.statement, &state.errors);
    let reply = model
        .complete(&prompt)
        .await
        .context("Correction failed")
        .map_err(Text2CypherError::Model)?;

    state.statement = prompts::extract_cypher(&reply);
    state.steps.push(Step::CorrectCypher);
    debug!(statement = %state.statement, "Corrected statement");
    Ok(())
}

async fn execute(state: &mut CypherState, graph: &dyn GraphStore) -> Result<()> {
    let rows = graph
        .query(&state.statement, &QueryParams::new())
        .await
        .map_err(Text2CypherError::Execution)?;

    let records = Records::from_rows(rows);
    info!(rows = records.rows().len(), "Executed statement");
    state.records = Some(records);
    state.steps.push(Step::ExecuteCypher);
    Ok(())
}

/// Long-lived entry point holding the collaborators and the schema snapshot.
///
/// `run` takes `&self`, so one instance serves concurrent questions.
#[derive(Clone)]
pub struct Text2Cypher {
    graph: Arc<dyn GraphStore>,
    model: Arc<dyn LanguageModel>,
    retriever: Arc<dyn ExampleRetriever>,
    schema: Arc<SchemaModel>,
    config: Text2CypherConfig,
}

impl Text2Cypher {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        model: Arc<dyn LanguageModel>,
        retriever: Arc<dyn ExampleRetriever>,
        schema: Arc<SchemaModel>,
        config: Text2CypherConfig,
    ) -> Self {
        Self {
            graph,
            model,
            retriever,
            schema,
            config,
        }
    }

    /// Introspect the schema from `graph`, then build the runner
    pub async fn connect(
        graph: Arc<dyn GraphStore>,
        model: Arc<dyn LanguageModel>,
        retriever: Arc<dyn ExampleRetriever>,
        schema_options: &SchemaOptions,
        config: Text2CypherConfig,
    ) -> Result<Self> {
        let schema = load_schema(graph.as_ref(), schema_options).await?;
        Ok(Self::new(graph, model, retriever, Arc::new(schema), config))
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    pub fn config(&self) -> &Text2CypherConfig {
        &self.config
    }

    pub async fn run(&self, question: &str) -> Result<Text2CypherOutput> {
        let span = info_span!("text2cypher", run_id = %uuid::Uuid::new_v4());
        async {
            info!(question, model = self.model.model_name(), "Answering question");

            let examples = self
                .retriever
                .get_examples(question)
                .await
                .map_err(Text2CypherError::Retrieval)?;
            debug!(examples = examples.len(), "Retrieved examples");

            let output = generate_validate_execute(
                self.graph.as_ref(),
                self.model.as_ref(),
                question,
                &self.schema,
                &examples,
                &self.config,
            )
            .await?;

            info!(
                outcome = ?output.outcome,
                attempts = output.attempts,
                "Finished"
            );
            Ok(output)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLanguageModel;
    use crate::neo4j::MockGraphStore;
    use crate::schema::{PropertyDescriptor, PropertyType};

    fn schema() -> SchemaModel {
        SchemaModel::new()
            .with_node(
                "Vehicle",
                vec![PropertyDescriptor::new("make", PropertyType::String).with_values(["Honda"])],
            )
            .with_node("Customer", vec![PropertyDescriptor::new("name", PropertyType::String)])
            .with_triple("Customer", "OWNS", "Vehicle")
    }

    fn static_config() -> Text2CypherConfig {
        Text2CypherConfig {
            llm_validation: false,
            ..Text2CypherConfig::default()
        }
    }

    #[tokio::test]
    async fn test_direction_is_fixed_before_execution() {
        let graph = MockGraphStore::new();
        let model = MockLanguageModel::new().with_reply(
            "Generate a Cypher statement",
            "```cypher\nMATCH (v:Vehicle)-[:OWNS]->(c:Customer) RETURN c.name\n```",
        );

        let output = generate_validate_execute(&graph, &model, "Who owns a car?", &schema(), &[], &static_config())
            .await
            .unwrap();

        assert_eq!(output.outcome, Outcome::Executed);
        assert_eq!(output.statement, "MATCH (v:Vehicle)<-[:OWNS]-(c:Customer) RETURN c.name");
        assert_eq!(output.records, Some(Records::NoResults));
        assert_eq!(
            graph.queries_containing("MATCH (v:Vehicle)<-[:OWNS]-").await.len(),
            1
        );
    }

    #[tokio::test]
    async fn test_schema_mismatch_triggers_correction() {
        let graph = MockGraphStore::new();
        let model = MockLanguageModel::new()
            .with_reply("Generate a Cypher statement", "MATCH (v:Vehicle)-[:OWNS]->(v2:Vehicle) RETURN v")
            .with_reply("Correct the Cypher statement", "MATCH (c:Customer)-[:OWNS]->(v:Vehicle) RETURN v");

        let output = generate_validate_execute(&graph, &model, "Owned cars?", &schema(), &[], &static_config())
            .await
            .unwrap();

        assert_eq!(output.outcome, Outcome::Executed);
        assert_eq!(output.attempts, 2);
        assert!(output.errors.is_empty());
        assert_eq!(
            model.calls_containing(SCHEMA_MISMATCH_ERROR).await,
            1,
            "correction prompt should carry the mismatch error"
        );
    }

    #[tokio::test]
    async fn test_model_validation_failure_blocks_execution() {
        let graph = MockGraphStore::new();
        let destructive = "MATCH (v:Vehicle {make: 'Toyota'}) DETACH DELETE v";
        let model = MockLanguageModel::new()
            .with_reply("Generate a Cypher statement", destructive)
            .with_reply("Correct the Cypher statement", destructive)
            .with_failure("Check the Cypher statement", "validator offline");

        let output = generate_validate_execute(
            &graph,
            &model,
            "Remove the Toyotas",
            &schema(),
            &[],
            &Text2CypherConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(output.outcome, Outcome::GaveUp);
        assert_eq!(output.attempts, 3);
        assert!(output.records.is_none());
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].contains("validator offline"));
        assert!(graph.queries.read().await.is_empty());
        assert_eq!(model.calls_containing("validator offline").await, 2);
    }

    #[tokio::test]
    async fn test_collaborator_failures_are_fatal() {
        let model = MockLanguageModel::new().with_failure("Generate a Cypher statement", "quota exceeded");
        let err = generate_validate_execute(&MockGraphStore::new(), &model, "q", &schema(), &[], &static_config())
            .await
            .unwrap_err();
        assert!(matches!(err, Text2CypherError::Model(_)));

        let model = MockLanguageModel::new().with_reply("Generate a Cypher statement", "MATCH (n) RETURN n");
        let graph = MockGraphStore::new().with_unreachable_explain("connection refused");
        let err = generate_validate_execute(&graph, &model, "q", &schema(), &[], &static_config())
            .await
            .unwrap_err();
        assert!(matches!(err, Text2CypherError::Database(_)));

        let graph = MockGraphStore::new().with_query_failure("MATCH (n)", "out of memory");
        let err = generate_validate_execute(&graph, &model, "q", &schema(), &[], &static_config())
            .await
            .unwrap_err();
        assert!(matches!(err, Text2CypherError::Execution(_)));
        assert!(err.to_string().contains("out of memory"));
    }
}

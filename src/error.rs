//! Error taxonomy for a text2cypher run
//!
//! Only failures that stop a request surface here. Validation-time problems
//! (syntax errors, schema mismatches, missing value mappings) are plain strings
//! fed back into the correction loop, and giving up is an [`Outcome`] rather
//! than an error.
//!
//! [`Outcome`]: crate::text2cypher::Outcome

use thiserror::Error;

/// Fatal errors for a single text2cypher request.
///
/// Collaborators (`GraphStore`, `LanguageModel`, `ExampleRetriever`) report
/// `anyhow::Error`; the workflow wraps them into the variant matching the
/// stage that failed.
#[derive(Debug, Error)]
pub enum Text2CypherError {
    /// The schema could not be introspected; no validation is attempted.
    #[error("graph schema unavailable: {0:#}")]
    SchemaUnavailable(anyhow::Error),

    /// The language model failed during generation or correction.
    #[error("language model call failed: {0:#}")]
    Model(anyhow::Error),

    /// Few-shot examples could not be retrieved.
    #[error("example retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),

    /// The database could not be reached while validating the statement.
    #[error("graph database unavailable during validation: {0:#}")]
    Database(anyhow::Error),

    /// The validated statement failed while running for real. Not retried.
    #[error("cypher execution failed: {0:#}")]
    Execution(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Text2CypherError>;

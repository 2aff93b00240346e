//! Question → Cypher → records, with bounded validation and correction

pub mod prompts;
pub mod state;
pub mod workflow;

pub use state::{
    decide, CypherState, NextAction, Outcome, Records, Step, Text2CypherConfig, Text2CypherOutput,
};
pub use workflow::{generate_validate_execute, Text2Cypher, SCHEMA_MISMATCH_ERROR};

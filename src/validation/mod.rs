//! Statement validation: parsing, schema checks, syntax dry-runs, direction
//! correction and model-assisted checks.

pub mod direction;
pub mod llm_check;
pub mod parser;
pub mod schema_check;
pub mod syntax;
pub mod task;

pub use direction::{correct_directions, DirectionCorrection, DirectionCorrector};
pub use llm_check::{validate_with_model, LlmValidation, PropertyFilter, ValidateCypherOutput};
pub use parser::{extract_entities, ExtractedEntities};
pub use schema_check::{validate_tasks, validate_with_schema, RangeBoundary};
pub use syntax::check_syntax;
pub use task::{Combinator, LabelExpression, PropertyValue, ValidationTask};

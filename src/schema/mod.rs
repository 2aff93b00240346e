//! Graph schema snapshot and its introspection

pub mod loader;
pub mod models;

pub use loader::{load_schema, SchemaOptions};
pub use models::*;

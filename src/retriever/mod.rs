//! Few-shot example retrieval
//!
//! - `ExampleRetriever` trait: question → ranked examples
//! - `StaticExampleRetriever`: in-memory / YAML-backed store

pub mod static_store;
pub mod traits;

pub use static_store::StaticExampleRetriever;
pub use traits::{CypherExample, ExampleRetriever};

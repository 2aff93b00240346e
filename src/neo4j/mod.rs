//! Neo4j client, trait and models for the graph database collaborator

pub mod client;
mod impl_graph_store;
pub mod mock;
pub mod models;
pub mod traits;

pub use client::Neo4jClient;
pub use mock::MockGraphStore;
pub use models::*;
pub use traits::GraphStore;

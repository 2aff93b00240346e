//! Language model collaborator
//!
//! Architecture follows the project pattern (trait + impl + mock):
//! - `LanguageModel` trait: async prompt → text / JSON interface
//! - `HttpLanguageModel`: real implementation using any OpenAI-compatible
//!   chat completions API
//! - `MockLanguageModel`: scripted replies for tests

pub mod mock;
pub mod provider;
pub mod traits;

pub use mock::MockLanguageModel;
pub use provider::HttpLanguageModel;
pub use traits::{complete_structured, LanguageModel};

//! LLM integration for photo critiques.
//!
//! Provides a provider abstraction over three structurally different APIs
//! (Gemini with a native response schema, OpenAI chat completions in JSON
//! mode, Anthropic messages returning free-form text) that all yield the
//! same validated [`CritiqueResult`](crate::types::CritiqueResult).

pub(crate) mod anthropic;
pub(crate) mod gemini;
pub(crate) mod openai;
pub(crate) mod provider;
pub mod schema;

pub use anthropic::strip_code_fences;
pub use provider::{
    resolve_env_var, CritiqueProvider, CritiqueRequest, ImageInput, ProviderFactory,
};

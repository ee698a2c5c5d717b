//! Static catalog of the models each provider can be asked for.
//!
//! The catalog only constrains which (provider, model) pairs are valid; it
//! is never mutated at runtime.

use crate::types::Provider;

/// A model offered by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /// Identifier sent on the wire
    pub id: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
}

const GOOGLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gemini-2.5-flash",
        display_name: "Gemini 2.5 Flash",
    },
    ModelInfo {
        id: "gemini-3-pro-preview",
        display_name: "Gemini 3 Pro",
    },
];

const OPENAI_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-4o",
        display_name: "GPT-4o",
    },
    ModelInfo {
        id: "gpt-4o-mini",
        display_name: "GPT-4o Mini",
    },
];

const ANTHROPIC_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "claude-3-5-sonnet-20241022",
        display_name: "Claude 3.5 Sonnet",
    },
    ModelInfo {
        id: "claude-3-haiku-20240307",
        display_name: "Claude 3 Haiku",
    },
];

/// Models offered by `provider`, in preference order.
pub fn models(provider: Provider) -> &'static [ModelInfo] {
    match provider {
        Provider::Google => GOOGLE_MODELS,
        Provider::OpenAi => OPENAI_MODELS,
        Provider::Anthropic => ANTHROPIC_MODELS,
    }
}

/// First (preferred) model for `provider`.
pub fn default_model(provider: Provider) -> &'static ModelInfo {
    // Every provider lists at least one model.
    &models(provider)[0]
}

/// Whether `model` is offered by `provider`.
pub fn contains(provider: Provider, model: &str) -> bool {
    models(provider).iter().any(|m| m.id == model)
}

/// Look up a model's catalog entry.
pub fn find(provider: Provider, model: &str) -> Option<&'static ModelInfo> {
    models(provider).iter().find(|m| m.id == model)
}

/// Keep `model` if the provider offers it, otherwise fall back to the
/// provider's first model.
pub fn resolve(provider: Provider, model: &str) -> &'static str {
    find(provider, model)
        .unwrap_or_else(|| default_model(provider))
        .id
}

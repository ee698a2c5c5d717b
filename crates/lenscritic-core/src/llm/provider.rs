//! Critique provider trait and request types.
//!
//! Defines the interface that all providers implement, plus the factory
//! that creates the right provider for a (provider, model) pair.

use crate::catalog;
use crate::config::LlmConfig;
use crate::error::CritiqueError;
use crate::types::{CritiqueResult, Provider};
use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type, always "image/jpeg" for compact images
    pub media_type: String,
}

impl ImageInput {
    /// Wrap JPEG bytes; the compact encoder only ever produces JPEG.
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: "image/jpeg".to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// One critique request. Immutable once built.
#[derive(Debug, Clone)]
pub struct CritiqueRequest {
    /// The compact image to critique
    pub image: ImageInput,
    /// Prompt text for the model
    pub prompt: String,
    pub provider: Provider,
    /// Model identifier
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// Trait that all critique providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn CritiqueProvider>` for dynamic dispatch).
#[async_trait]
pub trait CritiqueProvider: Send + Sync {
    /// Which provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Submit the image and prompt, returning a validated critique.
    async fn submit_critique(
        &self,
        request: &CritiqueRequest,
    ) -> Result<CritiqueResult, CritiqueError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Map a transport-level failure to an HTTP error without a status.
pub(crate) fn transport_error(provider: Provider, error: reqwest::Error) -> CritiqueError {
    CritiqueError::Http {
        provider,
        status: None,
        message: format!("request failed: {error}"),
    }
}

/// Build an HTTP error from a non-success response.
///
/// Prefers the provider-reported `error.message` from the JSON body and falls
/// back to the status's canonical reason.
pub(crate) async fn status_error(provider: Provider, response: reqwest::Response) -> CritiqueError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    CritiqueError::Http {
        provider,
        status: Some(status.as_u16()),
        message: error_message(status, &body),
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        })
}

/// Factory that creates the appropriate provider from config.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider adapter for `provider` and `model`.
    ///
    /// The API key is resolved here, at call time, so a key exported after
    /// startup is picked up. A missing key fails before any network call.
    pub fn create(
        provider: Provider,
        model: &str,
        config: &LlmConfig,
    ) -> Result<Box<dyn CritiqueProvider>, CritiqueError> {
        if !catalog::contains(provider, model) {
            return Err(CritiqueError::UnknownModel {
                provider,
                model: model.to_string(),
            });
        }

        let api_key = resolve_env_var(config.api_key_for(provider))
            .ok_or(CritiqueError::MissingCredential { provider })?;
        let endpoint = config.endpoint(provider);

        tracing::debug!("Creating {provider} provider for {model} at {endpoint}");
        Ok(match provider {
            Provider::Google => Box::new(super::gemini::GeminiProvider::new(
                &endpoint, &api_key, model,
            )),
            Provider::OpenAi => Box::new(super::openai::OpenAiProvider::new(
                &endpoint, &api_key, model,
            )),
            Provider::Anthropic => Box::new(super::anthropic::AnthropicProvider::new(
                &endpoint, &api_key, model,
            )),
        })
    }
}

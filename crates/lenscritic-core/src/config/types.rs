//! Sub-configuration structs with their defaults.

use crate::catalog;
use crate::types::{CritiqueStyle, Language, Provider};
use serde::{Deserialize, Serialize};

/// Compact-image encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Bound on the larger side of the image sent to providers
    pub max_dimension: u32,

    /// JPEG quality (1-100) of the image sent to providers
    pub jpeg_quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1536,
            jpeg_quality: 85,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum input file size in megabytes
    pub max_file_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
        }
    }
}

/// Default critique settings used when the CLI doesn't override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CritiqueConfig {
    pub provider: Provider,

    /// Model identifier; must belong to `provider`
    pub model: String,

    pub style: CritiqueStyle,

    /// Language of the critique's text values
    pub language: Language,
}

impl Default for CritiqueConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Google,
            model: catalog::default_model(Provider::Google).id.to_string(),
            style: CritiqueStyle::Balanced,
            language: Language::Chinese,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Shared API key for every provider (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Maximum tokens the provider may generate
    pub max_tokens: u32,

    /// Optional bound on a single provider call. Unset means wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Google Gemini overrides
    pub google: ProviderConfig,

    /// OpenAI overrides
    pub openai: ProviderConfig,

    /// Anthropic overrides
    pub anthropic: ProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: "${API_KEY}".to_string(),
            max_tokens: 2000,
            timeout_secs: None,
            google: ProviderConfig::default(),
            openai: ProviderConfig::default(),
            anthropic: ProviderConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Per-provider section.
    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Google => &self.google,
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
        }
    }

    /// API base URL for `provider`, without a trailing slash.
    pub fn endpoint(&self, provider: Provider) -> String {
        let endpoint = self
            .provider(provider)
            .endpoint
            .as_deref()
            .unwrap_or(match provider {
                Provider::Google => "https://generativelanguage.googleapis.com",
                Provider::OpenAi => "https://api.openai.com",
                Provider::Anthropic => "https://api.anthropic.com",
            });
        endpoint.trim_end_matches('/').to_string()
    }

    /// Raw (unresolved) API key for `provider`: its own key if set, else the shared one.
    pub fn api_key_for(&self, provider: Provider) -> &str {
        self.provider(provider)
            .api_key
            .as_deref()
            .unwrap_or(&self.api_key)
    }
}

/// Per-provider endpoint and credential overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL (defaults to the provider's public API)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Provider-specific API key (supports ${ENV_VAR} syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

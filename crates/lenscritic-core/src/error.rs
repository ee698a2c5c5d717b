//! Error types for the Lenscritic critique pipeline.
//!
//! Errors are organized by concern so the message shown to the user names
//! the stage (image, provider, result) and carries the provider's own reason
//! when one was reported.

use crate::types::Provider;
use thiserror::Error;

/// Top-level error type for Lenscritic operations.
#[derive(Error, Debug)]
pub enum LensError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Critique pipeline errors
    #[error("Critique error: {0}")]
    Critique(#[from] CritiqueError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while turning an image into a critique.
#[derive(Error, Debug)]
pub enum CritiqueError {
    /// No API key available for the selected provider
    #[error("{provider} API key is missing. Set API_KEY or llm.{}.api_key in the config.", .provider.id())]
    MissingCredential { provider: Provider },

    /// Input could not be parsed as a raster image
    #[error("Could not decode image: {message}")]
    Decode { message: String },

    /// Decoded image could not be re-encoded
    #[error("Could not render image: {message}")]
    Render { message: String },

    /// Input exceeds the configured size limit
    #[error("Image file too large ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge { size_mb: u64, max_mb: u64 },

    /// Provider returned a non-success status, or the request never completed
    #[error("{provider} error: {message}")]
    Http {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },

    /// Schema-enforced provider returned no text
    #[error("No response from {provider}")]
    EmptyResponse { provider: Provider },

    /// Response body is not well-formed structured data
    #[error("Could not parse {provider} response: {message}")]
    Parse { provider: Provider, message: String },

    /// Well-formed response that violates the critique schema
    #[error("{provider} returned an incomplete critique (invalid fields: {})", .fields.join(", "))]
    InvalidResult {
        provider: Provider,
        fields: Vec<String>,
    },

    /// Model is not listed for the provider
    #[error("Unknown model '{model}' for {provider}")]
    UnknownModel { provider: Provider, model: String },

    /// Session action not allowed in the current phase
    #[error("Cannot {action} while the session is {phase}")]
    InvalidTransition {
        phase: &'static str,
        action: &'static str,
    },

    /// Provider call exceeded the configured timeout
    #[error("{provider} did not respond within {secs}s")]
    Timeout { provider: Provider, secs: u64 },

    /// In-flight request was superseded by a newer selection
    #[error("Request cancelled")]
    Cancelled,
}

/// Convenience type alias for Lenscritic results.
pub type Result<T> = std::result::Result<T, LensError>;

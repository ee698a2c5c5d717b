//! Lenscritic Core - photo critique through multimodal LLMs.
//!
//! Lenscritic takes one photograph and returns a structured critique
//! (scores, strengths, weaknesses, improvements) from Google Gemini, OpenAI
//! or Anthropic.
//!
//! # Architecture
//!
//! ```text
//! Image bytes → Normalize (preview + compact JPEG) → Prompt(style) → Provider → CritiqueResult
//! ```
//!
//! The [`CritiqueOrchestrator`] runs this flow as a single cancellable task
//! and publishes [`SessionState`] transitions to read-only observers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lenscritic_core::{Config, CritiqueOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> lenscritic_core::Result<()> {
//!     let config = Config::load()?;
//!     let mut orchestrator = CritiqueOrchestrator::from_config(config);
//!
//!     let bytes = tokio::fs::read("./photo.jpg").await?;
//!     orchestrator.select_image(bytes).await?.wait().await;
//!     if let Some(result) = orchestrator.state().result() {
//!         println!("{}: {}", result.title, result.overall_score);
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, CritiqueError, LensError, Result};
pub use orchestrator::{CritiqueOrchestrator, CritiqueSettings, CritiqueTask};
pub use pipeline::{ImageNormalizer, NormalizedImage, PreviewImage};
pub use prompt::PromptBuilder;
pub use session::{Phase, SessionState};
pub use types::{CritiqueResult, CritiqueStyle, Language, Provider};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

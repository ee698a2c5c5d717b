//! Configuration validation with range checks.

use crate::catalog;
use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.image.max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "image.max_dimension must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&self.image.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "image.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "llm.max_tokens must be > 0".into(),
            ));
        }
        if self.llm.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "llm.timeout_secs must be > 0 when set".into(),
            ));
        }
        if !catalog::contains(self.critique.provider, &self.critique.model) {
            return Err(ConfigError::ValidationError(format!(
                "critique.model '{}' is not offered by {}",
                self.critique.model, self.critique.provider
            )));
        }
        Ok(())
    }
}

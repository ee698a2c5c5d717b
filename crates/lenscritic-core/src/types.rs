//! Core data types for the Lenscritic critique pipeline.
//!
//! These types describe what goes into a critique request (provider, style,
//! language) and what comes back from a provider (the scored critique).

use serde::{Deserialize, Serialize};
use std::fmt;

/// LLM service a critique can be requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini (native response-schema enforcement)
    #[default]
    Google,
    /// OpenAI Chat Completions (JSON-object mode)
    OpenAi,
    /// Anthropic Messages (free-form text)
    Anthropic,
}

impl Provider {
    /// All providers in catalog order.
    pub const ALL: [Provider; 3] = [Provider::Google, Provider::OpenAi, Provider::Anthropic];

    /// Lowercase identifier used in config files and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    /// Human-readable provider name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which qualities the critique should weigh most heavily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CritiqueStyle {
    /// Technical execution and artistic merit in equal measure
    #[default]
    Balanced,
    /// Exposure, sharpness, noise, optics; strict scoring
    Technical,
    /// Mood, emotion, color, storytelling
    Artistic,
    /// Visual hook and shareability
    Social,
}

impl CritiqueStyle {
    pub const ALL: [CritiqueStyle; 4] = [
        CritiqueStyle::Balanced,
        CritiqueStyle::Technical,
        CritiqueStyle::Artistic,
        CritiqueStyle::Social,
    ];
}

impl fmt::Display for CritiqueStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CritiqueStyle::Balanced => "balanced",
            CritiqueStyle::Technical => "technical",
            CritiqueStyle::Artistic => "artistic",
            CritiqueStyle::Social => "social",
        };
        f.write_str(label)
    }
}

/// Natural language the critique's string values are requested in.
///
/// JSON keys stay English regardless of language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Simplified Chinese
    #[default]
    Chinese,
    English,
}

/// The scored critique returned by a provider.
///
/// Field names match the JSON keys every provider is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueResult {
    /// Catchy title for the photo
    pub title: String,

    /// Overall score, 0-100
    pub overall_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creativity_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_score: Option<f64>,

    /// Summary paragraph
    pub summary: String,

    /// Key strengths (3-5 expected)
    pub strengths: Vec<String>,

    #[serde(default)]
    pub weaknesses: Vec<String>,

    /// Actionable improvements (3-5 expected)
    pub improvements: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_analysis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_analysis: Option<String>,
}

impl CritiqueResult {
    /// Named sub-scores that the provider reported, in display order.
    pub fn sub_scores(&self) -> Vec<(&'static str, f64)> {
        [
            ("composition", self.composition_score),
            ("lighting", self.lighting_score),
            ("creativity", self.creativity_score),
            ("technique", self.technical_score),
        ]
        .into_iter()
        .filter_map(|(name, score)| score.map(|s| (name, s)))
        .collect()
    }
}

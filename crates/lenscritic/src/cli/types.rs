//! CLI enum types shared by commands: provider, style, language, output format.

use clap::ValueEnum;
use lenscritic_core::{CritiqueStyle, Language, Provider};

/// Supported critique providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    /// Google Gemini
    Google,
    /// OpenAI
    Openai,
    /// Anthropic Claude
    Anthropic,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Google => Provider::Google,
            ProviderArg::Openai => Provider::OpenAi,
            ProviderArg::Anthropic => Provider::Anthropic,
        }
    }
}

/// Critique emphasis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StyleArg {
    /// Technical execution and artistic merit in equal measure
    Balanced,
    /// Exposure, sharpness, noise and optics, scored strictly
    Technical,
    /// Mood, emotion, color and storytelling
    Artistic,
    /// Visual hook and shareability
    Social,
}

impl From<StyleArg> for CritiqueStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Balanced => CritiqueStyle::Balanced,
            StyleArg::Technical => CritiqueStyle::Technical,
            StyleArg::Artistic => CritiqueStyle::Artistic,
            StyleArg::Social => CritiqueStyle::Social,
        }
    }
}

/// Language of the critique text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LanguageArg {
    /// Simplified Chinese
    #[value(alias = "zh")]
    Chinese,
    /// English
    #[value(alias = "en")]
    English,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Chinese => Language::Chinese,
            LanguageArg::English => Language::English,
        }
    }
}

/// How a finished critique is printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Styled report with score bars
    #[default]
    Pretty,
    /// The critique as a JSON object
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

//! The `lenscritic prompt` command: print the prompt a critique would send.

use clap::Args;
use lenscritic_core::{Config, PromptBuilder};

use super::types::{LanguageArg, StyleArg};

/// Arguments for the `prompt` command.
#[derive(Args, Debug)]
pub struct PromptArgs {
    /// Critique emphasis (defaults to `critique.style` in the config)
    #[arg(short, long, value_enum)]
    pub style: Option<StyleArg>,

    /// Language of the critique text (defaults to `critique.language`)
    #[arg(short, long, value_enum)]
    pub language: Option<LanguageArg>,
}

/// Execute the prompt command.
pub async fn execute(args: PromptArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let style = args.style.map_or(config.critique.style, Into::into);
    let language = args.language.map_or(config.critique.language, Into::into);

    println!("{}", PromptBuilder::new(language).build_prompt(style));
    Ok(())
}

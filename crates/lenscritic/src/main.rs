//! Lenscritic CLI - structured photo critiques from multimodal LLMs.
//!
//! Lenscritic sends one photo to Google Gemini, OpenAI or Anthropic and
//! prints a scored critique: title, scores, strengths, weaknesses and
//! concrete improvements.
//!
//! # Usage
//!
//! ```bash
//! # Critique a photo with the configured provider
//! lenscritic critique photo.jpg
//!
//! # Pick provider, style and language; print JSON
//! lenscritic critique photo.jpg --provider anthropic --style technical --language english --format json
//!
//! # List available models
//! lenscritic models
//!
//! # View configuration
//! lenscritic config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Lenscritic - structured photo critiques from multimodal LLMs.
#[derive(Parser, Debug)]
#[command(name = "lenscritic")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Critique a photo
    Critique(cli::critique::CritiqueArgs),

    /// List the models each provider offers
    Models(cli::models::ModelsArgs),

    /// Print the prompt a critique would send
    Prompt(cli::prompt::PromptArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match lenscritic_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `lenscritic config path`."
            );
            lenscritic_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lenscritic v{}", lenscritic_core::VERSION);

    match cli.command {
        Commands::Critique(args) => cli::critique::execute(args).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Prompt(args) => cli::prompt::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

//! The `lenscritic critique` command: one image, one critique.

mod render;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use lenscritic_core::{
    Config, CritiqueOrchestrator, CritiqueResult, CritiqueSettings, ImageNormalizer, Phase,
    SessionState,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{LanguageArg, OutputFormat, ProviderArg, StyleArg};

/// Arguments for the `critique` command.
#[derive(Args, Debug)]
pub struct CritiqueArgs {
    /// Image file to critique
    #[arg(required = true)]
    pub image: PathBuf,

    /// Provider to ask (defaults to `critique.provider` in the config)
    #[arg(short, long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Model of the provider (defaults to the configured or first listed model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Critique emphasis
    #[arg(short, long, value_enum)]
    pub style: Option<StyleArg>,

    /// Language of the critique text
    #[arg(short, long, value_enum)]
    pub language: Option<LanguageArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Write the lossless preview (PNG) to this path
    #[arg(long)]
    pub preview_out: Option<PathBuf>,

    /// Write the compact JPEG sent to the provider to this path
    #[arg(long)]
    pub compact_out: Option<PathBuf>,
}

/// Execute the critique command.
pub async fn execute(args: CritiqueArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let settings = resolve_settings(&args, &config)?;

    let image_path = expand_path(&args.image);
    let bytes = tokio::fs::read(&image_path)
        .await
        .with_context(|| format!("Failed to read image: {}", image_path.display()))?;
    tracing::info!(
        "Critiquing {} with {} ({}, {})",
        image_path.display(),
        settings.provider,
        settings.model,
        settings.style
    );

    if let Some(path) = &args.compact_out {
        write_compact(&config, bytes.clone(), &expand_path(path)).await?;
    }

    let mut orchestrator = CritiqueOrchestrator::new(config, settings.clone());
    let mut session = orchestrator.subscribe();
    let task = orchestrator.select_image(bytes).await?;

    let spinner = (orchestrator.state().phase() == Phase::Loading).then(|| {
        create_spinner(&format!(
            "Asking {} ({})...",
            settings.provider, settings.model
        ))
    });

    tokio::select! {
        finished = session.wait_for(|state| state.phase().is_terminal()) => {
            finished.context("Critique session closed unexpectedly")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling request");
            task.cancel();
        }
    }
    task.wait().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let state = orchestrator.state();
    if let (Some(path), Some(preview)) = (&args.preview_out, state.preview()) {
        let path = expand_path(path);
        std::fs::write(&path, preview.png_bytes()?)
            .with_context(|| format!("Failed to write preview: {}", path.display()))?;
        tracing::info!("Preview written to {}", path.display());
    }

    match state {
        SessionState::Succeeded { result, .. } => {
            print_result(&result, &settings, args.format)?;
            Ok(())
        }
        SessionState::Failed { message, .. } => anyhow::bail!(message),
        other => anyhow::bail!("Critique ended while {}", other.phase()),
    }
}

/// Config defaults, overridden by whatever the command line specifies.
///
/// A provider override without a model falls back to that provider's first
/// model.
fn resolve_settings(args: &CritiqueArgs, config: &Config) -> anyhow::Result<CritiqueSettings> {
    let mut settings = CritiqueSettings::from_config(&config.critique);
    if let Some(provider) = args.provider {
        settings = settings.with_provider(provider.into());
    }
    if let Some(model) = &args.model {
        settings = settings.with_model(model)?;
    }
    if let Some(style) = args.style {
        settings = settings.with_style(style.into());
    }
    if let Some(language) = args.language {
        settings = settings.with_language(language.into());
    }
    Ok(settings)
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

/// Dump the payload exactly as it will be sent.
async fn write_compact(config: &Config, bytes: Vec<u8>, path: &Path) -> anyhow::Result<()> {
    let normalizer = ImageNormalizer::new(config.image.clone(), config.limits.clone());
    let decoded = normalizer.decode(bytes).await?;
    let compact = normalizer.compact(decoded.image.into()).await?;
    let jpeg = BASE64
        .decode(&compact.image.data)
        .context("Compact payload is not valid base64")?;
    std::fs::write(path, jpeg)
        .with_context(|| format!("Failed to write compact image: {}", path.display()))?;
    tracing::info!(
        "Compact image ({}x{}) written to {}",
        compact.width,
        compact.height,
        path.display()
    );
    Ok(())
}

fn print_result(
    result: &CritiqueResult,
    settings: &CritiqueSettings,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Pretty => print!("{}", render::render(result, settings)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use lenscritic_core::{CritiqueStyle, Language, Provider};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: CritiqueArgs,
    }

    fn parse(argv: &[&str]) -> CritiqueArgs {
        let mut full = vec!["lenscritic"];
        full.extend_from_slice(argv);
        TestCli::parse_from(full).args
    }

    #[test]
    fn test_defaults_come_from_config() {
        let args = parse(&["photo.jpg"]);
        let settings = resolve_settings(&args, &Config::default()).unwrap();
        assert_eq!(settings, CritiqueSettings::default());
        assert_eq!(args.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_provider_override_picks_first_model() {
        let args = parse(&["photo.jpg", "--provider", "openai", "--style", "social"]);
        let settings = resolve_settings(&args, &Config::default()).unwrap();
        assert_eq!(settings.provider, Provider::OpenAi);
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.style, CritiqueStyle::Social);
    }

    #[test]
    fn test_explicit_model_and_language() {
        let args = parse(&[
            "photo.jpg",
            "-p",
            "anthropic",
            "-m",
            "claude-3-haiku-20240307",
            "-l",
            "en",
        ]);
        let settings = resolve_settings(&args, &Config::default()).unwrap();
        assert_eq!(settings.model, "claude-3-haiku-20240307");
        assert_eq!(settings.language, Language::English);
    }

    #[test]
    fn test_model_of_another_provider_is_rejected() {
        let args = parse(&["photo.jpg", "--model", "gpt-4o"]);
        let err = resolve_settings(&args, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("Unknown model"));
    }

    #[test]
    fn test_expand_path_leaves_plain_paths() {
        assert_eq!(
            expand_path(Path::new("/tmp/photo.jpg")),
            PathBuf::from("/tmp/photo.jpg")
        );
    }

    #[tokio::test]
    async fn test_write_compact_dumps_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("compact.jpg");

        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(2000, 1000)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        write_compact(&Config::default(), png.into_inner(), &out)
            .await
            .unwrap();
        let written = image::open(&out).unwrap();
        assert_eq!((written.width(), written.height()), (1536, 768));
    }
}

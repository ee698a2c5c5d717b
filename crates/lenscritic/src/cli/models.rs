//! The `lenscritic models` command: list the model catalog.

use clap::Args;
use lenscritic_core::{catalog, Config, Provider};

use super::types::ProviderArg;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only list models of this provider
    #[arg(short, long, value_enum)]
    pub provider: Option<ProviderArg>,
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let providers: Vec<Provider> = match args.provider {
        Some(provider) => vec![provider.into()],
        None => Provider::ALL.to_vec(),
    };
    print!("{}", listing(&providers, &config));
    Ok(())
}

/// One block per provider; the configured default is marked with `*`.
fn listing(providers: &[Provider], config: &Config) -> String {
    let mut out = String::new();
    for provider in providers {
        out.push_str(&format!("{} ({})\n", provider, provider.id()));
        for model in catalog::models(*provider) {
            let is_default =
                *provider == config.critique.provider && model.id == config.critique.model;
            let marker = if is_default { '*' } else { ' ' };
            out.push_str(&format!(
                "  {marker} {:<28} {}\n",
                model.id, model.display_name
            ));
        }
    }
    out
}

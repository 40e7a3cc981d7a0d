//! Command implementations

pub mod doctor;
pub mod manifest;
pub mod process;
pub mod push;
pub mod render;
pub mod status;
pub mod zonal;

use std::path::Path;

use anyhow::{Context, Result};
use routeatlas_core::config::AtlasConfig;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

/// Execute the parsed command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    match cli.command {
        Commands::Process(args) => process::execute(args, cli.config.as_deref(), &output).await,
        Commands::Push(args) => {
            push::execute(args, &cli.storage, cli.config.as_deref(), &output).await
        }
        Commands::Render(args) => {
            render::execute(args, &cli.storage, cli.config.as_deref(), &output).await
        }
        Commands::Zonal(args) => zonal::execute(args, cli.config.as_deref(), &output).await,
        Commands::Status => status::execute(&cli.storage, cli.config.as_deref(), &output).await,
        Commands::Doctor(args) => {
            doctor::execute(args, &cli.storage, cli.config.as_deref(), &output).await
        }
        Commands::Manifest(args) => manifest::execute(args, &output),
    }
}

/// Load the layered configuration.
///
/// An explicit `--config` path must exist; without one, `routeatlas.toml`
/// in the working directory is used when present. Environment variables
/// are applied on top either way.
pub(crate) fn load_config(config_path: Option<&Path>) -> Result<AtlasConfig> {
    let mut config = AtlasConfig::with_defaults();

    match config_path {
        Some(path) => {
            config = config
                .load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
        }
        None => {
            let default_path = Path::new("routeatlas.toml");
            if default_path.exists() {
                config = config
                    .load_from_file(default_path)
                    .context("Failed to load routeatlas.toml")?;
            }
        }
    }

    Ok(config.load_from_env())
}

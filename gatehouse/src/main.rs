//! gatehouse CLI: run the gateway or inspect its configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gatehouse::{AppState, GatehouseConfig, gprovider::CredentialOverrides};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// gatehouse: one streaming chat endpoint in front of many LLM providers.
#[derive(Parser)]
#[command(name = "gatehouse", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "gatehouse.toml", global = true)]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,

    /// List the provider catalog and where each credential resolves from.
    Providers,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration (env values redacted).
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Serve => cmd_serve(config).await?,
        Commands::Providers => cmd_providers(config)?,
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
    }

    Ok(())
}

async fn cmd_serve(config: GatehouseConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(config)?);
    info!("starting gatehouse");

    gatehouse::serve(state, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
    })
    .await
    .context("gateway server failed")?;

    Ok(())
}

fn cmd_providers(config: GatehouseConfig) -> Result<()> {
    let state = AppState::from_config(config)?;
    let registry = state.registry().map_err(|e| anyhow::anyhow!(e))?;
    let no_overrides = CredentialOverrides::new();

    println!(
        "{:<12} {:<26} {:<10} {:<6} DEFAULT MODEL",
        "PROVIDER", "CREDENTIAL KEY", "SOURCE", "TOOLS"
    );
    for instance in registry.all_providers() {
        let source = instance
            .resolve_credential(&no_overrides)
            .map(|resolved| resolved.source.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<26} {:<10} {:<6} {}",
            instance.name(),
            instance.config().credential_key(),
            source,
            if instance.supports_tools() { "yes" } else { "no" },
            instance.default_model()
        );
    }
    Ok(())
}

fn cmd_config(config_path: &Path, config: &GatehouseConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(&config.redacted())
            .map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<GatehouseConfig> {
    if path.exists() {
        GatehouseConfig::load(path).map_err(|e| anyhow::anyhow!(e))
    } else {
        GatehouseConfig::from_toml_str("").map_err(|e| anyhow::anyhow!(e))
    }
}

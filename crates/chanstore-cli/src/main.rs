mod cli;
mod commands;
mod config;
mod storage;

use std::path::Path;

use crate::{
    cli::{Command, ConfigCommand},
    config::Config,
};
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the file-backed store.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();
    let config_path = storage::config_path(cli.config.as_deref())?;
    let config = Config::read(&config_path)?;
    init_tracing(config.log_filter());

    let data_dir = cli.data_dir.as_deref();
    let mut out = std::io::stdout();
    match cli.command {
        Command::Version => print_version(),
        Command::Health => {
            let store = storage::store_from_config(&config, data_dir)?;
            commands::run_store_health(&store).await?;
            println!("Storage: ok ({})", store.root().display());
        }
        Command::Config(ConfigCommand::Init) => init_config(&config, &config_path)?,
        Command::Auth(cmd) => {
            let store = storage::store_from_config(&config, data_dir)?;
            commands::handle_auth(cmd, &store, &mut out).await?
        }
        Command::Settings(cmd) => {
            let store = storage::store_from_config(&config, data_dir)?;
            commands::handle_settings(cmd, &store, &mut out).await?
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    // RUST_LOG wins; logs go to stderr so JSON output stays clean.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("chanstore {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &Config, path: &Path) -> Result<()> {
    if config.write_if_missing(path)? {
        println!("Config initialized at {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

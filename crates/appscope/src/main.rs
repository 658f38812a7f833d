//! Appscope - mobile installer package inspection service

mod cli;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use appscope_core::config::{load_config, load_config_or_default, validate_config, LoggingConfig};
use appscope_core::{AppState, Config};
use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, source) = resolve_config(&cli)?;

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let _guard = init_tracing(&config.logging);
    match &source {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => info!("no configuration file found, using defaults"),
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let state = AppState::from_config(&config)?;
        appscope_core::serve(state).await
    })?;

    Ok(())
}

/// Load the configuration file and apply command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let (mut config, source) = match &cli.config {
        Some(path) => {
            let config = load_config(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            (config, Some(path.clone()))
        }
        None => {
            let cwd = std::env::current_dir()?;
            load_config_or_default(&cwd)?
        }
    };

    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
        validate_config(&config)?;
    }

    Ok((config, source))
}

/// Set up tracing with two layers:
/// - Console: controlled by RUST_LOG (default: info)
/// - File: debug-level JSON, rolled daily, unless `logging.file` is off
fn init_tracing(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_dir) = logging.file.then(|| log_directory(logging)).flatten() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "appscope.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_filter(console_filter),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
            .init();

        return Some(guard);
    }

    // Console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(console_filter),
        )
        .init();

    None
}

/// Returns the log directory path, creating it if needed.
fn log_directory(logging: &LoggingConfig) -> Option<PathBuf> {
    let log_dir = match &logging.directory {
        Some(dir) => dir.clone(),
        None => dirs::home_dir()?.join(".appscope").join("logs"),
    };
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}

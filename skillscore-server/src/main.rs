//! # SkillScore Server
//!
//! Accepts skills for a user, scores them asynchronously and serves the
//! results. Scoring runs either on an in-process worker pool or out of
//! process behind a Redis stream, chosen by `dispatch.strategy`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skillscore_config::{Config, ConfigLoad, ConfigLoader};
use skillscore_core::DispatchStrategy;
use skillscore_server::{create_app, infra::startup::build_state};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "skillscore-server")]
#[command(about = "Skill ingestion and asynchronous scoring service")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Dispatch strategy: `worker` or `broker` (overrides config)
    #[arg(long)]
    strategy: Option<DispatchStrategy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_runtime_config(&cli)?;
    let state = build_state(&config)
        .await
        .context("failed to start the scoring pipeline")?;
    let dispatcher = Arc::clone(&state.dispatcher);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting SkillScore server on {}", addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining dispatcher");
    dispatcher.shutdown().await;
    let stats = dispatcher.stats();
    info!(
        enqueued = stats.enqueued,
        completed = stats.completed,
        failed = stats.failed,
        "shutdown complete"
    );

    Ok(())
}

fn load_runtime_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = cli.env_file.clone() {
        loader = loader.with_env_file(path);
    }
    if let Some(strategy) = cli.strategy {
        loader = loader.with_strategy(strategy);
    }

    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    info!(
        dispatch.strategy = %config.dispatch.strategy,
        dispatch.batch_policy = %config.dispatch.batch_policy,
        worker.concurrency = config.worker.concurrency,
        worker.processing_delay = ?config.worker.processing_delay,
        broker.topic = %config.broker.topic,
        fixtures.seed = config.fixtures.seed,
        "configuration resolved"
    );

    Ok(config)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

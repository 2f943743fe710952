//! beacond — the Beacon daemon.
//!
//! Assembles the status subsystems into one process:
//! - Config (beacon.toml)
//! - Metric sampler (sysinfo)
//! - Health aggregator tick loop
//! - Status API (heartbeat, extended status, Prometheus)
//!
//! # Usage
//!
//! ```text
//! beacond run --config /etc/beacon/beacon.toml --port 8080
//! beacond check --config /etc/beacon/beacon.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use beacon_core::BeaconConfig;
use beacon_health::{AggregatorSettings, HealthAggregator};
use beacon_metrics::SystemSampler;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "beacond", about = "Beacon service status daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the aggregator and serve the status endpoints.
    Run {
        /// Path to beacon.toml. Defaults apply when omitted.
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Port to listen on, overriding `server.listen`.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Take one reading and print the extended status as JSON.
    Check {
        /// Path to beacon.toml. Defaults apply when omitted.
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run { config, port } => {
            let config = load_config(config.as_deref())?;
            run_daemon(config, port).await
        }
        Command::Check { config } => {
            let config = load_config(config.as_deref())?;
            check(&config)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beacon=debug"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BeaconConfig> {
    match path {
        Some(path) => {
            let config = BeaconConfig::from_file(path)?;
            info!(path = ?path, "config loaded");
            Ok(config)
        }
        None => {
            info!("no config file given, using defaults");
            Ok(BeaconConfig::default())
        }
    }
}

async fn run_daemon(config: BeaconConfig, port: Option<u16>) -> anyhow::Result<()> {
    info!("Beacon daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let settings = AggregatorSettings::from_config(&config)?;
    let sampler = SystemSampler::new(&config.storage.dir, config.health.memory_limit)?;
    info!(dir = ?config.storage.dir, "metric sampler initialized");

    let health = Arc::new(HealthAggregator::new(settings));

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let aggregator_handle = tokio::spawn({
        let health = Arc::clone(&health);
        async move {
            health.run(sampler, shutdown_rx).await;
        }
    });

    // ── Start status server ────────────────────────────────────

    let router = beacon_api::build_router(Arc::clone(&health));
    let mut addr = config.server.listen;
    if let Some(port) = port {
        addr.set_port(port);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "status server listening");

    let server = axum::serve(listener, router).with_graceful_shutdown({
        let health = Arc::clone(&health);
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to install CTRL+C handler");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            health.request_shutdown();
            let _ = shutdown_tx.send(true);
        }
    });

    server.await?;

    // Wait for the final SHUTDOWN tick.
    wait_for_aggregator(aggregator_handle).await?;

    info!("Beacon daemon stopped");
    Ok(())
}

async fn wait_for_aggregator(handle: tokio::task::JoinHandle<()>) -> anyhow::Result<()> {
    handle.await.map_err(|e| {
        error!(error = %e, "status aggregator task failed");
        anyhow::Error::new(e).context("status aggregator task failed")
    })
}

fn check(config: &BeaconConfig) -> anyhow::Result<()> {
    let settings = AggregatorSettings::from_config(config)?;
    let mut sampler = SystemSampler::new(&config.storage.dir, config.health.memory_limit)?;
    let health = HealthAggregator::new(settings);

    let snapshot = health.tick(&mut sampler);
    println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "beacond", "--log-json", "run", "--config", "beacon.toml", "--port", "9000",
        ])
        .unwrap();
        assert!(cli.log_json);
        match cli.command {
            Command::Run { config, port } => {
                assert_eq!(config, Some(PathBuf::from("beacon.toml")));
                assert_eq!(port, Some(9000));
            }
            Command::Check { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn parses_check_without_config() {
        let cli = Cli::try_parse_from(["beacond", "check"]).unwrap();
        assert!(matches!(cli.command, Command::Check { config: None }));
    }

    #[test]
    fn load_config_defaults_and_file() {
        let defaults = load_config(None).unwrap();
        assert_eq!(defaults.service.name, "Beacon");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.toml");
        std::fs::write(&path, "[service]\nname = \"Validator X\"\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().service.name, "Validator X");

        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[tokio::test]
    async fn aggregator_panic_fails_the_daemon() {
        let handle: tokio::task::JoinHandle<()> = tokio::spawn(async { panic!("tick loop crashed") });
        let err = wait_for_aggregator(handle).await.unwrap_err();
        assert!(err.to_string().contains("status aggregator task failed"));

        let handle = tokio::spawn(async {});
        assert!(wait_for_aggregator(handle).await.is_ok());
    }

    #[test]
    fn check_prints_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = BeaconConfig {
            storage: beacon_core::StorageConfig {
                dir: dir.path().to_path_buf(),
                test_object_max_size: None,
            },
            ..BeaconConfig::default()
        };
        // The storage filesystem may not be listed inside some containers;
        // the tick still publishes either way.
        check(&config).unwrap();
    }
}

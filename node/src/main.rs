// Copyright (c) 2026 QUPI Contributors. MIT License.
// See LICENSE for details.

//! # QUPI Node
//!
//! Entry point for the `qupi-node` binary. Parses CLI arguments, initializes
//! logging and metrics, and serves the HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`: serve the API and the metrics endpoint
//! - `simulate`: run one handshake in-process and print the responses
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use qupi_protocol::qkd::{BitSource, OsBitSource, SeededBitSource};
use qupi_protocol::TransactionService;

use cli::{Commands, EntropySource, QupiNodeCli, ServiceArgs};
use logging::LogFormat;
use metrics::{MetricsState, NodeMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = QupiNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Simulate(args) => simulate(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Builds the service from the shared CLI options.
fn build_service(args: &ServiceArgs) -> Result<TransactionService> {
    let source: Arc<dyn BitSource> = match args.entropy {
        EntropySource::Os => Arc::new(OsBitSource),
        EntropySource::Seeded => {
            tracing::warn!(seed = args.seed, "using seeded entropy, keys are predictable");
            Arc::new(SeededBitSource::new(args.seed))
        }
    };
    TransactionService::new(args.service_config(), source)
        .context("invalid service configuration")
}

/// Starts the API server, the metrics endpoint and the session sweeper.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.service.log_format),
    );

    tracing::info!(
        host = %args.host,
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        key_length = args.service.key_length,
        max_sessions = args.service.max_sessions,
        session_ttl_secs = args.service.session_ttl_secs,
        "starting qupi-node"
    );

    let service = Arc::new(build_service(&args.service)?);
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to create metrics registry")?);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            qupi_protocol::config::PROTOCOL_VERSION,
        ),
        service: Arc::clone(&service),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.host, args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(MetricsState {
            metrics: Arc::clone(&node_metrics),
            service: Arc::clone(&service),
        });
    let metrics_addr = format!("{}:{}", args.host, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Session sweeper ---
    let sweep_service = Arc::clone(&service);
    let sweep_every = Duration::from_secs(args.sweep_interval_secs.max(1));
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            let removed = sweep_service.expire_sessions();
            if removed > 0 {
                tracing::info!(
                    removed,
                    remaining = sweep_service.session_count(),
                    "expired sessions swept"
                );
            }
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    sweeper.abort();
    tracing::info!("qupi-node stopped");
    Ok(())
}

/// The three responses of one demo run, as the browser would see them.
#[derive(Serialize)]
struct SimulationReport {
    generate_key: api::GenerateKeyResponse,
    process_transaction: api::TransactionResponse,
    transaction_status: api::TransactionResponse,
}

/// Runs generate → process → status in-process and prints the JSON.
fn simulate(args: cli::SimulateArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.service.log_format),
    );

    let service = build_service(&args.service)?;

    let kg = service
        .generate_key(&args.sender, &args.receiver)
        .context("key generation failed")?;
    let tx = service
        .process_transaction(&kg.transaction_id, args.amount)
        .context("transaction processing failed")?;
    let view = service
        .get_status(&kg.transaction_id)
        .context("status lookup failed")?;

    let report = SimulationReport {
        generate_key: api::GenerateKeyResponse::from(&kg),
        process_transaction: api::TransactionResponse::processed(&tx),
        transaction_status: api::TransactionResponse::from_view(&view),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to encode report")?
    );
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("qupi-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", qupi_protocol::config::PROTOCOL_VERSION);
    println!("cipher    {}", qupi_protocol::config::SYMMETRIC_ALGORITHM);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

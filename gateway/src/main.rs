// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Oasis Rosetta Gateway
//!
//! Entry point for the `oasis-gateway` binary. Parses CLI arguments,
//! initializes logging and metrics, connects the node client, and serves
//! the Rosetta API.
//!
//! Subcommands:
//!
//! - `run`: serve the Rosetta API
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

use oasis_gateway_protocol::client::JsonRpcNodeClient;
use oasis_gateway_protocol::config::{MIDDLEWARE_VERSION, ROSETTA_VERSION};
use oasis_gateway_protocol::construction::ConstructionService;

use cli::{Commands, GatewayCli};
use metrics::GatewayMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = GatewayCli::parse();

    match cli.command {
        Commands::Run(args) => run_gateway(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Serves the Rosetta API and the metrics endpoint until a shutdown
/// signal arrives.
async fn run_gateway(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.log_format);

    let config = args.gateway_config();
    tracing::info!(
        blockchain = %config.blockchain,
        network = %config.network,
        chain_context = ?config.chain_context,
        node_url = %args.node_url,
        node_timeout_ms = args.node_timeout_ms,
        "starting oasis-gateway"
    );

    // --- Node client ---
    let node = JsonRpcNodeClient::new(args.node_url.as_str())
        .with_context(|| format!("failed to create node client for {}", args.node_url))?;

    // --- Metrics ---
    let gateway_metrics =
        Arc::new(GatewayMetrics::new().context("failed to register prometheus metrics")?);

    // --- Application state ---
    let app_state = api::AppState {
        service: Arc::new(ConstructionService::new(config, Arc::new(node))),
        metrics: Arc::clone(&gateway_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = SocketAddr::new(args.listen, args.port);
    let api_listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!(%api_addr, "Rosetta API listening");

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&gateway_metrics));
    let metrics_addr = SocketAddr::new(args.listen, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!(%metrics_addr, "metrics server listening");

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "API server error");
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "metrics server error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("oasis-gateway stopped");
    Ok(())
}

fn print_version() {
    println!("oasis-gateway {}", MIDDLEWARE_VERSION);
    println!("rosetta       {}", ROSETTA_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed, that signal is ignored and the other
/// one still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

//! # CLI Interface
//!
//! Command-line arguments for `oasis-gateway`, via `clap` derive. Every
//! `run` flag can also be set through an `OASIS_GATEWAY_*` environment
//! variable, which is how container deployments configure it.

use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::time::Duration;

use oasis_gateway_protocol::config::{
    GatewayConfig, BLOCKCHAIN_NAME, DEFAULT_API_PORT, DEFAULT_METRICS_PORT, DEFAULT_NETWORK_NAME,
    DEFAULT_NODE_TIMEOUT, DEFAULT_NODE_URL,
};

use crate::logging::LogFormat;

/// Rosetta Construction API gateway for the Oasis network.
///
/// Builds unsigned staking transactions from Rosetta operations, combines
/// them with offline signatures, and relays the result to an Oasis node.
#[derive(Parser, Debug)]
#[command(
    name = "oasis-gateway",
    about = "Rosetta Construction API gateway for the Oasis network",
    version,
    propagate_version = true
)]
pub struct GatewayCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the Rosetta API.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Address the API and metrics servers bind to.
    #[arg(long, env = "OASIS_GATEWAY_LISTEN", default_value = "0.0.0.0")]
    pub listen: IpAddr,

    /// Port for the Rosetta API.
    #[arg(long, env = "OASIS_GATEWAY_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "OASIS_GATEWAY_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// JSON-RPC endpoint of the Oasis node.
    #[arg(long, env = "OASIS_GATEWAY_NODE_URL", default_value = DEFAULT_NODE_URL)]
    pub node_url: String,

    /// Blockchain name callers must present.
    #[arg(long, env = "OASIS_GATEWAY_BLOCKCHAIN", default_value = BLOCKCHAIN_NAME)]
    pub blockchain: String,

    /// Network name callers must present.
    #[arg(long, env = "OASIS_GATEWAY_NETWORK", default_value = DEFAULT_NETWORK_NAME)]
    pub network: String,

    /// Chain context (genesis hash) that makes signatures chain specific.
    #[arg(long, env = "OASIS_GATEWAY_CHAIN_CONTEXT")]
    pub chain_context: Option<String>,

    /// Deadline for each node call, in milliseconds.
    #[arg(
        long,
        env = "OASIS_GATEWAY_NODE_TIMEOUT_MS",
        default_value_t = DEFAULT_NODE_TIMEOUT.as_millis() as u64
    )]
    pub node_timeout_ms: u64,

    /// Log output format.
    #[arg(long, env = "OASIS_GATEWAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl RunArgs {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            blockchain: self.blockchain.clone(),
            network: self.network.clone(),
            chain_context: self.chain_context.clone(),
            node_timeout: Duration::from_millis(self.node_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        GatewayCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = GatewayCli::try_parse_from(["oasis-gateway", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.port, DEFAULT_API_PORT);
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert_eq!(args.gateway_config(), GatewayConfig::default());
    }

    #[test]
    fn run_overrides() {
        let cli = GatewayCli::try_parse_from([
            "oasis-gateway",
            "run",
            "--network",
            "testnet",
            "--chain-context",
            "abcd",
            "--node-timeout-ms",
            "250",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let cfg = args.gateway_config();
        assert_eq!(cfg.network, "testnet");
        assert_eq!(cfg.node_timeout, Duration::from_millis(250));
        assert_eq!(cfg.signature_context(), "oasis-core/consensus: tx for chain abcd");
        assert_eq!(args.log_format, LogFormat::Json);
    }
}

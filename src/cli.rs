// Gateway CLI - arguments and derived configuration

use clap::Parser;

use crate::mempool::MempoolConfig;
use crate::rpc::methods::GatewayOptions;
use crate::rpc::rate_limit::RateLimitConfig;

/// Sharded EVM JSON-RPC gateway
#[derive(Parser, Debug)]
#[command(name = "evm-rpc-gateway")]
#[command(about = "Sharded EVM JSON-RPC gateway over an external execution engine")]
#[command(version)]
pub struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1")]
    pub addr: String,

    /// Listen port
    #[arg(long, default_value_t = 3000)]
    pub port: u16,

    /// Chain id reported by eth_chainId
    #[arg(long, default_value_t = 420)]
    pub chain_id: u64,

    /// Client version string reported by web3_clientVersion
    #[arg(long, default_value = "")]
    pub client_version: String,

    /// Requests allowed per client IP per window
    #[arg(long, default_value_t = 10)]
    pub rate_limit_requests: u32,

    /// Rate-limit window in seconds
    #[arg(long, default_value_t = 300)]
    pub rate_limit_window_secs: u64,

    /// Disable request throttling (development only)
    #[arg(long)]
    pub no_rate_limit: bool,

    /// Pending-transaction pool capacity
    #[arg(long, default_value_t = 4096)]
    pub mempool_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),
}

/// Complete gateway configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address octets
    pub address: [u8; 4],
    /// Listen port
    pub port: u16,
    /// Throttling policy; None disables it
    pub rate_limit: Option<RateLimitConfig>,
    /// Pending pool policy
    pub mempool: MempoolConfig,
    /// Constant-method values
    pub options: GatewayOptions,
}

impl GatewayConfig {
    /// Create configuration from CLI arguments
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let address = args
            .addr
            .parse::<std::net::Ipv4Addr>()
            .map_err(|_| ConfigError::InvalidAddress(args.addr.clone()))?
            .octets();

        let rate_limit = if args.no_rate_limit {
            None
        } else {
            Some(RateLimitConfig {
                max_requests: args.rate_limit_requests,
                window: std::time::Duration::from_secs(args.rate_limit_window_secs),
            })
        };

        Ok(Self {
            address,
            port: args.port,
            rate_limit,
            mempool: MempoolConfig {
                capacity: args.mempool_capacity,
            },
            options: GatewayOptions {
                chain_id: args.chain_id,
                client_version: args.client_version.clone(),
                ..GatewayOptions::default()
            },
        })
    }
}

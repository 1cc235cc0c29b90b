// EVM RPC Gateway - Entry point
//
// The binary wires development backends behind the collaborator traits; a
// deployment replaces them with clients for the real execution engine and
// state store.

#![allow(dead_code)]

mod cli;
mod codec;
mod engine;
mod mempool;
mod rpc;
mod store;
mod tx;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Args, GatewayConfig};
use engine::DevEngine;
use mempool::Mempool;
use rpc::methods::RpcMethods;
use rpc::rate_limit::RateLimiter;
use rpc::server::{RpcServer, ServerState};
use store::MemoryStateStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .init();

    let config = GatewayConfig::from_args(&args)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        chain_id = config.options.chain_id,
        "starting EVM RPC gateway"
    );

    // Development backends; real engine and store clients plug in here.
    let engine = Arc::new(DevEngine::new());
    engine.register_shard("dev", 0).await;
    info!("registered development shard \"dev\"");

    let store = Arc::new(MemoryStateStore::new());
    let mempool = Arc::new(Mempool::new(config.mempool.clone()));

    let methods = Arc::new(RpcMethods::new(
        engine,
        store,
        mempool,
        config.options.clone(),
    ));

    let limiter = config
        .rate_limit
        .clone()
        .map(|policy| Arc::new(RateLimiter::new(policy)));
    if limiter.is_none() {
        warn!("request throttling disabled");
    }

    let state = ServerState { methods, limiter };
    RpcServer::new(config.address, config.port).start(state).await;

    Ok(())
}

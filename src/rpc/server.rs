// Server RPC - HTTP binding over warp
//
// One shard-scoped POST route carries every JSON-RPC call. The reply
// protocol is deliberately lopsided and matches what clients already parse:
// successes are JSON envelopes, every validation/dispatch/handler failure is
// a plain-text 400 with no id echoed, and throttled clients get a plain-text
// 429.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

use crate::rpc::methods::RpcMethods;
use crate::rpc::rate_limit::RateLimiter;

/// State shared with the warp handlers
#[derive(Clone)]
pub struct ServerState {
    pub methods: Arc<RpcMethods>,
    /// Absent in development mode
    pub limiter: Option<Arc<RateLimiter>>,
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    healthy: bool,
    pending_transactions: usize,
}

/// JSON-RPC HTTP server
pub struct RpcServer {
    address: [u8; 4],
    port: u16,
}

impl RpcServer {
    pub fn new(address: [u8; 4], port: u16) -> Self {
        Self { address, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.address, self.port))
    }

    /// Start the server (blocking)
    pub async fn start(self, state: ServerState) {
        let addr = self.socket_addr();
        spawn_limiter_cleanup(&state);
        info!("RPC gateway listening on http://{}", addr);
        warp::serve(routes(state)).run(addr).await;
    }

    /// Start the server in background, returns a shutdown handle
    pub async fn start_background(self, state: ServerState) -> RpcServerHandle {
        let addr = self.socket_addr();
        spawn_limiter_cleanup(&state);

        let (tx, rx) = oneshot::channel::<()>();
        let (bound_addr, server) =
            warp::serve(routes(state)).bind_with_graceful_shutdown(addr, async {
                rx.await.ok();
            });

        info!("RPC gateway listening on http://{} (background)", bound_addr);
        tokio::spawn(server);

        RpcServerHandle {
            addr: bound_addr,
            shutdown_tx: Some(tx),
        }
    }
}

/// Handle for a running server
pub struct RpcServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RpcServerHandle {
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RpcServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Periodically evict idle rate-limit windows
fn spawn_limiter_cleanup(state: &ServerState) {
    if let Some(limiter) = state.limiter.clone() {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(600));
            loop {
                ticker.tick().await;
                limiter.cleanup().await;
            }
        });
    }
}

// =============================================================================
// ROUTES
// =============================================================================

/// The full route table, exposed for warp-level tests
pub fn routes(
    state: ServerState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let rpc = warp::path!("evm_rpc" / String)
        .and(warp::post())
        .and(warp::addr::remote())
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(handle_rpc_request);

    let health = warp::path("health")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_health_check);

    rpc.or(health).with(warp::log("rpc"))
}

/// Filter to inject state into handlers
fn with_state(
    state: ServerState,
) -> impl Filter<Extract = (ServerState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

async fn handle_rpc_request(
    shard: String,
    remote_addr: Option<SocketAddr>,
    body: Bytes,
    state: ServerState,
) -> Result<warp::reply::Response, Infallible> {
    // Throttling happens before the body is even looked at.
    if let Some(limiter) = &state.limiter {
        let client_ip = remote_addr
            .map(|addr| addr.ip())
            .unwrap_or(IpAddr::from([127, 0, 0, 1]));
        if let Err(retry_after) = limiter.check(client_ip).await {
            debug!(%client_ip, retry_after, "request throttled");
            return Ok(plain_reply("Too many requests", StatusCode::TOO_MANY_REQUESTS));
        }
    }

    // A missing body is rejected before envelope validation is attempted.
    if body.is_empty() {
        return Ok(plain_reply("Invalid request", StatusCode::BAD_REQUEST));
    }
    let decoded: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return Ok(plain_reply("Invalid request", StatusCode::BAD_REQUEST)),
    };

    match state.methods.handle_request(&decoded, &shard).await {
        Ok(response) => Ok(warp::reply::json(&response).into_response()),
        Err(err) => Ok(plain_reply(&err.to_string(), StatusCode::BAD_REQUEST)),
    }
}

async fn handle_health_check(state: ServerState) -> Result<warp::reply::Response, Infallible> {
    let health = HealthStatus {
        healthy: true,
        pending_transactions: state.methods.pending_transactions().await,
    };
    Ok(warp::reply::json(&health).into_response())
}

fn plain_reply(body: &str, status: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(body.to_owned(), status).into_response()
}

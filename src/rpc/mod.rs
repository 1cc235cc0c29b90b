// RPC - JSON-RPC gateway surface

pub mod methods;
pub mod rate_limit;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use methods::{GatewayOptions, LogFilter, MethodCall, RpcMethods};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use server::{RpcServer, RpcServerHandle, ServerState};
pub use types::{JsonRpcRequest, JsonRpcResponse, RpcError, validate_envelope};

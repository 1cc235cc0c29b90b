// Types RPC - JSON-RPC 2.0 envelopes and the gateway error set

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// JSON-RPC 2.0 PROTOCOL TYPES
// =============================================================================

/// JSON-RPC 2.0 Request
///
/// Only `jsonrpc`, `method` and `params` are validated. `id` is opaque and
/// echoed back unchanged; a missing `id` echoes as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,

    /// Method name (e.g., "eth_getBalance")
    pub method: String,

    /// Positional parameters; must be present and an array, possibly empty
    pub params: Vec<Value>,

    /// Request ID
    #[serde(default)]
    pub id: Value,
}

/// JSON-RPC 2.0 Response, success shape only.
///
/// Failures never travel as a JSON-RPC error object: dispatch and handler
/// errors leave the transport as plain-text bodies (see `RpcError`). That is
/// the wire contract existing clients depend on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: String,

    /// Result value
    pub result: Value,

    /// Request ID, echoed from the request
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result,
            id,
        }
    }
}

/// Check the envelope shape of a decoded request body.
///
/// Valid means: a JSON object with `jsonrpc == "2.0"`, a string `method` and
/// an array `params`. Everything else is a generic invalid request, reported
/// before any method parsing happens.
pub fn validate_envelope(body: &Value) -> Result<JsonRpcRequest, RpcError> {
    let request: JsonRpcRequest =
        serde_json::from_value(body.clone()).map_err(|_| RpcError::InvalidRequest)?;
    if request.jsonrpc != "2.0" {
        return Err(RpcError::InvalidRequest);
    }
    Ok(request)
}

// =============================================================================
// ERROR SET
// =============================================================================

/// Every user-visible failure of the gateway.
///
/// The display strings are the wire protocol: they travel to clients as
/// plain-text HTTP 400 bodies, so clients string-match on them. Collaborator
/// causes are collapsed before reaching this type and are never chained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// Malformed body or envelope shape
    #[error("Invalid request")]
    InvalidRequest,

    /// Method name not in the registry
    #[error("Method not found")]
    MethodNotFound,

    /// Method-specific parameter validation failure; carries the full message
    #[error("{0}")]
    InvalidParams(String),

    /// Account lookup failed, for whatever reason
    #[error("Impossible to get account")]
    AccountUnavailable,

    /// Sandbox threw or returned nothing usable
    #[error("Impossible to run transaction in sandbox. Make sure tx format is ok")]
    SandboxFailed,

    /// Sandbox ran but reported an execution error; carries its JSON form
    #[error("{0}")]
    SandboxReported(String),

    /// Gas estimation threw or returned nothing usable
    #[error("Impossible to run transaction in sandbox to estimate required amount of gas. Make sure tx format is ok")]
    EstimateFailed,

    /// Sandbox accepted the bytes but they do not decode as a transaction
    #[error("Impossible to parse transaction to get hash. Make sure tx format is ok")]
    TxParseFailed,

    /// Pending pool is at capacity
    #[error("Mempool is full")]
    MempoolFull,

    #[error("No block with such index")]
    BlockIndexNotFound,

    #[error("No block with such hash")]
    BlockHashNotFound,

    #[error("No such transaction. Make sure that hash is ok")]
    TransactionNotFound,

    /// eth_blockNumber on a shard the engine has no metadata for
    #[error("No metadata for shard")]
    ShardNotInitialized,

    /// eth_getLogs bounds that are neither hex quantities nor "latest"
    #[error("Wrong values of <fromBlock> or <toBlock>. Possible values are: <block_index_in_hex> | 'latest'")]
    BadBlockRange,
}

// Methods RPC - the dispatch core
//
// Every registered method is a variant of `MethodCall`; the parse step turns
// a (method, params) pair into one, and `RpcMethods::dispatch` runs it
// against the engine, the state store and the mempool. The set of variants
// is the registry: fixed at compile time, nothing registers at runtime.

use std::sync::Arc;

use alloy_primitives::{keccak256, U256};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::codec;
use crate::engine::ExecutionEngine;
use crate::mempool::{Mempool, MempoolEntry};
use crate::rpc::types::{JsonRpcRequest, JsonRpcResponse, RpcError, validate_envelope};
use crate::store::{self, StateStore};
use crate::tx;

// =============================================================================
// OPTIONS
// =============================================================================

/// Fixed values served by the constant methods
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Served by eth_chainId, as a plain number
    pub chain_id: u64,
    /// Served by eth_protocolVersion
    pub protocol_version_hex: String,
    /// Served by eth_gasPrice, in wei
    pub gas_price_wei_hex: String,
    /// Served by web3_clientVersion
    pub client_version: String,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            chain_id: 420,
            protocol_version_hex: "0x3f".to_string(),
            gas_price_wei_hex: "0x77359400".to_string(),
            client_version: String::new(),
        }
    }
}

// =============================================================================
// METHOD CALLS
// =============================================================================

/// eth_getLogs filter options
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// Hex quantity or "latest"; anything else fails range validation
    #[serde(default)]
    pub from_block: Value,
    #[serde(default)]
    pub to_block: Value,
    /// Contract address whose logs are selected
    pub address: String,
    /// Topic sequence a log must equal exactly, element for element
    pub topics: Vec<Value>,
}

/// A parsed call to one of the registered methods
#[derive(Debug, Clone)]
pub enum MethodCall {
    ChainId,
    ProtocolVersion,
    Syncing,
    GasPrice,
    BlockNumber,
    GetBalance { address: String },
    GetTransactionCount { address: String },
    GetCode { address: String },
    SendRawTransaction { raw_tx: String },
    Call { data: Value },
    EstimateGas { data: Value },
    GetBlockByNumber { number_hex: String },
    GetBlockByHash { block_hash: String },
    GetTransactionByHash { tx_hash: String },
    GetTransactionReceipt { tx_hash: String },
    GetLogs { filter: LogFilter },
    ClientVersion,
    Sha3 { params: Vec<Value> },
}

impl MethodCall {
    /// Resolve a method name and its params into a typed call.
    ///
    /// Unknown names fail with MethodNotFound; params that do not fit the
    /// method's shape fail with a validation error. web3_sha3 keeps its own
    /// parameter checks so its historical messages survive.
    pub fn parse(method: &str, params: Vec<Value>) -> Result<Self, RpcError> {
        match method {
            "eth_chainId" => Ok(Self::ChainId),
            "eth_protocolVersion" => Ok(Self::ProtocolVersion),
            "eth_syncing" => Ok(Self::Syncing),
            "eth_gasPrice" => Ok(Self::GasPrice),
            "eth_blockNumber" => Ok(Self::BlockNumber),
            "eth_getBalance" => Ok(Self::GetBalance {
                address: required_str(&params, 0, "[address, blockTag]")?,
            }),
            "eth_getTransactionCount" => Ok(Self::GetTransactionCount {
                address: required_str(&params, 0, "[address, blockTag]")?,
            }),
            "eth_getCode" => Ok(Self::GetCode {
                address: required_str(&params, 0, "[address, blockTag]")?,
            }),
            "eth_sendRawTransaction" => Ok(Self::SendRawTransaction {
                raw_tx: required_str(&params, 0, "[rawTransactionHex]")?,
            }),
            "eth_call" => Ok(Self::Call {
                data: required_value(&params, 0, "[transactionData]")?,
            }),
            "eth_estimateGas" => Ok(Self::EstimateGas {
                data: required_value(&params, 0, "[transactionData]")?,
            }),
            "eth_getBlockByNumber" => Ok(Self::GetBlockByNumber {
                number_hex: required_str(&params, 0, "[blockNumberHex, fullTransactions]")?,
            }),
            "eth_getBlockByHash" => Ok(Self::GetBlockByHash {
                block_hash: required_str(&params, 0, "[blockHash, fullTransactions]")?,
            }),
            "eth_getTransactionByHash" => Ok(Self::GetTransactionByHash {
                tx_hash: required_str(&params, 0, "[transactionHash]")?,
            }),
            "eth_getTransactionReceipt" => Ok(Self::GetTransactionReceipt {
                tx_hash: required_str(&params, 0, "[transactionHash]")?,
            }),
            "eth_getLogs" => {
                let options = required_value(&params, 0, "[filterOptions]")?;
                let filter: LogFilter = serde_json::from_value(options)
                    .map_err(|err| RpcError::InvalidParams(format!("Invalid params: {err}")))?;
                Ok(Self::GetLogs { filter })
            }
            "web3_clientVersion" => Ok(Self::ClientVersion),
            "web3_sha3" => Ok(Self::Sha3 { params }),
            _ => Err(RpcError::MethodNotFound),
        }
    }
}

fn required_str(params: &[Value], index: usize, expected: &str) -> Result<String, RpcError> {
    params
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RpcError::InvalidParams(format!("Invalid params: expected {expected}")))
}

fn required_value(params: &[Value], index: usize, expected: &str) -> Result<Value, RpcError> {
    params
        .get(index)
        .cloned()
        .ok_or_else(|| RpcError::InvalidParams(format!("Invalid params: expected {expected}")))
}

/// JSON falsy sentinel, the collaborator contract's "nothing there" shapes
fn falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// A resolved eth_getLogs range bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockBound {
    Quantity(U256),
    Latest,
}

fn parse_block_bound(value: &Value) -> Result<BlockBound, RpcError> {
    match value.as_str() {
        Some("latest") => Ok(BlockBound::Latest),
        Some(text) if codec::is_hex_quantity(text) => codec::parse_hex_u256(text)
            .map(BlockBound::Quantity)
            .map_err(|_| RpcError::BadBlockRange),
        _ => Err(RpcError::BadBlockRange),
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// RPC method handler set, shared across all in-flight requests
pub struct RpcMethods {
    engine: Arc<dyn ExecutionEngine>,
    store: Arc<dyn StateStore>,
    mempool: Arc<Mempool>,
    options: GatewayOptions,
}

impl RpcMethods {
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        store: Arc<dyn StateStore>,
        mempool: Arc<Mempool>,
        options: GatewayOptions,
    ) -> Self {
        Self {
            engine,
            store,
            mempool,
            options,
        }
    }

    /// Depth of the pending pool, for the health endpoint
    pub async fn pending_transactions(&self) -> usize {
        self.mempool.len().await
    }

    /// Validate, parse and dispatch one decoded request body
    pub async fn handle_request(
        &self,
        body: &Value,
        shard: &str,
    ) -> Result<JsonRpcResponse, RpcError> {
        let request: JsonRpcRequest = validate_envelope(body)?;
        debug!(method = %request.method, shard, "rpc request");
        let call = MethodCall::parse(&request.method, request.params)?;
        let result = self.dispatch(call, shard).await?;
        Ok(JsonRpcResponse::success(request.id, result))
    }

    /// Run a typed call. Most methods ignore the shard; block and log
    /// lookups and eth_blockNumber are scoped by it.
    pub async fn dispatch(&self, call: MethodCall, shard: &str) -> Result<Value, RpcError> {
        match call {
            MethodCall::ChainId => Ok(json!(self.options.chain_id)),
            MethodCall::ProtocolVersion => Ok(json!(self.options.protocol_version_hex)),
            MethodCall::Syncing => Ok(json!(false)),
            MethodCall::GasPrice => Ok(json!(self.options.gas_price_wei_hex)),
            MethodCall::BlockNumber => self.block_number(shard).await,
            MethodCall::GetBalance { address } => self.get_balance(&address).await,
            MethodCall::GetTransactionCount { address } => {
                self.get_transaction_count(&address).await
            }
            MethodCall::GetCode { address } => self.get_code(&address).await,
            MethodCall::SendRawTransaction { raw_tx } => self.send_raw_transaction(raw_tx).await,
            MethodCall::Call { data } => self.call(&data).await,
            MethodCall::EstimateGas { data } => self.estimate_gas(&data).await,
            MethodCall::GetBlockByNumber { number_hex } => {
                self.get_block_by_number(shard, &number_hex).await
            }
            MethodCall::GetBlockByHash { block_hash } => {
                self.get_block_by_hash(shard, &block_hash).await
            }
            MethodCall::GetTransactionByHash { tx_hash } => {
                self.get_transaction_by_hash(&tx_hash).await
            }
            MethodCall::GetTransactionReceipt { tx_hash } => {
                self.get_transaction_receipt(&tx_hash).await
            }
            MethodCall::GetLogs { filter } => self.get_logs(shard, filter).await,
            MethodCall::ClientVersion => Ok(json!(self.options.client_version)),
            MethodCall::Sha3 { params } => self.web3_sha3(&params),
        }
    }

    /// Store read with the collaborator-failure collapse: a thrown read or a
    /// falsy stored sentinel both count as absent. The cause only hits logs.
    async fn store_get(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(value) => value.filter(|stored| !falsy(stored)),
            Err(err) => {
                debug!(key, error = %err, "state store read failed");
                None
            }
        }
    }

    // =========================================================================
    // ACCOUNT METHODS
    // =========================================================================

    async fn get_balance(&self, address: &str) -> Result<Value, RpcError> {
        let account = self
            .engine
            .account(address)
            .await
            .map_err(|_| RpcError::AccountUnavailable)?;
        Ok(json!(codec::u256_to_hex(account.balance)))
    }

    async fn get_transaction_count(&self, address: &str) -> Result<Value, RpcError> {
        let account = self
            .engine
            .account(address)
            .await
            .map_err(|_| RpcError::AccountUnavailable)?;
        Ok(json!(codec::u64_to_hex(account.nonce)))
    }

    /// Returns the account's code hash, not the code body
    async fn get_code(&self, address: &str) -> Result<Value, RpcError> {
        let account = self
            .engine
            .account(address)
            .await
            .map_err(|_| RpcError::AccountUnavailable)?;
        Ok(json!(codec::bytes_to_hex(account.code_hash.as_slice())))
    }

    // =========================================================================
    // EXECUTION METHODS
    // =========================================================================

    /// Sandbox-validate, enqueue, then hash.
    ///
    /// The enqueue comes before hash computation: bytes the sandbox accepted
    /// stay in the pool even when they fail structural decoding afterwards,
    /// and the caller gets the parse error instead of a hash.
    async fn send_raw_transaction(&self, raw_tx: String) -> Result<Value, RpcError> {
        let outcome = self
            .engine
            .sandbox_call(&Value::String(raw_tx.clone()), false)
            .await
            .map_err(|_| RpcError::SandboxFailed)?;
        if falsy(&outcome) {
            return Err(RpcError::SandboxFailed);
        }
        if outcome.get("error").map(|err| !falsy(err)).unwrap_or(false) {
            return Err(RpcError::SandboxReported(outcome.to_string()));
        }

        self.mempool
            .enqueue(MempoolEntry::EvmCall {
                payload: raw_tx.clone(),
            })
            .await
            .map_err(|_| RpcError::MempoolFull)?;

        let decoded = tx::decode_raw_transaction(&raw_tx).map_err(|err| {
            debug!(error = %err, "enqueued transaction failed structural decoding");
            RpcError::TxParseFailed
        })?;
        debug!(tx_type = ?decoded.envelope.tx_type(), "transaction enqueued");
        Ok(json!(codec::bytes_to_hex(decoded.hash.as_slice())))
    }

    async fn call(&self, data: &Value) -> Result<Value, RpcError> {
        let outcome = self
            .engine
            .sandbox_call(data, true)
            .await
            .map_err(|_| RpcError::SandboxFailed)?;
        match outcome {
            Value::String(result_hex) => Ok(Value::String(result_hex)),
            other => {
                if !falsy(&other) && other.get("error").map(|err| !falsy(err)).unwrap_or(false) {
                    Err(RpcError::SandboxReported(other.to_string()))
                } else {
                    Err(RpcError::SandboxFailed)
                }
            }
        }
    }

    async fn estimate_gas(&self, data: &Value) -> Result<Value, RpcError> {
        let outcome = self
            .engine
            .estimate_gas(data)
            .await
            .map_err(|_| RpcError::EstimateFailed)?;
        match outcome {
            Value::String(gas_hex) => Ok(Value::String(gas_hex)),
            other => {
                if !falsy(&other) && other.get("error").map(|err| !falsy(err)).unwrap_or(false) {
                    Err(RpcError::SandboxReported(other.to_string()))
                } else {
                    Err(RpcError::EstimateFailed)
                }
            }
        }
    }

    // =========================================================================
    // LOOKUP METHODS
    // =========================================================================

    async fn block_number(&self, shard: &str) -> Result<Value, RpcError> {
        let metadata = self
            .engine
            .shard_metadata(shard)
            .await
            .ok_or(RpcError::ShardNotInitialized)?;
        Ok(json!(metadata.next_block_index))
    }

    /// The hex param is used verbatim as the key segment
    async fn get_block_by_number(&self, shard: &str, number_hex: &str) -> Result<Value, RpcError> {
        self.store_get(&store::block_key(shard, number_hex))
            .await
            .ok_or(RpcError::BlockIndexNotFound)
    }

    /// hash -> index, then index -> block
    async fn get_block_by_hash(&self, shard: &str, block_hash: &str) -> Result<Value, RpcError> {
        let index = self
            .store_get(&store::block_index_key(shard, block_hash))
            .await
            .ok_or(RpcError::BlockHashNotFound)?;
        let index_segment = match &index {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        self.store_get(&store::block_key(shard, &index_segment))
            .await
            .ok_or(RpcError::BlockHashNotFound)
    }

    async fn get_transaction_by_hash(&self, tx_hash: &str) -> Result<Value, RpcError> {
        let key = store::transaction_key(tx_hash.strip_prefix("0x").unwrap_or(tx_hash));
        self.store_get(&key)
            .await
            .and_then(|record| record.get("tx").cloned())
            .filter(|tx| !falsy(tx))
            .ok_or(RpcError::TransactionNotFound)
    }

    /// A miss answers with a bare `false` result, not an error. The key also
    /// keeps the hash prefix, unlike the ByHash lookup. Both quirks are wire
    /// contract.
    async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Value, RpcError> {
        let receipt = self
            .store_get(&store::transaction_key(tx_hash))
            .await
            .and_then(|record| record.get("receipt").cloned())
            .filter(|receipt| !falsy(receipt));
        Ok(receipt.unwrap_or(Value::Bool(false)))
    }

    // =========================================================================
    // LOG SCANNER
    // =========================================================================

    /// Walk the block range one store read at a time, selecting the logs of
    /// one contract whose topic sequence equals the query's exactly.
    async fn get_logs(&self, shard: &str, filter: LogFilter) -> Result<Value, RpcError> {
        let from = parse_block_bound(&filter.from_block)?;
        let to = parse_block_bound(&filter.to_block)?;

        // Resolve "latest" once; both bounds see the same snapshot.
        let latest = if from == BlockBound::Latest || to == BlockBound::Latest {
            U256::from(self.engine.current_block().await.number)
        } else {
            U256::ZERO
        };
        let from = match from {
            BlockBound::Quantity(number) => number,
            BlockBound::Latest => latest,
        };
        let to = match to {
            BlockBound::Quantity(number) => number,
            BlockBound::Latest => latest,
        };

        let wanted_topics = Value::Array(filter.topics.clone());
        let mut matched = Vec::new();
        let mut cursor = from;
        while cursor <= to {
            let key = store::logs_key(shard, &codec::u256_to_hex(cursor));
            if let Some(block_logs) = self.store_get(&key).await {
                if let Some(entries) = block_logs.get(&filter.address).and_then(Value::as_array) {
                    for log in entries {
                        if log.get("topics") == Some(&wanted_topics) {
                            matched.push(log.clone());
                        }
                    }
                }
            }
            match cursor.checked_add(U256::from(1u64)) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(Value::Array(matched))
    }

    // =========================================================================
    // WEB3 METHODS
    // =========================================================================

    /// Keccak digest of the parameter string's bytes
    fn web3_sha3(&self, params: &[Value]) -> Result<Value, RpcError> {
        if params.len() != 1 {
            return Err(RpcError::InvalidParams(
                "Invalid number of parameters".to_string(),
            ));
        }
        match params[0].as_str() {
            Some(text) => Ok(json!(codec::bytes_to_hex(
                keccak256(text.as_bytes()).as_slice()
            ))),
            None => Err(RpcError::InvalidParams(
                "Parameter is not a string".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_unknown_method() {
        assert!(matches!(
            MethodCall::parse("no_such_method", vec![]),
            Err(RpcError::MethodNotFound)
        ));
        // Names are case-sensitive.
        assert!(matches!(
            MethodCall::parse("ETH_chainId", vec![]),
            Err(RpcError::MethodNotFound)
        ));
    }

    #[test]
    fn test_parse_constant_methods_take_no_params() {
        assert!(matches!(
            MethodCall::parse("eth_chainId", vec![]),
            Ok(MethodCall::ChainId)
        ));
        assert!(matches!(
            MethodCall::parse("eth_syncing", vec![]),
            Ok(MethodCall::Syncing)
        ));
    }

    #[test]
    fn test_parse_requires_string_address() {
        let err = MethodCall::parse("eth_getBalance", vec![json!(5)]).unwrap_err();
        assert!(matches!(err, RpcError::InvalidParams(_)));

        let err = MethodCall::parse("eth_getBalance", vec![]).unwrap_err();
        assert!(matches!(err, RpcError::InvalidParams(_)));

        assert!(MethodCall::parse("eth_getBalance", vec![json!("0xaa"), json!("latest")]).is_ok());
    }

    #[test]
    fn test_parse_log_filter_defaults_bounds_requires_address_and_topics() {
        let full = json!({
            "fromBlock": "0x1", "toBlock": "latest",
            "address": "0xaa", "topics": ["0x01"]
        });
        let call = MethodCall::parse("eth_getLogs", vec![full]).unwrap();
        match call {
            MethodCall::GetLogs { filter } => {
                assert_eq!(filter.address, "0xaa");
                assert_eq!(filter.topics, vec![json!("0x01")]);
            }
            other => panic!("unexpected call: {other:?}"),
        }

        // Bounds may be absent at parse time; range validation rejects them later.
        let no_bounds = json!({"address": "0xaa", "topics": []});
        assert!(MethodCall::parse("eth_getLogs", vec![no_bounds]).is_ok());

        // Address and topics are structural.
        let no_topics = json!({"fromBlock": "0x1", "toBlock": "0x2", "address": "0xaa"});
        assert!(matches!(
            MethodCall::parse("eth_getLogs", vec![no_topics]),
            Err(RpcError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_parse_block_bound() {
        assert_eq!(
            parse_block_bound(&json!("latest")).unwrap(),
            BlockBound::Latest
        );
        assert_eq!(
            parse_block_bound(&json!("0x7b")).unwrap(),
            BlockBound::Quantity(U256::from(0x7bu64))
        );
        assert_eq!(
            parse_block_bound(&json!("pending")),
            Err(RpcError::BadBlockRange)
        );
        // Bare digits and non-strings are rejected, not coerced.
        assert_eq!(parse_block_bound(&json!("7b")), Err(RpcError::BadBlockRange));
        assert_eq!(parse_block_bound(&json!(123)), Err(RpcError::BadBlockRange));
        assert_eq!(
            parse_block_bound(&Value::Null),
            Err(RpcError::BadBlockRange)
        );
    }

    #[test]
    fn test_falsy_matches_collaborator_sentinels() {
        assert!(falsy(&Value::Null));
        assert!(falsy(&json!(false)));
        assert!(falsy(&json!(0)));
        assert!(falsy(&json!("")));
        assert!(!falsy(&json!("0x")));
        assert!(!falsy(&json!({"error": "x"})));
        assert!(!falsy(&json!([])));
    }
}

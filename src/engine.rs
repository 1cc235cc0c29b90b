// Execution engine - contract with the external EVM
//
// The gateway never executes anything itself; it forwards account lookups,
// sandboxed calls and gas estimation to an engine behind this trait. A
// development backend lives at the bottom of the file so the binary and the
// tests can run without a real engine deployment.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

/// Account state as reported by the execution engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountView {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: B256,
}

/// Header of the engine's current block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeaderView {
    pub number: u64,
}

/// Per-shard chain metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardMetadata {
    /// Index the next produced block will carry
    pub next_block_index: u64,
}

/// Engine-side failures. Handlers collapse these into fixed RPC errors, so
/// the payload only ever reaches logs.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("account lookup failed: {0}")]
    Account(String),
    #[error("sandbox execution failed: {0}")]
    Sandbox(String),
}

/// Interface the gateway requires from an execution engine.
///
/// `sandbox_call` and `estimate_gas` return the engine's verdict verbatim:
/// a hex string on success, an object carrying an `error` field when the
/// engine rejected the payload, or a falsy sentinel when it could not run it
/// at all. `Err` stands for a failure of the engine itself. Handlers sort
/// these cases out; the trait does not.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn account(&self, address: &str) -> Result<AccountView, EngineError>;

    async fn sandbox_call(&self, data: &Value, read_only: bool) -> Result<Value, EngineError>;

    async fn estimate_gas(&self, data: &Value) -> Result<Value, EngineError>;

    async fn current_block(&self) -> BlockHeaderView;

    /// Metadata for a shard, if the shard has been initialized
    async fn shard_metadata(&self, shard: &str) -> Option<ShardMetadata>;
}

// =============================================================================
// DEVELOPMENT BACKEND
// =============================================================================

/// In-memory engine for local development.
///
/// Accepts every sandbox payload with an empty return value and quotes a
/// flat transfer cost for gas estimation. Accounts and shards are seeded
/// through the mutators.
pub struct DevEngine {
    accounts: RwLock<HashMap<String, AccountView>>,
    shards: RwLock<HashMap<String, ShardMetadata>>,
    head: AtomicU64,
}

impl DevEngine {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            shards: RwLock::new(HashMap::new()),
            head: AtomicU64::new(0),
        }
    }

    pub async fn insert_account(&self, address: &str, view: AccountView) {
        self.accounts.write().await.insert(address.to_owned(), view);
    }

    pub async fn register_shard(&self, shard: &str, next_block_index: u64) {
        self.shards
            .write()
            .await
            .insert(shard.to_owned(), ShardMetadata { next_block_index });
    }

    pub fn set_head(&self, number: u64) {
        self.head.store(number, Ordering::Relaxed);
    }
}

impl Default for DevEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionEngine for DevEngine {
    async fn account(&self, address: &str) -> Result<AccountView, EngineError> {
        self.accounts
            .read()
            .await
            .get(address)
            .cloned()
            .ok_or_else(|| EngineError::Account(format!("unknown address {address}")))
    }

    async fn sandbox_call(&self, _data: &Value, _read_only: bool) -> Result<Value, EngineError> {
        Ok(json!("0x"))
    }

    async fn estimate_gas(&self, _data: &Value) -> Result<Value, EngineError> {
        // Flat transfer cost
        Ok(json!("0x5208"))
    }

    async fn current_block(&self) -> BlockHeaderView {
        BlockHeaderView {
            number: self.head.load(Ordering::Relaxed),
        }
    }

    async fn shard_metadata(&self, shard: &str) -> Option<ShardMetadata> {
        self.shards.read().await.get(shard).copied()
    }
}

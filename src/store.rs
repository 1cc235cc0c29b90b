// State store - keyed access to platform state
//
// Blocks, block indexes, logs and transaction records live in an external
// key/value store. The gateway only reads it. Block, index and log keys are
// namespaced by shard; transaction records are global. That asymmetry is part
// of the platform's key scheme, not an accident of this module.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Store-side read failures. Handlers treat a failed read like an absent key.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state store read failed: {0}")]
    Read(String),
}

/// Interface the gateway requires from the state store
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
}

// =============================================================================
// KEY SCHEME
// =============================================================================

/// Block body by hex index, shard-scoped
pub fn block_key(shard: &str, number_hex: &str) -> String {
    format!("{shard}:EVM_BLOCK:{number_hex}")
}

/// Block index by block hash, shard-scoped
pub fn block_index_key(shard: &str, block_hash: &str) -> String {
    format!("{shard}:EVM_INDEX:{block_hash}")
}

/// Per-block log mapping by hex index, shard-scoped
pub fn logs_key(shard: &str, number_hex: &str) -> String {
    format!("{shard}:EVM_LOGS:{number_hex}")
}

/// Transaction record by hash, global across shards
pub fn transaction_key(tx_hash: &str) -> String {
    format!("TX:{tx_hash}")
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// HashMap-backed store for development and tests
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.write().await.insert(key.into(), value);
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}

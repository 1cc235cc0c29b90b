// Mempool - pending-transaction hand-off
//
// The gateway's pool is a pure hand-off point: sandbox-validated raw
// transactions are appended here in arrival order for a downstream consumer
// to drain. No fee ordering, no nonce tracking, no deduplication — two
// identical submissions both land in the pool. The only policy is a hard
// capacity, enforced at enqueue time.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Mempool configuration
#[derive(Debug, Clone)]
pub struct MempoolConfig {
    /// Maximum number of pending entries
    pub capacity: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self { capacity: 4096 }
    }
}

/// Rejection reasons for an enqueue attempt
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("Mempool is full")]
    Full,
}

/// A pool entry. Serializes to `{"type":"EVM_CALL","payload":"0x..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MempoolEntry {
    #[serde(rename = "EVM_CALL")]
    EvmCall { payload: String },
}

/// Shared pending pool, appended to by in-flight requests
pub struct Mempool {
    config: MempoolConfig,
    entries: Mutex<VecDeque<MempoolEntry>>,
}

impl Mempool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Append an entry, preserving arrival order
    pub async fn enqueue(&self, entry: MempoolEntry) -> Result<(), MempoolError> {
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.config.capacity {
            return Err(MempoolError::Full);
        }
        entries.push_back(entry);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Remove and return every pending entry, oldest first
    pub async fn drain(&self) -> Vec<MempoolEntry> {
        self.entries.lock().await.drain(..).collect()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(MempoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(payload: &str) -> MempoolEntry {
        MempoolEntry::EvmCall {
            payload: payload.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_preserves_arrival_order() {
        let pool = Mempool::default();
        pool.enqueue(call("0x01")).await.unwrap();
        pool.enqueue(call("0x02")).await.unwrap();
        pool.enqueue(call("0x03")).await.unwrap();

        assert_eq!(
            pool.drain().await,
            vec![call("0x01"), call("0x02"), call("0x03")]
        );
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_identical_entries_both_enqueue() {
        let pool = Mempool::default();
        pool.enqueue(call("0xaa")).await.unwrap();
        pool.enqueue(call("0xaa")).await.unwrap();
        assert_eq!(pool.len().await, 2);
    }

    #[tokio::test]
    async fn test_capacity_rejects_overflow() {
        let pool = Mempool::new(MempoolConfig { capacity: 2 });
        pool.enqueue(call("0x01")).await.unwrap();
        pool.enqueue(call("0x02")).await.unwrap();
        assert_eq!(pool.enqueue(call("0x03")).await, Err(MempoolError::Full));
        // The rejected entry left no trace.
        assert_eq!(pool.len().await, 2);
    }

    #[test]
    fn test_entry_wire_shape() {
        let entry = call("0xdead");
        let encoded = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!({"type": "EVM_CALL", "payload": "0xdead"})
        );
        let decoded: MempoolEntry = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, entry);
    }
}

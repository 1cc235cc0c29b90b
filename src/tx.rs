// Raw transactions - decoding and canonical hashing
//
// `eth_sendRawTransaction` hands us an EIP-2718 payload as 0x-hex. The
// sandbox has already judged whether it executes; this module only answers
// whether the bytes parse as a transaction and what their canonical hash is.
// The hash is the keccak digest of the exact submitted encoding, which holds
// for legacy and typed envelopes alike.

use alloy_consensus::TxEnvelope;
use alloy_eips::eip2718::{Decodable2718, Eip2718Error};
use alloy_primitives::{keccak256, B256};

/// Failures to interpret a raw transaction payload
#[derive(Debug, thiserror::Error)]
pub enum TxDecodeError {
    #[error("payload is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("malformed transaction bytes: {0}")]
    Envelope(#[from] Eip2718Error),
}

/// A structurally valid raw transaction
#[derive(Debug)]
pub struct DecodedTransaction {
    pub envelope: TxEnvelope,
    pub hash: B256,
}

/// Decode a 0x-hex raw transaction into its envelope and canonical hash
pub fn decode_raw_transaction(raw_hex: &str) -> Result<DecodedTransaction, TxDecodeError> {
    let digits = raw_hex.strip_prefix("0x").unwrap_or(raw_hex);
    let bytes = hex::decode(digits)?;
    let envelope = TxEnvelope::decode_2718(&mut bytes.as_slice())?;
    Ok(DecodedTransaction {
        envelope,
        hash: keccak256(&bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_consensus::{SignableTransaction, TxLegacy};
    use alloy_eips::eip2718::Encodable2718;
    use alloy_primitives::{Address, Bytes, Signature, TxKind, U256};

    /// A structurally valid signed legacy transfer as 0x-hex
    pub fn sample_raw_transaction() -> String {
        let tx = TxLegacy {
            chain_id: Some(420),
            nonce: 7,
            gas_price: 2_000_000_000,
            gas_limit: 21_000,
            to: TxKind::Call(Address::repeat_byte(0x11)),
            value: U256::from(1_000u64),
            input: Bytes::new(),
        };
        let signature = Signature::new(U256::from(1u64), U256::from(1u64), false);
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
        format!("0x{}", hex::encode(envelope.encoded_2718()))
    }

    #[test]
    fn test_decode_valid_legacy_transaction() {
        let raw = sample_raw_transaction();
        let decoded = decode_raw_transaction(&raw).unwrap();

        let bytes = hex::decode(raw.strip_prefix("0x").unwrap()).unwrap();
        assert_eq!(decoded.hash, keccak256(&bytes));
        assert!(matches!(decoded.envelope, TxEnvelope::Legacy(_)));
    }

    #[test]
    fn test_decode_rejects_non_hex_payload() {
        assert!(matches!(
            decode_raw_transaction("0xnothex"),
            Err(TxDecodeError::Hex(_))
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_bytes() {
        // Valid hex, but not a transaction encoding.
        assert!(matches!(
            decode_raw_transaction("0xdeadbeef"),
            Err(TxDecodeError::Envelope(_))
        ));
    }

    #[test]
    fn test_decode_accepts_unprefixed_hex() {
        let raw = sample_raw_transaction();
        let unprefixed = raw.strip_prefix("0x").unwrap();
        assert!(decode_raw_transaction(unprefixed).is_ok());
    }
}

// Codec - 0x-prefixed hex quantities
//
// Every numeric-returning RPC method funnels through here. Quantities are
// unsigned, minimal lowercase hex with a 0x prefix; byte payloads keep their
// full width. Balances can use the whole 256-bit range, so quantity parsing
// and formatting go through U256 rather than machine integers.

use alloy_primitives::U256;

/// Codec failures for quantity parsing
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("quantity is not 0x-prefixed hex: {0}")]
    NotHex(String),
}

/// Encode a 256-bit quantity as minimal lowercase hex. Zero encodes as "0x0".
pub fn u256_to_hex(value: U256) -> String {
    format!("0x{value:x}")
}

/// Encode a machine integer as minimal lowercase hex
pub fn u64_to_hex(value: u64) -> String {
    format!("0x{value:x}")
}

/// Encode a byte slice as 0x-prefixed hex, keeping leading zero bytes
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// True when `value` is a 0x-prefixed hex quantity with at least one digit
pub fn is_hex_quantity(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Parse a 0x-prefixed hex quantity into a 256-bit integer
pub fn parse_hex_u256(value: &str) -> Result<U256, CodecError> {
    let digits = value
        .strip_prefix("0x")
        .filter(|digits| !digits.is_empty())
        .ok_or_else(|| CodecError::NotHex(value.to_owned()))?;
    U256::from_str_radix(digits, 16).map_err(|_| CodecError::NotHex(value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_u256_to_hex_minimal_digits() {
        assert_eq!(u256_to_hex(U256::ZERO), "0x0");
        assert_eq!(u256_to_hex(U256::from(1u64)), "0x1");
        assert_eq!(u256_to_hex(U256::from(0x7bu64)), "0x7b");
        assert_eq!(
            u256_to_hex(U256::from(1_000_000_000_000_000_000u64)),
            "0xde0b6b3a7640000"
        );
    }

    #[test]
    fn test_u256_to_hex_max_value() {
        let max = u256_to_hex(U256::MAX);
        assert_eq!(max.len(), 2 + 64);
        assert_eq!(parse_hex_u256(&max).unwrap(), U256::MAX);
    }

    #[test]
    fn test_u64_to_hex() {
        assert_eq!(u64_to_hex(0), "0x0");
        assert_eq!(u64_to_hex(21_000), "0x5208");
    }

    #[test]
    fn test_bytes_to_hex_keeps_leading_zeroes() {
        assert_eq!(bytes_to_hex(&[0, 1, 0xab]), "0x0001ab");
        assert_eq!(bytes_to_hex(&[]), "0x");
    }

    #[test]
    fn test_is_hex_quantity() {
        assert!(is_hex_quantity("0x0"));
        assert!(is_hex_quantity("0xDEADbeef"));
        assert!(!is_hex_quantity("latest"));
        assert!(!is_hex_quantity("0x"));
        assert!(!is_hex_quantity("7b"));
        assert!(!is_hex_quantity("0xzz"));
        assert!(!is_hex_quantity(""));
    }

    #[test]
    fn test_parse_hex_u256_rejects_bad_input() {
        assert!(parse_hex_u256("latest").is_err());
        assert!(parse_hex_u256("0x").is_err());
        assert!(parse_hex_u256("123").is_err());
        // 65 hex digits: one bit past the 256-bit range
        let too_wide = format!("0x1{}", "0".repeat(64));
        assert!(parse_hex_u256(&too_wide).is_err());
    }

    proptest! {
        // Balances must survive the full 256-bit range without precision loss.
        #[test]
        fn prop_quantity_survives_encoding(bytes in any::<[u8; 32]>()) {
            let value = U256::from_be_bytes(bytes);
            let encoded = u256_to_hex(value);
            prop_assert!(is_hex_quantity(&encoded));
            prop_assert_eq!(parse_hex_u256(&encoded).unwrap(), value);
        }
    }
}

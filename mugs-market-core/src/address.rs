//! Base58 text form of ledger addresses.

use base58::{FromBase58, ToBase58};
use solana_pubkey::Pubkey;

use crate::error::{MarketError, MarketResult};

/// Render an address as base58.
pub fn to_base58(key: &Pubkey) -> String {
    key.as_ref().to_base58()
}

/// Parse a base58 address, rejecting anything that is not 32 bytes.
pub fn parse_address(input: &str) -> MarketResult<Pubkey> {
    let bytes = input.trim().from_base58().map_err(|e| {
        MarketError::invalid_argument("address", format!("'{}' is not base58: {:?}", input, e))
    })?;
    let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        MarketError::invalid_argument(
            "address",
            format!("'{}' decodes to {} bytes, expected 32", input, bytes.len()),
        )
    })?;
    Ok(Pubkey::new_from_array(array))
}

/// Serde adapter storing a `Pubkey` as a base58 string.
pub mod serde_base58 {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_base58(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_address(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter storing raw bytes as a base58 string, the way the
/// ledger renders instruction data.
pub mod serde_base58_bytes {
    use base58::{FromBase58, ToBase58};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&bytes.to_base58())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.from_base58()
            .map_err(|e| serde::de::Error::custom(format!("invalid base58 data: {:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_system_program() {
        let key = parse_address("11111111111111111111111111111111").unwrap();
        assert_eq!(key, Pubkey::default());
        assert_eq!(to_base58(&key), "11111111111111111111111111111111");
    }

    #[test]
    fn rejects_short_input() {
        assert!(parse_address("abc").is_err());
        assert!(parse_address("0OIl").is_err());
    }
}

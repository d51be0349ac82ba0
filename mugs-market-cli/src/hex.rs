//! Hex encoding/decoding utilities.

use base58::FromBase58;
use solana_pubkey::Pubkey;

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn hex_decode(hex: &str) -> Result<Vec<u8>, String> {
    let hex = hex.trim();
    let hex = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex);
    if hex.len() % 2 != 0 {
        return Err(format!("Hex string has odd length: {}", hex.len()));
    }
    if let Some(pos) = hex.find(|c: char| !c.is_ascii_hexdigit()) {
        return Err(format!("Invalid hex character at position {}", pos));
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|e| format!("Invalid hex at position {}: {}", i, e))?;
        bytes.push(byte);
    }
    Ok(bytes)
}

/// Decode an address from base58 or a 64-char hex string.
pub fn decode_pubkey(input: &str) -> Result<Pubkey, String> {
    let input = input.trim();
    let is_hex = input.len() == 64 && input.chars().all(|c| c.is_ascii_hexdigit());
    if !is_hex {
        if let Ok(bytes) = input.from_base58() {
            return <[u8; 32]>::try_from(bytes.as_slice())
                .map(Pubkey::new_from_array)
                .map_err(|_| format!("Base58 decoded to {} bytes, expected 32", bytes.len()));
        }
    }

    let bytes = hex_decode(input)?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map(Pubkey::new_from_array)
        .map_err(|_| format!("Expected 32 bytes, got {} (provide base58 or 64 hex chars)", bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let bytes = vec![0x00, 0x0f, 0xa0, 0xff];
        assert_eq!(hex_encode(&bytes), "000fa0ff");
        assert_eq!(hex_decode("000fa0ff").unwrap(), bytes);
        assert_eq!(hex_decode("0x000FA0FF").unwrap(), bytes);
    }

    #[test]
    fn test_hex_rejects_bad_input() {
        assert!(hex_decode("abc").is_err());
        assert!(hex_decode("zz").is_err());
    }

    #[test]
    fn test_decode_pubkey_both_encodings() {
        let key = Pubkey::new_from_array([7u8; 32]);
        assert_eq!(decode_pubkey(&key.to_string()).unwrap(), key);
        assert_eq!(decode_pubkey(&hex_encode(&[7u8; 32])).unwrap(), key);
        assert!(decode_pubkey("abcd").is_err());
    }
}

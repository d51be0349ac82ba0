//! Shape checks shared by the codec, the scanner and the assembler.

use solana_pubkey::Pubkey;

use crate::address::to_base58;
use crate::error::MarketError;
use crate::state::RecordKind;

/// Check that a buffer is long enough for a fixed-size record.
pub fn validate_record_len(kind: &'static str, expected: usize, actual: usize) -> Result<(), MarketError> {
    if actual < expected {
        return Err(MarketError::MalformedRecord { kind, expected, actual });
    }
    Ok(())
}

/// Scans tell kinds apart by byte length alone, so no two kinds may share one.
pub fn validate_unique_record_sizes(kinds: &[RecordKind]) -> Result<(), MarketError> {
    for (i, a) in kinds.iter().enumerate() {
        if let Some(b) = kinds[i + 1..].iter().find(|b| b.size() == a.size()) {
            return Err(MarketError::invalid_argument(
                "record kinds",
                format!("{} and {} are both {} bytes", a.name(), b.name(), a.size()),
            ));
        }
    }
    Ok(())
}

/// Verify that a token account is held by the expected wallet.
pub fn verify_owner(account_owner: &Pubkey, expected_owner: &Pubkey, mint: &Pubkey) -> Result<(), MarketError> {
    if account_owner != expected_owner {
        return Err(MarketError::AssetNotOwned {
            mint: to_base58(mint),
            owner: to_base58(expected_owner),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_are_unique() {
        validate_unique_record_sizes(&RecordKind::ALL).unwrap();
    }

    #[test]
    fn short_buffer_is_malformed() {
        let err = validate_record_len("Offer", 96, 95).unwrap_err();
        assert_eq!(err, MarketError::MalformedRecord { kind: "Offer", expected: 96, actual: 95 });
        assert!(validate_record_len("Offer", 96, 96).is_ok());
    }
}

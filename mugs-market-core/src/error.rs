//! Structured error types for the marketplace client.
//!
//! Client-side failures carry stable numeric codes in the 1000 range.
//! Errors raised by the on-ledger program are surfaced as `Program`
//! and keep the program's own 6000-based custom code.

use thiserror::Error;

/// Result alias used across both crates.
pub type MarketResult<T> = Result<T, MarketError>;

/// Errors produced while deriving, decoding, assembling or decoding events.
///
/// # Example
/// ```rust
/// use mugs_market_core::error::MarketError;
///
/// fn check_len(kind: &'static str, bytes: &[u8], expected: usize) -> Result<(), MarketError> {
///     if bytes.len() < expected {
///         return Err(MarketError::MalformedRecord {
///             kind,
///             expected,
///             actual: bytes.len(),
///         });
///     }
///     Ok(())
/// }
///
/// assert_eq!(check_len("Listing", &[0u8; 4], 128).unwrap_err().error_code(), 1000);
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Account bytes do not have the shape of the requested record kind
    #[error("Malformed {kind} record: expected {expected} bytes, got {actual}")]
    MalformedRecord {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Neither the owner's token account nor the vault holds the asset
    #[error("Asset {mint} is not held by {owner} or the marketplace vault")]
    AssetNotOwned {
        mint: String,
        owner: String,
    },

    /// A record that must exist was not found on the ledger
    #[error("{kind} record not found at {address}")]
    RecordAbsent {
        kind: &'static str,
        address: String,
    },

    /// No bump in 0..=255 produced an off-curve address
    #[error("Unable to find a viable program address bump seed")]
    AddressDerivationExhausted,

    /// A variable-length record could not be parsed
    #[error("Failed to decode {kind}: {message}")]
    Deserialization {
        kind: &'static str,
        message: String,
    },

    /// Instruction arguments could not be serialized
    #[error("Failed to serialize data: {message}")]
    Serialization {
        message: String,
    },

    /// Seeds exceed the per-seed length or seed count limit
    #[error("Invalid seeds: {message}")]
    InvalidSeeds {
        message: String,
    },

    /// Instruction data matched no registered fingerprint
    #[error("Instruction fingerprint {prefix} matched no known instruction")]
    AmbiguousEventFingerprint {
        prefix: String,
    },

    /// More treasury entries than the global record can hold
    #[error("Treasury list holds at most {capacity} entries, got {actual}")]
    TreasuryCapacity {
        capacity: usize,
        actual: usize,
    },

    /// A caller-supplied value could not be used
    #[error("Invalid argument {name}: {message}")]
    InvalidArgument {
        name: String,
        message: String,
    },

    /// The ledger collaborator failed for a reason other than "not found"
    #[error("Ledger request failed: {message}")]
    Ledger {
        message: String,
    },

    /// A ledger call exceeded the configured timeout
    #[error("Timed out waiting for {operation}")]
    Timeout {
        operation: String,
    },

    /// The marketplace program rejected the transaction
    #[error("Program error {code}: {message}")]
    Program {
        code: u32,
        message: String,
    },
}

impl MarketError {
    /// Build a `Program` error from a raw custom code returned by the ledger.
    pub fn program(code: u32) -> Self {
        let message = crate::program_errors::describe_program_error(code)
            .map(|entry| entry.message.to_string())
            .unwrap_or_else(|| "unknown program error".to_string());
        MarketError::Program { code, message }
    }

    /// Convenience constructor for argument validation failures.
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        MarketError::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Get a numeric error code for client-side handling.
    pub fn error_code(&self) -> u32 {
        match self {
            MarketError::MalformedRecord { .. } => 1000,
            MarketError::AssetNotOwned { .. } => 1001,
            MarketError::RecordAbsent { .. } => 1002,
            MarketError::AddressDerivationExhausted => 1003,
            MarketError::InvalidSeeds { .. } => 1004,
            MarketError::AmbiguousEventFingerprint { .. } => 1005,
            MarketError::TreasuryCapacity { .. } => 1006,
            MarketError::InvalidArgument { .. } => 1007,
            MarketError::Ledger { .. } => 1008,
            MarketError::Timeout { .. } => 1009,
            MarketError::Deserialization { .. } => 1010,
            MarketError::Serialization { .. } => 1011,
            MarketError::Program { code, .. } => *code,
        }
    }
}

//! Client configuration: program id, commitment, timeouts, verbosity.

use std::time::Duration;

use mugs_market_core::address::parse_address;
use mugs_market_core::error::{MarketError, MarketResult};
use mugs_market_core::pda::MARKETPLACE_PROGRAM_ID;
use mugs_market_core::types::Commitment;
use solana_pubkey::Pubkey;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_PROGRAM_ID: &str = "MUGS_PROGRAM_ID";
pub const ENV_COMMITMENT: &str = "MUGS_COMMITMENT";
pub const ENV_TIMEOUT_SECS: &str = "MUGS_TIMEOUT_SECS";
pub const ENV_VERBOSE: &str = "MUGS_VERBOSE";

/// Settings shared by the assembler, orchestrator and scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketContext {
    pub program_id: Pubkey,
    pub commitment: Commitment,
    /// Upper bound on any single ledger call.
    pub timeout: Duration,
    pub verbose: bool,
}

impl Default for MarketContext {
    fn default() -> Self {
        Self {
            program_id: MARKETPLACE_PROGRAM_ID,
            commitment: Commitment::default(),
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
        }
    }
}

impl MarketContext {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id, ..Self::default() }
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Defaults overridden by `MUGS_*` environment variables.
    pub fn from_env() -> MarketResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`MarketContext::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MarketResult<Self> {
        let mut ctx = Self::default();
        if let Some(raw) = lookup(ENV_PROGRAM_ID) {
            ctx.program_id = parse_address(&raw)?;
        }
        if let Some(raw) = lookup(ENV_COMMITMENT) {
            ctx.commitment = Commitment::parse(&raw).ok_or_else(|| {
                MarketError::invalid_argument(ENV_COMMITMENT, format!("unknown commitment '{}'", raw))
            })?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| MarketError::invalid_argument(ENV_TIMEOUT_SECS, e.to_string()))?;
            ctx.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_VERBOSE) {
            ctx.verbose = matches!(raw.trim(), "1" | "true" | "yes");
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let ctx = MarketContext::from_lookup(|_| None).unwrap();
        assert_eq!(ctx, MarketContext::default());
        assert_eq!(ctx.program_id, MARKETPLACE_PROGRAM_ID);
        assert_eq!(ctx.commitment, Commitment::Confirmed);
    }

    #[test]
    fn test_overrides() {
        let other = Pubkey::new_from_array([3u8; 32]);
        let vars: HashMap<&str, String> = [
            (ENV_PROGRAM_ID, other.to_string()),
            (ENV_COMMITMENT, "finalized".to_string()),
            (ENV_TIMEOUT_SECS, "5".to_string()),
            (ENV_VERBOSE, "1".to_string()),
        ]
        .into_iter()
        .collect();
        let ctx = MarketContext::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(ctx.program_id, other);
        assert_eq!(ctx.commitment, Commitment::Finalized);
        assert_eq!(ctx.timeout, Duration::from_secs(5));
        assert!(ctx.verbose);
    }

    #[test]
    fn test_bad_timeout() {
        let err = MarketContext::from_lookup(|k| (k == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(err.error_code(), 1007);
    }
}

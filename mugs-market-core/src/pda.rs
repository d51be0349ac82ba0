//! Program-derived address computation.
//!
//! Every marketplace record lives at an address computed from fixed seed
//! strings and the owning program id. Nothing is looked up: callers
//! re-derive the address each time they need it.

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};
use solana_pubkey::Pubkey;

use crate::error::{MarketError, MarketResult};

/// Longest allowed single seed.
pub const MAX_SEED_LEN: usize = 32;
/// Most seeds allowed, bump included.
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

pub const MARKETPLACE_PROGRAM_ID: Pubkey = Pubkey::new_from_array(five8_const::decode_32_const(
    "C29hER4SXQr3atHsuCrRmLAkXBpxvfLMCNeXg2TRTd9o",
));
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array(five8_const::decode_32_const(
    "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
));
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array(
    five8_const::decode_32_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"),
);
pub const METADATA_PROGRAM_ID: Pubkey = Pubkey::new_from_array(five8_const::decode_32_const(
    "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s",
));
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);
pub const RENT_SYSVAR_ID: Pubkey = Pubkey::new_from_array(five8_const::decode_32_const(
    "SysvarRent111111111111111111111111111111111",
));

pub const GLOBAL_AUTHORITY_SEED: &[u8] = b"global-authority-v1";
pub const ESCROW_VAULT_SEED: &[u8] = b"escrow-vault";
pub const SELL_DATA_SEED: &[u8] = b"sell-info-v1";
pub const OFFER_DATA_SEED: &[u8] = b"offer-info-v1";
pub const AUCTION_DATA_SEED: &[u8] = b"auction-info-v1";
pub const USER_DATA_SEED: &[u8] = b"user-info-v1";
pub const METADATA_SEED: &[u8] = b"metadata";

/// Whether 32 bytes decode to a point on the ed25519 curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

fn check_seeds(seeds: &[&[u8]], reserved: usize) -> MarketResult<()> {
    if seeds.len() + reserved > MAX_SEEDS {
        return Err(MarketError::InvalidSeeds {
            message: format!("{} seeds given, at most {} allowed", seeds.len(), MAX_SEEDS - reserved),
        });
    }
    if let Some((i, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(MarketError::InvalidSeeds {
            message: format!("seed {} is {} bytes, max {}", i, seed.len(), MAX_SEED_LEN),
        });
    }
    Ok(())
}

fn hash_seeds(seeds: &[&[u8]], bump: Option<u8>, program_id: &Pubkey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    if let Some(bump) = bump {
        hasher.update([bump]);
    }
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);
    hasher.finalize().into()
}

/// Compute the address for exactly these seeds, failing if it lies on the curve.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> MarketResult<Pubkey> {
    check_seeds(seeds, 0)?;
    let hash = hash_seeds(seeds, None, program_id);
    if is_on_curve(&hash) {
        return Err(MarketError::InvalidSeeds {
            message: "derived address lies on the ed25519 curve".to_string(),
        });
    }
    Ok(Pubkey::new_from_array(hash))
}

/// Find the canonical derived address and its bump.
///
/// The bump is searched from 255 downward and the first value that
/// yields an off-curve address wins, matching the ledger's own search.
pub fn derive_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    check_seeds(seeds, 1)?;
    for bump in (0..=u8::MAX).rev() {
        let hash = hash_seeds(seeds, Some(bump), program_id);
        if !is_on_curve(&hash) {
            return Ok((Pubkey::new_from_array(hash), bump));
        }
    }
    Err(MarketError::AddressDerivationExhausted)
}

pub fn find_global_authority(program_id: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    derive_program_address(&[GLOBAL_AUTHORITY_SEED], program_id)
}

pub fn find_escrow_vault(program_id: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    derive_program_address(&[ESCROW_VAULT_SEED], program_id)
}

/// Listing (sell data) record for a mint.
pub fn find_listing(program_id: &Pubkey, mint: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    derive_program_address(&[SELL_DATA_SEED, mint.as_ref()], program_id)
}

/// Offer record for a (mint, buyer) pair.
pub fn find_offer(program_id: &Pubkey, mint: &Pubkey, buyer: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    derive_program_address(&[OFFER_DATA_SEED, mint.as_ref(), buyer.as_ref()], program_id)
}

pub fn find_auction(program_id: &Pubkey, mint: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    derive_program_address(&[AUCTION_DATA_SEED, mint.as_ref()], program_id)
}

pub fn find_user_account(program_id: &Pubkey, owner: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    derive_program_address(&[USER_DATA_SEED, owner.as_ref()], program_id)
}

/// Default token account of `owner` for `mint`.
pub fn find_associated_token_account(owner: &Pubkey, mint: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    derive_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
}

/// Metadata record describing `mint`.
pub fn find_metadata(mint: &Pubkey) -> MarketResult<(Pubkey, u8)> {
    derive_program_address(
        &[METADATA_SEED, METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
}

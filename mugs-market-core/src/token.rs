//! Token-account view and the associated-account helper instruction.

use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;

use crate::error::{MarketError, MarketResult};
use crate::pda::{find_associated_token_account, ASSOCIATED_TOKEN_PROGRAM_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};

/// Byte length of a token account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// The parts of a token account the marketplace cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

impl TokenAccount {
    pub fn decode(bytes: &[u8]) -> MarketResult<Self> {
        if bytes.len() < TOKEN_ACCOUNT_LEN {
            return Err(MarketError::MalformedRecord {
                kind: "TokenAccount",
                expected: TOKEN_ACCOUNT_LEN,
                actual: bytes.len(),
            });
        }
        let mut mint = [0u8; 32];
        mint.copy_from_slice(&bytes[0..32]);
        let mut owner = [0u8; 32];
        owner.copy_from_slice(&bytes[32..64]);
        let mut amount = [0u8; 8];
        amount.copy_from_slice(&bytes[64..72]);
        Ok(Self {
            mint: Pubkey::new_from_array(mint),
            owner: Pubkey::new_from_array(owner),
            amount: u64::from_le_bytes(amount),
        })
    }

    /// Encode into a token-account sized buffer, remaining fields zeroed.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; TOKEN_ACCOUNT_LEN];
        out[0..32].copy_from_slice(self.mint.as_ref());
        out[32..64].copy_from_slice(self.owner.as_ref());
        out[64..72].copy_from_slice(&self.amount.to_le_bytes());
        out
    }

    /// Whether this account currently holds `mint`.
    pub fn holds(&self, mint: &Pubkey) -> bool {
        &self.mint == mint && self.amount > 0
    }
}

/// Create-if-missing instruction for `owner`'s associated account of `mint`.
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> MarketResult<(Instruction, Pubkey)> {
    let (ata, _) = find_associated_token_account(owner, mint)?;
    let ix = Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(ata, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![1],
    };
    Ok((ix, ata))
}

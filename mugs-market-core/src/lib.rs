//! # Mugs Market Core
//!
//! Ledger-independent pieces of the marketplace client:
//! - program-derived address computation for every record
//! - fixed-layout record codec
//! - instruction builders and the instruction catalog
//! - event reconstruction from historical transactions

pub mod address;
pub mod error;
pub mod events;
pub mod idl;
pub mod instruction;
pub mod metadata;
pub mod pda;
pub mod program_errors;
pub mod state;
pub mod token;
pub mod types;
pub mod validation;

pub mod prelude {
    pub use crate::address::{parse_address, to_base58};
    pub use crate::error::{MarketError, MarketResult};
    pub use crate::events::{EventDecoder, HistoricalTransaction, MarketAction, MarketEvent};
    pub use crate::instruction::MarketInstruction;
    pub use crate::state::{Auction, GlobalConfig, Listing, Offer, Record, RecordKind, UserAccount};
    pub use crate::types::{Commitment, InstructionSet, PreparedTransaction};
    pub use solana_instruction::{AccountMeta, Instruction};
    pub use solana_pubkey::Pubkey;
}

//! Ledger fixtures shared by the integration tests.

#![allow(dead_code)]

use mugs_market_cli::config::MarketContext;
use mugs_market_cli::ledger::MemoryLedger;
use mugs_market_core::instruction::vault_token_account;
use mugs_market_core::pda::{
    find_associated_token_account, find_auction, find_global_authority, find_listing, find_offer, find_user_account,
    MARKETPLACE_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
use mugs_market_core::state::{Auction, GlobalConfig, Listing, Offer, TreasuryList, UserAccount};
use mugs_market_core::token::TokenAccount;
use solana_pubkey::Pubkey;

pub fn key(byte: u8) -> Pubkey {
    Pubkey::new_from_array([byte; 32])
}

pub fn ctx() -> MarketContext {
    MarketContext::new(MARKETPLACE_PROGRAM_ID)
}

pub fn ledger() -> MemoryLedger {
    MemoryLedger::new(MARKETPLACE_PROGRAM_ID)
}

/// Global config with the given treasury entries.
pub async fn market(ledger: &MemoryLedger, treasury: &[(Pubkey, u64)]) {
    let (global, _) = find_global_authority(&MARKETPLACE_PROGRAM_ID).unwrap();
    let config = GlobalConfig {
        super_admin: key(200),
        market_fee_sol: 0,
        treasury: TreasuryList::from_entries(treasury).unwrap(),
    };
    ledger.insert_record(global, &config).await;
}

pub async fn token_account(ledger: &MemoryLedger, address: Pubkey, owner: Pubkey, mint: Pubkey, amount: u64) {
    let data = TokenAccount { mint, owner, amount }.encode();
    ledger.insert_account(address, TOKEN_PROGRAM_ID, 2_039_280, data).await;
}

/// `owner` holds one unit of `mint` in its associated account.
pub async fn wallet_holds(ledger: &MemoryLedger, owner: Pubkey, mint: Pubkey) {
    let (ata, _) = find_associated_token_account(&owner, &mint).unwrap();
    token_account(ledger, ata, owner, mint, 1).await;
}

/// The vault holds one unit of `mint`.
pub async fn vault_holds(ledger: &MemoryLedger, mint: Pubkey) {
    let (global, _) = find_global_authority(&MARKETPLACE_PROGRAM_ID).unwrap();
    let vault = vault_token_account(&MARKETPLACE_PROGRAM_ID, &mint).unwrap();
    token_account(ledger, vault, global, mint, 1).await;
}

pub fn listing_record(mint: Pubkey, seller: Pubkey, active: u64) -> Listing {
    Listing { mint, seller, collection: Pubkey::default(), price: 1_000, listed_date: 1_700_000_000, active }
}

pub async fn listed(ledger: &MemoryLedger, mint: Pubkey, seller: Pubkey) {
    let (address, _) = find_listing(&MARKETPLACE_PROGRAM_ID, &mint).unwrap();
    ledger.insert_record(address, &listing_record(mint, seller, 1)).await;
    vault_holds(ledger, mint).await;
}

pub fn auction_record(mint: Pubkey, creator: Pubkey, last_bidder: Pubkey, status: u64) -> Auction {
    Auction {
        mint,
        creator,
        start_price: 100,
        min_increase: 10,
        start_date: 1_700_000_000,
        last_bid_date: 0,
        last_bidder,
        highest_bid: 0,
        duration: 3_600,
        status,
    }
}

pub async fn auctioned(ledger: &MemoryLedger, mint: Pubkey, creator: Pubkey, last_bidder: Pubkey) {
    let (address, _) = find_auction(&MARKETPLACE_PROGRAM_ID, &mint).unwrap();
    ledger.insert_record(address, &auction_record(mint, creator, last_bidder, 1)).await;
    vault_holds(ledger, mint).await;
}

pub fn offer_record(mint: Pubkey, buyer: Pubkey, active: u64) -> Offer {
    Offer { mint, buyer, offer_price: 500, offer_listing_date: 1_700_000_000, active }
}

pub async fn offered(ledger: &MemoryLedger, mint: Pubkey, buyer: Pubkey, active: u64) {
    let (address, _) = find_offer(&MARKETPLACE_PROGRAM_ID, &mint, &buyer).unwrap();
    ledger.insert_record(address, &offer_record(mint, buyer, active)).await;
}

pub async fn user_exists(ledger: &MemoryLedger, owner: Pubkey) {
    let (address, _) = find_user_account(&MARKETPLACE_PROGRAM_ID, &owner).unwrap();
    let record = UserAccount { address: owner, traded_volume: 0, escrow_sol_balance: 0 };
    ledger.insert_record(address, &record).await;
}

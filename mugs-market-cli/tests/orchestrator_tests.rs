//! Assembly and submission against an in-memory ledger.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use common::*;
use mugs_market_cli::assembler::{AssetLocation, MarketOperation};
use mugs_market_cli::ledger::{LedgerQuery, MemcmpFilter, MemoryLedger, QueryError};
use mugs_market_cli::metadata::{FixedCreators, LedgerCreators};
use mugs_market_cli::tx::Orchestrator;
use mugs_market_core::events::HistoricalTransaction;
use mugs_market_core::instruction::{AuctionTerms, MarketInstruction};
use mugs_market_core::metadata::{AssetMetadata, Creator};
use mugs_market_core::pda::{find_associated_token_account, find_metadata, ASSOCIATED_TOKEN_PROGRAM_ID, METADATA_PROGRAM_ID};
use mugs_market_core::types::{Commitment, PreparedTransaction};
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;

fn opcode(ix: &Instruction) -> &[u8] {
    &ix.data[..8]
}

fn primary(tx: &PreparedTransaction) -> &Instruction {
    tx.instructions.last().unwrap()
}

fn tail(ix: &Instruction, from: usize) -> Vec<Pubkey> {
    ix.accounts[from..].iter().map(|m| m.pubkey).collect()
}

#[tokio::test]
async fn test_purchase_initializes_user_account_once() {
    let (ctx, ledger) = (ctx(), ledger());
    let (seller, buyer, mint) = (key(1), key(2), key(3));
    market(&ledger, &[(key(20), 500), (key(21), 300)]).await;
    listed(&ledger, mint, seller).await;
    let creators = FixedCreators(vec![key(30), key(31), key(32)]);
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);
    let op = MarketOperation::Purchase { mint };
    let init = MarketInstruction::InitUserPool.discriminator();

    let first = orchestrator.submit(&buyer, &op).await.unwrap();
    assert!(!first.retried);
    assert_eq!(first.transaction.count_with_opcode(&init), 1);
    assert_eq!(opcode(&first.transaction.instructions[0]), &init[..]);
    // user init, buyer's associated account, purchase
    assert_eq!(first.transaction.instructions.len(), 3);
    assert_eq!(first.transaction.instructions[1].program_id, ASSOCIATED_TOKEN_PROGRAM_ID);

    let second = orchestrator.prepare(&buyer, &op).await.unwrap();
    assert_eq!(second.count_with_opcode(&init), 0);
    assert_eq!(opcode(primary(&second)), &MarketInstruction::Purchase.discriminator()[..]);
}

#[tokio::test]
async fn test_purchase_appends_treasury_then_creators() {
    let (ctx, ledger) = (ctx(), ledger());
    let (seller, buyer, mint) = (key(1), key(2), key(3));
    market(&ledger, &[(key(20), 500), (key(21), 300)]).await;
    listed(&ledger, mint, seller).await;
    user_exists(&ledger, buyer).await;
    let creators = FixedCreators(vec![key(30), key(31), key(32)]);
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let tx = orchestrator.prepare(&buyer, &MarketOperation::Purchase { mint }).await.unwrap();
    let purchase = primary(&tx);
    assert_eq!(purchase.accounts.len(), 14 + 5);
    assert_eq!(tail(purchase, 14), vec![key(20), key(21), key(30), key(31), key(32)]);
    assert_eq!(purchase.accounts[6].pubkey, seller);
}

#[tokio::test]
async fn test_creators_come_from_metadata_account() {
    let (ctx, ledger) = (ctx(), ledger());
    let (seller, buyer, mint) = (key(1), key(2), key(3));
    market(&ledger, &[(key(20), 500)]).await;
    listed(&ledger, mint, seller).await;
    user_exists(&ledger, buyer).await;
    let metadata = AssetMetadata {
        update_authority: key(40),
        mint,
        name: "Mug #1".to_string(),
        symbol: "MUG".to_string(),
        uri: "https://example.invalid/1.json".to_string(),
        seller_fee_basis_points: 500,
        creators: vec![
            Creator { address: key(41), verified: true, share: 60 },
            Creator { address: key(42), verified: false, share: 40 },
        ],
    };
    let (metadata_address, _) = find_metadata(&mint).unwrap();
    ledger
        .insert_account(metadata_address, METADATA_PROGRAM_ID, 0, metadata.encode().unwrap())
        .await;
    let creators = LedgerCreators::new(&ctx, &ledger);
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let tx = orchestrator.prepare(&buyer, &MarketOperation::Purchase { mint }).await.unwrap();
    assert_eq!(tail(primary(&tx), 14), vec![key(20), key(41), key(42)]);
}

#[tokio::test]
async fn test_missing_metadata_is_reported() {
    let (ctx, ledger) = (ctx(), ledger());
    let (seller, buyer, mint) = (key(1), key(2), key(3));
    market(&ledger, &[]).await;
    listed(&ledger, mint, seller).await;
    let creators = LedgerCreators::new(&ctx, &ledger);
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let err = orchestrator.prepare(&buyer, &MarketOperation::Purchase { mint }).await.unwrap_err();
    assert_eq!(err.error_code(), 1002);
}

#[tokio::test]
async fn test_purchase_without_listing_is_absent() {
    let (ctx, ledger) = (ctx(), ledger());
    market(&ledger, &[]).await;
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let err = orchestrator.prepare(&key(2), &MarketOperation::Purchase { mint: key(3) }).await.unwrap_err();
    assert_eq!(err.error_code(), 1002);
}

#[tokio::test]
async fn test_list_requires_ownership() {
    let (ctx, ledger) = (ctx(), ledger());
    let (owner, mint) = (key(1), key(3));
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);
    let op = MarketOperation::List { mint, price: 1_000 };

    let err = orchestrator.prepare(&owner, &op).await.unwrap_err();
    assert_eq!(err.error_code(), 1001);

    // an emptied wallet account does not count
    let (ata, _) = find_associated_token_account(&owner, &mint).unwrap();
    token_account(&ledger, ata, owner, mint, 0).await;
    assert_eq!(orchestrator.prepare(&owner, &op).await.unwrap_err().error_code(), 1001);

    // nor does an asset someone else deposited
    listed(&ledger, mint, key(9)).await;
    assert_eq!(orchestrator.prepare(&owner, &op).await.unwrap_err().error_code(), 1001);
}

#[tokio::test]
async fn test_locate_asset_prefers_wallet_then_vault() {
    let (ctx, ledger) = (ctx(), ledger());
    let (owner, mint) = (key(1), key(3));
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    listed(&ledger, mint, owner).await;
    let location = orchestrator.assembler().locate_asset(&owner, &mint).await.unwrap();
    assert!(matches!(location, AssetLocation::Vault(_)));

    wallet_holds(&ledger, owner, mint).await;
    let (ata, _) = find_associated_token_account(&owner, &mint).unwrap();
    let location = orchestrator.assembler().locate_asset(&owner, &mint).await.unwrap();
    assert_eq!(location, AssetLocation::Wallet(ata));
}

#[tokio::test]
async fn test_list_initializes_mint_records_and_vault_account() {
    let (ctx, ledger) = (ctx(), ledger());
    let (owner, mint) = (key(1), key(3));
    wallet_holds(&ledger, owner, mint).await;
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let tx = orchestrator.prepare(&owner, &MarketOperation::List { mint, price: 7 }).await.unwrap();
    assert_eq!(tx.instructions.len(), 5);
    assert_eq!(opcode(&tx.instructions[0]), &MarketInstruction::InitUserPool.discriminator()[..]);
    assert_eq!(opcode(&tx.instructions[1]), &MarketInstruction::InitSellData.discriminator()[..]);
    assert_eq!(opcode(&tx.instructions[2]), &MarketInstruction::InitAuctionData.discriminator()[..]);
    assert_eq!(tx.instructions[3].program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
    assert_eq!(opcode(&tx.instructions[4]), &MarketInstruction::ListNftForSale.discriminator()[..]);

    let (ata, _) = find_associated_token_account(&owner, &mint).unwrap();
    assert_eq!(tx.instructions[4].accounts[3].pubkey, ata);
}

#[tokio::test]
async fn test_create_auction_skips_existing_records() {
    let (ctx, ledger) = (ctx(), ledger());
    let (owner, mint) = (key(1), key(3));
    wallet_holds(&ledger, owner, mint).await;
    user_exists(&ledger, owner).await;
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);
    let op = MarketOperation::CreateAuction {
        mint,
        terms: AuctionTerms { start_price: 100, min_increase: 10, duration: 3_600, reserved: false },
    };

    // first run creates the listing and auction records
    orchestrator.submit(&owner, &op).await.unwrap();
    let again = orchestrator.prepare(&owner, &op).await.unwrap();
    assert_eq!(again.count_with_opcode(&MarketInstruction::InitSellData.discriminator()), 0);
    assert_eq!(again.count_with_opcode(&MarketInstruction::InitAuctionData.discriminator()), 0);
    assert_eq!(again.count_with_opcode(&MarketInstruction::InitUserPool.discriminator()), 0);
}

#[tokio::test]
async fn test_transfer_routes_by_listing_state() {
    let (ctx, ledger) = (ctx(), ledger());
    let (owner, recipient, mint) = (key(1), key(4), key(3));
    wallet_holds(&ledger, owner, mint).await;
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);
    let op = MarketOperation::Transfer { mint, recipient };

    let direct = orchestrator.prepare(&owner, &op).await.unwrap();
    assert_eq!(opcode(primary(&direct)), &MarketInstruction::Transfer.discriminator()[..]);
    // recipient has no associated account yet
    assert_eq!(direct.instructions.len(), 2);
    assert_eq!(direct.instructions[0].program_id, ASSOCIATED_TOKEN_PROGRAM_ID);

    let (ledger, owner) = (self::ledger(), key(1));
    listed(&ledger, mint, owner).await;
    wallet_holds(&ledger, recipient, mint).await;
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);
    let vaulted = orchestrator.prepare(&owner, &op).await.unwrap();
    assert_eq!(vaulted.instructions.len(), 1);
    assert_eq!(opcode(primary(&vaulted)), &MarketInstruction::TransferFromVault.discriminator()[..]);
}

#[tokio::test]
async fn test_place_bid_refunds_previous_bidder() {
    let (ctx, ledger) = (ctx(), ledger());
    let (creator, bidder, mint) = (key(1), key(2), key(3));
    auctioned(&ledger, mint, creator, Pubkey::default()).await;
    user_exists(&ledger, bidder).await;
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);
    let op = MarketOperation::PlaceBid { mint, price: 150 };

    let first = orchestrator.prepare(&bidder, &op).await.unwrap();
    assert_eq!(first.instructions.len(), 1);
    assert_eq!(primary(&first).accounts[4].pubkey, bidder);

    let ledger = self::ledger();
    auctioned(&ledger, mint, creator, key(7)).await;
    user_exists(&ledger, bidder).await;
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);
    let outbid = orchestrator.prepare(&bidder, &op).await.unwrap();
    assert_eq!(primary(&outbid).accounts[4].pubkey, key(7));
}

#[tokio::test]
async fn test_claim_auction_pays_creator() {
    let (ctx, ledger) = (ctx(), ledger());
    let (creator, bidder, mint) = (key(1), key(2), key(3));
    market(&ledger, &[(key(20), 1_000)]).await;
    auctioned(&ledger, mint, creator, bidder).await;
    user_exists(&ledger, bidder).await;
    let creators = FixedCreators(vec![key(30)]);
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let tx = orchestrator.prepare(&bidder, &MarketOperation::ClaimAuction { mint }).await.unwrap();
    let claim = primary(&tx);
    assert_eq!(claim.accounts[8].pubkey, creator);
    assert_eq!(tail(claim, 14), vec![key(20), key(30)]);
}

#[tokio::test]
async fn test_accept_offer_delivers_to_buyer() {
    let (ctx, ledger) = (ctx(), ledger());
    let (seller, buyer, mint) = (key(1), key(2), key(3));
    market(&ledger, &[(key(20), 1_000), (key(21), 500)]).await;
    listed(&ledger, mint, seller).await;
    offered(&ledger, mint, buyer, 1).await;
    user_exists(&ledger, seller).await;
    wallet_holds(&ledger, buyer, key(99)).await;
    let creators = FixedCreators(vec![key(30)]);
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let tx = orchestrator.prepare(&seller, &MarketOperation::AcceptOffer { mint, buyer }).await.unwrap();
    let accept = primary(&tx);
    let (buyer_ata, _) = find_associated_token_account(&buyer, &mint).unwrap();
    assert_eq!(accept.accounts[2].pubkey, buyer);
    assert_eq!(accept.accounts[8].pubkey, buyer_ata);
    assert_eq!(tail(accept, 16), vec![key(20), key(21), key(30)]);
    // buyer's account for this mint is created by the seller
    assert_eq!(tx.instructions[0].program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
    assert_eq!(tx.instructions[0].accounts[0].pubkey, seller);
}

#[tokio::test]
async fn test_make_offer_initializes_offer_slot() {
    let (ctx, ledger) = (ctx(), ledger());
    let (buyer, mint) = (key(2), key(3));
    user_exists(&ledger, buyer).await;
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let tx = orchestrator.prepare(&buyer, &MarketOperation::MakeOffer { mint, price: 5 }).await.unwrap();
    assert_eq!(tx.instructions.len(), 2);
    assert_eq!(opcode(&tx.instructions[0]), &MarketInstruction::InitOfferData.discriminator()[..]);
}

#[tokio::test]
async fn test_admin_operations_need_no_lookups() {
    let (ctx, ledger) = (ctx(), ledger());
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);
    for op in [
        MarketOperation::Initialize,
        MarketOperation::UpdateFee { sol_fee: 10 },
        MarketOperation::AddTreasury { address: key(20), rate: 100 },
        MarketOperation::RemoveTreasury { address: key(20) },
    ] {
        let tx = orchestrator.prepare(&key(200), &op).await.unwrap();
        assert_eq!(tx.instructions.len(), 1, "{}", op.name());
        assert!(tx.instructions[0].accounts[0].is_signer);
    }
}

// ─── Submission failures ─────────────────────────────────────────

/// Ledger whose first submission loses an initialization race.
struct RacingLedger {
    inner: MemoryLedger,
    racer: Pubkey,
    raced: AtomicBool,
}

/// Ledger that rejects every submission with a fixed error.
struct RejectingLedger {
    inner: MemoryLedger,
    error: QueryError,
    attempts: AtomicUsize,
}

/// Ledger whose reads never finish in time.
struct SlowLedger {
    inner: MemoryLedger,
}

macro_rules! delegate_reads {
    () => {
        async fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, QueryError> {
            self.inner.get_account(address).await
        }

        async fn scan_program_accounts(
            &self,
            owner: &Pubkey,
            data_size: usize,
            filter: Option<&MemcmpFilter>,
        ) -> Result<Vec<(Pubkey, Vec<u8>)>, QueryError> {
            self.inner.scan_program_accounts(owner, data_size, filter).await
        }

        async fn get_balance(&self, address: &Pubkey) -> Result<u64, QueryError> {
            self.inner.get_balance(address).await
        }

        async fn signatures_for_address(&self, address: &Pubkey) -> Result<Vec<String>, QueryError> {
            self.inner.signatures_for_address(address).await
        }

        async fn get_transaction(&self, signature: &str) -> Result<Option<HistoricalTransaction>, QueryError> {
            self.inner.get_transaction(signature).await
        }

        async fn confirm_transaction(&self, signature: &str, commitment: Commitment) -> Result<(), QueryError> {
            self.inner.confirm_transaction(signature, commitment).await
        }
    };
}

impl LedgerQuery for RacingLedger {
    delegate_reads!();

    async fn submit_transaction(&self, tx: &PreparedTransaction) -> Result<String, QueryError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            user_exists(&self.inner, self.racer).await;
            return Err(QueryError::AlreadyInitialized { address: "user".to_string() });
        }
        self.inner.submit_transaction(tx).await
    }
}

impl LedgerQuery for RejectingLedger {
    delegate_reads!();

    async fn submit_transaction(&self, _tx: &PreparedTransaction) -> Result<String, QueryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

impl LedgerQuery for SlowLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, QueryError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.inner.get_account(address).await
    }

    async fn scan_program_accounts(
        &self,
        owner: &Pubkey,
        data_size: usize,
        filter: Option<&MemcmpFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, QueryError> {
        self.inner.scan_program_accounts(owner, data_size, filter).await
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, QueryError> {
        self.inner.get_balance(address).await
    }

    async fn signatures_for_address(&self, address: &Pubkey) -> Result<Vec<String>, QueryError> {
        self.inner.signatures_for_address(address).await
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<HistoricalTransaction>, QueryError> {
        self.inner.get_transaction(signature).await
    }

    async fn submit_transaction(&self, tx: &PreparedTransaction) -> Result<String, QueryError> {
        self.inner.submit_transaction(tx).await
    }

    async fn confirm_transaction(&self, signature: &str, commitment: Commitment) -> Result<(), QueryError> {
        self.inner.confirm_transaction(signature, commitment).await
    }
}

#[tokio::test]
async fn test_init_race_is_retried_once() {
    let ctx = ctx();
    let user = key(2);
    let ledger = RacingLedger { inner: self::ledger(), racer: user, raced: AtomicBool::new(false) };
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let submitted = orchestrator.submit(&user, &MarketOperation::Deposit { amount: 5 }).await.unwrap();
    assert!(submitted.retried);
    assert_eq!(submitted.transaction.instructions.len(), 1);
    assert_eq!(submitted.transaction.count_with_opcode(&MarketInstruction::InitUserPool.discriminator()), 0);
    assert_eq!(ledger.inner.submitted().await.len(), 1);
}

#[tokio::test]
async fn test_second_init_failure_surfaces() {
    let ctx = ctx();
    let ledger = RejectingLedger {
        inner: self::ledger(),
        error: QueryError::AlreadyInitialized { address: "user".to_string() },
        attempts: AtomicUsize::new(0),
    };
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let err = orchestrator.submit(&key(2), &MarketOperation::Withdraw { amount: 5 }).await.unwrap_err();
    assert_eq!(err.error_code(), 1008);
    assert_eq!(ledger.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_program_error_code_passes_through() {
    let ctx = ctx();
    let ledger = RejectingLedger {
        inner: self::ledger(),
        error: QueryError::Rejected {
            message: "Transaction simulation failed: custom program error: 0x1770".to_string(),
        },
        attempts: AtomicUsize::new(0),
    };
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let err = orchestrator.submit(&key(200), &MarketOperation::Initialize).await.unwrap_err();
    assert_eq!(err.error_code(), 6000);
    assert_eq!(ledger.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_ledger_times_out() {
    let ctx = ctx().with_timeout(Duration::from_millis(20));
    let ledger = SlowLedger { inner: self::ledger() };
    let creators = FixedCreators::default();
    let orchestrator = Orchestrator::new(&ctx, &ledger, &creators);

    let err = orchestrator.prepare(&key(2), &MarketOperation::Deposit { amount: 1 }).await.unwrap_err();
    assert_eq!(err.error_code(), 1009);
}

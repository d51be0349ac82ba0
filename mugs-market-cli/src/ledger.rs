//! Ledger query collaborator.
//!
//! Everything that reads or writes ledger state goes through
//! [`LedgerQuery`]. [`MemoryLedger`] implements it over an in-process
//! account map, loaded from a JSON snapshot for dry runs and tests.

use std::collections::BTreeMap;
use std::future::Future;

use mugs_market_core::address::serde_base58;
use mugs_market_core::error::{MarketError, MarketResult};
use mugs_market_core::events::HistoricalTransaction;
use mugs_market_core::instruction::MarketInstruction;
use mugs_market_core::program_errors::parse_custom_error_code;
use mugs_market_core::state::{Auction, Listing, Offer, Record, UserAccount};
use mugs_market_core::types::{Commitment, PreparedTransaction};
use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::MarketContext;
use crate::hex::{hex_decode, hex_encode};

/// Exact byte-range equality filter for program account scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self { offset, bytes: bytes.into() }
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len())
            .map(|window| window == self.bytes.as_slice())
            .unwrap_or(false)
    }
}

/// Failures reported by the ledger collaborator.
///
/// "Not found" is not an error: lookups return `Ok(None)` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// An init instruction targeted an account that already exists
    #[error("Account {address} is already initialized")]
    AlreadyInitialized { address: String },

    /// The ledger rejected the transaction
    #[error("Transaction rejected: {message}")]
    Rejected { message: String },

    /// Network or service failure
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl QueryError {
    pub fn transport(message: impl Into<String>) -> Self {
        QueryError::Transport { message: message.into() }
    }
}

impl From<QueryError> for MarketError {
    fn from(err: QueryError) -> Self {
        match &err {
            QueryError::Rejected { message } => match parse_custom_error_code(message) {
                Some(code) => MarketError::program(code),
                None => MarketError::Ledger { message: err.to_string() },
            },
            _ => MarketError::Ledger { message: err.to_string() },
        }
    }
}

/// Read and submit operations against the ledger.
#[allow(async_fn_in_trait)]
pub trait LedgerQuery {
    /// Raw account data, or `None` if the account does not exist.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, QueryError>;

    /// Accounts owned by `owner` whose data is exactly `data_size` bytes.
    async fn scan_program_accounts(
        &self,
        owner: &Pubkey,
        data_size: usize,
        filter: Option<&MemcmpFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, QueryError>;

    /// Lamport balance; zero for missing accounts.
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, QueryError>;

    /// Signatures of transactions that touched `address`, newest first.
    async fn signatures_for_address(&self, address: &Pubkey) -> Result<Vec<String>, QueryError>;

    async fn get_transaction(&self, signature: &str) -> Result<Option<HistoricalTransaction>, QueryError>;

    /// Sign and submit; returns the transaction signature.
    async fn submit_transaction(&self, tx: &PreparedTransaction) -> Result<String, QueryError>;

    async fn confirm_transaction(&self, signature: &str, commitment: Commitment) -> Result<(), QueryError>;
}

/// Run a ledger call under the context's timeout.
pub async fn with_timeout<T, F>(ctx: &MarketContext, operation: &str, fut: F) -> MarketResult<T>
where
    F: Future<Output = Result<T, QueryError>>,
{
    match tokio::time::timeout(ctx.timeout, fut).await {
        Ok(result) => result.map_err(MarketError::from),
        Err(_) => Err(MarketError::Timeout { operation: operation.to_string() }),
    }
}

/// Fetch and decode a record, `None` if the account does not exist.
pub async fn fetch_record<R: Record, L: LedgerQuery>(
    ctx: &MarketContext,
    ledger: &L,
    address: &Pubkey,
) -> MarketResult<Option<R>> {
    match with_timeout(ctx, "get_account", ledger.get_account(address)).await? {
        Some(bytes) => R::decode(&bytes).map(Some),
        None => Ok(None),
    }
}

/// Fetch a record that must exist.
pub async fn require_record<R: Record, L: LedgerQuery>(
    ctx: &MarketContext,
    ledger: &L,
    address: &Pubkey,
) -> MarketResult<R> {
    fetch_record::<R, L>(ctx, ledger, address).await?.ok_or_else(|| MarketError::RecordAbsent {
        kind: R::KIND,
        address: mugs_market_core::address::to_base58(address),
    })
}

// ─── Snapshot format ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub accounts: Vec<SnapshotAccount>,
    #[serde(default)]
    pub transactions: Vec<HistoricalTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotAccount {
    #[serde(with = "serde_base58")]
    pub address: Pubkey,
    #[serde(with = "serde_base58")]
    pub owner: Pubkey,
    #[serde(default)]
    pub lamports: u64,
    /// Hex-encoded account data.
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAccount {
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: BTreeMap<Pubkey, StoredAccount>,
    transactions: BTreeMap<String, HistoricalTransaction>,
    by_address: BTreeMap<Pubkey, Vec<String>>,
    submitted: Vec<PreparedTransaction>,
}

impl MemoryState {
    fn index_transaction(&mut self, tx: HistoricalTransaction) {
        for ix in &tx.instructions {
            for key in &ix.accounts {
                let sigs = self.by_address.entry(*key).or_default();
                if !sigs.contains(&tx.signature) {
                    sigs.insert(0, tx.signature.clone());
                }
            }
        }
        self.transactions.insert(tx.signature.clone(), tx);
    }
}

/// In-memory ledger.
///
/// Submitting a transaction records it and materializes any record-init
/// instructions it contains, so a lazily initialized record is visible
/// to the next probe. No other program logic runs.
#[derive(Debug)]
pub struct MemoryLedger {
    program_id: Pubkey,
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id, state: Mutex::new(MemoryState::default()) }
    }

    pub fn from_snapshot(program_id: Pubkey, snapshot: LedgerSnapshot) -> MarketResult<Self> {
        let mut state = MemoryState::default();
        for account in snapshot.accounts {
            let data = hex_decode(&account.data)
                .map_err(|e| MarketError::invalid_argument("snapshot account data", e))?;
            state.accounts.insert(
                account.address,
                StoredAccount { owner: account.owner, lamports: account.lamports, data },
            );
        }
        for tx in snapshot.transactions {
            state.index_transaction(tx);
        }
        Ok(Self { program_id, state: Mutex::new(state) })
    }

    pub fn from_json(program_id: Pubkey, json: &str) -> MarketResult<Self> {
        let snapshot: LedgerSnapshot = serde_json::from_str(json)
            .map_err(|e| MarketError::invalid_argument("snapshot", e.to_string()))?;
        Self::from_snapshot(program_id, snapshot)
    }

    pub async fn insert_account(&self, address: Pubkey, owner: Pubkey, lamports: u64, data: Vec<u8>) {
        self.state.lock().await.accounts.insert(address, StoredAccount { owner, lamports, data });
    }

    /// Store a program-owned record at `address`.
    pub async fn insert_record<R: Record>(&self, address: Pubkey, record: &R) {
        self.insert_account(address, self.program_id, 0, record.encode()).await;
    }

    pub async fn insert_transaction(&self, tx: HistoricalTransaction) {
        self.state.lock().await.index_transaction(tx);
    }

    /// Transactions accepted so far, in submission order.
    pub async fn submitted(&self) -> Vec<PreparedTransaction> {
        self.state.lock().await.submitted.clone()
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock().await;
        LedgerSnapshot {
            accounts: state
                .accounts
                .iter()
                .map(|(address, acc)| SnapshotAccount {
                    address: *address,
                    owner: acc.owner,
                    lamports: acc.lamports,
                    data: hex_encode(&acc.data),
                })
                .collect(),
            transactions: state.transactions.values().cloned().collect(),
        }
    }

    /// Default-valued record created by an init instruction, if `data` is one.
    fn init_effect(&self, accounts: &[Pubkey], data: &[u8]) -> Option<(Pubkey, Vec<u8>)> {
        let opcode = data.get(..8)?;
        let ix = MarketInstruction::ALL.iter().find(|ix| ix.discriminator() == opcode)?;
        let payer = *accounts.first()?;
        let target = *accounts.get(1)?;
        let nft = data.get(8..40).and_then(|b| <[u8; 32]>::try_from(b).ok()).map(Pubkey::new_from_array);
        let bytes = match ix {
            MarketInstruction::InitUserPool => {
                UserAccount { address: payer, traded_volume: 0, escrow_sol_balance: 0 }.encode()
            }
            MarketInstruction::InitSellData => Listing {
                mint: nft?,
                seller: Pubkey::default(),
                collection: Pubkey::default(),
                price: 0,
                listed_date: 0,
                active: 0,
            }
            .encode(),
            MarketInstruction::InitOfferData => Offer {
                mint: nft?,
                buyer: payer,
                offer_price: 0,
                offer_listing_date: 0,
                active: 0,
            }
            .encode(),
            MarketInstruction::InitAuctionData => Auction {
                mint: nft?,
                creator: Pubkey::default(),
                start_price: 0,
                min_increase: 0,
                start_date: 0,
                last_bid_date: 0,
                last_bidder: Pubkey::default(),
                highest_bid: 0,
                duration: 0,
                status: 0,
            }
            .encode(),
            _ => return None,
        };
        Some((target, bytes))
    }
}

impl LedgerQuery for MemoryLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, QueryError> {
        Ok(self.state.lock().await.accounts.get(address).map(|a| a.data.clone()))
    }

    async fn scan_program_accounts(
        &self,
        owner: &Pubkey,
        data_size: usize,
        filter: Option<&MemcmpFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, QueryError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .iter()
            .filter(|(_, a)| &a.owner == owner && a.data.len() == data_size)
            .filter(|(_, a)| filter.map(|f| f.matches(&a.data)).unwrap_or(true))
            .map(|(k, a)| (*k, a.data.clone()))
            .collect())
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, QueryError> {
        Ok(self.state.lock().await.accounts.get(address).map(|a| a.lamports).unwrap_or(0))
    }

    async fn signatures_for_address(&self, address: &Pubkey) -> Result<Vec<String>, QueryError> {
        Ok(self.state.lock().await.by_address.get(address).cloned().unwrap_or_default())
    }

    async fn get_transaction(&self, signature: &str) -> Result<Option<HistoricalTransaction>, QueryError> {
        Ok(self.state.lock().await.transactions.get(signature).cloned())
    }

    async fn submit_transaction(&self, tx: &PreparedTransaction) -> Result<String, QueryError> {
        let mut state = self.state.lock().await;
        let mut created = Vec::new();
        for ix in tx.instructions.iter().filter(|ix| ix.program_id == self.program_id) {
            let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
            if let Some((target, bytes)) = self.init_effect(&keys, &ix.data) {
                if state.accounts.contains_key(&target) || created.iter().any(|(t, _)| *t == target) {
                    return Err(QueryError::AlreadyInitialized {
                        address: mugs_market_core::address::to_base58(&target),
                    });
                }
                created.push((target, bytes));
            }
        }
        for (target, data) in created {
            state.accounts.insert(target, StoredAccount { owner: self.program_id, lamports: 0, data });
        }
        state.submitted.push(tx.clone());
        Ok(format!("memory-{}", state.submitted.len()))
    }

    async fn confirm_transaction(&self, signature: &str, _commitment: Commitment) -> Result<(), QueryError> {
        let state = self.state.lock().await;
        let known = signature
            .strip_prefix("memory-")
            .and_then(|n| n.parse::<usize>().ok())
            .map(|n| n >= 1 && n <= state.submitted.len())
            .unwrap_or(false);
        if known {
            Ok(())
        } else {
            Err(QueryError::transport(format!("unknown signature {}", signature)))
        }
    }
}

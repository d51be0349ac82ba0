//! Transaction preparation and submission.
//!
//! Wraps the assembler with lazy record initialization: per-user and
//! per-mint records an operation depends on are created in the same
//! transaction when the ledger does not have them yet.

use mugs_market_core::address::to_base58;
use mugs_market_core::error::{MarketError, MarketResult};
use mugs_market_core::instruction::{init_auction_data, init_offer_data, init_sell_data, init_user_pool};
use mugs_market_core::pda::{find_auction, find_listing, find_offer, find_user_account};
use mugs_market_core::types::PreparedTransaction;
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;

use crate::assembler::{Assembler, MarketOperation};
use crate::config::MarketContext;
use crate::ledger::{with_timeout, LedgerQuery, QueryError};
use crate::metadata::CreatorSource;

/// A record some operations create on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyRecord {
    /// The payer's user account.
    UserAccount,
    Listing,
    Auction,
    /// The payer's offer slot for the mint.
    Offer,
}

/// Records `op` needs to exist before its primary instruction runs.
pub fn lazy_records(op: &MarketOperation) -> &'static [LazyRecord] {
    use LazyRecord::*;
    match op {
        MarketOperation::Deposit { .. }
        | MarketOperation::Withdraw { .. }
        | MarketOperation::Purchase { .. }
        | MarketOperation::CancelOffer { .. }
        | MarketOperation::AcceptOffer { .. }
        | MarketOperation::PlaceBid { .. }
        | MarketOperation::ClaimAuction { .. } => &[UserAccount],
        MarketOperation::List { .. } | MarketOperation::CreateAuction { .. } => &[UserAccount, Listing, Auction],
        MarketOperation::MakeOffer { .. } => &[UserAccount, Offer],
        _ => &[],
    }
}

/// Outcome of a submitted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub signature: String,
    pub transaction: PreparedTransaction,
    /// Whether the first attempt lost an initialization race and was rebuilt.
    pub retried: bool,
}

pub struct Orchestrator<'a, L, C> {
    ctx: &'a MarketContext,
    ledger: &'a L,
    assembler: Assembler<'a, L, C>,
}

impl<'a, L: LedgerQuery, C: CreatorSource> Orchestrator<'a, L, C> {
    pub fn new(ctx: &'a MarketContext, ledger: &'a L, creators: &'a C) -> Self {
        Self { ctx, ledger, assembler: Assembler::new(ctx, ledger, creators) }
    }

    pub fn assembler(&self) -> &Assembler<'a, L, C> {
        &self.assembler
    }

    async fn exists(&self, address: &Pubkey) -> MarketResult<bool> {
        Ok(with_timeout(self.ctx, "get_account", self.ledger.get_account(address)).await?.is_some())
    }

    /// Init instruction for `record`, or `None` if it already exists.
    async fn ensure_record(
        &self,
        record: LazyRecord,
        payer: &Pubkey,
        mint: Option<&Pubkey>,
    ) -> MarketResult<Option<Instruction>> {
        let pid = &self.ctx.program_id;
        let need_mint = || mint.ok_or_else(|| MarketError::invalid_argument("mint", "required for this record"));
        let (address, init) = match record {
            LazyRecord::UserAccount => (find_user_account(pid, payer)?.0, init_user_pool(pid, payer)?),
            LazyRecord::Listing => {
                let mint = need_mint()?;
                (find_listing(pid, mint)?.0, init_sell_data(pid, payer, mint)?)
            }
            LazyRecord::Auction => {
                let mint = need_mint()?;
                (find_auction(pid, mint)?.0, init_auction_data(pid, payer, mint)?)
            }
            LazyRecord::Offer => {
                let mint = need_mint()?;
                (find_offer(pid, mint, payer)?.0, init_offer_data(pid, payer, mint)?)
            }
        };
        if self.exists(&address).await? {
            return Ok(None);
        }
        if self.ctx.verbose {
            println!("  ℹ️  {:?} {} missing, adding init", record, to_base58(&address));
        }
        Ok(Some(init))
    }

    /// Assemble `op` with any missing records initialized first.
    pub async fn prepare(&self, payer: &Pubkey, op: &MarketOperation) -> MarketResult<PreparedTransaction> {
        let mut set = self.assembler.assemble(payer, op).await?;
        let mint = op.mint();
        let mut inits = Vec::new();
        for record in lazy_records(op) {
            if let Some(init) = self.ensure_record(*record, payer, mint.as_ref()).await? {
                inits.push(init);
            }
        }
        for init in inits.into_iter().rev() {
            set.prepend(init);
        }
        Ok(PreparedTransaction::new(*payer, set))
    }

    /// Prepare, submit and confirm `op`.
    ///
    /// If submission reports that a record was initialized concurrently,
    /// the transaction is rebuilt once against the new ledger state.
    pub async fn submit(&self, payer: &Pubkey, op: &MarketOperation) -> MarketResult<SubmittedTransaction> {
        if self.ctx.verbose {
            println!("📤 Submitting {}...", op.name());
        }
        let transaction = self.prepare(payer, op).await?;
        let (signature, transaction, retried) = match self.ledger_submit(&transaction).await? {
            Ok(signature) => (signature, transaction, false),
            Err(QueryError::AlreadyInitialized { address }) => {
                if self.ctx.verbose {
                    eprintln!("⚠️  {} was initialized concurrently, rebuilding", address);
                }
                let rebuilt = self.prepare(payer, op).await?;
                let signature = self.ledger_submit(&rebuilt).await?.map_err(MarketError::from)?;
                (signature, rebuilt, true)
            }
            Err(e) => return Err(e.into()),
        };

        with_timeout(
            self.ctx,
            "confirm_transaction",
            self.ledger.confirm_transaction(&signature, self.ctx.commitment),
        )
        .await?;
        if self.ctx.verbose {
            println!("✅ {} confirmed: {}", op.name(), signature);
        }
        Ok(SubmittedTransaction { signature, transaction, retried })
    }

    /// Submit under the timeout, keeping the ledger's own error for inspection.
    async fn ledger_submit(&self, tx: &PreparedTransaction) -> MarketResult<Result<String, QueryError>> {
        tokio::time::timeout(self.ctx.timeout, self.ledger.submit_transaction(tx))
            .await
            .map_err(|_| MarketError::Timeout { operation: "submit_transaction".to_string() })
    }
}

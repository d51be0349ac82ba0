//! Ledger-aware instruction assembly.
//!
//! Resolves everything a marketplace operation needs beyond its
//! arguments (asset location, counterparties, royalty recipients,
//! missing associated accounts) and hands the result to the pure
//! builders in `mugs_market_core::instruction`.

use mugs_market_core::address::to_base58;
use mugs_market_core::error::{MarketError, MarketResult};
use mugs_market_core::instruction::{
    self as ix, AcceptOfferAccounts, AuctionTerms, ClaimAuctionAccounts, PurchaseAccounts,
};
use mugs_market_core::pda::{find_associated_token_account, find_auction, find_global_authority, find_listing};
use mugs_market_core::state::{Auction, GlobalConfig, Listing, Record};
use mugs_market_core::token::{create_associated_token_account_idempotent, TokenAccount};
use mugs_market_core::types::InstructionSet;
use mugs_market_core::validation::verify_owner;
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;

use crate::config::MarketContext;
use crate::ledger::{fetch_record, require_record, with_timeout, LedgerQuery};
use crate::metadata::CreatorSource;

/// One user-level marketplace action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketOperation {
    Initialize,
    UpdateFee { sol_fee: u64 },
    AddTreasury { address: Pubkey, rate: u64 },
    RemoveTreasury { address: Pubkey },
    InitUser,
    InitListing { mint: Pubkey },
    List { mint: Pubkey, price: u64 },
    Delist { mint: Pubkey },
    SetPrice { mint: Pubkey, price: u64 },
    Transfer { mint: Pubkey, recipient: Pubkey },
    Purchase { mint: Pubkey },
    Deposit { amount: u64 },
    Withdraw { amount: u64 },
    InitOffer { mint: Pubkey },
    MakeOffer { mint: Pubkey, price: u64 },
    CancelOffer { mint: Pubkey },
    AcceptOffer { mint: Pubkey, buyer: Pubkey },
    InitAuction { mint: Pubkey },
    CreateAuction { mint: Pubkey, terms: AuctionTerms },
    PlaceBid { mint: Pubkey, price: u64 },
    ClaimAuction { mint: Pubkey },
    UpdateReserve { mint: Pubkey, price: u64 },
    CancelAuction { mint: Pubkey },
}

impl MarketOperation {
    pub fn name(&self) -> &'static str {
        match self {
            MarketOperation::Initialize => "initialize",
            MarketOperation::UpdateFee { .. } => "update-fee",
            MarketOperation::AddTreasury { .. } => "add-treasury",
            MarketOperation::RemoveTreasury { .. } => "remove-treasury",
            MarketOperation::InitUser => "init-user",
            MarketOperation::InitListing { .. } => "init-listing",
            MarketOperation::List { .. } => "list",
            MarketOperation::Delist { .. } => "delist",
            MarketOperation::SetPrice { .. } => "set-price",
            MarketOperation::Transfer { .. } => "transfer",
            MarketOperation::Purchase { .. } => "purchase",
            MarketOperation::Deposit { .. } => "deposit",
            MarketOperation::Withdraw { .. } => "withdraw",
            MarketOperation::InitOffer { .. } => "init-offer",
            MarketOperation::MakeOffer { .. } => "make-offer",
            MarketOperation::CancelOffer { .. } => "cancel-offer",
            MarketOperation::AcceptOffer { .. } => "accept-offer",
            MarketOperation::InitAuction { .. } => "init-auction",
            MarketOperation::CreateAuction { .. } => "create-auction",
            MarketOperation::PlaceBid { .. } => "place-bid",
            MarketOperation::ClaimAuction { .. } => "claim-auction",
            MarketOperation::UpdateReserve { .. } => "update-reserve",
            MarketOperation::CancelAuction { .. } => "cancel-auction",
        }
    }

    /// The mint this operation targets, if any.
    pub fn mint(&self) -> Option<Pubkey> {
        match self {
            MarketOperation::InitListing { mint }
            | MarketOperation::List { mint, .. }
            | MarketOperation::Delist { mint }
            | MarketOperation::SetPrice { mint, .. }
            | MarketOperation::Transfer { mint, .. }
            | MarketOperation::Purchase { mint }
            | MarketOperation::InitOffer { mint }
            | MarketOperation::MakeOffer { mint, .. }
            | MarketOperation::CancelOffer { mint }
            | MarketOperation::AcceptOffer { mint, .. }
            | MarketOperation::InitAuction { mint }
            | MarketOperation::CreateAuction { mint, .. }
            | MarketOperation::PlaceBid { mint, .. }
            | MarketOperation::ClaimAuction { mint }
            | MarketOperation::UpdateReserve { mint, .. }
            | MarketOperation::CancelAuction { mint } => Some(*mint),
            _ => None,
        }
    }
}

/// Where a user's asset currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLocation {
    /// In the user's associated token account.
    Wallet(Pubkey),
    /// In the marketplace vault, deposited by the user.
    Vault(Pubkey),
}

impl AssetLocation {
    pub fn token_account(&self) -> Pubkey {
        match self {
            AssetLocation::Wallet(account) | AssetLocation::Vault(account) => *account,
        }
    }
}

pub struct Assembler<'a, L, C> {
    ctx: &'a MarketContext,
    ledger: &'a L,
    creators: &'a C,
}

impl<'a, L: LedgerQuery, C: CreatorSource> Assembler<'a, L, C> {
    pub fn new(ctx: &'a MarketContext, ledger: &'a L, creators: &'a C) -> Self {
        Self { ctx, ledger, creators }
    }

    pub fn context(&self) -> &MarketContext {
        self.ctx
    }

    async fn token_account(&self, address: &Pubkey) -> MarketResult<Option<TokenAccount>> {
        match with_timeout(self.ctx, "get_token_account", self.ledger.get_account(address)).await? {
            Some(bytes) => TokenAccount::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Parties that deposited `mint` into the vault: live listing seller and live auction creator.
    async fn vault_depositors(&self, mint: &Pubkey) -> MarketResult<Vec<Pubkey>> {
        let pid = &self.ctx.program_id;
        let mut out = Vec::new();
        let (listing, _) = find_listing(pid, mint)?;
        if let Some(l) = fetch_record::<Listing, L>(self.ctx, self.ledger, &listing).await? {
            if l.is_live() {
                out.push(l.seller);
            }
        }
        let (auction, _) = find_auction(pid, mint)?;
        if let Some(a) = fetch_record::<Auction, L>(self.ctx, self.ledger, &auction).await? {
            if a.is_live() {
                out.push(a.creator);
            }
        }
        Ok(out)
    }

    /// Find `owner`'s copy of `mint`: wallet first, then the vault.
    pub async fn locate_asset(&self, owner: &Pubkey, mint: &Pubkey) -> MarketResult<AssetLocation> {
        let (wallet, _) = find_associated_token_account(owner, mint)?;
        if let Some(token) = self.token_account(&wallet).await? {
            if token.holds(mint) {
                verify_owner(&token.owner, owner, mint)?;
                return Ok(AssetLocation::Wallet(wallet));
            }
        }

        let vault = ix::vault_token_account(&self.ctx.program_id, mint)?;
        if let Some(token) = self.token_account(&vault).await? {
            if token.holds(mint) && self.vault_depositors(mint).await?.contains(owner) {
                return Ok(AssetLocation::Vault(vault));
            }
        }

        Err(MarketError::AssetNotOwned { mint: to_base58(mint), owner: to_base58(owner) })
    }

    /// `owner`'s associated account for `mint`, plus a create instruction if it is missing.
    pub async fn ensure_associated_account(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> MarketResult<(Pubkey, Option<Instruction>)> {
        let (address, _) = find_associated_token_account(owner, mint)?;
        if with_timeout(self.ctx, "get_account", self.ledger.get_account(&address)).await?.is_some() {
            return Ok((address, None));
        }
        if self.ctx.verbose {
            println!("  ℹ️  Creating associated account {} for {}", address, owner);
        }
        let (create, _) = create_associated_token_account_idempotent(payer, owner, mint)?;
        Ok((address, Some(create)))
    }

    /// Treasury recipients in slot order, then the asset's creators.
    pub async fn remaining_accounts(&self, mint: &Pubkey) -> MarketResult<Vec<Pubkey>> {
        let (global, _) = find_global_authority(&self.ctx.program_id)?;
        let config = require_record::<GlobalConfig, L>(self.ctx, self.ledger, &global).await?;
        let mut out = config.treasury.addresses();
        out.extend(self.creators.creators(mint).await?);
        Ok(out)
    }

    /// Build the instruction set for `op`, excluding lazy record initialization.
    pub async fn assemble(&self, payer: &Pubkey, op: &MarketOperation) -> MarketResult<InstructionSet> {
        let pid = &self.ctx.program_id;
        let set = match op {
            MarketOperation::Initialize => InstructionSet::primary_only(ix::initialize(pid, payer)?),
            MarketOperation::UpdateFee { sol_fee } => InstructionSet::primary_only(ix::update_fee(pid, payer, *sol_fee)?),
            MarketOperation::AddTreasury { address, rate } => {
                InstructionSet::primary_only(ix::add_team_treasury(pid, payer, address, *rate)?)
            }
            MarketOperation::RemoveTreasury { address } => {
                InstructionSet::primary_only(ix::remove_team_treasury(pid, payer, address)?)
            }
            MarketOperation::InitUser => InstructionSet::primary_only(ix::init_user_pool(pid, payer)?),
            MarketOperation::InitListing { mint } => InstructionSet::primary_only(ix::init_sell_data(pid, payer, mint)?),
            MarketOperation::InitOffer { mint } => InstructionSet::primary_only(ix::init_offer_data(pid, payer, mint)?),
            MarketOperation::InitAuction { mint } => {
                InstructionSet::primary_only(ix::init_auction_data(pid, payer, mint)?)
            }

            MarketOperation::List { mint, price } => {
                let source = self.deposit_source(payer, mint).await?;
                let setup = self.vault_setup(payer, mint).await?;
                InstructionSet::with_setup(setup, ix::list_nft_for_sale(pid, payer, mint, &source, *price)?)
            }
            MarketOperation::Delist { mint } => {
                self.locate_asset(payer, mint).await?;
                let (destination, create) = self.ensure_associated_account(payer, payer, mint).await?;
                with_optional(create, ix::delist_nft(pid, payer, mint, &destination)?)
            }
            MarketOperation::SetPrice { mint, price } => InstructionSet::primary_only(ix::set_price(pid, payer, mint, *price)?),
            MarketOperation::Transfer { mint, recipient } => {
                let location = self.locate_asset(payer, mint).await?;
                let (destination, create) = self.ensure_associated_account(payer, recipient, mint).await?;
                let (listing, _) = find_listing(pid, mint)?;
                let listed = fetch_record::<Listing, L>(self.ctx, self.ledger, &listing)
                    .await?
                    .map(|l| l.is_live())
                    .unwrap_or(false);
                let primary = if listed {
                    ix::transfer_from_vault(pid, payer, mint, recipient, &destination)?
                } else {
                    ix::transfer(pid, payer, mint, &location.token_account(), recipient, &destination)?
                };
                with_optional(create, primary)
            }
            MarketOperation::Purchase { mint } => {
                let (listing_address, _) = find_listing(pid, mint)?;
                let listing = require_record::<Listing, L>(self.ctx, self.ledger, &listing_address).await?;
                self.locate_asset(&listing.seller, mint).await?;
                let (buyer_token_account, create) = self.ensure_associated_account(payer, payer, mint).await?;
                let remaining = self.remaining_accounts(mint).await?;
                let parties = PurchaseAccounts { buyer: *payer, seller: listing.seller, mint: *mint, buyer_token_account };
                with_optional(create, ix::purchase(pid, &parties, &remaining)?)
            }
            MarketOperation::Deposit { amount } => InstructionSet::primary_only(ix::deposit_to_escrow(pid, payer, *amount)?),
            MarketOperation::Withdraw { amount } => {
                InstructionSet::primary_only(ix::withdraw_from_escrow(pid, payer, *amount)?)
            }

            MarketOperation::MakeOffer { mint, price } => InstructionSet::primary_only(ix::make_offer(pid, payer, mint, *price)?),
            MarketOperation::CancelOffer { mint } => InstructionSet::primary_only(ix::cancel_offer(pid, payer, mint)?),
            MarketOperation::AcceptOffer { mint, buyer } => {
                self.locate_asset(payer, mint).await?;
                let (buyer_token_account, create) = self.ensure_associated_account(payer, buyer, mint).await?;
                let remaining = self.remaining_accounts(mint).await?;
                let parties = AcceptOfferAccounts { seller: *payer, buyer: *buyer, mint: *mint, buyer_token_account };
                with_optional(create, ix::accept_offer(pid, &parties, &remaining)?)
            }

            MarketOperation::CreateAuction { mint, terms } => {
                let source = self.deposit_source(payer, mint).await?;
                let setup = self.vault_setup(payer, mint).await?;
                InstructionSet::with_setup(setup, ix::create_auction(pid, payer, mint, &source, terms)?)
            }
            MarketOperation::PlaceBid { mint, price } => {
                let (auction_address, _) = find_auction(pid, mint)?;
                let auction = require_record::<Auction, L>(self.ctx, self.ledger, &auction_address).await?;
                let out_bidder = if auction.has_bid() { auction.last_bidder } else { *payer };
                InstructionSet::primary_only(ix::place_bid(pid, payer, mint, &out_bidder, *price)?)
            }
            MarketOperation::ClaimAuction { mint } => {
                let (auction_address, _) = find_auction(pid, mint)?;
                let auction = require_record::<Auction, L>(self.ctx, self.ledger, &auction_address).await?;
                self.locate_asset(&auction.creator, mint).await?;
                let (bidder_token_account, create) = self.ensure_associated_account(payer, payer, mint).await?;
                let remaining = self.remaining_accounts(mint).await?;
                let parties =
                    ClaimAuctionAccounts { bidder: *payer, creator: auction.creator, mint: *mint, bidder_token_account };
                with_optional(create, ix::claim_auction(pid, &parties, &remaining)?)
            }
            MarketOperation::UpdateReserve { mint, price } => {
                InstructionSet::primary_only(ix::update_reserve(pid, payer, mint, *price)?)
            }
            MarketOperation::CancelAuction { mint } => {
                self.locate_asset(payer, mint).await?;
                let (destination, create) = self.ensure_associated_account(payer, payer, mint).await?;
                with_optional(create, ix::cancel_auction(pid, payer, mint, &destination)?)
            }
        };
        Ok(set)
    }

    /// Token account the asset is deposited from. A vault-held asset
    /// (already listed or reserved) still names the owner's own account.
    async fn deposit_source(&self, owner: &Pubkey, mint: &Pubkey) -> MarketResult<Pubkey> {
        match self.locate_asset(owner, mint).await? {
            AssetLocation::Wallet(account) => Ok(account),
            AssetLocation::Vault(_) => Ok(find_associated_token_account(owner, mint)?.0),
        }
    }

    async fn vault_setup(&self, payer: &Pubkey, mint: &Pubkey) -> MarketResult<Vec<Instruction>> {
        let (global, _) = find_global_authority(&self.ctx.program_id)?;
        let (_, create) = self.ensure_associated_account(payer, &global, mint).await?;
        Ok(create.into_iter().collect())
    }
}

fn with_optional(setup: Option<Instruction>, primary: Instruction) -> InstructionSet {
    InstructionSet::with_setup(setup.into_iter().collect(), primary)
}

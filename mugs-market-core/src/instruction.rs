//! Wire builders for every marketplace instruction.
//!
//! Builders are pure: they derive the program-owned addresses they need
//! and take everything that requires a ledger lookup (token accounts,
//! sellers, remaining accounts) as parameters.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;

use crate::error::{MarketError, MarketResult};
use crate::pda::{
    find_associated_token_account, find_auction, find_escrow_vault, find_global_authority,
    find_listing, find_metadata, find_offer, find_user_account, METADATA_PROGRAM_ID,
    RENT_SYSVAR_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};

/// Every instruction the marketplace program accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketInstruction {
    Initialize,
    UpdateFee,
    AddTeamTreasury,
    RemoveTeamTreasury,
    InitUserPool,
    InitSellData,
    ListNftForSale,
    DelistNft,
    SetPrice,
    Transfer,
    TransferFromVault,
    Purchase,
    DepositToEscrow,
    WithdrawFromEscrow,
    InitOfferData,
    MakeOffer,
    CancelOffer,
    AcceptOffer,
    InitAuctionData,
    CreateAuction,
    PlaceBid,
    ClaimAuction,
    UpdateReserve,
    CancelAuction,
}

impl MarketInstruction {
    pub const ALL: [MarketInstruction; 24] = [
        MarketInstruction::Initialize,
        MarketInstruction::UpdateFee,
        MarketInstruction::AddTeamTreasury,
        MarketInstruction::RemoveTeamTreasury,
        MarketInstruction::InitUserPool,
        MarketInstruction::InitSellData,
        MarketInstruction::ListNftForSale,
        MarketInstruction::DelistNft,
        MarketInstruction::SetPrice,
        MarketInstruction::Transfer,
        MarketInstruction::TransferFromVault,
        MarketInstruction::Purchase,
        MarketInstruction::DepositToEscrow,
        MarketInstruction::WithdrawFromEscrow,
        MarketInstruction::InitOfferData,
        MarketInstruction::MakeOffer,
        MarketInstruction::CancelOffer,
        MarketInstruction::AcceptOffer,
        MarketInstruction::InitAuctionData,
        MarketInstruction::CreateAuction,
        MarketInstruction::PlaceBid,
        MarketInstruction::ClaimAuction,
        MarketInstruction::UpdateReserve,
        MarketInstruction::CancelAuction,
    ];

    /// Snake-case handler name in the program.
    pub fn name(self) -> &'static str {
        match self {
            MarketInstruction::Initialize => "initialize",
            MarketInstruction::UpdateFee => "update_fee",
            MarketInstruction::AddTeamTreasury => "add_team_treasury",
            MarketInstruction::RemoveTeamTreasury => "remove_team_treasury",
            MarketInstruction::InitUserPool => "init_user_pool",
            MarketInstruction::InitSellData => "init_sell_data",
            MarketInstruction::ListNftForSale => "list_nft_for_sale",
            MarketInstruction::DelistNft => "delist_nft",
            MarketInstruction::SetPrice => "set_price",
            MarketInstruction::Transfer => "transfer",
            MarketInstruction::TransferFromVault => "transfer_from_vault",
            MarketInstruction::Purchase => "purchase",
            MarketInstruction::DepositToEscrow => "deposit_to_escrow",
            MarketInstruction::WithdrawFromEscrow => "withdraw_from_escrow",
            MarketInstruction::InitOfferData => "init_offer_data",
            MarketInstruction::MakeOffer => "make_offer",
            MarketInstruction::CancelOffer => "cancel_offer",
            MarketInstruction::AcceptOffer => "accept_offer",
            MarketInstruction::InitAuctionData => "init_auction_data",
            MarketInstruction::CreateAuction => "create_auction",
            MarketInstruction::PlaceBid => "place_bid",
            MarketInstruction::ClaimAuction => "claim_auction",
            MarketInstruction::UpdateReserve => "update_reserve",
            MarketInstruction::CancelAuction => "cancel_auction",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let snake = name.replace('-', "_");
        Self::ALL.iter().copied().find(|ix| ix.name() == snake)
    }

    /// First eight bytes of `sha256("global:<name>")`.
    pub fn discriminator(self) -> [u8; 8] {
        let hash = Sha256::digest(format!("global:{}", self.name()).as_bytes());
        let mut out = [0u8; 8];
        out.copy_from_slice(&hash[..8]);
        out
    }
}

/// Opcode followed by borsh-encoded arguments.
pub fn build_instruction_data<T: BorshSerialize>(ix: MarketInstruction, args: &T) -> MarketResult<Vec<u8>> {
    let mut data = ix.discriminator().to_vec();
    args.serialize(&mut data).map_err(|e| MarketError::Serialization {
        message: format!("{} args: {}", ix.name(), e),
    })?;
    Ok(data)
}

fn signer(key: Pubkey) -> AccountMeta {
    AccountMeta::new(key, true)
}

fn writable(key: Pubkey) -> AccountMeta {
    AccountMeta::new(key, false)
}

fn readonly(key: Pubkey) -> AccountMeta {
    AccountMeta::new_readonly(key, false)
}

fn assemble<T: BorshSerialize>(
    program_id: &Pubkey,
    ix: MarketInstruction,
    args: &T,
    accounts: Vec<AccountMeta>,
) -> MarketResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: build_instruction_data(ix, args)?,
    })
}

/// Remaining accounts receive lamports, so they are writable.
fn append_remaining(accounts: &mut Vec<AccountMeta>, remaining: &[Pubkey]) {
    accounts.extend(remaining.iter().map(|k| writable(*k)));
}

// ─── Argument layouts ────────────────────────────────────────────

#[derive(BorshSerialize)]
struct InitializeArgs {
    global_bump: u8,
    escrow_bump: u8,
}

#[derive(BorshSerialize)]
struct UpdateFeeArgs {
    global_bump: u8,
    sol_fee: u64,
}

#[derive(BorshSerialize)]
struct AddTeamTreasuryArgs {
    global_bump: u8,
    address: [u8; 32],
    rate: u64,
}

#[derive(BorshSerialize)]
struct RemoveTeamTreasuryArgs {
    global_bump: u8,
    address: [u8; 32],
}

#[derive(BorshSerialize)]
struct BumpArgs {
    bump: u8,
}

#[derive(BorshSerialize)]
struct InitMintRecordArgs {
    nft: [u8; 32],
    bump: u8,
}

#[derive(BorshSerialize)]
struct ListArgs {
    global_bump: u8,
    sell_bump: u8,
    auction_bump: u8,
    price_sol: u64,
}

#[derive(BorshSerialize)]
struct VaultArgs {
    global_bump: u8,
    sell_bump: u8,
}

#[derive(BorshSerialize)]
struct BumpPriceArgs {
    bump: u8,
    price: u64,
}

#[derive(BorshSerialize)]
struct NoArgs {}

#[derive(BorshSerialize)]
struct PurchaseArgs {
    global_bump: u8,
    nft_bump: u8,
    seller_bump: u8,
    buyer_bump: u8,
}

#[derive(BorshSerialize)]
struct EscrowArgs {
    user_bump: u8,
    escrow_bump: u8,
    sol: u64,
}

#[derive(BorshSerialize)]
struct MakeOfferArgs {
    sell_bump: u8,
    offer_bump: u8,
    user_bump: u8,
    escrow_bump: u8,
    price: u64,
}

#[derive(BorshSerialize)]
struct AcceptOfferArgs {
    global_bump: u8,
    nft_bump: u8,
    offer_bump: u8,
    buyer_bump: u8,
    seller_bump: u8,
    escrow_bump: u8,
}

#[derive(BorshSerialize)]
struct CreateAuctionArgs {
    global_bump: u8,
    auction_bump: u8,
    sell_bump: u8,
    start_price: u64,
    min_increase: u64,
    duration: i64,
    reserved: u8,
}

#[derive(BorshSerialize)]
struct PlaceBidArgs {
    auction_bump: u8,
    escrow_bump: u8,
    price: u64,
}

#[derive(BorshSerialize)]
struct ClaimAuctionArgs {
    global_bump: u8,
    auction_bump: u8,
    escrow_bump: u8,
}

#[derive(BorshSerialize)]
struct CancelAuctionArgs {
    global_bump: u8,
    auction_bump: u8,
}

// ─── Admin ───────────────────────────────────────────────────────

pub fn initialize(program_id: &Pubkey, admin: &Pubkey) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (escrow, escrow_bump) = find_escrow_vault(program_id)?;
    assemble(
        program_id,
        MarketInstruction::Initialize,
        &InitializeArgs { global_bump, escrow_bump },
        vec![
            signer(*admin),
            writable(global),
            writable(escrow),
            readonly(SYSTEM_PROGRAM_ID),
            readonly(RENT_SYSVAR_ID),
        ],
    )
}

pub fn update_fee(program_id: &Pubkey, admin: &Pubkey, sol_fee: u64) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    assemble(
        program_id,
        MarketInstruction::UpdateFee,
        &UpdateFeeArgs { global_bump, sol_fee },
        vec![signer(*admin), writable(global)],
    )
}

pub fn add_team_treasury(
    program_id: &Pubkey,
    admin: &Pubkey,
    address: &Pubkey,
    rate: u64,
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    assemble(
        program_id,
        MarketInstruction::AddTeamTreasury,
        &AddTeamTreasuryArgs { global_bump, address: address.to_bytes(), rate },
        vec![signer(*admin), writable(global)],
    )
}

pub fn remove_team_treasury(program_id: &Pubkey, admin: &Pubkey, address: &Pubkey) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    assemble(
        program_id,
        MarketInstruction::RemoveTeamTreasury,
        &RemoveTeamTreasuryArgs { global_bump, address: address.to_bytes() },
        vec![signer(*admin), writable(global)],
    )
}

// ─── Record initialization ───────────────────────────────────────

pub fn init_user_pool(program_id: &Pubkey, owner: &Pubkey) -> MarketResult<Instruction> {
    let (user_pool, bump) = find_user_account(program_id, owner)?;
    assemble(
        program_id,
        MarketInstruction::InitUserPool,
        &BumpArgs { bump },
        vec![
            signer(*owner),
            writable(user_pool),
            readonly(SYSTEM_PROGRAM_ID),
            readonly(RENT_SYSVAR_ID),
        ],
    )
}

fn init_mint_record(
    program_id: &Pubkey,
    ix: MarketInstruction,
    payer: &Pubkey,
    mint: &Pubkey,
    (record, bump): (Pubkey, u8),
) -> MarketResult<Instruction> {
    assemble(
        program_id,
        ix,
        &InitMintRecordArgs { nft: mint.to_bytes(), bump },
        vec![
            signer(*payer),
            writable(record),
            readonly(SYSTEM_PROGRAM_ID),
            readonly(RENT_SYSVAR_ID),
        ],
    )
}

pub fn init_sell_data(program_id: &Pubkey, payer: &Pubkey, mint: &Pubkey) -> MarketResult<Instruction> {
    let listing = find_listing(program_id, mint)?;
    init_mint_record(program_id, MarketInstruction::InitSellData, payer, mint, listing)
}

/// The offer slot is keyed by (mint, payer): the payer is the future buyer.
pub fn init_offer_data(program_id: &Pubkey, payer: &Pubkey, mint: &Pubkey) -> MarketResult<Instruction> {
    let offer = find_offer(program_id, mint, payer)?;
    init_mint_record(program_id, MarketInstruction::InitOfferData, payer, mint, offer)
}

pub fn init_auction_data(program_id: &Pubkey, payer: &Pubkey, mint: &Pubkey) -> MarketResult<Instruction> {
    let auction = find_auction(program_id, mint)?;
    init_mint_record(program_id, MarketInstruction::InitAuctionData, payer, mint, auction)
}

// ─── Listing ─────────────────────────────────────────────────────

/// Vault-held token account for `mint`.
pub fn vault_token_account(program_id: &Pubkey, mint: &Pubkey) -> MarketResult<Pubkey> {
    let (global, _) = find_global_authority(program_id)?;
    Ok(find_associated_token_account(&global, mint)?.0)
}

pub fn list_nft_for_sale(
    program_id: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    user_token_account: &Pubkey,
    price: u64,
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (listing, sell_bump) = find_listing(program_id, mint)?;
    let (auction, auction_bump) = find_auction(program_id, mint)?;
    let (metadata, _) = find_metadata(mint)?;
    let vault = find_associated_token_account(&global, mint)?.0;
    assemble(
        program_id,
        MarketInstruction::ListNftForSale,
        &ListArgs { global_bump, sell_bump, auction_bump, price_sol: price },
        vec![
            signer(*owner),
            writable(global),
            writable(listing),
            writable(*user_token_account),
            writable(vault),
            readonly(*mint),
            writable(metadata),
            readonly(TOKEN_PROGRAM_ID),
            readonly(METADATA_PROGRAM_ID),
            writable(auction),
        ],
    )
}

/// `user_token_account` receives the asset back from the vault.
pub fn delist_nft(
    program_id: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    user_token_account: &Pubkey,
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (listing, sell_bump) = find_listing(program_id, mint)?;
    let (auction, _) = find_auction(program_id, mint)?;
    let vault = find_associated_token_account(&global, mint)?.0;
    assemble(
        program_id,
        MarketInstruction::DelistNft,
        &VaultArgs { global_bump, sell_bump },
        vec![
            signer(*owner),
            writable(global),
            writable(listing),
            writable(*user_token_account),
            writable(vault),
            readonly(*mint),
            readonly(TOKEN_PROGRAM_ID),
            writable(auction),
        ],
    )
}

pub fn set_price(program_id: &Pubkey, owner: &Pubkey, mint: &Pubkey, price: u64) -> MarketResult<Instruction> {
    let (listing, sell_bump) = find_listing(program_id, mint)?;
    assemble(
        program_id,
        MarketInstruction::SetPrice,
        &BumpPriceArgs { bump: sell_bump, price },
        vec![signer(*owner), writable(listing), readonly(*mint)],
    )
}

// ─── Transfers ───────────────────────────────────────────────────

/// Direct wallet-to-wallet move of an unlisted asset.
pub fn transfer(
    program_id: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    user_token_account: &Pubkey,
    recipient: &Pubkey,
    recipient_token_account: &Pubkey,
) -> MarketResult<Instruction> {
    assemble(
        program_id,
        MarketInstruction::Transfer,
        &NoArgs {},
        vec![
            signer(*owner),
            writable(*user_token_account),
            writable(*recipient),
            writable(*recipient_token_account),
            readonly(*mint),
            readonly(TOKEN_PROGRAM_ID),
        ],
    )
}

/// Move a listed asset out of the vault straight to `recipient`.
pub fn transfer_from_vault(
    program_id: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    recipient: &Pubkey,
    recipient_token_account: &Pubkey,
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (listing, sell_bump) = find_listing(program_id, mint)?;
    let (auction, _) = find_auction(program_id, mint)?;
    let vault = find_associated_token_account(&global, mint)?.0;
    assemble(
        program_id,
        MarketInstruction::TransferFromVault,
        &VaultArgs { global_bump, sell_bump },
        vec![
            signer(*owner),
            writable(global),
            writable(listing),
            writable(*recipient),
            writable(*recipient_token_account),
            writable(vault),
            readonly(*mint),
            readonly(TOKEN_PROGRAM_ID),
            writable(auction),
        ],
    )
}

// ─── Sales ───────────────────────────────────────────────────────

/// Parties of a purchase resolved from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseAccounts {
    pub buyer: Pubkey,
    pub seller: Pubkey,
    pub mint: Pubkey,
    pub buyer_token_account: Pubkey,
}

/// `remaining` is the treasury list followed by the asset's creators.
pub fn purchase(
    program_id: &Pubkey,
    parties: &PurchaseAccounts,
    remaining: &[Pubkey],
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (listing, nft_bump) = find_listing(program_id, &parties.mint)?;
    let (buyer_pool, buyer_bump) = find_user_account(program_id, &parties.buyer)?;
    let (seller_pool, seller_bump) = find_user_account(program_id, &parties.seller)?;
    let (auction, _) = find_auction(program_id, &parties.mint)?;
    let (metadata, _) = find_metadata(&parties.mint)?;
    let vault = find_associated_token_account(&global, &parties.mint)?.0;
    let mut accounts = vec![
        signer(parties.buyer),
        writable(global),
        writable(listing),
        writable(buyer_pool),
        writable(parties.buyer_token_account),
        writable(vault),
        writable(parties.seller),
        writable(seller_pool),
        readonly(parties.mint),
        writable(metadata),
        readonly(TOKEN_PROGRAM_ID),
        readonly(SYSTEM_PROGRAM_ID),
        readonly(METADATA_PROGRAM_ID),
        writable(auction),
    ];
    append_remaining(&mut accounts, remaining);
    assemble(
        program_id,
        MarketInstruction::Purchase,
        &PurchaseArgs { global_bump, nft_bump, seller_bump, buyer_bump },
        accounts,
    )
}

// ─── Escrow ──────────────────────────────────────────────────────

fn escrow_move(
    program_id: &Pubkey,
    ix: MarketInstruction,
    owner: &Pubkey,
    sol: u64,
) -> MarketResult<Instruction> {
    let (user_pool, user_bump) = find_user_account(program_id, owner)?;
    let (escrow, escrow_bump) = find_escrow_vault(program_id)?;
    assemble(
        program_id,
        ix,
        &EscrowArgs { user_bump, escrow_bump, sol },
        vec![
            signer(*owner),
            writable(user_pool),
            writable(escrow),
            readonly(SYSTEM_PROGRAM_ID),
        ],
    )
}

pub fn deposit_to_escrow(program_id: &Pubkey, owner: &Pubkey, sol: u64) -> MarketResult<Instruction> {
    escrow_move(program_id, MarketInstruction::DepositToEscrow, owner, sol)
}

pub fn withdraw_from_escrow(program_id: &Pubkey, owner: &Pubkey, sol: u64) -> MarketResult<Instruction> {
    escrow_move(program_id, MarketInstruction::WithdrawFromEscrow, owner, sol)
}

// ─── Offers ──────────────────────────────────────────────────────

pub fn make_offer(program_id: &Pubkey, owner: &Pubkey, mint: &Pubkey, price: u64) -> MarketResult<Instruction> {
    let (listing, sell_bump) = find_listing(program_id, mint)?;
    let (offer, offer_bump) = find_offer(program_id, mint, owner)?;
    let (user_pool, user_bump) = find_user_account(program_id, owner)?;
    let (escrow, escrow_bump) = find_escrow_vault(program_id)?;
    assemble(
        program_id,
        MarketInstruction::MakeOffer,
        &MakeOfferArgs { sell_bump, offer_bump, user_bump, escrow_bump, price },
        vec![
            signer(*owner),
            writable(listing),
            writable(offer),
            readonly(*mint),
            writable(user_pool),
            writable(escrow),
            readonly(SYSTEM_PROGRAM_ID),
        ],
    )
}

pub fn cancel_offer(program_id: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> MarketResult<Instruction> {
    let (offer, offer_bump) = find_offer(program_id, mint, owner)?;
    assemble(
        program_id,
        MarketInstruction::CancelOffer,
        &BumpArgs { bump: offer_bump },
        vec![signer(*owner), writable(offer), readonly(*mint)],
    )
}

/// Parties of an accepted offer resolved from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptOfferAccounts {
    pub seller: Pubkey,
    pub buyer: Pubkey,
    pub mint: Pubkey,
    pub buyer_token_account: Pubkey,
}

pub fn accept_offer(
    program_id: &Pubkey,
    parties: &AcceptOfferAccounts,
    remaining: &[Pubkey],
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (listing, nft_bump) = find_listing(program_id, &parties.mint)?;
    let (offer, offer_bump) = find_offer(program_id, &parties.mint, &parties.buyer)?;
    let (seller_pool, seller_bump) = find_user_account(program_id, &parties.seller)?;
    let (buyer_pool, buyer_bump) = find_user_account(program_id, &parties.buyer)?;
    let (escrow, escrow_bump) = find_escrow_vault(program_id)?;
    let (auction, _) = find_auction(program_id, &parties.mint)?;
    let (metadata, _) = find_metadata(&parties.mint)?;
    let vault = find_associated_token_account(&global, &parties.mint)?.0;
    let mut accounts = vec![
        signer(parties.seller),
        writable(listing),
        writable(parties.buyer),
        writable(offer),
        writable(seller_pool),
        readonly(parties.mint),
        writable(global),
        writable(buyer_pool),
        writable(parties.buyer_token_account),
        writable(vault),
        writable(escrow),
        writable(metadata),
        readonly(TOKEN_PROGRAM_ID),
        readonly(SYSTEM_PROGRAM_ID),
        readonly(METADATA_PROGRAM_ID),
        writable(auction),
    ];
    append_remaining(&mut accounts, remaining);
    assemble(
        program_id,
        MarketInstruction::AcceptOffer,
        &AcceptOfferArgs { global_bump, nft_bump, offer_bump, buyer_bump, seller_bump, escrow_bump },
        accounts,
    )
}

// ─── Auctions ────────────────────────────────────────────────────

/// Terms of a new auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuctionTerms {
    pub start_price: u64,
    pub min_increase: u64,
    /// Seconds.
    pub duration: i64,
    /// Keep the existing listing alongside the auction.
    pub reserved: bool,
}

pub fn create_auction(
    program_id: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    user_token_account: &Pubkey,
    terms: &AuctionTerms,
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (auction, auction_bump) = find_auction(program_id, mint)?;
    let (listing, sell_bump) = find_listing(program_id, mint)?;
    let vault = find_associated_token_account(&global, mint)?.0;
    assemble(
        program_id,
        MarketInstruction::CreateAuction,
        &CreateAuctionArgs {
            global_bump,
            auction_bump,
            sell_bump,
            start_price: terms.start_price,
            min_increase: terms.min_increase,
            duration: terms.duration,
            reserved: u8::from(terms.reserved),
        },
        vec![
            signer(*owner),
            writable(global),
            writable(auction),
            writable(*user_token_account),
            writable(vault),
            readonly(*mint),
            readonly(TOKEN_PROGRAM_ID),
            writable(listing),
        ],
    )
}

/// `out_bidder` is refunded by the program; pass the bidder when there is no prior bid.
pub fn place_bid(
    program_id: &Pubkey,
    bidder: &Pubkey,
    mint: &Pubkey,
    out_bidder: &Pubkey,
    price: u64,
) -> MarketResult<Instruction> {
    let (auction, auction_bump) = find_auction(program_id, mint)?;
    let (escrow, escrow_bump) = find_escrow_vault(program_id)?;
    let (listing, _) = find_listing(program_id, mint)?;
    assemble(
        program_id,
        MarketInstruction::PlaceBid,
        &PlaceBidArgs { auction_bump, escrow_bump, price },
        vec![
            signer(*bidder),
            writable(auction),
            readonly(*mint),
            writable(escrow),
            writable(*out_bidder),
            readonly(SYSTEM_PROGRAM_ID),
            writable(listing),
        ],
    )
}

/// Parties of an auction claim resolved from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimAuctionAccounts {
    pub bidder: Pubkey,
    pub creator: Pubkey,
    pub mint: Pubkey,
    pub bidder_token_account: Pubkey,
}

pub fn claim_auction(
    program_id: &Pubkey,
    parties: &ClaimAuctionAccounts,
    remaining: &[Pubkey],
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (auction, auction_bump) = find_auction(program_id, &parties.mint)?;
    let (escrow, escrow_bump) = find_escrow_vault(program_id)?;
    let (bidder_pool, _) = find_user_account(program_id, &parties.bidder)?;
    let (creator_pool, _) = find_user_account(program_id, &parties.creator)?;
    let (metadata, _) = find_metadata(&parties.mint)?;
    let vault = find_associated_token_account(&global, &parties.mint)?.0;
    let mut accounts = vec![
        signer(parties.bidder),
        writable(global),
        writable(auction),
        writable(parties.bidder_token_account),
        writable(vault),
        readonly(parties.mint),
        writable(escrow),
        writable(bidder_pool),
        writable(parties.creator),
        writable(creator_pool),
        writable(metadata),
        readonly(TOKEN_PROGRAM_ID),
        readonly(SYSTEM_PROGRAM_ID),
        readonly(METADATA_PROGRAM_ID),
    ];
    append_remaining(&mut accounts, remaining);
    assemble(
        program_id,
        MarketInstruction::ClaimAuction,
        &ClaimAuctionArgs { global_bump, auction_bump, escrow_bump },
        accounts,
    )
}

pub fn update_reserve(program_id: &Pubkey, creator: &Pubkey, mint: &Pubkey, price: u64) -> MarketResult<Instruction> {
    let (auction, auction_bump) = find_auction(program_id, mint)?;
    assemble(
        program_id,
        MarketInstruction::UpdateReserve,
        &BumpPriceArgs { bump: auction_bump, price },
        vec![signer(*creator), writable(auction), readonly(*mint)],
    )
}

/// `creator_token_account` receives the asset back from the vault.
pub fn cancel_auction(
    program_id: &Pubkey,
    creator: &Pubkey,
    mint: &Pubkey,
    creator_token_account: &Pubkey,
) -> MarketResult<Instruction> {
    let (global, global_bump) = find_global_authority(program_id)?;
    let (auction, auction_bump) = find_auction(program_id, mint)?;
    let (listing, _) = find_listing(program_id, mint)?;
    let vault = find_associated_token_account(&global, mint)?.0;
    assemble(
        program_id,
        MarketInstruction::CancelAuction,
        &CancelAuctionArgs { global_bump, auction_bump },
        vec![
            signer(*creator),
            writable(global),
            writable(auction),
            writable(*creator_token_account),
            writable(vault),
            readonly(*mint),
            readonly(TOKEN_PROGRAM_ID),
            writable(listing),
        ],
    )
}

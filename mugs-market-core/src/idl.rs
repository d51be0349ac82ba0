//! Serializable catalog of the marketplace program's interface.
//!
//! The catalog mirrors what the instruction builders emit: account order,
//! signer and writable flags, argument names and types. The CLI prints it
//! with `mugs-cli idl`.

use serde::{Deserialize, Serialize};

use crate::instruction::MarketInstruction;
use crate::program_errors::PROGRAM_ERRORS;
use crate::state::{Auction, GlobalConfig, Listing, Offer, Record, UserAccount};

/// Top-level interface description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketIdl {
    pub version: String,
    pub name: String,
    pub instructions: Vec<IdlInstruction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<IdlAccountType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IdlError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    /// Hex-encoded 8-byte opcode.
    pub discriminator: String,
    pub accounts: Vec<IdlAccountItem>,
    pub args: Vec<IdlArg>,
    /// Whether the instruction takes a trailing remaining-accounts list.
    #[serde(default, skip_serializing_if = "is_false")]
    pub remaining_accounts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccountItem {
    pub name: String,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub signer: bool,
}

fn is_false(v: &bool) -> bool {
    !v
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlArg {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
}

impl IdlArg {
    /// Encoded width of the argument in bytes.
    pub fn width(&self) -> usize {
        arg_width(&self.type_)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccountType {
    pub name: String,
    pub size: usize,
    pub discriminator: Vec<u8>,
    pub fields: Vec<IdlField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlError {
    pub code: u32,
    pub name: String,
    pub msg: String,
}

/// (name, writable, signer)
type AccountRow = (&'static str, bool, bool);
/// (name, type)
type ArgRow = (&'static str, &'static str);

struct InstructionShape {
    ix: MarketInstruction,
    accounts: &'static [AccountRow],
    args: &'static [ArgRow],
    remaining: bool,
}

const fn shape(
    ix: MarketInstruction,
    accounts: &'static [AccountRow],
    args: &'static [ArgRow],
    remaining: bool,
) -> InstructionShape {
    InstructionShape { ix, accounts, args, remaining }
}

const INIT_RECORD_ACCOUNTS: &[AccountRow] = &[
    ("payer", true, true),
    ("record", true, false),
    ("system_program", false, false),
    ("rent", false, false),
];

const ADMIN_ACCOUNTS: &[AccountRow] = &[("admin", true, true), ("global_authority", true, false)];

const ESCROW_ACCOUNTS: &[AccountRow] = &[
    ("owner", true, true),
    ("user_pool", true, false),
    ("escrow_vault", true, false),
    ("system_program", false, false),
];

const ESCROW_ARGS: &[ArgRow] = &[("user_bump", "u8"), ("escrow_bump", "u8"), ("sol", "u64")];

const SHAPES: [InstructionShape; 24] = [
    shape(
        MarketInstruction::Initialize,
        &[
            ("admin", true, true),
            ("global_authority", true, false),
            ("escrow_vault", true, false),
            ("system_program", false, false),
            ("rent", false, false),
        ],
        &[("global_bump", "u8"), ("escrow_bump", "u8")],
        false,
    ),
    shape(MarketInstruction::UpdateFee, ADMIN_ACCOUNTS, &[("global_bump", "u8"), ("sol_fee", "u64")], false),
    shape(
        MarketInstruction::AddTeamTreasury,
        ADMIN_ACCOUNTS,
        &[("global_bump", "u8"), ("address", "publicKey"), ("rate", "u64")],
        false,
    ),
    shape(
        MarketInstruction::RemoveTeamTreasury,
        ADMIN_ACCOUNTS,
        &[("global_bump", "u8"), ("address", "publicKey")],
        false,
    ),
    shape(
        MarketInstruction::InitUserPool,
        &[
            ("owner", true, true),
            ("user_pool", true, false),
            ("system_program", false, false),
            ("rent", false, false),
        ],
        &[("bump", "u8")],
        false,
    ),
    shape(MarketInstruction::InitSellData, INIT_RECORD_ACCOUNTS, &[("nft", "publicKey"), ("bump", "u8")], false),
    shape(
        MarketInstruction::ListNftForSale,
        &[
            ("owner", true, true),
            ("global_authority", true, false),
            ("sell_data_info", true, false),
            ("user_token_account", true, false),
            ("dest_nft_token_account", true, false),
            ("nft_mint", false, false),
            ("mint_metadata", true, false),
            ("token_program", false, false),
            ("token_metadata_program", false, false),
            ("auction_data_info", true, false),
        ],
        &[("global_bump", "u8"), ("sell_bump", "u8"), ("auction_bump", "u8"), ("price_sol", "u64")],
        false,
    ),
    shape(
        MarketInstruction::DelistNft,
        &[
            ("owner", true, true),
            ("global_authority", true, false),
            ("sell_data_info", true, false),
            ("user_token_account", true, false),
            ("dest_nft_token_account", true, false),
            ("nft_mint", false, false),
            ("token_program", false, false),
            ("auction_data_info", true, false),
        ],
        &[("global_bump", "u8"), ("sell_bump", "u8")],
        false,
    ),
    shape(
        MarketInstruction::SetPrice,
        &[("owner", true, true), ("sell_data_info", true, false), ("nft_mint", false, false)],
        &[("sell_bump", "u8"), ("price", "u64")],
        false,
    ),
    shape(
        MarketInstruction::Transfer,
        &[
            ("owner", true, true),
            ("user_token_account", true, false),
            ("recipient", true, false),
            ("dest_nft_token_account", true, false),
            ("nft_mint", false, false),
            ("token_program", false, false),
        ],
        &[],
        false,
    ),
    shape(
        MarketInstruction::TransferFromVault,
        &[
            ("owner", true, true),
            ("global_authority", true, false),
            ("sell_data_info", true, false),
            ("recipient", true, false),
            ("user_token_account", true, false),
            ("dest_nft_token_account", true, false),
            ("nft_mint", false, false),
            ("token_program", false, false),
            ("auction_data_info", true, false),
        ],
        &[("global_bump", "u8"), ("sell_bump", "u8")],
        false,
    ),
    shape(
        MarketInstruction::Purchase,
        &[
            ("buyer", true, true),
            ("global_authority", true, false),
            ("sell_data_info", true, false),
            ("buyer_user_pool", true, false),
            ("user_nft_token_account", true, false),
            ("dest_nft_token_account", true, false),
            ("seller", true, false),
            ("seller_user_pool", true, false),
            ("nft_mint", false, false),
            ("mint_metadata", true, false),
            ("token_program", false, false),
            ("system_program", false, false),
            ("token_metadata_program", false, false),
            ("auction_data_info", true, false),
        ],
        &[("global_bump", "u8"), ("nft_bump", "u8"), ("seller_bump", "u8"), ("buyer_bump", "u8")],
        true,
    ),
    shape(MarketInstruction::DepositToEscrow, ESCROW_ACCOUNTS, ESCROW_ARGS, false),
    shape(MarketInstruction::WithdrawFromEscrow, ESCROW_ACCOUNTS, ESCROW_ARGS, false),
    shape(MarketInstruction::InitOfferData, INIT_RECORD_ACCOUNTS, &[("nft", "publicKey"), ("bump", "u8")], false),
    shape(
        MarketInstruction::MakeOffer,
        &[
            ("owner", true, true),
            ("sell_data_info", true, false),
            ("offer_data_info", true, false),
            ("nft_mint", false, false),
            ("user_pool", true, false),
            ("escrow_vault", true, false),
            ("system_program", false, false),
        ],
        &[
            ("sell_bump", "u8"),
            ("offer_bump", "u8"),
            ("user_bump", "u8"),
            ("escrow_bump", "u8"),
            ("price", "u64"),
        ],
        false,
    ),
    shape(
        MarketInstruction::CancelOffer,
        &[("owner", true, true), ("offer_data_info", true, false), ("nft_mint", false, false)],
        &[("offer_bump", "u8")],
        false,
    ),
    shape(
        MarketInstruction::AcceptOffer,
        &[
            ("seller", true, true),
            ("sell_data_info", true, false),
            ("buyer", true, false),
            ("offer_data_info", true, false),
            ("seller_user_pool", true, false),
            ("nft_mint", false, false),
            ("global_authority", true, false),
            ("buyer_user_pool", true, false),
            ("user_nft_token_account", true, false),
            ("dest_nft_token_account", true, false),
            ("escrow_vault", true, false),
            ("mint_metadata", true, false),
            ("token_program", false, false),
            ("system_program", false, false),
            ("token_metadata_program", false, false),
            ("auction_data_info", true, false),
        ],
        &[
            ("global_bump", "u8"),
            ("nft_bump", "u8"),
            ("offer_bump", "u8"),
            ("buyer_bump", "u8"),
            ("seller_bump", "u8"),
            ("escrow_bump", "u8"),
        ],
        true,
    ),
    shape(MarketInstruction::InitAuctionData, INIT_RECORD_ACCOUNTS, &[("nft", "publicKey"), ("bump", "u8")], false),
    shape(
        MarketInstruction::CreateAuction,
        &[
            ("owner", true, true),
            ("global_authority", true, false),
            ("auction_data_info", true, false),
            ("user_token_account", true, false),
            ("dest_nft_token_account", true, false),
            ("nft_mint", false, false),
            ("token_program", false, false),
            ("sell_data_info", true, false),
        ],
        &[
            ("global_bump", "u8"),
            ("auction_bump", "u8"),
            ("sell_bump", "u8"),
            ("start_price", "u64"),
            ("min_increase", "u64"),
            ("duration", "i64"),
            ("reserved", "u8"),
        ],
        false,
    ),
    shape(
        MarketInstruction::PlaceBid,
        &[
            ("bidder", true, true),
            ("auction_data_info", true, false),
            ("nft_mint", false, false),
            ("escrow_vault", true, false),
            ("out_bidder", true, false),
            ("system_program", false, false),
            ("sell_data_info", true, false),
        ],
        &[("auction_bump", "u8"), ("escrow_bump", "u8"), ("price", "u64")],
        false,
    ),
    shape(
        MarketInstruction::ClaimAuction,
        &[
            ("bidder", true, true),
            ("global_authority", true, false),
            ("auction_data_info", true, false),
            ("user_token_account", true, false),
            ("dest_nft_token_account", true, false),
            ("nft_mint", false, false),
            ("escrow_vault", true, false),
            ("bidder_user_pool", true, false),
            ("creator", true, false),
            ("creator_user_pool", true, false),
            ("mint_metadata", true, false),
            ("token_program", false, false),
            ("system_program", false, false),
            ("token_metadata_program", false, false),
        ],
        &[("global_bump", "u8"), ("auction_bump", "u8"), ("escrow_bump", "u8")],
        true,
    ),
    shape(
        MarketInstruction::UpdateReserve,
        &[("creator", true, true), ("auction_data_info", true, false), ("nft_mint", false, false)],
        &[("auction_bump", "u8"), ("price", "u64")],
        false,
    ),
    shape(
        MarketInstruction::CancelAuction,
        &[
            ("creator", true, true),
            ("global_authority", true, false),
            ("auction_data_info", true, false),
            ("user_token_account", true, false),
            ("dest_nft_token_account", true, false),
            ("nft_mint", false, false),
            ("token_program", false, false),
            ("sell_data_info", true, false),
        ],
        &[("global_bump", "u8"), ("auction_bump", "u8")],
        false,
    ),
];

fn arg_width(type_: &str) -> usize {
    match type_ {
        "u8" | "bool" => 1,
        "u16" => 2,
        "u32" => 4,
        "u64" | "i64" => 8,
        "publicKey" => 32,
        _ => 0,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn field(name: &str, type_: &str, offset: usize) -> IdlField {
    IdlField { name: name.to_string(), type_: type_.to_string(), offset }
}

/// Lay out record fields from their types, starting after the header.
fn record_fields(rows: &[(&str, &str)]) -> Vec<IdlField> {
    let mut offset = crate::state::HEADER_LEN;
    rows.iter()
        .map(|(name, type_)| {
            let f = field(name, type_, offset);
            offset += match *type_ {
                "[publicKey; 8]" => 32 * 8,
                "[u64; 8]" => 8 * 8,
                other => arg_width(other),
            };
            f
        })
        .collect()
}

fn account_type<R: Record>(rows: &[(&str, &str)]) -> IdlAccountType {
    IdlAccountType {
        name: R::KIND.to_string(),
        size: R::SIZE,
        discriminator: R::DISCRIMINATOR.to_vec(),
        fields: record_fields(rows),
    }
}

/// Catalog entry for one instruction.
pub fn instruction_entry(ix: MarketInstruction) -> Option<IdlInstruction> {
    SHAPES.iter().find(|s| s.ix == ix).map(|s| IdlInstruction {
        name: s.ix.name().to_string(),
        discriminator: hex(&s.ix.discriminator()),
        accounts: s
            .accounts
            .iter()
            .map(|(name, writable, signer)| IdlAccountItem {
                name: name.to_string(),
                writable: *writable,
                signer: *signer,
            })
            .collect(),
        args: s
            .args
            .iter()
            .map(|(name, type_)| IdlArg { name: name.to_string(), type_: type_.to_string() })
            .collect(),
        remaining_accounts: s.remaining,
    })
}

/// Encoded byte length of an instruction's arguments, opcode excluded.
pub fn args_len(ix: MarketInstruction) -> usize {
    SHAPES
        .iter()
        .find(|s| s.ix == ix)
        .map(|s| s.args.iter().map(|(_, t)| arg_width(t)).sum())
        .unwrap_or(0)
}

/// The full interface description.
pub fn market_idl() -> MarketIdl {
    MarketIdl {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: "mugs_marketplace".to_string(),
        instructions: MarketInstruction::ALL.iter().filter_map(|ix| instruction_entry(*ix)).collect(),
        accounts: vec![
            account_type::<GlobalConfig>(&[
                ("super_admin", "publicKey"),
                ("market_fee_sol", "u64"),
                ("team_count", "u64"),
                ("team_treasury", "[publicKey; 8]"),
                ("treasury_rate", "[u64; 8]"),
            ]),
            account_type::<Listing>(&[
                ("mint", "publicKey"),
                ("seller", "publicKey"),
                ("collection", "publicKey"),
                ("price", "u64"),
                ("listed_date", "i64"),
                ("active", "u64"),
            ]),
            account_type::<Offer>(&[
                ("mint", "publicKey"),
                ("buyer", "publicKey"),
                ("offer_price", "u64"),
                ("offer_listing_date", "i64"),
                ("active", "u64"),
            ]),
            account_type::<Auction>(&[
                ("mint", "publicKey"),
                ("creator", "publicKey"),
                ("start_price", "u64"),
                ("min_increase", "u64"),
                ("start_date", "i64"),
                ("last_bid_date", "i64"),
                ("last_bidder", "publicKey"),
                ("highest_bid", "u64"),
                ("duration", "i64"),
                ("status", "u64"),
            ]),
            account_type::<UserAccount>(&[
                ("address", "publicKey"),
                ("traded_volume", "u64"),
                ("escrow_sol_balance", "u64"),
            ]),
        ],
        errors: PROGRAM_ERRORS
            .iter()
            .map(|e| IdlError { code: e.code, name: e.name.to_string(), msg: e.message.to_string() })
            .collect(),
    }
}

/// Pretty JSON of [`market_idl`].
pub fn market_idl_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&market_idl())
}

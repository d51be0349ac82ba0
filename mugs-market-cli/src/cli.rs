//! CLI helpers: help text, argument parsing, operation construction.

use std::collections::HashMap;

use mugs_market_core::idl::{instruction_entry, MarketIdl};
use mugs_market_core::instruction::{AuctionTerms, MarketInstruction};
use solana_pubkey::Pubkey;

use crate::assembler::MarketOperation;
use crate::parse::{parse_bool, parse_duration_secs, parse_pubkey, parse_sol_amount, parse_u64};

/// Build operations, their flags, and a short description.
pub const OPERATIONS: &[(&str, &str, &str)] = &[
    ("initialize", "", "Create the marketplace config and escrow vault"),
    ("update-fee", "--sol-fee <PERMYRIAD>", "Set the flat marketplace fee"),
    ("add-treasury", "--address <ADDR> --rate <PERMYRIAD>", "Add a treasury recipient"),
    ("remove-treasury", "--address <ADDR>", "Remove a treasury recipient"),
    ("init-user", "", "Create the payer's user account"),
    ("init-listing", "--mint <ADDR>", "Create the listing record for a mint"),
    ("list", "--mint <ADDR> --price <SOL>", "List an asset for sale"),
    ("delist", "--mint <ADDR>", "Withdraw a listing"),
    ("set-price", "--mint <ADDR> --price <SOL>", "Change a listing price"),
    ("transfer", "--mint <ADDR> --recipient <ADDR>", "Send an asset, from the vault if listed"),
    ("purchase", "--mint <ADDR>", "Buy a listed asset"),
    ("deposit", "--amount <SOL>", "Move SOL into escrow"),
    ("withdraw", "--amount <SOL>", "Move SOL out of escrow"),
    ("init-offer", "--mint <ADDR>", "Create the payer's offer slot for a mint"),
    ("make-offer", "--mint <ADDR> --price <SOL>", "Offer on a listed asset"),
    ("cancel-offer", "--mint <ADDR>", "Withdraw an offer"),
    ("accept-offer", "--mint <ADDR> --buyer <ADDR>", "Sell to an offer"),
    ("init-auction", "--mint <ADDR>", "Create the auction record for a mint"),
    (
        "create-auction",
        "--mint <ADDR> --start-price <SOL> --min-increase <SOL> --duration <SECS|Nm|Nh|Nd> [--reserved]",
        "Start an auction",
    ),
    ("place-bid", "--mint <ADDR> --price <SOL>", "Bid on an auction"),
    ("claim-auction", "--mint <ADDR>", "Settle a won auction"),
    ("update-reserve", "--mint <ADDR> --price <SOL>", "Change a reserved auction's price"),
    ("cancel-auction", "--mint <ADDR>", "Cancel an auction"),
];

pub fn print_help(idl: &MarketIdl, binary_name: &str) {
    println!("🔧 {} v{} marketplace client", idl.name, idl.version);
    println!();
    println!("USAGE:");
    println!("  {} <COMMAND> [ARGS]", binary_name);
    println!();
    println!("ENVIRONMENT:");
    println!("  MUGS_PROGRAM_ID            Marketplace program address");
    println!("  MUGS_COMMITMENT            processed | confirmed | finalized");
    println!("  MUGS_TIMEOUT_SECS          Per-call ledger timeout");
    println!("  MUGS_VERBOSE               1 to log each step");
    println!();
    println!("COMMANDS:");
    println!("  idl                                    Print the instruction catalog as JSON");
    println!("  pda <KIND> [--mint ADDR] [--user ADDR] Derive a record address");
    println!("  decode <KIND> <HEX>                    Decode raw record bytes");
    println!("  events --file <JSON>                   Decode events from RPC transaction JSON");
    println!("  scan <KIND> --snapshot <JSON> [--mint ADDR]");
    println!("                                         List live records (KIND=escrow: vault balance)");
    println!("  build <OP> --snapshot <JSON> --payer <ADDR> [FLAGS]");
    println!("                                         Prepare a transaction against a snapshot");
    println!("  error <CODE>                           Describe a program error code");
    println!();
    println!("BUILD OPERATIONS:");
    for (name, flags, about) in OPERATIONS {
        println!("  {:<16} {}", name, about);
        if !flags.is_empty() {
            println!("  {:<16}   {}", "", flags);
        }
    }
    println!();
    println!("KINDS: global, listing, offer, auction, user (pda also: escrow, vault, ata, metadata)");
    println!("AMOUNTS: SOL with up to 9 decimals, or an integer followed by 'lamports'");
}

/// Print the account list and arguments of one instruction.
pub fn print_instruction_help(ix: MarketInstruction) {
    let entry = match instruction_entry(ix) {
        Some(entry) => entry,
        None => {
            eprintln!("❌ No catalog entry for {}", ix.name());
            return;
        }
    };
    println!("📋 {} ({} account(s), {} arg(s))", entry.name, entry.accounts.len(), entry.args.len());
    println!();
    println!("ACCOUNTS:");
    for acc in &entry.accounts {
        let mut flags = vec![];
        if acc.writable { flags.push("mut"); }
        if acc.signer { flags.push("signer"); }
        let flags_str = if flags.is_empty() { String::new() } else { format!(" [{}]", flags.join(", ")) };
        println!("  {}{}", acc.name, flags_str);
    }
    if entry.remaining_accounts {
        println!("  ...treasury recipients, then creators [mut]");
    }
    println!();
    println!("ARGS:");
    for arg in &entry.args {
        println!("  {:<20} {}", arg.name, arg.type_);
    }
}

/// Collect `--key value` pairs; a flag without a value is `"true"`.
pub fn parse_flags(args: &[String]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut i = 0;
    while i < args.len() {
        if let Some(key) = args[i].strip_prefix("--") {
            if i + 1 < args.len() && !args[i + 1].starts_with("--") {
                map.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                map.insert(key.to_string(), "true".to_string());
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    map
}

/// Positional (non-flag) arguments, in order.
pub fn positionals(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i].starts_with("--") {
            i += if i + 1 < args.len() && !args[i + 1].starts_with("--") { 2 } else { 1 };
        } else {
            out.push(args[i].clone());
            i += 1;
        }
    }
    out
}

fn required<'a>(flags: &'a HashMap<String, String>, key: &str) -> Result<&'a str, String> {
    flags.get(key).map(String::as_str).ok_or_else(|| format!("Missing required argument --{}", key))
}

fn flag_pubkey(flags: &HashMap<String, String>, key: &str) -> Result<Pubkey, String> {
    parse_pubkey(required(flags, key)?).map_err(|e| format!("--{}: {}", key, e))
}

fn flag_u64(flags: &HashMap<String, String>, key: &str) -> Result<u64, String> {
    parse_u64(required(flags, key)?).map_err(|e| format!("--{}: {}", key, e))
}

fn flag_sol(flags: &HashMap<String, String>, key: &str) -> Result<u64, String> {
    parse_sol_amount(required(flags, key)?).map_err(|e| format!("--{}: {}", key, e))
}

/// Build an operation from its kebab-case name and flags.
pub fn parse_operation(name: &str, flags: &HashMap<String, String>) -> Result<MarketOperation, String> {
    let mint = || flag_pubkey(flags, "mint");
    let op = match snake_to_kebab(name).as_str() {
        "initialize" => MarketOperation::Initialize,
        "update-fee" => MarketOperation::UpdateFee { sol_fee: flag_u64(flags, "sol-fee")? },
        "add-treasury" => MarketOperation::AddTreasury {
            address: flag_pubkey(flags, "address")?,
            rate: flag_u64(flags, "rate")?,
        },
        "remove-treasury" => MarketOperation::RemoveTreasury { address: flag_pubkey(flags, "address")? },
        "init-user" => MarketOperation::InitUser,
        "init-listing" => MarketOperation::InitListing { mint: mint()? },
        "list" => MarketOperation::List { mint: mint()?, price: flag_sol(flags, "price")? },
        "delist" => MarketOperation::Delist { mint: mint()? },
        "set-price" => MarketOperation::SetPrice { mint: mint()?, price: flag_sol(flags, "price")? },
        "transfer" => MarketOperation::Transfer { mint: mint()?, recipient: flag_pubkey(flags, "recipient")? },
        "purchase" => MarketOperation::Purchase { mint: mint()? },
        "deposit" => MarketOperation::Deposit { amount: flag_sol(flags, "amount")? },
        "withdraw" => MarketOperation::Withdraw { amount: flag_sol(flags, "amount")? },
        "init-offer" => MarketOperation::InitOffer { mint: mint()? },
        "make-offer" => MarketOperation::MakeOffer { mint: mint()?, price: flag_sol(flags, "price")? },
        "cancel-offer" => MarketOperation::CancelOffer { mint: mint()? },
        "accept-offer" => MarketOperation::AcceptOffer { mint: mint()?, buyer: flag_pubkey(flags, "buyer")? },
        "init-auction" => MarketOperation::InitAuction { mint: mint()? },
        "create-auction" => MarketOperation::CreateAuction {
            mint: mint()?,
            terms: AuctionTerms {
                start_price: flag_sol(flags, "start-price")?,
                min_increase: flag_sol(flags, "min-increase")?,
                duration: parse_duration_secs(required(flags, "duration")?)
                    .map_err(|e| format!("--duration: {}", e))?,
                reserved: match flags.get("reserved") {
                    Some(raw) => parse_bool(raw).map_err(|e| format!("--reserved: {}", e))?,
                    None => false,
                },
            },
        },
        "place-bid" => MarketOperation::PlaceBid { mint: mint()?, price: flag_sol(flags, "price")? },
        "claim-auction" => MarketOperation::ClaimAuction { mint: mint()? },
        "update-reserve" => MarketOperation::UpdateReserve { mint: mint()?, price: flag_sol(flags, "price")? },
        "cancel-auction" => MarketOperation::CancelAuction { mint: mint()? },
        other => return Err(format!("Unknown operation '{}'", other)),
    };
    Ok(op)
}

// ─── String utilities ────────────────────────────────────────────

pub fn snake_to_kebab(s: &str) -> String {
    s.replace('_', "-")
}

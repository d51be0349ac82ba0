//! `mugs-cli`: inspect and dry-run the Mugs marketplace from the command line.

use std::collections::HashMap;
use std::fs;
use std::process;

use mugs_market_core::events::describe;
use mugs_market_core::idl::{market_idl, market_idl_json};
use mugs_market_core::instruction::MarketInstruction;
use mugs_market_core::pda::{
    find_associated_token_account, find_auction, find_escrow_vault, find_global_authority, find_listing,
    find_metadata, find_offer, find_user_account,
};
use mugs_market_core::program_errors::describe_program_error;
use mugs_market_core::state::{AnyRecord, RecordKind};
use mugs_market_core::types::PreparedTransaction;
use mugs_market_cli::cli::{parse_flags, parse_operation, positionals, print_help, print_instruction_help};
use mugs_market_cli::config::MarketContext;
use mugs_market_cli::hex::{hex_decode, hex_encode};
use mugs_market_cli::history::{decode_all, parse_rpc_transactions};
use mugs_market_cli::ledger::MemoryLedger;
use mugs_market_cli::metadata::{CreatorSource, FixedCreators, LedgerCreators};
use mugs_market_cli::parse::parse_pubkey;
use mugs_market_cli::scan::{escrow_balance, scan_kind};
use mugs_market_cli::tx::Orchestrator;
use solana_pubkey::Pubkey;

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    process::exit(1);
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(format!("Failed to read '{}': {}", path, e)))
}

fn flag_key(flags: &HashMap<String, String>, key: &str) -> Pubkey {
    match flags.get(key) {
        Some(raw) => parse_pubkey(raw).unwrap_or_else(|e| fail(format!("--{}: {}", key, e))),
        None => fail(format!("Missing required argument --{}", key)),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(format!("Failed to render JSON: {}", e)),
    }
}

fn load_snapshot(ctx: &MarketContext, flags: &HashMap<String, String>) -> MemoryLedger {
    let path = flags.get("snapshot").unwrap_or_else(|| fail("Missing required argument --snapshot"));
    MemoryLedger::from_json(ctx.program_id, &read_file(path)).unwrap_or_else(|e| fail(e))
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let binary = args.first().map(String::as_str).unwrap_or("mugs-cli");
    let ctx = MarketContext::from_env().unwrap_or_else(|e| fail(e));

    let Some(command) = args.get(1) else {
        print_help(&market_idl(), binary);
        return;
    };
    let rest = &args[2..];
    let flags = parse_flags(rest);
    let positional = positionals(rest);

    match command.as_str() {
        "help" | "--help" | "-h" => print_help(&market_idl(), binary),
        "idl" => cmd_idl(positional.first()),
        "pda" => cmd_pda(&ctx, positional.first(), &flags),
        "decode" => cmd_decode(positional.first(), positional.get(1)),
        "events" => cmd_events(&ctx, &flags),
        "scan" => cmd_scan(&ctx, positional.first(), &flags).await,
        "build" => cmd_build(&ctx, positional.first(), &flags).await,
        "error" => cmd_error(positional.first()),
        other => {
            eprintln!("❌ Unknown command '{}'", other);
            eprintln!("Run '{} help' for usage.", binary);
            process::exit(1);
        }
    }
}

fn cmd_idl(instruction: Option<&String>) {
    match instruction {
        Some(name) => match MarketInstruction::from_name(name) {
            Some(ix) => print_instruction_help(ix),
            None => fail(format!("Unknown instruction '{}'", name)),
        },
        None => match market_idl_json() {
            Ok(json) => println!("{}", json),
            Err(e) => fail(format!("Failed to render catalog: {}", e)),
        },
    }
}

fn cmd_pda(ctx: &MarketContext, kind: Option<&String>, flags: &HashMap<String, String>) {
    let kind = kind.unwrap_or_else(|| fail("Usage: pda <KIND> [--mint ADDR] [--user ADDR]"));
    let pid = &ctx.program_id;
    let derived = match kind.as_str() {
        "global" => find_global_authority(pid),
        "escrow" => find_escrow_vault(pid),
        "listing" | "sell" => find_listing(pid, &flag_key(flags, "mint")),
        "offer" => find_offer(pid, &flag_key(flags, "mint"), &flag_key(flags, "user")),
        "auction" => find_auction(pid, &flag_key(flags, "mint")),
        "user" => find_user_account(pid, &flag_key(flags, "user")),
        "ata" => find_associated_token_account(&flag_key(flags, "user"), &flag_key(flags, "mint")),
        "vault" => find_global_authority(pid)
            .and_then(|(global, _)| find_associated_token_account(&global, &flag_key(flags, "mint"))),
        "metadata" => find_metadata(&flag_key(flags, "mint")),
        other => fail(format!("Unknown PDA kind '{}'", other)),
    };
    match derived {
        Ok((address, bump)) => {
            println!("📦 {}", kind);
            println!("   address: {}", address);
            println!("   bump:    {}", bump);
        }
        Err(e) => fail(e),
    }
}

fn cmd_decode(kind: Option<&String>, hex: Option<&String>) {
    let (Some(kind), Some(hex)) = (kind, hex) else {
        fail("Usage: decode <KIND> <HEX>");
    };
    let kind = RecordKind::from_name(kind).unwrap_or_else(|| fail(format!("Unknown record kind '{}'", kind)));
    let bytes = hex_decode(hex).unwrap_or_else(|e| fail(e));
    match AnyRecord::decode(kind, &bytes) {
        Ok(record) => {
            print_json(&record);
            if !record.is_live() {
                eprintln!("ℹ️  {} record is not live", kind.name());
            }
        }
        Err(e) => fail(e),
    }
}

fn cmd_events(ctx: &MarketContext, flags: &HashMap<String, String>) {
    let path = flags.get("file").unwrap_or_else(|| fail("Missing required argument --file"));
    let transactions = parse_rpc_transactions(&read_file(path)).unwrap_or_else(|e| fail(e));
    let events = decode_all(ctx, &transactions);
    if flags.contains_key("json") {
        print_json(&events);
        return;
    }
    println!("🔎 {} event(s) in {} transaction(s)", events.len(), transactions.len());
    for event in &events {
        println!("  {}", describe(event));
    }
}

async fn cmd_scan(ctx: &MarketContext, kind: Option<&String>, flags: &HashMap<String, String>) {
    let kind = kind.unwrap_or_else(|| fail("Usage: scan <KIND> --snapshot <JSON> [--mint ADDR]"));
    if kind == "escrow" {
        let ledger = load_snapshot(ctx, flags);
        let lamports = escrow_balance(ctx, &ledger).await.unwrap_or_else(|e| fail(e));
        println!("💾 Escrow vault holds {} lamports", lamports);
        return;
    }
    let kind = RecordKind::from_name(kind).unwrap_or_else(|| fail(format!("Unknown record kind '{}'", kind)));
    let ledger = load_snapshot(ctx, flags);
    let mint = flags.get("mint").map(|_| flag_key(flags, "mint"));
    let records = scan_kind(ctx, &ledger, kind, mint.as_ref()).await.unwrap_or_else(|e| fail(e));
    let rendered: Vec<serde_json::Value> = records
        .iter()
        .map(|(address, record)| serde_json::json!({ "address": address.to_string(), "record": record }))
        .collect();
    print_json(&rendered);
}

async fn cmd_build(ctx: &MarketContext, op_name: Option<&String>, flags: &HashMap<String, String>) {
    let op_name = op_name.unwrap_or_else(|| fail("Usage: build <OP> --snapshot <JSON> --payer <ADDR> [FLAGS]"));
    let ledger = load_snapshot(ctx, flags);
    match flags.get("creators") {
        Some(raw) => {
            let creators = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_pubkey(s).unwrap_or_else(|e| fail(format!("--creators: {}", e))))
                .collect();
            run_build(ctx, &ledger, &FixedCreators(creators), op_name, flags).await
        }
        None => run_build(ctx, &ledger, &LedgerCreators::new(ctx, &ledger), op_name, flags).await,
    }
}

async fn run_build<C: CreatorSource>(
    ctx: &MarketContext,
    ledger: &MemoryLedger,
    creators: &C,
    op_name: &str,
    flags: &HashMap<String, String>,
) {
    let payer = flag_key(flags, "payer");
    let op = parse_operation(op_name, flags).unwrap_or_else(|e| fail(e));
    let orchestrator = Orchestrator::new(ctx, ledger, creators);

    if !flags.contains_key("submit") {
        let tx = orchestrator.prepare(&payer, &op).await.unwrap_or_else(|e| fail(e));
        print_transaction(&tx);
        println!();
        println!("⚠️  Dry run: pass --submit to apply it to the snapshot.");
        return;
    }

    let submitted = orchestrator.submit(&payer, &op).await.unwrap_or_else(|e| fail(e));
    print_transaction(&submitted.transaction);
    println!();
    println!("✅ Signature: {}", submitted.signature);
    if submitted.retried {
        println!("   (rebuilt once after a concurrent initialization)");
    }
    if let Some(out) = flags.get("out") {
        let snapshot = ledger.snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot).unwrap_or_else(|e| fail(e));
        fs::write(out, json).unwrap_or_else(|e| fail(format!("Failed to write '{}': {}", out, e)));
        println!("💾 Snapshot written to {}", out);
    }
}

fn print_transaction(tx: &PreparedTransaction) {
    println!("🔧 Transaction for {} ({} instruction(s))", tx.payer, tx.instructions.len());
    for (i, ix) in tx.instructions.iter().enumerate() {
        let name = ix
            .data
            .get(..8)
            .and_then(|op| MarketInstruction::ALL.iter().find(|m| m.discriminator() == op))
            .map(|m| m.name())
            .unwrap_or("external");
        println!("  [{}] {} → program {}", i, name, ix.program_id);
        for meta in &ix.accounts {
            let mut flags = vec![];
            if meta.is_writable { flags.push("mut"); }
            if meta.is_signer { flags.push("signer"); }
            println!("      {} {}", meta.pubkey, if flags.is_empty() { String::new() } else { format!("[{}]", flags.join(", ")) });
        }
        println!("      data: {}", hex_encode(&ix.data));
    }
}

fn cmd_error(code: Option<&String>) {
    let raw = code.unwrap_or_else(|| fail("Usage: error <CODE>"));
    let code = match raw.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse::<u32>(),
    }
    .unwrap_or_else(|e| fail(format!("Invalid code '{}': {}", raw, e)));
    match describe_program_error(code) {
        Some(entry) => println!("{} {}: {}", entry.code, entry.name, entry.message),
        None => fail(format!("No program error with code {}", code)),
    }
}

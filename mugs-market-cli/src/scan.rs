//! Program account scans.
//!
//! A kind is selected by account size alone, so every record kind must
//! have a distinct size. Liveness is checked client-side.

use mugs_market_core::error::MarketResult;
use mugs_market_core::pda::find_escrow_vault;
use mugs_market_core::state::{
    AnyRecord, Auction, GlobalConfig, Listing, Offer, Record, RecordKind, UserAccount, HEADER_LEN,
};
use mugs_market_core::validation::validate_unique_record_sizes;
use solana_pubkey::Pubkey;

use crate::config::MarketContext;
use crate::ledger::{with_timeout, LedgerQuery, MemcmpFilter};

/// Live records of type `R`. Entries that fail to decode are skipped.
pub async fn scan_records<R: Record, L: LedgerQuery>(
    ctx: &MarketContext,
    ledger: &L,
    filter: Option<&MemcmpFilter>,
) -> MarketResult<Vec<(Pubkey, R)>> {
    validate_unique_record_sizes(&RecordKind::ALL)?;
    let raw = with_timeout(
        ctx,
        "scan_program_accounts",
        ledger.scan_program_accounts(&ctx.program_id, R::SIZE, filter),
    )
    .await?;

    let mut out = Vec::with_capacity(raw.len());
    for (address, bytes) in raw {
        if ctx.verbose && !R::has_header(&bytes) {
            eprintln!("ℹ️  {} {}: header is not the {} discriminator", R::KIND, address, R::KIND);
        }
        match R::decode(&bytes) {
            Ok(record) if record.is_live() => out.push((address, record)),
            Ok(_) => {}
            Err(e) => eprintln!("⚠️  Skipping {} {}: {}", R::KIND, address, e),
        }
    }
    if ctx.verbose {
        println!("🔎 {} live {} record(s)", out.len(), R::KIND);
    }
    Ok(out)
}

pub async fn active_listings<L: LedgerQuery>(ctx: &MarketContext, ledger: &L) -> MarketResult<Vec<(Pubkey, Listing)>> {
    scan_records::<Listing, L>(ctx, ledger, None).await
}

/// Active offers, optionally restricted to one mint.
pub async fn active_offers<L: LedgerQuery>(
    ctx: &MarketContext,
    ledger: &L,
    mint: Option<&Pubkey>,
) -> MarketResult<Vec<(Pubkey, Offer)>> {
    let filter = mint.map(mint_filter);
    scan_records::<Offer, L>(ctx, ledger, filter.as_ref()).await
}

/// Auctions that are running or reserved.
pub async fn live_auctions<L: LedgerQuery>(ctx: &MarketContext, ledger: &L) -> MarketResult<Vec<(Pubkey, Auction)>> {
    scan_records::<Auction, L>(ctx, ledger, None).await
}

/// Lamports pooled in the escrow vault. The vault has no typed payload.
pub async fn escrow_balance<L: LedgerQuery>(ctx: &MarketContext, ledger: &L) -> MarketResult<u64> {
    let (vault, _) = find_escrow_vault(&ctx.program_id)?;
    with_timeout(ctx, "get_balance", ledger.get_balance(&vault)).await
}

/// Mint-keyed records store the mint right after the header.
pub fn mint_filter(mint: &Pubkey) -> MemcmpFilter {
    MemcmpFilter::new(HEADER_LEN, mint.to_bytes())
}

async fn scan_any<R: Record, L: LedgerQuery>(
    ctx: &MarketContext,
    ledger: &L,
    filter: Option<&MemcmpFilter>,
    wrap: fn(R) -> AnyRecord,
) -> MarketResult<Vec<(Pubkey, AnyRecord)>> {
    let records = scan_records::<R, L>(ctx, ledger, filter).await?;
    Ok(records.into_iter().map(|(address, record)| (address, wrap(record))).collect())
}

/// Runtime-selected scan used by the CLI.
pub async fn scan_kind<L: LedgerQuery>(
    ctx: &MarketContext,
    ledger: &L,
    kind: RecordKind,
    mint: Option<&Pubkey>,
) -> MarketResult<Vec<(Pubkey, AnyRecord)>> {
    let filter = mint.map(mint_filter);
    let filter = filter.as_ref();
    match kind {
        RecordKind::GlobalConfig => scan_any::<GlobalConfig, L>(ctx, ledger, filter, AnyRecord::GlobalConfig).await,
        RecordKind::Listing => scan_any::<Listing, L>(ctx, ledger, filter, AnyRecord::Listing).await,
        RecordKind::Offer => scan_any::<Offer, L>(ctx, ledger, filter, AnyRecord::Offer).await,
        RecordKind::Auction => scan_any::<Auction, L>(ctx, ledger, filter, AnyRecord::Auction).await,
        RecordKind::UserAccount => scan_any::<UserAccount, L>(ctx, ledger, filter, AnyRecord::UserAccount).await,
    }
}

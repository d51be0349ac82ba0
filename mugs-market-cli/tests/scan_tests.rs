//! Program account scans over an in-memory ledger.

mod common;

use common::*;
use mugs_market_cli::ledger::{LedgerQuery, MemoryLedger};
use mugs_market_cli::scan::{active_listings, escrow_balance, active_offers, live_auctions, mint_filter, scan_kind, scan_records};
use mugs_market_core::pda::{find_escrow_vault, MARKETPLACE_PROGRAM_ID, TOKEN_PROGRAM_ID};
use mugs_market_core::state::{AnyRecord, Listing, Record, RecordKind, UserAccount};

#[tokio::test]
async fn test_listing_scan_returns_only_active_listings() {
    let (ctx, ledger) = (ctx(), ledger());
    for i in 0..4u8 {
        ledger.insert_record(key(100 + i), &listing_record(key(i), key(50), 1)).await;
    }
    for i in 0..3u8 {
        ledger.insert_record(key(110 + i), &listing_record(key(10 + i), key(50), 0)).await;
    }
    // other kinds and foreign programs never show up
    ledger.insert_record(key(120), &offer_record(key(1), key(2), 1)).await;
    ledger.insert_record(key(121), &auction_record(key(1), key(2), key(3), 1)).await;
    ledger.insert_account(key(122), MARKETPLACE_PROGRAM_ID, 0, vec![0u8; 200]).await;
    ledger
        .insert_account(key(123), TOKEN_PROGRAM_ID, 0, listing_record(key(30), key(50), 1).encode())
        .await;

    let listings = active_listings(&ctx, &ledger).await.unwrap();
    assert_eq!(listings.len(), 4);
    assert!(listings.iter().all(|(_, l)| l.active == 1 && l.seller == key(50)));
}

#[tokio::test]
async fn test_kind_is_selected_by_size_alone() {
    let (ctx, ledger) = (ctx(), ledger());
    ledger.insert_record(key(100), &listing_record(key(1), key(50), 1)).await;
    // right size and live, but the header belongs to nothing we know
    let mut foreign_header = listing_record(key(2), key(50), 1).encode();
    foreign_header[..8].copy_from_slice(&[0xee; 8]);
    ledger.insert_account(key(101), MARKETPLACE_PROGRAM_ID, 0, foreign_header).await;
    // right size, garbage payload: active flag is not 1
    ledger.insert_account(key(102), MARKETPLACE_PROGRAM_ID, 0, vec![7u8; Listing::SIZE]).await;

    let ctx = ctx.with_verbose(true);
    let mut listings = scan_records::<Listing, MemoryLedger>(&ctx, &ledger, None).await.unwrap();
    listings.sort_by_key(|(address, _)| *address);
    let addresses: Vec<_> = listings.iter().map(|(address, _)| *address).collect();
    assert_eq!(addresses, vec![key(100), key(101)]);
    assert_eq!(listings[1].1.mint, key(2));
}

#[tokio::test]
async fn test_offer_scan_filters_by_mint() {
    let (ctx, ledger) = (ctx(), ledger());
    let mint = key(1);
    offered(&ledger, mint, key(2), 1).await;
    offered(&ledger, mint, key(3), 1).await;
    offered(&ledger, mint, key(4), 0).await;
    offered(&ledger, key(9), key(2), 1).await;

    let for_mint = active_offers(&ctx, &ledger, Some(&mint)).await.unwrap();
    assert_eq!(for_mint.len(), 2);
    assert!(for_mint.iter().all(|(_, o)| o.mint == mint));

    let all = active_offers(&ctx, &ledger, None).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_auction_scan_keeps_started_and_reserved() {
    let (ctx, ledger) = (ctx(), ledger());
    for (i, status) in [0u64, 1, 2, 3, 1].into_iter().enumerate() {
        let record = auction_record(key(i as u8), key(50), key(51), status);
        ledger.insert_record(key(100 + i as u8), &record).await;
    }

    let auctions = live_auctions(&ctx, &ledger).await.unwrap();
    let mut statuses: Vec<u64> = auctions.iter().map(|(_, a)| a.status).collect();
    statuses.sort_unstable();
    assert_eq!(statuses, vec![1, 1, 3]);
}

#[tokio::test]
async fn test_scan_kind_matches_typed_scan() {
    let (ctx, ledger) = (ctx(), ledger());
    user_exists(&ledger, key(1)).await;
    user_exists(&ledger, key(2)).await;
    ledger.insert_record(key(100), &listing_record(key(3), key(1), 1)).await;

    let users = scan_kind(&ctx, &ledger, RecordKind::UserAccount, None).await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|(_, r)| matches!(r, AnyRecord::UserAccount(_))));

    let typed = scan_records::<UserAccount, MemoryLedger>(&ctx, &ledger, None).await.unwrap();
    assert_eq!(typed.len(), users.len());
}

#[tokio::test]
async fn test_mint_filter_targets_bytes_after_header() {
    let ledger = ledger();
    let record = offer_record(key(1), key(2), 1);
    ledger.insert_record(key(100), &record).await;
    let filter = mint_filter(&key(1));
    assert_eq!(filter.offset, 8);

    let hits = ledger
        .scan_program_accounts(&MARKETPLACE_PROGRAM_ID, record.encode().len(), Some(&filter))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    let misses = ledger
        .scan_program_accounts(&MARKETPLACE_PROGRAM_ID, record.encode().len(), Some(&mint_filter(&key(2))))
        .await
        .unwrap();
    assert!(misses.is_empty());
}

#[tokio::test]
async fn test_escrow_balance_reads_vault_lamports() {
    let (ctx, ledger) = (ctx(), ledger());
    assert_eq!(escrow_balance(&ctx, &ledger).await.unwrap(), 0);

    let (vault, _) = find_escrow_vault(&MARKETPLACE_PROGRAM_ID).unwrap();
    ledger.insert_account(vault, MARKETPLACE_PROGRAM_ID, 7_500_000, vec![]).await;
    assert_eq!(escrow_balance(&ctx, &ledger).await.unwrap(), 7_500_000);
}

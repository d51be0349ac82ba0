//! Instruction builders agree with the catalog and the program's wire layout.

use mugs_market_core::idl::{args_len, instruction_entry, market_idl};
use mugs_market_core::instruction::*;
use mugs_market_core::pda::*;
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;

fn key(b: u8) -> Pubkey {
    Pubkey::new_from_array([b; 32])
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One built instruction per opcode, with a remaining-accounts tail where supported.
fn build_all() -> Vec<(MarketInstruction, Instruction)> {
    let p = MARKETPLACE_PROGRAM_ID;
    let (owner, mint, other, ata) = (key(1), key(2), key(3), key(4));
    let remaining = [key(10), key(11)];
    let terms = AuctionTerms { start_price: 1, min_increase: 2, duration: 3, reserved: true };
    vec![
        (MarketInstruction::Initialize, initialize(&p, &owner).unwrap()),
        (MarketInstruction::UpdateFee, update_fee(&p, &owner, 5).unwrap()),
        (MarketInstruction::AddTeamTreasury, add_team_treasury(&p, &owner, &other, 100).unwrap()),
        (MarketInstruction::RemoveTeamTreasury, remove_team_treasury(&p, &owner, &other).unwrap()),
        (MarketInstruction::InitUserPool, init_user_pool(&p, &owner).unwrap()),
        (MarketInstruction::InitSellData, init_sell_data(&p, &owner, &mint).unwrap()),
        (MarketInstruction::ListNftForSale, list_nft_for_sale(&p, &owner, &mint, &ata, 9).unwrap()),
        (MarketInstruction::DelistNft, delist_nft(&p, &owner, &mint, &ata).unwrap()),
        (MarketInstruction::SetPrice, set_price(&p, &owner, &mint, 7).unwrap()),
        (MarketInstruction::Transfer, transfer(&p, &owner, &mint, &ata, &other, &key(5)).unwrap()),
        (MarketInstruction::TransferFromVault, transfer_from_vault(&p, &owner, &mint, &other, &key(5)).unwrap()),
        (
            MarketInstruction::Purchase,
            purchase(
                &p,
                &PurchaseAccounts { buyer: owner, seller: other, mint, buyer_token_account: ata },
                &remaining,
            )
            .unwrap(),
        ),
        (MarketInstruction::DepositToEscrow, deposit_to_escrow(&p, &owner, 10).unwrap()),
        (MarketInstruction::WithdrawFromEscrow, withdraw_from_escrow(&p, &owner, 10).unwrap()),
        (MarketInstruction::InitOfferData, init_offer_data(&p, &owner, &mint).unwrap()),
        (MarketInstruction::MakeOffer, make_offer(&p, &owner, &mint, 8).unwrap()),
        (MarketInstruction::CancelOffer, cancel_offer(&p, &owner, &mint).unwrap()),
        (
            MarketInstruction::AcceptOffer,
            accept_offer(
                &p,
                &AcceptOfferAccounts { seller: owner, buyer: other, mint, buyer_token_account: ata },
                &remaining,
            )
            .unwrap(),
        ),
        (MarketInstruction::InitAuctionData, init_auction_data(&p, &owner, &mint).unwrap()),
        (MarketInstruction::CreateAuction, create_auction(&p, &owner, &mint, &ata, &terms).unwrap()),
        (MarketInstruction::PlaceBid, place_bid(&p, &owner, &mint, &other, 11).unwrap()),
        (
            MarketInstruction::ClaimAuction,
            claim_auction(
                &p,
                &ClaimAuctionAccounts { bidder: owner, creator: other, mint, bidder_token_account: ata },
                &remaining,
            )
            .unwrap(),
        ),
        (MarketInstruction::UpdateReserve, update_reserve(&p, &owner, &mint, 12).unwrap()),
        (MarketInstruction::CancelAuction, cancel_auction(&p, &owner, &mint, &ata).unwrap()),
    ]
}

#[test]
fn test_known_discriminators() {
    assert_eq!(hex(&MarketInstruction::Initialize.discriminator()), "afaf6d1f0d989bed");
    assert_eq!(hex(&MarketInstruction::ListNftForSale.discriminator()), "57eb17d364eb4e27");
    assert_eq!(hex(&MarketInstruction::Purchase.discriminator()), "155d719ac1a0f2a8");
    assert_eq!(hex(&MarketInstruction::PlaceBid.discriminator()), "ee4d945bc8975c92");
    assert_eq!(hex(&MarketInstruction::UpdateReserve.discriminator()), "2efaf9f0a6361656");
}

#[test]
fn test_builders_match_catalog() {
    let built = build_all();
    assert_eq!(built.len(), MarketInstruction::ALL.len());
    for (ix, instruction) in built {
        let entry = instruction_entry(ix).unwrap();
        assert_eq!(instruction.program_id, MARKETPLACE_PROGRAM_ID);
        assert_eq!(&instruction.data[..8], &ix.discriminator(), "{}", ix.name());
        assert_eq!(instruction.data.len(), 8 + args_len(ix), "{}", ix.name());

        let fixed = &instruction.accounts[..entry.accounts.len()];
        for (meta, expected) in fixed.iter().zip(entry.accounts.iter()) {
            assert_eq!(meta.is_signer, expected.signer, "{}.{}", ix.name(), expected.name);
            assert_eq!(meta.is_writable, expected.writable, "{}.{}", ix.name(), expected.name);
        }
        let tail = instruction.accounts.len() - entry.accounts.len();
        assert_eq!(tail, if entry.remaining_accounts { 2 } else { 0 }, "{}", ix.name());
    }
}

#[test]
fn test_list_argument_layout() {
    let p = MARKETPLACE_PROGRAM_ID;
    let (owner, mint) = (key(1), key(2));
    let ix = list_nft_for_sale(&p, &owner, &mint, &key(4), 1_500_000_000).unwrap();
    let (_, global_bump) = find_global_authority(&p).unwrap();
    let (_, sell_bump) = find_listing(&p, &mint).unwrap();
    let (auction, auction_bump) = find_auction(&p, &mint).unwrap();
    assert_eq!(&ix.data[8..11], &[global_bump, sell_bump, auction_bump]);
    assert_eq!(&ix.data[11..19], &1_500_000_000u64.to_le_bytes());
    assert_eq!(ix.accounts[5].pubkey, mint);
    assert_eq!(ix.accounts[4].pubkey, vault_token_account(&p, &mint).unwrap());
    assert_eq!(ix.accounts[6].pubkey, find_metadata(&mint).unwrap().0);
    assert_eq!(ix.accounts[9].pubkey, auction);
}

#[test]
fn test_create_auction_argument_layout() {
    let p = MARKETPLACE_PROGRAM_ID;
    let terms = AuctionTerms { start_price: 100, min_increase: 5, duration: -1, reserved: true };
    let ix = create_auction(&p, &key(1), &key(2), &key(4), &terms).unwrap();
    assert_eq!(ix.data.len(), 36);
    assert_eq!(&ix.data[11..19], &100u64.to_le_bytes());
    assert_eq!(&ix.data[19..27], &5u64.to_le_bytes());
    assert_eq!(&ix.data[27..35], &[0xff; 8]);
    assert_eq!(ix.data[35], 1);
}

#[test]
fn test_treasury_argument_carries_address() {
    let ix = add_team_treasury(&MARKETPLACE_PROGRAM_ID, &key(1), &key(3), 250).unwrap();
    assert_eq!(&ix.data[9..41], &[3; 32]);
    assert_eq!(&ix.data[41..49], &250u64.to_le_bytes());
}

#[test]
fn test_remaining_accounts_keep_order() {
    let remaining = [key(20), key(21), key(30), key(31), key(32)];
    let ix = purchase(
        &MARKETPLACE_PROGRAM_ID,
        &PurchaseAccounts { buyer: key(1), seller: key(3), mint: key(2), buyer_token_account: key(4) },
        &remaining,
    )
    .unwrap();
    let tail: Vec<Pubkey> = ix.accounts[14..].iter().map(|m| m.pubkey).collect();
    assert_eq!(tail, remaining.to_vec());
    assert!(ix.accounts[14..].iter().all(|m| m.is_writable && !m.is_signer));
}

#[test]
fn test_offer_slot_is_keyed_by_payer() {
    let p = MARKETPLACE_PROGRAM_ID;
    let ix = init_offer_data(&p, &key(1), &key(2)).unwrap();
    assert_eq!(ix.accounts[1].pubkey, find_offer(&p, &key(2), &key(1)).unwrap().0);
    assert_eq!(&ix.data[8..40], &[2; 32]);
}

#[test]
fn test_catalog_serializes() {
    let idl = market_idl();
    assert_eq!(idl.instructions.len(), 24);
    assert_eq!(idl.errors.len(), 39);
    for account in &idl.accounts {
        let last = account.fields.last().unwrap();
        let width = match last.type_.as_str() {
            "[u64; 8]" => 64,
            "publicKey" => 32,
            _ => 8,
        };
        assert_eq!(last.offset + width, account.size, "{}", account.name);
    }
    let json = mugs_market_core::idl::market_idl_json().unwrap();
    assert!(json.contains("\"list_nft_for_sale\""));
    assert_eq!(MarketInstruction::from_name("place-bid"), Some(MarketInstruction::PlaceBid));
}

//! Reconstruct marketplace events from historical transactions.
//!
//! Instructions are classified by the first eight base58 characters of
//! their data. The opcode and the argument length together fix those
//! characters, so each (instruction, layout) pair has one fingerprint.
//! The table is ordered and the first matching entry wins.
//!
//! Settled prices are not part of the instruction arguments; they are
//! recovered by summing the system transfers the program performed from
//! the paying account.

use base58::ToBase58;
use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;

use crate::address::{serde_base58, serde_base58_bytes, to_base58};
use crate::error::{MarketError, MarketResult};
use crate::instruction::MarketInstruction;

/// Characters of base58 instruction data compared against the table.
pub const FINGERPRINT_LEN: usize = 8;

/// One registered instruction signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub prefix: &'static str,
    pub instruction: MarketInstruction,
    /// Byte offset of the first non-bump argument.
    pub args_offset: usize,
    /// Layout used before the auction bump was added to list and create-auction.
    pub legacy: bool,
}

const fn fp(prefix: &'static str, instruction: MarketInstruction, args_offset: usize) -> FingerprintEntry {
    FingerprintEntry { prefix, instruction, args_offset, legacy: false }
}

const fn legacy(prefix: &'static str, instruction: MarketInstruction, args_offset: usize) -> FingerprintEntry {
    FingerprintEntry { prefix, instruction, args_offset, legacy: true }
}

pub const FINGERPRINTS: [FingerprintEntry; 26] = [
    fp("AsUkG8p1", MarketInstruction::Initialize, 10),
    fp("3BzKBJUk", MarketInstruction::UpdateFee, 9),
    fp("HY2XrSxn", MarketInstruction::AddTeamTreasury, 9),
    fp("AJbPzu2U", MarketInstruction::RemoveTeamTreasury, 9),
    fp("PcLYN6YP", MarketInstruction::InitUserPool, 9),
    fp("4G2WiD2C", MarketInstruction::InitSellData, 8),
    fp("H6XaU25j", MarketInstruction::ListNftForSale, 11),
    fp("6Ahuf6jr", MarketInstruction::DelistNft, 10),
    fp("UJJfJRLD", MarketInstruction::Transfer, 8),
    fp("5p6KPRCQ", MarketInstruction::TransferFromVault, 10),
    fp("QPHXB9jL", MarketInstruction::Purchase, 12),
    fp("BE4DeeJT", MarketInstruction::DepositToEscrow, 10),
    fp("AnGz4SzU", MarketInstruction::WithdrawFromEscrow, 10),
    fp("VcryEr2T", MarketInstruction::InitOfferData, 8),
    fp("3zENZMgC", MarketInstruction::MakeOffer, 12),
    fp("2BWUiNsL", MarketInstruction::CancelOffer, 9),
    fp("2SaBBC7P", MarketInstruction::AcceptOffer, 14),
    fp("ZkCkv1Hg", MarketInstruction::InitAuctionData, 8),
    fp("2n4tpBZG", MarketInstruction::CreateAuction, 11),
    fp("AtH7do4b", MarketInstruction::PlaceBid, 10),
    fp("882wV271", MarketInstruction::ClaimAuction, 11),
    fp("9mtdhZPt", MarketInstruction::CancelAuction, 10),
    fp("9mE5kJpm", MarketInstruction::SetPrice, 9),
    fp("Sc9FjYDt", MarketInstruction::UpdateReserve, 9),
    legacy("4eW8amCV", MarketInstruction::ListNftForSale, 10),
    legacy("QMNFmXsk", MarketInstruction::CreateAuction, 10),
];

/// Fingerprint text of raw instruction data, if it is long enough to have one.
pub fn fingerprint(data: &[u8]) -> Option<String> {
    let text = data.to_base58();
    if text.len() < FINGERPRINT_LEN {
        return None;
    }
    Some(text[..FINGERPRINT_LEN].to_string())
}

/// First table entry whose prefix equals the fingerprint of `data`.
pub fn classify(data: &[u8]) -> Option<&'static FingerprintEntry> {
    let print = fingerprint(data)?;
    FINGERPRINTS.iter().find(|entry| entry.prefix == print)
}

// ─── Historical transaction input ────────────────────────────────

/// A top-level instruction as recorded by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedInstruction {
    #[serde(with = "serde_base58")]
    pub program_id: Pubkey,
    #[serde(default, with = "crate::events::serde_key_list")]
    pub accounts: Vec<Pubkey>,
    #[serde(default, with = "serde_base58_bytes")]
    pub data: Vec<u8>,
}

/// An instruction executed by the program on behalf of a top-level one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InnerInstruction {
    /// Plain lamport transfer through the system program.
    SystemTransfer {
        #[serde(with = "serde_base58")]
        source: Pubkey,
        #[serde(with = "serde_base58")]
        destination: Pubkey,
        lamports: u64,
    },
    Other {
        #[serde(with = "serde_base58")]
        program_id: Pubkey,
    },
}

/// Inner instructions grouped under the top-level instruction at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerInstructionGroup {
    pub index: usize,
    pub instructions: Vec<InnerInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalTransaction {
    pub signature: String,
    #[serde(default)]
    pub block_time: Option<i64>,
    pub instructions: Vec<RecordedInstruction>,
    #[serde(default)]
    pub inner_instructions: Vec<InnerInstructionGroup>,
}

impl HistoricalTransaction {
    /// Inner instructions belonging to the top-level instruction at `index`.
    pub fn inner_for(&self, index: usize) -> impl Iterator<Item = &InnerInstruction> {
        self.inner_instructions
            .iter()
            .filter(move |group| group.index == index)
            .flat_map(|group| group.instructions.iter())
    }

    /// Sum of system transfers out of `payer` under instruction `index`.
    pub fn transferred_from(&self, index: usize, payer: &Pubkey) -> u64 {
        self.inner_for(index)
            .filter_map(|inner| match inner {
                InnerInstruction::SystemTransfer { source, lamports, .. } if source == payer => Some(*lamports),
                _ => None,
            })
            .fold(0u64, u64::saturating_add)
    }
}

pub(crate) mod serde_key_list {
    use serde::{Deserialize, Deserializer, Serializer};
    use solana_pubkey::Pubkey;

    pub fn serialize<S: Serializer>(keys: &[Pubkey], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(keys.iter().map(crate::address::to_base58))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Pubkey>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|raw| crate::address::parse_address(raw).map_err(serde::de::Error::custom))
            .collect()
    }
}

// ─── Decoded events ──────────────────────────────────────────────

/// Domain payload of a decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MarketAction {
    Initialize,
    UpdateFee { sol_fee: u64 },
    AddTreasury { #[serde(with = "serde_base58")] address: Pubkey, rate: u64 },
    RemoveTreasury { #[serde(with = "serde_base58")] address: Pubkey },
    InitUser,
    InitListing { #[serde(with = "serde_base58")] mint: Pubkey },
    List { #[serde(with = "serde_base58")] mint: Pubkey, price: u64 },
    Delist { #[serde(with = "serde_base58")] mint: Pubkey },
    SetPrice { #[serde(with = "serde_base58")] mint: Pubkey, price: u64 },
    Transfer {
        #[serde(with = "serde_base58")]
        mint: Pubkey,
        #[serde(with = "serde_base58")]
        recipient: Pubkey,
    },
    TransferFromVault {
        #[serde(with = "serde_base58")]
        mint: Pubkey,
        #[serde(with = "serde_base58")]
        recipient: Pubkey,
    },
    Purchase {
        #[serde(with = "serde_base58")]
        mint: Pubkey,
        #[serde(with = "serde_base58")]
        buyer: Pubkey,
        #[serde(with = "serde_base58")]
        seller: Pubkey,
        price: u64,
    },
    Deposit { amount: u64 },
    Withdraw { amount: u64 },
    InitOffer { #[serde(with = "serde_base58")] mint: Pubkey },
    /// `price` is what left the buyer's wallet; `offer_price` is the argument.
    MakeOffer { #[serde(with = "serde_base58")] mint: Pubkey, price: u64, offer_price: u64 },
    CancelOffer { #[serde(with = "serde_base58")] mint: Pubkey },
    AcceptOffer {
        #[serde(with = "serde_base58")]
        mint: Pubkey,
        #[serde(with = "serde_base58")]
        buyer: Pubkey,
        #[serde(with = "serde_base58")]
        seller: Pubkey,
        price: u64,
    },
    InitAuction { #[serde(with = "serde_base58")] mint: Pubkey },
    CreateAuction {
        #[serde(with = "serde_base58")]
        mint: Pubkey,
        start_price: u64,
        min_increase: u64,
        duration: i64,
        /// Block time plus duration, when the block time is known.
        end_date: Option<i64>,
    },
    PlaceBid { #[serde(with = "serde_base58")] mint: Pubkey, price: u64, bid: u64 },
    ClaimAuction {
        #[serde(with = "serde_base58")]
        mint: Pubkey,
        #[serde(with = "serde_base58")]
        buyer: Pubkey,
        #[serde(with = "serde_base58")]
        seller: Pubkey,
        price: u64,
    },
    UpdateReserve { #[serde(with = "serde_base58")] mint: Pubkey, price: u64 },
    CancelAuction { #[serde(with = "serde_base58")] mint: Pubkey },
}

/// One decoded marketplace event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketEvent {
    pub signature: String,
    pub block_time: Option<i64>,
    #[serde(with = "serde_base58")]
    pub signer: Pubkey,
    pub fingerprint: &'static str,
    #[serde(flatten)]
    pub action: MarketAction,
}

/// Bounds-checked view over one instruction's accounts and data.
struct InstructionView<'a> {
    ix: &'a RecordedInstruction,
    name: &'static str,
}

impl<'a> InstructionView<'a> {
    fn account(&self, index: usize) -> MarketResult<Pubkey> {
        self.ix.accounts.get(index).copied().ok_or(MarketError::MalformedRecord {
            kind: self.name,
            expected: index + 1,
            actual: self.ix.accounts.len(),
        })
    }

    fn bytes<const N: usize>(&self, offset: usize) -> MarketResult<[u8; N]> {
        let slice = self.ix.data.get(offset..offset + N).ok_or(MarketError::MalformedRecord {
            kind: self.name,
            expected: offset + N,
            actual: self.ix.data.len(),
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u64(&self, offset: usize) -> MarketResult<u64> {
        self.bytes::<8>(offset).map(u64::from_le_bytes)
    }

    fn i64(&self, offset: usize) -> MarketResult<i64> {
        self.bytes::<8>(offset).map(i64::from_le_bytes)
    }

    fn pubkey(&self, offset: usize) -> MarketResult<Pubkey> {
        self.bytes::<32>(offset).map(Pubkey::new_from_array)
    }
}

/// Decodes events for one program id.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    pub program_id: Pubkey,
    /// Print every fingerprint match to stderr.
    pub verbose: bool,
}

impl EventDecoder {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id, verbose: false }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Decode every marketplace instruction in `tx`.
    ///
    /// Instructions of other programs are ignored. Marketplace instructions
    /// whose fingerprint is not registered are skipped, and so are those
    /// that fail to decode (with a warning); their siblings still decode.
    pub fn decode(&self, tx: &HistoricalTransaction) -> Vec<MarketEvent> {
        let mut events = Vec::new();
        for (index, ix) in tx.instructions.iter().enumerate() {
            if ix.program_id != self.program_id {
                continue;
            }
            match self.decode_instruction(tx, index) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(MarketError::AmbiguousEventFingerprint { prefix }) => {
                    if self.verbose {
                        eprintln!("⚠️  {} #{}: unregistered fingerprint {}, skipped", tx.signature, index, prefix);
                    }
                }
                Err(e) => eprintln!("⚠️  {} #{}: {}, skipped", tx.signature, index, e),
            }
        }
        events
    }

    /// Decode the top-level instruction at `index`.
    ///
    /// Returns `Ok(None)` when the data is too short to fingerprint.
    pub fn decode_instruction(&self, tx: &HistoricalTransaction, index: usize) -> MarketResult<Option<MarketEvent>> {
        let Some(ix) = tx.instructions.get(index) else {
            return Ok(None);
        };
        let Some(print) = fingerprint(&ix.data) else {
            return Ok(None);
        };
        let entry = classify(&ix.data).ok_or(MarketError::AmbiguousEventFingerprint { prefix: print })?;
        if self.verbose {
            eprintln!(
                "🔎 {} #{}: {} → {}{}",
                tx.signature,
                index,
                entry.prefix,
                entry.instruction.name(),
                if entry.legacy { " (legacy layout)" } else { "" }
            );
        }
        let view = InstructionView { ix, name: entry.instruction.name() };
        let action = decode_action(entry, &view, tx, index)?;
        Ok(Some(MarketEvent {
            signature: tx.signature.clone(),
            block_time: tx.block_time,
            signer: view.account(0)?,
            fingerprint: entry.prefix,
            action,
        }))
    }
}

fn decode_action(
    entry: &FingerprintEntry,
    v: &InstructionView<'_>,
    tx: &HistoricalTransaction,
    index: usize,
) -> MarketResult<MarketAction> {
    let at = entry.args_offset;
    let paid_from = |account: usize| -> MarketResult<u64> { Ok(tx.transferred_from(index, &v.account(account)?)) };
    Ok(match entry.instruction {
        MarketInstruction::Initialize => MarketAction::Initialize,
        MarketInstruction::UpdateFee => MarketAction::UpdateFee { sol_fee: v.u64(at)? },
        MarketInstruction::AddTeamTreasury => MarketAction::AddTreasury {
            address: v.pubkey(at)?,
            rate: v.u64(at + 32)?,
        },
        MarketInstruction::RemoveTeamTreasury => MarketAction::RemoveTreasury { address: v.pubkey(at)? },
        MarketInstruction::InitUserPool => MarketAction::InitUser,
        MarketInstruction::InitSellData => MarketAction::InitListing { mint: v.pubkey(at)? },
        MarketInstruction::InitOfferData => MarketAction::InitOffer { mint: v.pubkey(at)? },
        MarketInstruction::InitAuctionData => MarketAction::InitAuction { mint: v.pubkey(at)? },
        MarketInstruction::ListNftForSale => MarketAction::List { mint: v.account(5)?, price: v.u64(at)? },
        MarketInstruction::DelistNft => MarketAction::Delist { mint: v.account(5)? },
        MarketInstruction::SetPrice => MarketAction::SetPrice { mint: v.account(2)?, price: v.u64(at)? },
        MarketInstruction::Transfer => MarketAction::Transfer { mint: v.account(4)?, recipient: v.account(2)? },
        MarketInstruction::TransferFromVault => MarketAction::TransferFromVault {
            mint: v.account(6)?,
            recipient: v.account(3)?,
        },
        MarketInstruction::Purchase => MarketAction::Purchase {
            mint: v.account(8)?,
            buyer: v.account(0)?,
            seller: v.account(6)?,
            price: paid_from(0)?,
        },
        MarketInstruction::DepositToEscrow => MarketAction::Deposit { amount: v.u64(at)? },
        MarketInstruction::WithdrawFromEscrow => MarketAction::Withdraw { amount: v.u64(at)? },
        MarketInstruction::MakeOffer => MarketAction::MakeOffer {
            mint: v.account(3)?,
            price: paid_from(0)?,
            offer_price: v.u64(at)?,
        },
        MarketInstruction::CancelOffer => MarketAction::CancelOffer { mint: v.account(2)? },
        MarketInstruction::AcceptOffer => MarketAction::AcceptOffer {
            mint: v.account(5)?,
            buyer: v.account(2)?,
            seller: v.account(0)?,
            price: paid_from(10)?,
        },
        MarketInstruction::CreateAuction => {
            let duration = v.i64(at + 16)?;
            MarketAction::CreateAuction {
                mint: v.account(5)?,
                start_price: v.u64(at)?,
                min_increase: v.u64(at + 8)?,
                duration,
                end_date: tx.block_time.map(|t| t.saturating_add(duration)),
            }
        }
        MarketInstruction::PlaceBid => MarketAction::PlaceBid {
            mint: v.account(2)?,
            price: paid_from(0)?,
            bid: v.u64(at)?,
        },
        MarketInstruction::ClaimAuction => MarketAction::ClaimAuction {
            mint: v.account(5)?,
            buyer: v.account(0)?,
            seller: v.account(8)?,
            price: paid_from(6)?,
        },
        MarketInstruction::UpdateReserve => MarketAction::UpdateReserve { mint: v.account(2)?, price: v.u64(at)? },
        MarketInstruction::CancelAuction => MarketAction::CancelAuction { mint: v.account(5)? },
    })
}

/// Build an inner system transfer, mostly for fixtures.
pub fn system_transfer(source: Pubkey, destination: Pubkey, lamports: u64) -> InnerInstruction {
    InnerInstruction::SystemTransfer { source, destination, lamports }
}

/// Readable one-line summary of an event for CLI output.
pub fn describe(event: &MarketEvent) -> String {
    let mint_of = |mint: &Pubkey| to_base58(mint);
    let body = match &event.action {
        MarketAction::Initialize => "initialize".to_string(),
        MarketAction::UpdateFee { sol_fee } => format!("update fee → {}", sol_fee),
        MarketAction::AddTreasury { address, rate } => format!("add treasury {} @ {}", to_base58(address), rate),
        MarketAction::RemoveTreasury { address } => format!("remove treasury {}", to_base58(address)),
        MarketAction::InitUser => "init user".to_string(),
        MarketAction::InitListing { mint } => format!("init listing {}", mint_of(mint)),
        MarketAction::List { mint, price } => format!("list {} for {}", mint_of(mint), price),
        MarketAction::Delist { mint } => format!("delist {}", mint_of(mint)),
        MarketAction::SetPrice { mint, price } => format!("set price {} → {}", mint_of(mint), price),
        MarketAction::Transfer { mint, recipient } => {
            format!("transfer {} → {}", mint_of(mint), to_base58(recipient))
        }
        MarketAction::TransferFromVault { mint, recipient } => {
            format!("transfer from vault {} → {}", mint_of(mint), to_base58(recipient))
        }
        MarketAction::Purchase { mint, seller, price, .. } => {
            format!("purchase {} from {} for {}", mint_of(mint), to_base58(seller), price)
        }
        MarketAction::Deposit { amount } => format!("deposit {}", amount),
        MarketAction::Withdraw { amount } => format!("withdraw {}", amount),
        MarketAction::InitOffer { mint } => format!("init offer {}", mint_of(mint)),
        MarketAction::MakeOffer { mint, offer_price, .. } => format!("offer {} on {}", offer_price, mint_of(mint)),
        MarketAction::CancelOffer { mint } => format!("cancel offer {}", mint_of(mint)),
        MarketAction::AcceptOffer { mint, buyer, price, .. } => {
            format!("accept offer {} from {} for {}", mint_of(mint), to_base58(buyer), price)
        }
        MarketAction::InitAuction { mint } => format!("init auction {}", mint_of(mint)),
        MarketAction::CreateAuction { mint, start_price, duration, .. } => {
            format!("auction {} from {} for {}s", mint_of(mint), start_price, duration)
        }
        MarketAction::PlaceBid { mint, bid, .. } => format!("bid {} on {}", bid, mint_of(mint)),
        MarketAction::ClaimAuction { mint, price, .. } => format!("claim {} for {}", mint_of(mint), price),
        MarketAction::UpdateReserve { mint, price } => format!("reserve {} → {}", mint_of(mint), price),
        MarketAction::CancelAuction { mint } => format!("cancel auction {}", mint_of(mint)),
    };
    format!("{} {} {}", event.signature, to_base58(&event.signer), body)
}

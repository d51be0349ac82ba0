//! Fixed-layout codec for the marketplace program's account records.
//!
//! Every record starts with the storage layer's 8-byte kind header,
//! followed by fields at fixed offsets. Integers are little-endian;
//! timestamps and durations are signed.

use serde::Serialize;
use sha2::{Digest, Sha256};
use solana_pubkey::Pubkey;

use crate::address::serde_base58;
use crate::error::{MarketError, MarketResult};
use crate::validation::validate_record_len;

/// Length of the kind header preceding every payload.
pub const HEADER_LEN: usize = 8;
/// Fee and treasury rates are expressed in parts per ten thousand.
pub const PERMYRIAD: u64 = 10_000;
/// Treasury slots in the global record.
pub const TREASURY_CAPACITY: usize = 8;

/// Header bytes the storage layer writes for a record type name.
pub fn account_discriminator(type_name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("account:{}", type_name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// A record kind with a fixed on-ledger size.
pub trait Record: Sized {
    /// Human-readable kind name used in errors and logs.
    const KIND: &'static str;
    /// Total byte length, header included.
    const SIZE: usize;
    /// Header bytes written by the storage layer.
    const DISCRIMINATOR: [u8; 8];

    fn decode(bytes: &[u8]) -> MarketResult<Self>;

    fn encode(&self) -> Vec<u8>;

    /// Whether a scan should return this record.
    fn is_live(&self) -> bool {
        true
    }

    /// Whether `bytes` carry this kind's header.
    fn has_header(bytes: &[u8]) -> bool {
        bytes.len() >= HEADER_LEN && bytes[..HEADER_LEN] == Self::DISCRIMINATOR
    }
}

/// The record kinds a scan can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    GlobalConfig,
    Listing,
    Offer,
    Auction,
    UserAccount,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::GlobalConfig,
        RecordKind::Listing,
        RecordKind::Offer,
        RecordKind::Auction,
        RecordKind::UserAccount,
    ];

    pub fn size(self) -> usize {
        match self {
            RecordKind::GlobalConfig => GlobalConfig::SIZE,
            RecordKind::Listing => Listing::SIZE,
            RecordKind::Offer => Offer::SIZE,
            RecordKind::Auction => Auction::SIZE,
            RecordKind::UserAccount => UserAccount::SIZE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RecordKind::GlobalConfig => GlobalConfig::KIND,
            RecordKind::Listing => Listing::KIND,
            RecordKind::Offer => Offer::KIND,
            RecordKind::Auction => Auction::KIND,
            RecordKind::UserAccount => UserAccount::KIND,
        }
    }

    /// Parse a kebab or snake case kind name as typed on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "global" | "global-config" => Some(RecordKind::GlobalConfig),
            "listing" | "sell" => Some(RecordKind::Listing),
            "offer" => Some(RecordKind::Offer),
            "auction" => Some(RecordKind::Auction),
            "user" | "user-account" => Some(RecordKind::UserAccount),
            _ => None,
        }
    }
}

/// Any decoded record, for callers that pick the kind at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum AnyRecord {
    GlobalConfig(GlobalConfig),
    Listing(Listing),
    Offer(Offer),
    Auction(Auction),
    UserAccount(UserAccount),
}

impl AnyRecord {
    pub fn decode(kind: RecordKind, bytes: &[u8]) -> MarketResult<Self> {
        Ok(match kind {
            RecordKind::GlobalConfig => AnyRecord::GlobalConfig(GlobalConfig::decode(bytes)?),
            RecordKind::Listing => AnyRecord::Listing(Listing::decode(bytes)?),
            RecordKind::Offer => AnyRecord::Offer(Offer::decode(bytes)?),
            RecordKind::Auction => AnyRecord::Auction(Auction::decode(bytes)?),
            RecordKind::UserAccount => AnyRecord::UserAccount(UserAccount::decode(bytes)?),
        })
    }

    pub fn is_live(&self) -> bool {
        match self {
            AnyRecord::GlobalConfig(r) => r.is_live(),
            AnyRecord::Listing(r) => r.is_live(),
            AnyRecord::Offer(r) => r.is_live(),
            AnyRecord::Auction(r) => r.is_live(),
            AnyRecord::UserAccount(r) => r.is_live(),
        }
    }
}

// ─── Field cursor ────────────────────────────────────────────────

struct FieldReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    fn new(kind: &'static str, size: usize, bytes: &'a [u8]) -> MarketResult<Self> {
        validate_record_len(kind, size, bytes.len())?;
        Ok(Self { bytes, offset: HEADER_LEN })
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        out
    }

    fn pubkey(&mut self) -> Pubkey {
        Pubkey::new_from_array(self.take::<32>())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take::<8>())
    }

    fn i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take::<8>())
    }
}

struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    fn new(discriminator: [u8; 8], size: usize) -> Self {
        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(&discriminator);
        Self { buf }
    }

    fn pubkey(mut self, key: &Pubkey) -> Self {
        self.buf.extend_from_slice(key.as_ref());
        self
    }

    fn u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn i64(mut self, value: i64) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

// ─── Global config ───────────────────────────────────────────────

/// Treasury recipients: up to eight (address, rate) slots plus an active count.
///
/// Slots past `len()` are padding. They are kept as read so that
/// re-encoding reproduces the stored bytes exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreasuryList {
    count: u64,
    #[serde(serialize_with = "serialize_slots")]
    addresses: [Pubkey; TREASURY_CAPACITY],
    rates: [u64; TREASURY_CAPACITY],
}

fn serialize_slots<S: serde::Serializer>(
    keys: &[Pubkey; TREASURY_CAPACITY],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(keys.len()))?;
    for key in keys {
        seq.serialize_element(&crate::address::to_base58(key))?;
    }
    seq.end()
}

impl Default for TreasuryList {
    fn default() -> Self {
        Self {
            count: 0,
            addresses: [Pubkey::default(); TREASURY_CAPACITY],
            rates: [0; TREASURY_CAPACITY],
        }
    }
}

impl TreasuryList {
    /// Build a list from active entries, leaving the remaining slots zeroed.
    pub fn from_entries(entries: &[(Pubkey, u64)]) -> MarketResult<Self> {
        if entries.len() > TREASURY_CAPACITY {
            return Err(MarketError::TreasuryCapacity {
                capacity: TREASURY_CAPACITY,
                actual: entries.len(),
            });
        }
        let mut list = Self::default();
        for (i, (address, rate)) in entries.iter().enumerate() {
            list.addresses[i] = *address;
            list.rates[i] = *rate;
        }
        list.count = entries.len() as u64;
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Active (address, rate) pairs in configuration order.
    pub fn active(&self) -> impl Iterator<Item = (Pubkey, u64)> + '_ {
        self.addresses
            .iter()
            .zip(self.rates.iter())
            .take(self.len())
            .map(|(a, r)| (*a, *r))
    }

    /// Active addresses in configuration order.
    pub fn addresses(&self) -> Vec<Pubkey> {
        self.active().map(|(a, _)| a).collect()
    }

    /// Sum of active rates, in permyriad.
    pub fn total_rate(&self) -> u64 {
        self.active().map(|(_, r)| r).fold(0u64, u64::saturating_add)
    }
}

/// Marketplace-wide singleton: admin, flat fee and treasury split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalConfig {
    #[serde(with = "serde_base58")]
    pub super_admin: Pubkey,
    pub market_fee_sol: u64,
    pub treasury: TreasuryList,
}

impl Record for GlobalConfig {
    const KIND: &'static str = "GlobalConfig";
    const SIZE: usize = 376;
    const DISCRIMINATOR: [u8; 8] = [162, 244, 124, 37, 148, 94, 28, 50];

    fn decode(bytes: &[u8]) -> MarketResult<Self> {
        let mut r = FieldReader::new(Self::KIND, Self::SIZE, bytes)?;
        let super_admin = r.pubkey();
        let market_fee_sol = r.u64();
        let count = r.u64();
        if count > TREASURY_CAPACITY as u64 {
            return Err(MarketError::TreasuryCapacity {
                capacity: TREASURY_CAPACITY,
                actual: usize::try_from(count).unwrap_or(usize::MAX),
            });
        }
        let mut treasury = TreasuryList { count, ..TreasuryList::default() };
        for slot in treasury.addresses.iter_mut() {
            *slot = r.pubkey();
        }
        for slot in treasury.rates.iter_mut() {
            *slot = r.u64();
        }
        Ok(Self { super_admin, market_fee_sol, treasury })
    }

    fn encode(&self) -> Vec<u8> {
        let mut w = FieldWriter::new(Self::DISCRIMINATOR, Self::SIZE)
            .pubkey(&self.super_admin)
            .u64(self.market_fee_sol)
            .u64(self.treasury.count);
        for key in &self.treasury.addresses {
            w = w.pubkey(key);
        }
        for rate in &self.treasury.rates {
            w = w.u64(*rate);
        }
        w.finish()
    }
}

// ─── Listing ─────────────────────────────────────────────────────

/// Sale listing for one mint. Stays on the ledger with `active = 0` after delist or sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    #[serde(with = "serde_base58")]
    pub mint: Pubkey,
    #[serde(with = "serde_base58")]
    pub seller: Pubkey,
    #[serde(with = "serde_base58")]
    pub collection: Pubkey,
    pub price: u64,
    pub listed_date: i64,
    pub active: u64,
}

impl Record for Listing {
    const KIND: &'static str = "Listing";
    const SIZE: usize = 128;
    const DISCRIMINATOR: [u8; 8] = [40, 65, 228, 85, 42, 150, 106, 168];

    fn decode(bytes: &[u8]) -> MarketResult<Self> {
        let mut r = FieldReader::new(Self::KIND, Self::SIZE, bytes)?;
        Ok(Self {
            mint: r.pubkey(),
            seller: r.pubkey(),
            collection: r.pubkey(),
            price: r.u64(),
            listed_date: r.i64(),
            active: r.u64(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        FieldWriter::new(Self::DISCRIMINATOR, Self::SIZE)
            .pubkey(&self.mint)
            .pubkey(&self.seller)
            .pubkey(&self.collection)
            .u64(self.price)
            .i64(self.listed_date)
            .u64(self.active)
            .finish()
    }

    fn is_live(&self) -> bool {
        self.active == 1
    }
}

// ─── Offer ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Offer {
    #[serde(with = "serde_base58")]
    pub mint: Pubkey,
    #[serde(with = "serde_base58")]
    pub buyer: Pubkey,
    pub offer_price: u64,
    pub offer_listing_date: i64,
    pub active: u64,
}

impl Record for Offer {
    const KIND: &'static str = "Offer";
    const SIZE: usize = 96;
    const DISCRIMINATOR: [u8; 8] = [100, 210, 219, 73, 49, 238, 125, 31];

    fn decode(bytes: &[u8]) -> MarketResult<Self> {
        let mut r = FieldReader::new(Self::KIND, Self::SIZE, bytes)?;
        Ok(Self {
            mint: r.pubkey(),
            buyer: r.pubkey(),
            offer_price: r.u64(),
            offer_listing_date: r.i64(),
            active: r.u64(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        FieldWriter::new(Self::DISCRIMINATOR, Self::SIZE)
            .pubkey(&self.mint)
            .pubkey(&self.buyer)
            .u64(self.offer_price)
            .i64(self.offer_listing_date)
            .u64(self.active)
            .finish()
    }

    fn is_live(&self) -> bool {
        self.active == 1
    }
}

// ─── Auction ─────────────────────────────────────────────────────

/// Known auction status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuctionStatus {
    Cancelled,
    Started,
    Claimed,
    /// Running, and the mint is also listed for direct sale.
    Reserved,
}

impl AuctionStatus {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(AuctionStatus::Cancelled),
            1 => Some(AuctionStatus::Started),
            2 => Some(AuctionStatus::Claimed),
            3 => Some(AuctionStatus::Reserved),
            _ => None,
        }
    }

    pub fn code(self) -> u64 {
        match self {
            AuctionStatus::Cancelled => 0,
            AuctionStatus::Started => 1,
            AuctionStatus::Claimed => 2,
            AuctionStatus::Reserved => 3,
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, AuctionStatus::Started | AuctionStatus::Reserved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Auction {
    #[serde(with = "serde_base58")]
    pub mint: Pubkey,
    #[serde(with = "serde_base58")]
    pub creator: Pubkey,
    pub start_price: u64,
    pub min_increase: u64,
    pub start_date: i64,
    pub last_bid_date: i64,
    #[serde(with = "serde_base58")]
    pub last_bidder: Pubkey,
    pub highest_bid: u64,
    pub duration: i64,
    /// Raw status code as stored; see [`AuctionStatus`].
    pub status: u64,
}

impl Auction {
    pub fn status(&self) -> Option<AuctionStatus> {
        AuctionStatus::from_code(self.status)
    }

    /// Whether anyone has bid yet.
    pub fn has_bid(&self) -> bool {
        self.last_bidder != Pubkey::default()
    }

    pub fn end_date(&self) -> i64 {
        self.start_date.saturating_add(self.duration)
    }
}

impl Record for Auction {
    const KIND: &'static str = "Auction";
    const SIZE: usize = 160;
    const DISCRIMINATOR: [u8; 8] = [72, 15, 100, 35, 242, 55, 1, 93];

    fn decode(bytes: &[u8]) -> MarketResult<Self> {
        let mut r = FieldReader::new(Self::KIND, Self::SIZE, bytes)?;
        Ok(Self {
            mint: r.pubkey(),
            creator: r.pubkey(),
            start_price: r.u64(),
            min_increase: r.u64(),
            start_date: r.i64(),
            last_bid_date: r.i64(),
            last_bidder: r.pubkey(),
            highest_bid: r.u64(),
            duration: r.i64(),
            status: r.u64(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        FieldWriter::new(Self::DISCRIMINATOR, Self::SIZE)
            .pubkey(&self.mint)
            .pubkey(&self.creator)
            .u64(self.start_price)
            .u64(self.min_increase)
            .i64(self.start_date)
            .i64(self.last_bid_date)
            .pubkey(&self.last_bidder)
            .u64(self.highest_bid)
            .i64(self.duration)
            .u64(self.status)
            .finish()
    }

    fn is_live(&self) -> bool {
        self.status().map(AuctionStatus::is_live).unwrap_or(false)
    }
}

// ─── User account ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    #[serde(with = "serde_base58")]
    pub address: Pubkey,
    pub traded_volume: u64,
    pub escrow_sol_balance: u64,
}

impl Record for UserAccount {
    const KIND: &'static str = "UserAccount";
    const SIZE: usize = 56;
    const DISCRIMINATOR: [u8; 8] = [139, 248, 167, 203, 253, 220, 210, 221];

    fn decode(bytes: &[u8]) -> MarketResult<Self> {
        let mut r = FieldReader::new(Self::KIND, Self::SIZE, bytes)?;
        Ok(Self {
            address: r.pubkey(),
            traded_volume: r.u64(),
            escrow_sol_balance: r.u64(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        FieldWriter::new(Self::DISCRIMINATOR, Self::SIZE)
            .pubkey(&self.address)
            .u64(self.traded_volume)
            .u64(self.escrow_sol_balance)
            .finish()
    }
}

//! Creator lookup for royalty-bearing instructions.

use mugs_market_core::address::to_base58;
use mugs_market_core::error::{MarketError, MarketResult};
use mugs_market_core::metadata::AssetMetadata;
use mugs_market_core::pda::find_metadata;
use solana_pubkey::Pubkey;

use crate::config::MarketContext;
use crate::ledger::{with_timeout, LedgerQuery};

/// Resolves the creator list of an asset.
#[allow(async_fn_in_trait)]
pub trait CreatorSource {
    async fn creators(&self, mint: &Pubkey) -> MarketResult<Vec<Pubkey>>;
}

/// Reads creators from the asset's metadata account on the ledger.
pub struct LedgerCreators<'a, L> {
    ctx: &'a MarketContext,
    ledger: &'a L,
}

impl<'a, L: LedgerQuery> LedgerCreators<'a, L> {
    pub fn new(ctx: &'a MarketContext, ledger: &'a L) -> Self {
        Self { ctx, ledger }
    }

    pub async fn metadata(&self, mint: &Pubkey) -> MarketResult<AssetMetadata> {
        let (address, _) = find_metadata(mint)?;
        let bytes = with_timeout(self.ctx, "get_metadata", self.ledger.get_account(&address))
            .await?
            .ok_or_else(|| MarketError::RecordAbsent { kind: "Metadata", address: to_base58(&address) })?;
        AssetMetadata::decode(&bytes)
    }
}

impl<L: LedgerQuery> CreatorSource for LedgerCreators<'_, L> {
    async fn creators(&self, mint: &Pubkey) -> MarketResult<Vec<Pubkey>> {
        Ok(self.metadata(mint).await?.creator_addresses())
    }
}

/// Fixed creator list, for dry runs without metadata accounts.
#[derive(Debug, Clone, Default)]
pub struct FixedCreators(pub Vec<Pubkey>);

impl CreatorSource for FixedCreators {
    async fn creators(&self, _mint: &Pubkey) -> MarketResult<Vec<Pubkey>> {
        Ok(self.0.clone())
    }
}

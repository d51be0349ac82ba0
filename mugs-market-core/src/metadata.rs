//! Asset metadata records and their royalty creator list.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::error::{MarketError, MarketResult};

/// A royalty recipient declared by an asset's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    pub share: u8,
}

/// Leading fields of a metadata record, through the creator list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMetadata {
    pub update_authority: Pubkey,
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Vec<Creator>,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct RawCreator {
    address: [u8; 32],
    verified: bool,
    share: u8,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct RawMetadata {
    key: u8,
    update_authority: [u8; 32],
    mint: [u8; 32],
    name: String,
    symbol: String,
    uri: String,
    seller_fee_basis_points: u16,
    creators: Option<Vec<RawCreator>>,
}

/// Key byte identifying a v1 metadata record.
const METADATA_V1_KEY: u8 = 4;

impl AssetMetadata {
    /// Parse the record prefix. Trailing fields after the creators are ignored.
    pub fn decode(bytes: &[u8]) -> MarketResult<Self> {
        let mut cursor = bytes;
        let raw = RawMetadata::deserialize(&mut cursor).map_err(|e| MarketError::Deserialization {
            kind: "Metadata",
            message: e.to_string(),
        })?;
        Ok(Self {
            update_authority: Pubkey::new_from_array(raw.update_authority),
            mint: Pubkey::new_from_array(raw.mint),
            name: raw.name.trim_end_matches('\0').to_string(),
            symbol: raw.symbol.trim_end_matches('\0').to_string(),
            uri: raw.uri.trim_end_matches('\0').to_string(),
            seller_fee_basis_points: raw.seller_fee_basis_points,
            creators: raw
                .creators
                .unwrap_or_default()
                .into_iter()
                .map(|c| Creator {
                    address: Pubkey::new_from_array(c.address),
                    verified: c.verified,
                    share: c.share,
                })
                .collect(),
        })
    }

    pub fn encode(&self) -> MarketResult<Vec<u8>> {
        let raw = RawMetadata {
            key: METADATA_V1_KEY,
            update_authority: self.update_authority.to_bytes(),
            mint: self.mint.to_bytes(),
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            uri: self.uri.clone(),
            seller_fee_basis_points: self.seller_fee_basis_points,
            creators: if self.creators.is_empty() {
                None
            } else {
                Some(
                    self.creators
                        .iter()
                        .map(|c| RawCreator {
                            address: c.address.to_bytes(),
                            verified: c.verified,
                            share: c.share,
                        })
                        .collect(),
                )
            },
        };
        borsh::to_vec(&raw).map_err(|e| MarketError::Deserialization {
            kind: "Metadata",
            message: e.to_string(),
        })
    }

    pub fn creator_addresses(&self) -> Vec<Pubkey> {
        self.creators.iter().map(|c| c.address).collect()
    }
}

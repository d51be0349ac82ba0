//! Historical transaction retrieval and conversion.
//!
//! Accepts the parsed-JSON transaction shape returned by ledger RPC
//! nodes and turns it into [`HistoricalTransaction`] for the event
//! decoder.

use mugs_market_core::address::parse_address;
use mugs_market_core::error::{MarketError, MarketResult};
use mugs_market_core::events::{
    system_transfer, EventDecoder, HistoricalTransaction, InnerInstruction, InnerInstructionGroup, MarketEvent,
    RecordedInstruction,
};
use base58::FromBase58;
use serde::Deserialize;
use serde_json::Value;
use solana_pubkey::Pubkey;

use crate::config::MarketContext;
use crate::ledger::{with_timeout, LedgerQuery};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    #[serde(default)]
    pub block_time: Option<i64>,
    pub transaction: RpcTransactionBody,
    #[serde(default)]
    pub meta: Option<RpcMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcTransactionBody {
    pub signatures: Vec<String>,
    pub message: RpcMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcMessage {
    pub instructions: Vec<RpcInstruction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub inner_instructions: Option<Vec<RpcInnerGroup>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcInnerGroup {
    pub index: usize,
    pub instructions: Vec<RpcInstruction>,
}

/// An instruction as rendered by the node: decoded for known programs,
/// raw accounts and base58 data otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RpcInstruction {
    #[serde(rename_all = "camelCase")]
    Parsed { program_id: String, #[serde(default)] program: Option<String>, parsed: Value },
    #[serde(rename_all = "camelCase")]
    Raw { program_id: String, #[serde(default)] accounts: Vec<String>, #[serde(default)] data: String },
}

impl RpcInstruction {
    fn program_id(&self) -> MarketResult<Pubkey> {
        match self {
            RpcInstruction::Parsed { program_id, .. } | RpcInstruction::Raw { program_id, .. } => {
                parse_address(program_id)
            }
        }
    }

    fn to_recorded(&self) -> MarketResult<RecordedInstruction> {
        let program_id = self.program_id()?;
        match self {
            RpcInstruction::Raw { accounts, data, .. } => Ok(RecordedInstruction {
                program_id,
                accounts: accounts.iter().map(|a| parse_address(a)).collect::<MarketResult<_>>()?,
                data: data.from_base58().map_err(|e| MarketError::Deserialization {
                    kind: "Instruction",
                    message: format!("invalid base58 data: {:?}", e),
                })?,
            }),
            RpcInstruction::Parsed { .. } => Ok(RecordedInstruction { program_id, accounts: vec![], data: vec![] }),
        }
    }

    fn to_inner(&self) -> MarketResult<InnerInstruction> {
        let program_id = self.program_id()?;
        if let RpcInstruction::Parsed { program: Some(program), parsed, .. } = self {
            if program == "system" && parsed.get("type").and_then(Value::as_str) == Some("transfer") {
                let info = &parsed["info"];
                let field = |name: &str| {
                    info.get(name).and_then(Value::as_str).ok_or_else(|| MarketError::Deserialization {
                        kind: "SystemTransfer",
                        message: format!("missing '{}'", name),
                    })
                };
                let lamports = info.get("lamports").and_then(Value::as_u64).ok_or_else(|| {
                    MarketError::Deserialization { kind: "SystemTransfer", message: "missing 'lamports'".to_string() }
                })?;
                return Ok(system_transfer(
                    parse_address(field("source")?)?,
                    parse_address(field("destination")?)?,
                    lamports,
                ));
            }
        }
        Ok(InnerInstruction::Other { program_id })
    }
}

impl RpcTransaction {
    /// Convert for decoding. Failed transactions yield `None`.
    pub fn into_historical(self) -> MarketResult<Option<HistoricalTransaction>> {
        let failed = self.meta.as_ref().and_then(|m| m.err.as_ref()).map(|e| !e.is_null()).unwrap_or(false);
        if failed {
            return Ok(None);
        }
        let signature = self.transaction.signatures.first().cloned().ok_or_else(|| {
            MarketError::Deserialization { kind: "Transaction", message: "no signatures".to_string() }
        })?;
        let instructions = self
            .transaction
            .message
            .instructions
            .iter()
            .map(RpcInstruction::to_recorded)
            .collect::<MarketResult<Vec<_>>>()?;
        let mut inner_instructions = Vec::new();
        for group in self.meta.and_then(|m| m.inner_instructions).unwrap_or_default() {
            inner_instructions.push(InnerInstructionGroup {
                index: group.index,
                instructions: group.instructions.iter().map(RpcInstruction::to_inner).collect::<MarketResult<_>>()?,
            });
        }
        Ok(Some(HistoricalTransaction { signature, block_time: self.block_time, instructions, inner_instructions }))
    }
}

/// Parse one RPC transaction object or an array of them.
///
/// Only unreadable JSON fails the call. Entries that do not convert are
/// reported and skipped.
pub fn parse_rpc_transactions(json: &str) -> MarketResult<Vec<HistoricalTransaction>> {
    let value: Value = serde_json::from_str(json).map_err(|e| MarketError::Deserialization {
        kind: "Transaction",
        message: e.to_string(),
    })?;
    let items = match value {
        Value::Array(items) => items,
        single => vec![single],
    };
    let mut out = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        let converted = serde_json::from_value::<RpcTransaction>(item)
            .map_err(|e| MarketError::Deserialization { kind: "Transaction", message: e.to_string() })
            .and_then(RpcTransaction::into_historical);
        match converted {
            Ok(tx) => out.extend(tx),
            Err(e) => eprintln!("⚠️  Skipping transaction #{}: {}", position, e),
        }
    }
    Ok(out)
}

/// Decode every marketplace event in `transactions`, in order.
pub fn decode_all(ctx: &MarketContext, transactions: &[HistoricalTransaction]) -> Vec<MarketEvent> {
    let decoder = EventDecoder::new(ctx.program_id).verbose(ctx.verbose);
    transactions.iter().flat_map(|tx| decoder.decode(tx)).collect()
}

/// Events from every transaction that touched `address`, newest first.
///
/// Transactions that cannot be fetched or decoded are reported and skipped.
pub async fn fetch_events<L: LedgerQuery>(
    ctx: &MarketContext,
    ledger: &L,
    address: &Pubkey,
) -> MarketResult<Vec<MarketEvent>> {
    let decoder = EventDecoder::new(ctx.program_id).verbose(ctx.verbose);
    let signatures = with_timeout(ctx, "signatures_for_address", ledger.signatures_for_address(address)).await?;
    let mut events = Vec::new();
    for signature in signatures {
        let tx = match with_timeout(ctx, "get_transaction", ledger.get_transaction(&signature)).await {
            Ok(Some(tx)) => tx,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("⚠️  {}: {}", signature, e);
                continue;
            }
        };
        events.extend(decoder.decode(&tx));
    }
    Ok(events)
}

//! Shared data types passed between the assembler and the orchestrator.

use serde::{Deserialize, Serialize};
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;

/// Output of the assembler for one marketplace action.
///
/// Setup instructions (associated account creation, record init) run
/// before the primary instruction in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSet {
    pub setup: Vec<Instruction>,
    pub primary: Instruction,
}

impl InstructionSet {
    /// A primary instruction with no setup.
    pub fn primary_only(primary: Instruction) -> Self {
        Self { setup: vec![], primary }
    }

    /// A primary instruction preceded by setup instructions.
    pub fn with_setup(setup: Vec<Instruction>, primary: Instruction) -> Self {
        Self { setup, primary }
    }

    /// Prepend another setup instruction.
    pub fn prepend(&mut self, ix: Instruction) {
        self.setup.insert(0, ix);
    }

    /// Flatten into submission order.
    pub fn into_instructions(self) -> Vec<Instruction> {
        let mut all = self.setup;
        all.push(self.primary);
        all
    }
}

/// An unsigned transaction ready for the external signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub payer: Pubkey,
    pub instructions: Vec<Instruction>,
}

impl PreparedTransaction {
    pub fn new(payer: Pubkey, set: InstructionSet) -> Self {
        Self { payer, instructions: set.into_instructions() }
    }

    /// Number of instructions whose opcode matches `discriminator`.
    pub fn count_with_opcode(&self, discriminator: &[u8; 8]) -> usize {
        self.instructions
            .iter()
            .filter(|ix| ix.data.len() >= 8 && ix.data[..8] == discriminator[..])
            .count()
    }
}

/// Confirmation level requested from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "processed" => Some(Commitment::Processed),
            "confirmed" => Some(Commitment::Confirmed),
            "finalized" => Some(Commitment::Finalized),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

use crate::tx::Transaction;
use crate::uint160::UInt160;
use crate::uint256::UInt256;
use serde::{Deserialize, Serialize};

/// The header fields of a block that the native-contract layer consumes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of this block.
    pub hash: UInt256,
    /// Hash of the previous block. Zero for the genesis block.
    pub prev_hash: UInt256,
    /// Height of this block. The genesis block has index 0.
    pub index: u32,
    /// Millisecond timestamp of this block.
    pub timestamp_ms: u64,
    /// Script hash of the next round's consensus address.
    pub next_consensus: UInt160,
    /// Index of the primary (speaker) consensus node for this block.
    pub primary_index: u8,
}

/// A block as handed to the persistence pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> UInt256 {
        self.header.hash
    }

    pub fn index(&self) -> u32 {
        self.header.index
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.header.timestamp_ms
    }
}

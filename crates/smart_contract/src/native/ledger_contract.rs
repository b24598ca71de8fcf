//! The Ledger contract: the on-chain record of persisted blocks.
//!
//! Stores the header of every persisted block, an index-to-hash lookup,
//! and the current chain tip. Transactions bodies and execution results
//! live outside the native layer.

use crate::application_engine::ApplicationEngine;
use crate::binary::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};
use crate::interop::StackItem;
use crate::native::native_contract::{
    MethodDescriptor, NativeContract, NativeContractMeta, ParamType,
};
use crate::CallFlags;
use neo_core::{BlockHeader, UInt160, UInt256};
use neo_persistence::{DataCache, KeyBuilder, StorageItem};

pub const ID: i32 = -4;

const PREFIX_BLOCK: u8 = 5;
const PREFIX_BLOCK_HASH: u8 = 9;
const PREFIX_CURRENT_BLOCK: u8 = 12;

pub struct LedgerContract {
    meta: NativeContractMeta,
}

impl Default for LedgerContract {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerContract {
    pub fn new() -> Self {
        let methods = vec![
            MethodDescriptor::new(
                "currentHash",
                &[],
                ParamType::Hash256,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "currentIndex",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "getBlock",
                &[("indexOrHash", ParamType::ByteArray)],
                ParamType::Array,
                1 << 16,
                CallFlags::READ_STATES,
            ),
        ];
        Self {
            meta: NativeContractMeta::new("LedgerContract", ID, methods, Vec::new()),
        }
    }

    /// Height of the stored chain tip.
    pub fn current_index(snapshot: &DataCache) -> Option<u32> {
        Self::current_tip(snapshot).map(|(_, index)| index)
    }

    /// Hash of the stored chain tip.
    pub fn current_hash(snapshot: &DataCache) -> Option<UInt256> {
        Self::current_tip(snapshot).map(|(hash, _)| hash)
    }

    /// Hash of the block at `index`.
    pub fn block_hash(snapshot: &DataCache, index: u32) -> Option<UInt256> {
        let key = KeyBuilder::new(ID, PREFIX_BLOCK_HASH)
            .add_u32_be(index)
            .to_key();
        let item = snapshot.try_get(&key)?;
        UInt256::from_bytes(item.as_bytes()).ok()
    }

    /// Header of the block with `hash`, decoded from its stored form.
    pub fn get_header(snapshot: &DataCache, hash: &UInt256) -> Result<Option<BlockHeader>> {
        let key = KeyBuilder::new(ID, PREFIX_BLOCK).add_uint256(hash).to_key();
        match snapshot.try_get(&key) {
            Some(item) => Ok(Some(decode_header(item.as_bytes())?)),
            None => Ok(None),
        }
    }

    /// Millisecond timestamp of the block at `index`.
    pub fn timestamp_of(snapshot: &DataCache, index: u32) -> Result<Option<u64>> {
        let Some(hash) = Self::block_hash(snapshot, index) else {
            return Ok(None);
        };
        Ok(Self::get_header(snapshot, &hash)?.map(|header| header.timestamp_ms))
    }

    fn current_tip(snapshot: &DataCache) -> Option<(UInt256, u32)> {
        let key = KeyBuilder::new(ID, PREFIX_CURRENT_BLOCK).to_key();
        let item = snapshot.try_get(&key)?;
        let bytes = item.as_bytes();
        if bytes.len() != UInt256::LEN + 4 {
            return None;
        }
        let hash = UInt256::from_bytes(&bytes[..UInt256::LEN]).ok()?;
        let mut index_bytes = [0u8; 4];
        index_bytes.copy_from_slice(&bytes[UInt256::LEN..]);
        Some((hash, u32::from_le_bytes(index_bytes)))
    }

    fn get_block(&self, engine: &ApplicationEngine, index_or_hash: &[u8]) -> Result<StackItem> {
        let snapshot = engine.snapshot();
        let hash = if index_or_hash.len() == UInt256::LEN {
            UInt256::from_bytes(index_or_hash)?
        } else if index_or_hash.len() < 8 {
            let mut padded = [0u8; 8];
            padded[..index_or_hash.len()].copy_from_slice(index_or_hash);
            let index = u64::from_le_bytes(padded);
            let index = u32::try_from(index)
                .map_err(|_| Error::InvalidArgument(format!("block index {index} out of range")))?;
            match Self::block_hash(snapshot, index) {
                Some(hash) => hash,
                None => return Ok(StackItem::Null),
            }
        } else {
            return Err(Error::InvalidArgument(
                "expected a block index or a 32-byte hash".into(),
            ));
        };
        let Some(header) = Self::get_header(snapshot, &hash)? else {
            return Ok(StackItem::Null);
        };
        if !Self::is_traceable(engine, header.index) {
            return Ok(StackItem::Null);
        }
        Ok(StackItem::Array(vec![
            StackItem::from(&header.hash),
            StackItem::from(&header.prev_hash),
            StackItem::from(header.index),
            StackItem::from(header.timestamp_ms as i64),
            StackItem::from(&header.next_consensus),
            StackItem::from(header.primary_index as u32),
        ]))
    }

    fn is_traceable(engine: &ApplicationEngine, index: u32) -> bool {
        let Some(current) = Self::current_index(engine.snapshot()) else {
            return false;
        };
        index <= current
            && index + engine.settings().max_traceable_blocks > current
    }
}

impl NativeContract for LedgerContract {
    fn meta(&self) -> &NativeContractMeta {
        &self.meta
    }

    fn invoke(
        &self,
        engine: &mut ApplicationEngine,
        method: &str,
        args: &[StackItem],
    ) -> Result<StackItem> {
        match method {
            "currentHash" => Ok(Self::current_hash(engine.snapshot())
                .map(|hash| StackItem::from(&hash))
                .unwrap_or(StackItem::Null)),
            "currentIndex" => Ok(Self::current_index(engine.snapshot())
                .map(StackItem::from)
                .unwrap_or(StackItem::Null)),
            "getBlock" => self.get_block(engine, &args[0].as_bytes()?),
            _ => Err(Error::MethodNotFound {
                contract: self.meta.name.to_string(),
                method: method.to_string(),
                argc: args.len(),
            }),
        }
    }

    fn on_persist(&self, engine: &mut ApplicationEngine) -> Result<()> {
        let block = engine
            .persisting_block()
            .ok_or_else(|| Error::InvariantViolation("no persisting block".into()))?
            .clone();
        let header_bytes = encode_header(&block.header);
        let snapshot = engine.snapshot_mut();
        snapshot.put(
            KeyBuilder::new(ID, PREFIX_BLOCK_HASH)
                .add_u32_be(block.index())
                .to_key(),
            StorageItem::new(block.hash().to_array().to_vec()),
        );
        snapshot.put(
            KeyBuilder::new(ID, PREFIX_BLOCK)
                .add_uint256(&block.hash())
                .to_key(),
            StorageItem::new(header_bytes),
        );
        let mut tip = Vec::with_capacity(UInt256::LEN + 4);
        tip.extend_from_slice(block.hash().as_bytes());
        tip.extend_from_slice(&block.index().to_le_bytes());
        snapshot.put(
            KeyBuilder::new(ID, PREFIX_CURRENT_BLOCK).to_key(),
            StorageItem::new(tip),
        );
        Ok(())
    }
}

fn encode_header(header: &BlockHeader) -> Vec<u8> {
    let mut writer = BinaryWriter::new();
    writer.write_bytes(header.hash.as_bytes());
    writer.write_bytes(header.prev_hash.as_bytes());
    writer.write_u32(header.index);
    writer.write_u64(header.timestamp_ms);
    writer.write_bytes(header.next_consensus.as_bytes());
    writer.write_u8(header.primary_index);
    writer.into_bytes()
}

fn decode_header(bytes: &[u8]) -> Result<BlockHeader> {
    let mut reader = BinaryReader::new(bytes);
    let header = BlockHeader {
        hash: UInt256::from_bytes(reader.read_bytes(UInt256::LEN)?)?,
        prev_hash: UInt256::from_bytes(reader.read_bytes(UInt256::LEN)?)?,
        index: reader.read_u32()?,
        timestamp_ms: reader.read_u64()?,
        next_consensus: UInt160::from_bytes(reader.read_bytes(UInt160::LEN)?)?,
        primary_index: reader.read_u8()?,
    };
    reader.expect_end()?;
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_core::Block;

    #[test]
    fn header_encoding_round_trips() {
        let header = BlockHeader {
            hash: UInt256::from_bytes(&[1u8; 32]).unwrap(),
            prev_hash: UInt256::from_bytes(&[2u8; 32]).unwrap(),
            index: 42,
            timestamp_ms: 1_700_000_000_123,
            next_consensus: UInt160::from([3u8; 20]),
            primary_index: 4,
        };
        let bytes = encode_header(&header);
        assert_eq!(decode_header(&bytes).unwrap(), header);
    }

    #[test]
    fn tip_round_trips_through_storage() {
        use crate::application_engine::TriggerType;
        use neo_config::ProtocolSettings;
        use neo_core::ECPoint;
        use neo_persistence::MemoryStore;
        use std::collections::HashMap;
        use std::str::FromStr;
        use std::sync::Arc;

        let key = ECPoint::from_str(
            "036b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296",
        )
        .unwrap();
        let settings =
            Arc::new(ProtocolSettings::new(vec![key], 1, HashMap::new()).unwrap());
        let block = Block {
            header: BlockHeader {
                hash: UInt256::from_bytes(&[9u8; 32]).unwrap(),
                index: 7,
                timestamp_ms: 1000,
                ..Default::default()
            },
            transactions: Vec::new(),
        };
        let mut engine = ApplicationEngine::new(
            settings,
            DataCache::new(Arc::new(MemoryStore::new())),
            TriggerType::OnPersist,
        )
        .with_block(block.clone());

        let ledger = LedgerContract::new();
        ledger.on_persist(&mut engine).unwrap();

        let snapshot = engine.snapshot();
        assert_eq!(LedgerContract::current_index(snapshot), Some(7));
        assert_eq!(LedgerContract::current_hash(snapshot), Some(block.hash()));
        assert_eq!(LedgerContract::block_hash(snapshot, 7), Some(block.hash()));
        assert_eq!(
            LedgerContract::timestamp_of(snapshot, 7).unwrap(),
            Some(1000)
        );
        assert_eq!(LedgerContract::timestamp_of(snapshot, 8).unwrap(), None);
    }
}

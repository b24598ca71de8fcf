//! The Policy contract: network-wide fee parameters and the blocked
//! account list, adjustable only by the committee.

use crate::application_engine::ApplicationEngine;
use crate::error::{Error, Result};
use crate::interop::StackItem;
use crate::native::native_contract::{
    MethodDescriptor, NativeContract, NativeContractMeta, ParamType,
};
use crate::native::neo_token::NeoToken;
use crate::CallFlags;
use neo_config::Hardfork;
use neo_core::UInt160;
use neo_persistence::{DataCache, KeyBuilder, StorageItem};

pub const ID: i32 = -7;

const PREFIX_FEE_PER_BYTE: u8 = 10;
const PREFIX_BLOCKED_ACCOUNT: u8 = 15;
const PREFIX_EXEC_FEE_FACTOR: u8 = 18;
const PREFIX_STORAGE_PRICE: u8 = 19;

pub const DEFAULT_EXEC_FEE_FACTOR: u32 = 30;
pub const DEFAULT_STORAGE_PRICE: u32 = 100_000;
pub const DEFAULT_FEE_PER_BYTE: i64 = 1000;

const MAX_EXEC_FEE_FACTOR: u32 = 100;
const MAX_STORAGE_PRICE: u32 = 10_000_000;
const MAX_FEE_PER_BYTE: i64 = 1_0000_0000;

pub struct PolicyContract {
    meta: NativeContractMeta,
    /// Hashes that may never be blocked; the registry passes in the
    /// native contracts.
    protected: Vec<UInt160>,
}

impl PolicyContract {
    pub fn new(protected: Vec<UInt160>) -> Self {
        let methods = vec![
            MethodDescriptor::new(
                "getFeePerByte",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "setFeePerByte",
                &[("value", ParamType::Integer)],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES,
            ),
            MethodDescriptor::new(
                "getExecFeeFactor",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "setExecFeeFactor",
                &[("value", ParamType::Integer)],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES,
            ),
            MethodDescriptor::new(
                "getStoragePrice",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "setStoragePrice",
                &[("value", ParamType::Integer)],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES,
            ),
            MethodDescriptor::new(
                "isBlocked",
                &[("account", ParamType::Hash160)],
                ParamType::Boolean,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "blockAccount",
                &[("account", ParamType::Hash160)],
                ParamType::Boolean,
                1 << 15,
                CallFlags::STATES,
            ),
            MethodDescriptor::new(
                "unblockAccount",
                &[("account", ParamType::Hash160)],
                ParamType::Boolean,
                1 << 15,
                CallFlags::STATES,
            ),
        ];
        Self {
            meta: NativeContractMeta::new("PolicyContract", ID, methods, Vec::new()),
            protected,
        }
    }

    pub fn fee_per_byte(snapshot: &DataCache) -> i64 {
        read_i64(snapshot, PREFIX_FEE_PER_BYTE, DEFAULT_FEE_PER_BYTE)
    }

    pub fn exec_fee_factor(snapshot: &DataCache) -> u32 {
        read_i64(snapshot, PREFIX_EXEC_FEE_FACTOR, DEFAULT_EXEC_FEE_FACTOR as i64) as u32
    }

    pub fn storage_price(snapshot: &DataCache) -> u32 {
        read_i64(snapshot, PREFIX_STORAGE_PRICE, DEFAULT_STORAGE_PRICE as i64) as u32
    }

    pub fn is_blocked(snapshot: &DataCache, account: &UInt160) -> bool {
        snapshot.contains(&blocked_key(account))
    }

    /// Adds `account` to the blocked list without a committee check.
    /// Used when a contract is destroyed.
    pub(crate) fn block_account_unchecked(snapshot: &mut DataCache, account: &UInt160) -> bool {
        let key = blocked_key(account);
        if snapshot.contains(&key) {
            return false;
        }
        snapshot.put(key, StorageItem::new(Vec::new()));
        true
    }

    fn check_committee(&self, engine: &ApplicationEngine) -> Result<()> {
        let committee = NeoToken::committee_address(engine.snapshot())?;
        if !engine.check_witness(&committee) {
            return Err(Error::InvalidOperation(
                "committee witness is required".into(),
            ));
        }
        Ok(())
    }

    fn set_fee_per_byte(&self, engine: &mut ApplicationEngine, value: i64) -> Result<()> {
        if !(0..=MAX_FEE_PER_BYTE).contains(&value) {
            return Err(Error::InvalidArgument(format!(
                "feePerByte {value} out of range"
            )));
        }
        self.check_committee(engine)?;
        write_i64(engine.snapshot_mut(), PREFIX_FEE_PER_BYTE, value);
        Ok(())
    }

    fn set_exec_fee_factor(&self, engine: &mut ApplicationEngine, value: i64) -> Result<()> {
        if value <= 0 || value > MAX_EXEC_FEE_FACTOR as i64 {
            return Err(Error::InvalidArgument(format!(
                "execFeeFactor {value} out of range"
            )));
        }
        self.check_committee(engine)?;
        write_i64(engine.snapshot_mut(), PREFIX_EXEC_FEE_FACTOR, value);
        Ok(())
    }

    fn set_storage_price(&self, engine: &mut ApplicationEngine, value: i64) -> Result<()> {
        if value <= 0 || value > MAX_STORAGE_PRICE as i64 {
            return Err(Error::InvalidArgument(format!(
                "storagePrice {value} out of range"
            )));
        }
        self.check_committee(engine)?;
        write_i64(engine.snapshot_mut(), PREFIX_STORAGE_PRICE, value);
        Ok(())
    }

    fn block_account(&self, engine: &mut ApplicationEngine, account: &UInt160) -> Result<bool> {
        self.check_committee(engine)?;
        if self.protected.contains(account) {
            return Err(Error::InvalidOperation(
                "native contracts cannot be blocked".into(),
            ));
        }
        Ok(Self::block_account_unchecked(engine.snapshot_mut(), account))
    }

    fn unblock_account(&self, engine: &mut ApplicationEngine, account: &UInt160) -> Result<bool> {
        self.check_committee(engine)?;
        let key = blocked_key(account);
        if !engine.snapshot().contains(&key) {
            return Ok(false);
        }
        engine.snapshot_mut().delete(&key);
        Ok(true)
    }
}

impl NativeContract for PolicyContract {
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
            "getFeePerByte" => Ok(StackItem::from(Self::fee_per_byte(engine.snapshot()))),
            "setFeePerByte" => {
                self.set_fee_per_byte(engine, args[0].as_i64()?)?;
                Ok(StackItem::Null)
            }
            "getExecFeeFactor" => Ok(StackItem::from(Self::exec_fee_factor(engine.snapshot()))),
            "setExecFeeFactor" => {
                self.set_exec_fee_factor(engine, args[0].as_i64()?)?;
                Ok(StackItem::Null)
            }
            "getStoragePrice" => Ok(StackItem::from(Self::storage_price(engine.snapshot()))),
            "setStoragePrice" => {
                self.set_storage_price(engine, args[0].as_i64()?)?;
                Ok(StackItem::Null)
            }
            "isBlocked" => Ok(StackItem::from(Self::is_blocked(
                engine.snapshot(),
                &args[0].as_uint160()?,
            ))),
            "blockAccount" => Ok(StackItem::from(
                self.block_account(engine, &args[0].as_uint160()?)?,
            )),
            "unblockAccount" => Ok(StackItem::from(
                self.unblock_account(engine, &args[0].as_uint160()?)?,
            )),
            _ => Err(Error::MethodNotFound {
                contract: self.meta.name.to_string(),
                method: method.to_string(),
                argc: args.len(),
            }),
        }
    }

    fn initialize(
        &self,
        engine: &mut ApplicationEngine,
        hardfork: Option<Hardfork>,
    ) -> Result<()> {
        if hardfork == self.meta.active_in {
            let snapshot = engine.snapshot_mut();
            write_i64(snapshot, PREFIX_FEE_PER_BYTE, DEFAULT_FEE_PER_BYTE);
            write_i64(
                snapshot,
                PREFIX_EXEC_FEE_FACTOR,
                DEFAULT_EXEC_FEE_FACTOR as i64,
            );
            write_i64(snapshot, PREFIX_STORAGE_PRICE, DEFAULT_STORAGE_PRICE as i64);
        }
        Ok(())
    }
}

fn blocked_key(account: &UInt160) -> neo_persistence::StorageKey {
    KeyBuilder::new(ID, PREFIX_BLOCKED_ACCOUNT)
        .add_uint160(account)
        .to_key()
}

fn read_i64(snapshot: &DataCache, prefix: u8, default: i64) -> i64 {
    snapshot
        .try_get(&KeyBuilder::new(ID, prefix).to_key())
        .map(|item| item.to_bigint())
        .and_then(|value| i64::try_from(value).ok())
        .unwrap_or(default)
}

fn write_i64(snapshot: &mut DataCache, prefix: u8, value: i64) {
    snapshot.put(
        KeyBuilder::new(ID, prefix).to_key(),
        StorageItem::from_i64(value),
    );
}

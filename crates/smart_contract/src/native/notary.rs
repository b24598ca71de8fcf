//! The Notary contract: GAS deposits locked until a block height.
//!
//! Accounts fund their deposit by sending GAS here with the recipient
//! and the lock height as attached data. The deposit backs multi-party
//! transactions; once the lock expires the owner can withdraw.

use crate::application_engine::ApplicationEngine;
use crate::error::{Error, Result};
use crate::interop::interoperable::struct_fields;
use crate::interop::{Interoperable, StackItem};
use crate::native::gas_token::GasToken;
use crate::native::native_contract::{
    MethodDescriptor, NativeContract, NativeContractMeta, ParamType,
};
use crate::native::neo_token::NeoToken;
use crate::storage::SnapshotExt;
use crate::CallFlags;
use neo_config::Hardfork;
use neo_core::UInt160;
use neo_persistence::{DataCache, KeyBuilder, StorageItem, StorageKey};
use num_bigint::BigInt;
use num_traits::Signed;
use std::sync::OnceLock;

pub const ID: i32 = -10;

const PREFIX_DEPOSIT: u8 = 1;
const PREFIX_MAX_NOT_VALID_BEFORE_DELTA: u8 = 10;

const DEFAULT_MAX_NOT_VALID_BEFORE_DELTA: u32 = 140;
/// Lock height applied when a payment carries no explicit `till`.
const DEFAULT_DEPOSIT_DELTA_TILL: u32 = 5760;

/// A locked GAS deposit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deposit {
    pub amount: BigInt,
    /// First height at which the deposit may be withdrawn.
    pub till: u32,
}

impl Interoperable for Deposit {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let fields = struct_fields(item, 2)?;
        Ok(Self {
            amount: fields[0].as_int()?,
            till: fields[1].as_u32()?,
        })
    }

    fn to_stack_item(&self) -> StackItem {
        StackItem::Struct(vec![
            StackItem::from(&self.amount),
            StackItem::from(self.till),
        ])
    }
}

fn meta() -> &'static NativeContractMeta {
    static META: OnceLock<NativeContractMeta> = OnceLock::new();
    META.get_or_init(|| {
        let methods = vec![
            MethodDescriptor::new(
                "onNEP17Payment",
                &[
                    ("from", ParamType::Hash160),
                    ("amount", ParamType::Integer),
                    ("data", ParamType::Any),
                ],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES,
            ),
            MethodDescriptor::new(
                "balanceOf",
                &[("account", ParamType::Hash160)],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "expirationOf",
                &[("account", ParamType::Hash160)],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "lockDepositUntil",
                &[
                    ("account", ParamType::Hash160),
                    ("till", ParamType::Integer),
                ],
                ParamType::Boolean,
                1 << 15,
                CallFlags::STATES,
            ),
            MethodDescriptor::new(
                "withdraw",
                &[("from", ParamType::Hash160), ("to", ParamType::Hash160)],
                ParamType::Boolean,
                1 << 17,
                CallFlags::ALL,
            ),
            MethodDescriptor::new(
                "getMaxNotValidBeforeDelta",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "setMaxNotValidBeforeDelta",
                &[("value", ParamType::Integer)],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES,
            ),
        ];
        NativeContractMeta::new("Notary", ID, methods, Vec::new())
    })
}

pub struct Notary;

impl Default for Notary {
    fn default() -> Self {
        Self::new()
    }
}

impl Notary {
    pub fn new() -> Self {
        Self
    }

    pub fn hash() -> UInt160 {
        meta().hash
    }

    pub fn deposit_of(snapshot: &DataCache, account: &UInt160) -> Result<Option<Deposit>> {
        snapshot.get_interoperable(&deposit_key(account))
    }

    pub fn max_not_valid_before_delta(snapshot: &DataCache) -> u32 {
        snapshot
            .try_get(&delta_key())
            .and_then(|item| u32::try_from(item.to_bigint()).ok())
            .unwrap_or(DEFAULT_MAX_NOT_VALID_BEFORE_DELTA)
    }

    /// Accepts a GAS payment into a deposit. Only GAS may land here, and
    /// the attached data names the deposit owner and the lock height.
    fn on_nep17_payment(
        &self,
        engine: &mut ApplicationEngine,
        from: &UInt160,
        amount: &BigInt,
        data: &StackItem,
    ) -> Result<()> {
        if engine.calling_script_hash() != Some(GasToken::hash()) {
            return Err(Error::InvalidOperation(
                "only GAS can be deposited".into(),
            ));
        }
        if !amount.is_positive() {
            return Err(Error::InvalidArgument(
                "deposit amount must be positive".into(),
            ));
        }
        let fields = data.as_array()?;
        if fields.len() != 2 {
            return Err(Error::InvalidArgument(
                "deposit data must be [owner, till]".into(),
            ));
        }
        let to = match &fields[0] {
            StackItem::Null => *from,
            other => other.as_uint160()?,
        };
        let current = engine.persisting_index();
        let till = match &fields[1] {
            StackItem::Null => current + DEFAULT_DEPOSIT_DELTA_TILL,
            other => other.as_u32()?,
        };
        if till < current + 2 {
            return Err(Error::InvalidArgument(format!(
                "deposit lock height {till} is not at least two blocks ahead"
            )));
        }
        let key = deposit_key(&to);
        let mut deposit = engine
            .snapshot()
            .get_interoperable::<Deposit>(&key)?
            .unwrap_or_default();
        if deposit.till > 0 {
            if till < deposit.till {
                return Err(Error::InvalidArgument(format!(
                    "deposit lock height cannot move back from {}",
                    deposit.till
                )));
            }
            // Third parties may top up a deposit but not move its lock.
            if *from != to && till != deposit.till {
                return Err(Error::InvalidOperation(
                    "only the owner may change the lock height".into(),
                ));
            }
        }
        deposit.amount += amount;
        deposit.till = till;
        engine.snapshot_mut().set_interoperable(key, &deposit)
    }

    fn lock_deposit_until(
        &self,
        engine: &mut ApplicationEngine,
        account: &UInt160,
        till: u32,
    ) -> Result<bool> {
        if !engine.check_witness(account) {
            return Ok(false);
        }
        if till < engine.persisting_index() + 2 {
            return Ok(false);
        }
        let key = deposit_key(account);
        let Some(mut deposit) = engine.snapshot().get_interoperable::<Deposit>(&key)? else {
            return Ok(false);
        };
        if till < deposit.till {
            return Ok(false);
        }
        deposit.till = till;
        engine.snapshot_mut().set_interoperable(key, &deposit)?;
        Ok(true)
    }

    /// Pays an expired deposit out to `to`. The GAS moves from this
    /// contract's own balance, so the transfer runs with the notary hash
    /// as the calling script.
    fn withdraw(
        &self,
        engine: &mut ApplicationEngine,
        from: &UInt160,
        to: &UInt160,
    ) -> Result<bool> {
        if engine.calling_script_hash() != Some(*from) && !engine.check_witness(from) {
            return Ok(false);
        }
        let key = deposit_key(from);
        let Some(deposit) = engine.snapshot().get_interoperable::<Deposit>(&key)? else {
            return Ok(false);
        };
        if engine.persisting_index() < deposit.till {
            return Ok(false);
        }
        engine.snapshot_mut().delete(&key);
        let previous_caller = engine.calling_script_hash();
        engine.set_calling_script_hash(Some(Self::hash()));
        let sent = GasToken::transfer(
            engine,
            &Self::hash(),
            to,
            &deposit.amount,
            StackItem::Null,
        );
        engine.set_calling_script_hash(previous_caller);
        if !sent? {
            return Err(Error::InvariantViolation(
                "notary balance does not cover the deposit".into(),
            ));
        }
        Ok(true)
    }

    fn set_max_not_valid_before_delta(
        &self,
        engine: &mut ApplicationEngine,
        value: u32,
    ) -> Result<()> {
        let validators = engine.settings().validators_count as u32;
        if value < validators || value > DEFAULT_DEPOSIT_DELTA_TILL / 2 {
            return Err(Error::InvalidArgument(format!(
                "maxNotValidBeforeDelta must be within {validators}..={}",
                DEFAULT_DEPOSIT_DELTA_TILL / 2
            )));
        }
        let committee = NeoToken::committee_address(engine.snapshot())?;
        if !engine.check_witness(&committee) {
            return Err(Error::InvalidOperation(
                "committee witness is required".into(),
            ));
        }
        engine
            .snapshot_mut()
            .put(delta_key(), StorageItem::from_i64(value as i64));
        Ok(())
    }
}

impl NativeContract for Notary {
    fn meta(&self) -> &NativeContractMeta {
        meta()
    }

    fn invoke(
        &self,
        engine: &mut ApplicationEngine,
        method: &str,
        args: &[StackItem],
    ) -> Result<StackItem> {
        match method {
            "onNEP17Payment" => {
                self.on_nep17_payment(
                    engine,
                    &args[0].as_uint160()?,
                    &args[1].as_int()?,
                    &args[2],
                )?;
                Ok(StackItem::Null)
            }
            "balanceOf" => {
                let deposit = Self::deposit_of(engine.snapshot(), &args[0].as_uint160()?)?;
                Ok(StackItem::from(
                    &deposit.map(|d| d.amount).unwrap_or_default(),
                ))
            }
            "expirationOf" => {
                let deposit = Self::deposit_of(engine.snapshot(), &args[0].as_uint160()?)?;
                Ok(StackItem::from(deposit.map(|d| d.till).unwrap_or(0)))
            }
            "lockDepositUntil" => Ok(StackItem::from(self.lock_deposit_until(
                engine,
                &args[0].as_uint160()?,
                args[1].as_u32()?,
            )?)),
            "withdraw" => Ok(StackItem::from(self.withdraw(
                engine,
                &args[0].as_uint160()?,
                &args[1].as_uint160()?,
            )?)),
            "getMaxNotValidBeforeDelta" => Ok(StackItem::from(
                Self::max_not_valid_before_delta(engine.snapshot()),
            )),
            "setMaxNotValidBeforeDelta" => {
                self.set_max_not_valid_before_delta(engine, args[0].as_u32()?)?;
                Ok(StackItem::Null)
            }
            _ => Err(Error::MethodNotFound {
                contract: meta().name.to_string(),
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
        if hardfork == meta().active_in {
            engine.snapshot_mut().put(
                delta_key(),
                StorageItem::from_i64(DEFAULT_MAX_NOT_VALID_BEFORE_DELTA as i64),
            );
        }
        Ok(())
    }
}

fn deposit_key(account: &UInt160) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_DEPOSIT).add_uint160(account).to_key()
}

fn delta_key() -> StorageKey {
    KeyBuilder::new(ID, PREFIX_MAX_NOT_VALID_BEFORE_DELTA).to_key()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_round_trips() {
        let deposit = Deposit {
            amount: BigInt::from(12_3456_7890i64),
            till: 9_000,
        };
        let item = deposit.to_stack_item();
        assert_eq!(Deposit::from_stack_item(&item).unwrap(), deposit);
    }
}

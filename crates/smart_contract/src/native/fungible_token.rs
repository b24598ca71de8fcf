//! Shared balance bookkeeping of the fungible native tokens.
//!
//! NEO and GAS differ only in their account record type and in the hook
//! run whenever a balance is about to change, so minting, burning and
//! transfers live here as free functions parameterized over both.

use crate::application_engine::ApplicationEngine;
use crate::error::{Error, Result};
use crate::interop::{Interoperable, StackItem};
use crate::native::contract_management::ContractManagement;
use crate::native::native_contract::{emit_event, NativeContractMeta};
use crate::storage::SnapshotExt;
use neo_core::UInt160;
use neo_persistence::{DataCache, KeyBuilder, StorageItem, StorageKey};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

pub const PREFIX_TOTAL_SUPPLY: u8 = 11;
pub const PREFIX_ACCOUNT: u8 = 20;

/// An account record of a fungible token.
pub trait TokenState: Interoperable + Default {
    fn balance(&self) -> &BigInt;
    fn balance_mut(&mut self) -> &mut BigInt;
}

/// Runs before a balance changes by `delta`. The state passed in is the
/// pre-change record; mutations made here are persisted with it.
pub type BalanceHook<S> =
    fn(&mut ApplicationEngine, &UInt160, &mut S, &BigInt) -> Result<()>;

pub fn account_key(id: i32, account: &UInt160) -> StorageKey {
    KeyBuilder::new(id, PREFIX_ACCOUNT).add_uint160(account).to_key()
}

fn supply_key(id: i32) -> StorageKey {
    KeyBuilder::new(id, PREFIX_TOTAL_SUPPLY).to_key()
}

pub fn total_supply(snapshot: &DataCache, id: i32) -> BigInt {
    snapshot
        .try_get(&supply_key(id))
        .map(|item| item.to_bigint())
        .unwrap_or_default()
}

pub fn balance_of<S: TokenState>(
    snapshot: &DataCache,
    id: i32,
    account: &UInt160,
) -> Result<BigInt> {
    Ok(snapshot
        .get_interoperable::<S>(&account_key(id, account))?
        .map(|state| state.balance().clone())
        .unwrap_or_default())
}

/// Creates `amount` tokens on `account` and grows the total supply.
pub fn mint<S: TokenState>(
    engine: &mut ApplicationEngine,
    meta: &NativeContractMeta,
    account: &UInt160,
    amount: &BigInt,
    call_on_payment: bool,
    hook: Option<BalanceHook<S>>,
) -> Result<()> {
    if !amount.is_positive() {
        return Err(Error::InvalidArgument(format!(
            "mint amount must be positive, got {amount}"
        )));
    }
    let key = account_key(meta.id, account);
    let mut state = engine
        .snapshot()
        .get_interoperable::<S>(&key)?
        .unwrap_or_default();
    if let Some(hook) = hook {
        hook(engine, account, &mut state, amount)?;
    }
    *state.balance_mut() += amount;
    engine.snapshot_mut().set_interoperable(key, &state)?;

    let mut supply = total_supply(engine.snapshot(), meta.id);
    supply += amount;
    engine
        .snapshot_mut()
        .put(supply_key(meta.id), StorageItem::from_bigint(&supply));

    post_transfer(
        engine,
        meta,
        None,
        Some(account),
        amount,
        StackItem::Null,
        call_on_payment,
    )
}

/// Destroys `amount` tokens held by `account` and shrinks the total
/// supply. Faults when the balance is insufficient.
pub fn burn<S: TokenState>(
    engine: &mut ApplicationEngine,
    meta: &NativeContractMeta,
    account: &UInt160,
    amount: &BigInt,
    hook: Option<BalanceHook<S>>,
) -> Result<()> {
    if !amount.is_positive() {
        return Err(Error::InvalidArgument(format!(
            "burn amount must be positive, got {amount}"
        )));
    }
    let key = account_key(meta.id, account);
    let mut state = engine
        .snapshot()
        .get_interoperable::<S>(&key)?
        .ok_or_else(|| Error::InvalidOperation(format!("account {account} holds no tokens")))?;
    if state.balance() < amount {
        return Err(Error::InvalidOperation(format!(
            "balance {} is below the burn amount {amount}",
            state.balance()
        )));
    }
    if let Some(hook) = hook {
        let delta = -amount.clone();
        hook(engine, account, &mut state, &delta)?;
    }
    if state.balance() == amount {
        engine.snapshot_mut().delete(&key);
    } else {
        *state.balance_mut() -= amount;
        engine.snapshot_mut().set_interoperable(key, &state)?;
    }

    let mut supply = total_supply(engine.snapshot(), meta.id);
    supply -= amount;
    engine
        .snapshot_mut()
        .put(supply_key(meta.id), StorageItem::from_bigint(&supply));

    post_transfer(engine, meta, Some(account), None, amount, StackItem::Null, false)
}

/// Moves `amount` tokens between accounts. Returns `Ok(false)` for an
/// unauthorized or underfunded transfer; protocol violations fault.
pub fn transfer<S: TokenState>(
    engine: &mut ApplicationEngine,
    meta: &NativeContractMeta,
    from: &UInt160,
    to: &UInt160,
    amount: &BigInt,
    data: StackItem,
    hook: Option<BalanceHook<S>>,
) -> Result<bool> {
    if amount.is_negative() {
        return Err(Error::InvalidArgument(
            "transfer amount must not be negative".into(),
        ));
    }
    // The owning contract of the calling script may move its own funds
    // without a witness.
    if engine.calling_script_hash() != Some(*from) && !engine.check_witness(from) {
        return Ok(false);
    }
    let key_from = account_key(meta.id, from);
    if amount.is_zero() {
        // A zero transfer still settles the sender's account.
        if let Some(mut state) = engine.snapshot().get_interoperable::<S>(&key_from)? {
            if let Some(hook) = hook {
                hook(engine, from, &mut state, amount)?;
            }
            engine.snapshot_mut().set_interoperable(key_from, &state)?;
        }
    } else {
        let Some(mut state_from) = engine.snapshot().get_interoperable::<S>(&key_from)? else {
            return Ok(false);
        };
        if state_from.balance() < amount {
            return Ok(false);
        }
        if from == to {
            if let Some(hook) = hook {
                hook(engine, from, &mut state_from, &BigInt::zero())?;
            }
            engine.snapshot_mut().set_interoperable(key_from, &state_from)?;
        } else {
            if let Some(hook) = hook {
                let delta = -amount.clone();
                hook(engine, from, &mut state_from, &delta)?;
            }
            if state_from.balance() == amount {
                engine.snapshot_mut().delete(&key_from);
            } else {
                *state_from.balance_mut() -= amount;
                engine.snapshot_mut().set_interoperable(key_from, &state_from)?;
            }
            let key_to = account_key(meta.id, to);
            let mut state_to = engine
                .snapshot()
                .get_interoperable::<S>(&key_to)?
                .unwrap_or_default();
            if let Some(hook) = hook {
                hook(engine, to, &mut state_to, amount)?;
            }
            *state_to.balance_mut() += amount;
            engine.snapshot_mut().set_interoperable(key_to, &state_to)?;
        }
    }
    post_transfer(engine, meta, Some(from), Some(to), amount, data, true)?;
    Ok(true)
}

/// Emits the Transfer event and, when the recipient is a contract,
/// queues its payment callback.
pub fn post_transfer(
    engine: &mut ApplicationEngine,
    meta: &NativeContractMeta,
    from: Option<&UInt160>,
    to: Option<&UInt160>,
    amount: &BigInt,
    data: StackItem,
    call_on_payment: bool,
) -> Result<()> {
    emit_event(
        engine,
        meta,
        "Transfer",
        vec![
            from.map(StackItem::from).unwrap_or(StackItem::Null),
            to.map(StackItem::from).unwrap_or(StackItem::Null),
            StackItem::from(amount),
        ],
    )?;
    if call_on_payment {
        if let Some(to) = to {
            if ContractManagement::get_contract(engine.snapshot(), to)?.is_some() {
                let from_item = from.map(StackItem::from).unwrap_or(StackItem::Null);
                engine.call_from_native(
                    meta.hash,
                    *to,
                    "onNEP17Payment",
                    vec![from_item, StackItem::from(amount), data],
                );
            }
        }
    }
    Ok(())
}

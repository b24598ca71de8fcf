//! The GAS token: the utility asset that pays for execution and storage.
//!
//! Supply is elastic. Fees burn GAS on persist, governance rewards mint
//! it, and the genesis distribution seeds the standby validators.

use crate::application_engine::ApplicationEngine;
use crate::error::{Error, Result};
use crate::interop::StackItem;
use crate::native::fungible_token;
use crate::native::governance_types::AccountState;
use crate::native::native_contract::{
    EventDescriptor, MethodDescriptor, NativeContract, NativeContractMeta, ParamType,
};
use crate::native::neo_token::NeoToken;
use crate::CallFlags;
use neo_config::Hardfork;
use neo_core::{create_signature_redeem_script, get_bft_address, to_script_hash, UInt160};
use neo_persistence::DataCache;
use num_bigint::BigInt;
use num_traits::Signed;
use std::sync::OnceLock;

pub const ID: i32 = -6;
pub const SYMBOL: &str = "GAS";
pub const DECIMALS: u8 = 8;
/// Smallest GAS fractions per whole token.
pub const FACTOR: i64 = 100_000_000;

fn meta() -> &'static NativeContractMeta {
    static META: OnceLock<NativeContractMeta> = OnceLock::new();
    META.get_or_init(|| {
        let methods = vec![
            MethodDescriptor::new("symbol", &[], ParamType::String, 0, CallFlags::empty()),
            MethodDescriptor::new("decimals", &[], ParamType::Integer, 0, CallFlags::empty()),
            MethodDescriptor::new(
                "totalSupply",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "balanceOf",
                &[("account", ParamType::Hash160)],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "transfer",
                &[
                    ("from", ParamType::Hash160),
                    ("to", ParamType::Hash160),
                    ("amount", ParamType::Integer),
                    ("data", ParamType::Any),
                ],
                ParamType::Boolean,
                1 << 17,
                CallFlags::ALL,
            ),
        ];
        let events = vec![EventDescriptor::new(
            "Transfer",
            &[
                ("from", ParamType::Hash160),
                ("to", ParamType::Hash160),
                ("amount", ParamType::Integer),
            ],
        )];
        NativeContractMeta::new("GasToken", ID, methods, events).with_standards(&["NEP-17"])
    })
}

pub struct GasToken;

impl Default for GasToken {
    fn default() -> Self {
        Self::new()
    }
}

impl GasToken {
    pub fn new() -> Self {
        Self
    }

    pub fn hash() -> UInt160 {
        meta().hash
    }

    pub fn total_supply(snapshot: &DataCache) -> BigInt {
        fungible_token::total_supply(snapshot, ID)
    }

    pub fn balance_of(snapshot: &DataCache, account: &UInt160) -> Result<BigInt> {
        fungible_token::balance_of::<AccountState>(snapshot, ID, account)
    }

    pub fn mint(
        engine: &mut ApplicationEngine,
        account: &UInt160,
        amount: &BigInt,
        call_on_payment: bool,
    ) -> Result<()> {
        fungible_token::mint::<AccountState>(engine, meta(), account, amount, call_on_payment, None)
    }

    pub fn burn(engine: &mut ApplicationEngine, account: &UInt160, amount: &BigInt) -> Result<()> {
        fungible_token::burn::<AccountState>(engine, meta(), account, amount, None)
    }

    pub fn transfer(
        engine: &mut ApplicationEngine,
        from: &UInt160,
        to: &UInt160,
        amount: &BigInt,
        data: StackItem,
    ) -> Result<bool> {
        fungible_token::transfer::<AccountState>(engine, meta(), from, to, amount, data, None)
    }
}

impl NativeContract for GasToken {
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
            "symbol" => Ok(StackItem::from(SYMBOL)),
            "decimals" => Ok(StackItem::from(DECIMALS as u32)),
            "totalSupply" => Ok(StackItem::from(&Self::total_supply(engine.snapshot()))),
            "balanceOf" => Ok(StackItem::from(&Self::balance_of(
                engine.snapshot(),
                &args[0].as_uint160()?,
            )?)),
            "transfer" => Ok(StackItem::from(Self::transfer(
                engine,
                &args[0].as_uint160()?,
                &args[1].as_uint160()?,
                &args[2].as_int()?,
                args[3].clone(),
            )?)),
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
            let validators = engine.settings().standby_validators();
            let account = get_bft_address(&validators)?;
            let amount = BigInt::from(engine.settings().initial_gas_distribution);
            Self::mint(engine, &account, &amount, false)?;
        }
        Ok(())
    }

    /// Burns each transaction's fees from its sender, then credits the
    /// block's primary validator with the network fees.
    fn on_persist(&self, engine: &mut ApplicationEngine) -> Result<()> {
        let block = engine
            .persisting_block()
            .ok_or_else(|| Error::InvariantViolation("no persisting block".into()))?
            .clone();
        let mut total_network_fee = BigInt::from(0);
        for tx in &block.transactions {
            let fees = BigInt::from(tx.system_fee) + BigInt::from(tx.network_fee);
            if fees.is_positive() {
                Self::burn(engine, &tx.sender(), &fees)?;
            }
            total_network_fee += tx.network_fee;
        }
        if total_network_fee.is_positive() {
            let validators = NeoToken::next_block_validators(
                engine.snapshot(),
                engine.settings().validators_count,
            )?;
            let primary = validators
                .get(block.header.primary_index as usize)
                .ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "primary index {} out of range for {} validators",
                        block.header.primary_index,
                        validators.len()
                    ))
                })?;
            let account = to_script_hash(&create_signature_redeem_script(primary));
            Self::mint(engine, &account, &total_network_fee, false)?;
        }
        Ok(())
    }
}

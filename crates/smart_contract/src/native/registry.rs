//! The registry of native contracts: lookup, checked dispatch, and the
//! per-block persist hooks.
//!
//! Every call into a native contract goes through [`NativeRegistry::call`],
//! which resolves the method by name and arity, verifies that contract and
//! method exist at the current height, checks the caller's flags, charges
//! the declared fees, and type-checks the arguments before the handler
//! runs.

use crate::application_engine::ApplicationEngine;
use crate::error::{Error, Result};
use crate::interop::StackItem;
use crate::native::contract_management::ContractManagement;
use crate::native::gas_token::GasToken;
use crate::native::ledger_contract::LedgerContract;
use crate::native::native_contract::NativeContract;
use crate::native::neo_token::NeoToken;
use crate::native::notary::Notary;
use crate::native::policy_contract::PolicyContract;
use crate::native::token_management::TokenManagement;
use neo_config::Hardfork;
use neo_core::{get_contract_hash, UInt160};

pub struct NativeRegistry {
    contracts: Vec<Box<dyn NativeContract>>,
}

impl Default for NativeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRegistry {
    pub fn new() -> Self {
        let contract_management = ContractManagement::new();
        let ledger = LedgerContract::new();
        let neo = NeoToken::new();
        let gas = GasToken::new();
        let token_management = TokenManagement::new();
        let notary = Notary::new();
        let protected = vec![
            contract_management.meta().hash,
            ledger.meta().hash,
            neo.meta().hash,
            gas.meta().hash,
            get_contract_hash(&UInt160::ZERO, 0, "PolicyContract"),
            token_management.meta().hash,
            notary.meta().hash,
        ];
        let policy = PolicyContract::new(protected);
        Self {
            contracts: vec![
                Box::new(contract_management),
                Box::new(ledger),
                Box::new(neo),
                Box::new(gas),
                Box::new(policy),
                Box::new(token_management),
                Box::new(notary),
            ],
        }
    }

    pub fn contracts(&self) -> impl Iterator<Item = &dyn NativeContract> {
        self.contracts.iter().map(Box::as_ref)
    }

    pub fn by_hash(&self, hash: &UInt160) -> Option<&dyn NativeContract> {
        self.contracts()
            .find(|contract| contract.meta().hash == *hash)
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn NativeContract> {
        self.contracts()
            .find(|contract| contract.meta().name == name)
    }

    pub fn by_id(&self, id: i32) -> Option<&dyn NativeContract> {
        self.contracts().find(|contract| contract.meta().id == id)
    }

    pub fn is_native(&self, hash: &UInt160) -> bool {
        self.by_hash(hash).is_some()
    }

    /// Calls a native method by name and drains any cooperative calls it
    /// queued.
    pub fn call(
        &self,
        engine: &mut ApplicationEngine,
        hash: &UInt160,
        method: &str,
        args: &[StackItem],
    ) -> Result<StackItem> {
        let contract = self
            .by_hash(hash)
            .ok_or(Error::ContractNotFound(*hash))?;
        let result = self.dispatch(engine, contract, method, args)?;
        self.drain_deferred(engine)?;
        Ok(result)
    }

    /// Calls a native method through its synthetic script offset, the way
    /// the VM enters after a CALLT or a jump into the native script.
    pub fn call_at_offset(
        &self,
        engine: &mut ApplicationEngine,
        hash: &UInt160,
        offset: u32,
        args: &[StackItem],
    ) -> Result<StackItem> {
        let contract = self
            .by_hash(hash)
            .ok_or(Error::ContractNotFound(*hash))?;
        let meta = contract.meta();
        let index = engine.persisting_index();
        let (_, offsets) = meta.active_script(engine.settings(), index);
        let position = offsets.get(&offset).copied().ok_or_else(|| {
            Error::InvalidOperation(format!(
                "no method of {} at script offset {offset}",
                meta.name
            ))
        })?;
        let name = meta.methods()[position].name.clone();
        let result = self.dispatch(engine, contract, &name, args)?;
        self.drain_deferred(engine)?;
        Ok(result)
    }

    fn dispatch(
        &self,
        engine: &mut ApplicationEngine,
        contract: &dyn NativeContract,
        method: &str,
        args: &[StackItem],
    ) -> Result<StackItem> {
        let meta = contract.meta();
        let index = engine.persisting_index();
        if !meta.is_active(engine.settings(), index) {
            return Err(Error::ContractNotFound(meta.hash));
        }
        let descriptor = meta
            .find_method(method, args.len())
            .ok_or_else(|| Error::MethodNotFound {
                contract: meta.name.to_string(),
                method: method.to_string(),
                argc: args.len(),
            })?;
        if !descriptor.is_active(engine.settings(), index) {
            return Err(Error::MethodInactive {
                contract: meta.name.to_string(),
                method: method.to_string(),
            });
        }
        if !engine.call_flags().contains(descriptor.required_flags) {
            return Err(Error::MissingCallFlags {
                method: format!("{}::{}", meta.name, method),
                required: descriptor.required_flags,
            });
        }
        let fee = descriptor.cpu_fee * PolicyContract::exec_fee_factor(engine.snapshot()) as i64
            + descriptor.storage_fee * PolicyContract::storage_price(engine.snapshot()) as i64;
        engine.add_fee(fee)?;
        for ((name, param), arg) in descriptor.parameters.iter().zip(args) {
            param.check(arg).map_err(|e| {
                Error::InvalidArgument(format!(
                    "{}::{method} argument {name}: {e}",
                    meta.name
                ))
            })?;
        }
        contract.invoke(engine, method, args)
    }

    /// Runs queued cooperative calls until the queue is empty. Calls into
    /// non-native targets are dropped here; executing deployed scripts is
    /// the VM's job, not the native layer's. A native target that does
    /// not implement the callback fails the initiating call, so a
    /// payment to a contract that cannot receive it never settles.
    pub fn drain_deferred(&self, engine: &mut ApplicationEngine) -> Result<()> {
        while let Some(call) = engine.take_deferred_call() {
            let Some(contract) = self.by_hash(&call.target) else {
                continue;
            };
            if contract.meta().find_method(&call.method, call.args.len()).is_none() {
                return Err(Error::MethodNotFound {
                    contract: contract.meta().name.to_string(),
                    method: call.method,
                    argc: call.args.len(),
                });
            }
            let previous_caller = engine.calling_script_hash();
            engine.set_calling_script_hash(Some(call.caller));
            let result = self.dispatch(engine, contract, &call.method, &call.args);
            engine.set_calling_script_hash(previous_caller);
            result?;
        }
        Ok(())
    }

    /// The before-transactions half of persisting a block. Newly active
    /// contracts and hardfork migrations publish their contract records
    /// and initialize their storage first, then every active contract's
    /// persist hook runs.
    pub fn on_persist(&self, engine: &mut ApplicationEngine) -> Result<()> {
        let settings = engine.settings_arc();
        let index = engine.persisting_index();

        let mut activations: Vec<Option<Hardfork>> = Vec::new();
        if index == 0 {
            activations.push(None);
        }
        for hardfork in Hardfork::ALL {
            if settings.hardforks.get(&hardfork) == Some(&index) {
                activations.push(Some(hardfork));
            }
        }

        for contract in &self.contracts {
            let meta = contract.meta();
            if !meta.is_active(&settings, index) {
                continue;
            }
            let mut initialize_for: Vec<Option<Hardfork>> = Vec::new();
            for activation in &activations {
                let applies = match activation {
                    None => meta.active_in.is_none(),
                    Some(hardfork) => {
                        meta.active_in == Some(*hardfork)
                            || meta.methods().iter().any(|m| {
                                m.active_in == Some(*hardfork)
                                    || m.deprecated_in == Some(*hardfork)
                            })
                    }
                };
                if applies {
                    initialize_for.push(*activation);
                }
            }
            if initialize_for.is_empty() {
                continue;
            }
            // The method table changed shape, so the published script and
            // manifest are rebuilt.
            let state = ContractManagement::native_contract_state(meta, &settings, index)?;
            ContractManagement::put_contract_state(engine.snapshot_mut(), &state)?;
            for hardfork in initialize_for {
                contract.initialize(engine, hardfork)?;
            }
        }

        for contract in &self.contracts {
            if contract.meta().is_active(&settings, index) {
                contract.on_persist(engine)?;
            }
        }
        self.drain_deferred(engine)
    }

    /// The after-transactions half of persisting a block.
    pub fn post_persist(&self, engine: &mut ApplicationEngine) -> Result<()> {
        let settings = engine.settings_arc();
        let index = engine.persisting_index();
        for contract in &self.contracts {
            if contract.meta().is_active(&settings, index) {
                contract.post_persist(engine)?;
            }
        }
        self.drain_deferred(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_engine::TriggerType;
    use crate::CallFlags;
    use neo_config::ProtocolSettings;
    use neo_core::{Block, BlockHeader, ECPoint, UInt256};
    use neo_persistence::{DataCache, MemoryStore};
    use num_bigint::BigInt;
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::Arc;

    fn settings() -> Arc<ProtocolSettings> {
        let key = ECPoint::from_str(
            "036b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296",
        )
        .unwrap();
        Arc::new(ProtocolSettings::new(vec![key], 1, HashMap::new()).unwrap())
    }

    fn genesis_block() -> Block {
        Block {
            header: BlockHeader {
                hash: UInt256::from([7u8; 32]),
                index: 0,
                timestamp_ms: 1_468_595_301_000,
                ..BlockHeader::default()
            },
            transactions: Vec::new(),
        }
    }

    fn bootstrapped() -> (NativeRegistry, ApplicationEngine) {
        let registry = NativeRegistry::new();
        let mut engine = ApplicationEngine::new(
            settings(),
            DataCache::new(Arc::new(MemoryStore::new())),
            TriggerType::OnPersist,
        )
        .with_block(genesis_block());
        registry.on_persist(&mut engine).unwrap();
        registry.post_persist(&mut engine).unwrap();
        (registry, engine)
    }

    #[test]
    fn lookups_agree_on_identity() {
        let registry = NativeRegistry::new();
        let neo = registry.by_name("NeoToken").unwrap();
        assert_eq!(neo.meta().id, -5);
        assert_eq!(
            registry.by_id(-5).unwrap().meta().hash,
            neo.meta().hash
        );
        assert!(registry.is_native(&neo.meta().hash));
        assert!(!registry.is_native(&UInt160::from([9u8; 20])));
    }

    #[test]
    fn known_mainnet_hashes_are_reproduced() {
        let registry = NativeRegistry::new();
        assert_eq!(
            registry.by_name("NeoToken").unwrap().meta().hash,
            UInt160::from_str("0xef4073a0f2b305a38ec4050e4d3d28bc40ea63f5").unwrap()
        );
        assert_eq!(
            registry.by_name("GasToken").unwrap().meta().hash,
            UInt160::from_str("0xd2a4cff31913016155e38e474a2c06d08be276cf").unwrap()
        );
    }

    #[test]
    fn genesis_publishes_contract_records_and_seeds_supplies() {
        let (registry, engine) = bootstrapped();
        for contract in registry.contracts() {
            let state =
                ContractManagement::get_contract(engine.snapshot(), &contract.meta().hash)
                    .unwrap()
                    .unwrap();
            assert_eq!(state.id, contract.meta().id);
        }
        assert_eq!(
            NeoToken::total_supply(engine.snapshot()),
            BigInt::from(100_000_000)
        );
        // Initial distribution plus the genesis committee reward of 10%
        // of the default 5 GAS per block.
        assert_eq!(
            GasToken::total_supply(engine.snapshot()),
            BigInt::from(ProtocolSettings::DEFAULT_INITIAL_GAS + 50_000_000)
        );
    }

    #[test]
    fn dispatch_charges_the_declared_fee() {
        let (registry, mut engine) = bootstrapped();
        let gas = GasToken::hash();
        let before = engine.fee_consumed();
        registry
            .call(&mut engine, &gas, "totalSupply", &[])
            .unwrap();
        // cpu fee 1<<15 at the default execution factor of 30.
        assert_eq!(engine.fee_consumed() - before, (1 << 15) * 30);
    }

    #[test]
    fn dispatch_rejects_missing_flags_and_unknown_methods() {
        let (registry, engine) = bootstrapped();
        let mut engine = ApplicationEngine::new(
            engine.settings_arc(),
            engine.into_snapshot(),
            TriggerType::Application,
        )
        .with_call_flags(CallFlags::READ_ONLY);
        let gas = GasToken::hash();
        let from = UInt160::from([1u8; 20]);
        let transfer_args = [
            StackItem::from(&from),
            StackItem::from(&from),
            StackItem::from(1i64),
            StackItem::Null,
        ];
        assert!(matches!(
            registry.call(&mut engine, &gas, "transfer", &transfer_args),
            Err(Error::MissingCallFlags { .. })
        ));
        assert!(matches!(
            registry.call(&mut engine, &gas, "noSuchMethod", &[]),
            Err(Error::MethodNotFound { .. })
        ));
    }

    #[test]
    fn script_offsets_resolve_to_methods() {
        let (registry, mut engine) = bootstrapped();
        let gas = GasToken::hash();
        let meta = registry.by_hash(&gas).unwrap().meta();
        let (_, offsets) = meta.active_script(engine.settings(), 1);
        let (&offset, &position) = offsets
            .iter()
            .find(|(_, &p)| meta.methods()[p].name == "symbol")
            .unwrap();
        assert_eq!(meta.methods()[position].name, "symbol");
        let result = registry
            .call_at_offset(&mut engine, &gas, offset, &[])
            .unwrap();
        assert_eq!(result, StackItem::from("GAS"));
    }
}

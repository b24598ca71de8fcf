//! The execution context a native call runs in: snapshot, persisting
//! block, gas budget, witnesses and emitted notifications.

use crate::call_flags::CallFlags;
use crate::error::{Error, Result};
use crate::interop::StackItem;
use neo_config::ProtocolSettings;
use neo_core::{Block, Transaction, UInt160};
use neo_persistence::DataCache;
use num_bigint::BigInt;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// What started this execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerType {
    /// Block driver, before the block's transactions.
    OnPersist,
    /// Block driver, after the block's transactions.
    PostPersist,
    /// An ordinary transaction script.
    Application,
}

/// A structured event emitted during execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationEvent {
    pub contract: UInt160,
    pub name: String,
    pub state: Vec<StackItem>,
}

/// A cross-contract call requested by a native handler. Execution is
/// cooperative: calls queue here and the registry drains the queue at
/// call boundaries, preserving request order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredCall {
    pub caller: UInt160,
    pub target: UInt160,
    pub method: String,
    pub args: Vec<StackItem>,
}

/// A voter-reward payout decided during balance settlement, minted after
/// the owning transfer completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasDistribution {
    pub account: UInt160,
    pub amount: BigInt,
}

/// Per-call execution context for the native-contract layer.
pub struct ApplicationEngine {
    settings: Arc<ProtocolSettings>,
    trigger: TriggerType,
    snapshot: DataCache,
    persisting_block: Option<Block>,
    transaction: Option<Transaction>,
    calling_script_hash: Option<UInt160>,
    call_flags: CallFlags,
    gas_limit: i64,
    fee_consumed: i64,
    notifications: Vec<NotificationEvent>,
    deferred_calls: VecDeque<DeferredCall>,
    pending_distributions: Vec<GasDistribution>,
    extra_witnesses: HashSet<UInt160>,
}

impl ApplicationEngine {
    pub fn new(settings: Arc<ProtocolSettings>, snapshot: DataCache, trigger: TriggerType) -> Self {
        Self {
            settings,
            trigger,
            snapshot,
            persisting_block: None,
            transaction: None,
            calling_script_hash: None,
            call_flags: CallFlags::ALL,
            gas_limit: i64::MAX,
            fee_consumed: 0,
            notifications: Vec::new(),
            deferred_calls: VecDeque::new(),
            pending_distributions: Vec::new(),
            extra_witnesses: HashSet::new(),
        }
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.persisting_block = Some(block);
        self
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn with_gas_limit(mut self, limit: i64) -> Self {
        self.gas_limit = limit;
        self
    }

    pub fn with_call_flags(mut self, flags: CallFlags) -> Self {
        self.call_flags = flags;
        self
    }

    pub fn with_calling_script_hash(mut self, hash: UInt160) -> Self {
        self.calling_script_hash = Some(hash);
        self
    }

    /// Grants a witness beyond the transaction's signers. Used by the
    /// block driver and by tests.
    pub fn add_witness(&mut self, account: UInt160) {
        self.extra_witnesses.insert(account);
    }

    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    pub fn settings_arc(&self) -> Arc<ProtocolSettings> {
        self.settings.clone()
    }

    pub fn trigger(&self) -> TriggerType {
        self.trigger
    }

    pub fn snapshot(&self) -> &DataCache {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut DataCache {
        &mut self.snapshot
    }

    pub fn into_snapshot(self) -> DataCache {
        self.snapshot
    }

    pub fn persisting_block(&self) -> Option<&Block> {
        self.persisting_block.as_ref()
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    pub fn calling_script_hash(&self) -> Option<UInt160> {
        self.calling_script_hash
    }

    pub fn set_calling_script_hash(&mut self, hash: Option<UInt160>) {
        self.calling_script_hash = hash;
    }

    pub fn call_flags(&self) -> CallFlags {
        self.call_flags
    }

    /// Height the current execution settles at: the persisting block, or
    /// one past the stored chain tip for query-style calls.
    pub fn persisting_index(&self) -> u32 {
        match &self.persisting_block {
            Some(block) => block.index(),
            None => crate::native::LedgerContract::current_index(&self.snapshot)
                .map(|index| index + 1)
                .unwrap_or(0),
        }
    }

    /// Whether `account` authorized the current execution.
    pub fn check_witness(&self, account: &UInt160) -> bool {
        if self.extra_witnesses.contains(account) {
            return true;
        }
        match &self.transaction {
            Some(tx) => tx.signers.contains(account),
            None => false,
        }
    }

    pub fn fee_consumed(&self) -> i64 {
        self.fee_consumed
    }

    /// Charges `amount` GAS fractions against the budget.
    pub fn add_fee(&mut self, amount: i64) -> Result<()> {
        let consumed = self
            .fee_consumed
            .checked_add(amount)
            .ok_or(Error::GasExhausted {
                required: amount,
                limit: self.gas_limit,
            })?;
        if consumed > self.gas_limit {
            return Err(Error::GasExhausted {
                required: amount,
                limit: self.gas_limit,
            });
        }
        self.fee_consumed = consumed;
        Ok(())
    }

    pub fn notifications(&self) -> &[NotificationEvent] {
        &self.notifications
    }

    pub(crate) fn push_notification(&mut self, event: NotificationEvent) {
        self.notifications.push(event);
    }

    /// Queues a cooperative call into another contract.
    pub fn call_from_native(
        &mut self,
        caller: UInt160,
        target: UInt160,
        method: &str,
        args: Vec<StackItem>,
    ) {
        self.deferred_calls.push_back(DeferredCall {
            caller,
            target,
            method: method.to_string(),
            args,
        });
    }

    pub(crate) fn take_deferred_call(&mut self) -> Option<DeferredCall> {
        self.deferred_calls.pop_front()
    }

    pub(crate) fn push_distribution(&mut self, distribution: GasDistribution) {
        self.pending_distributions.push(distribution);
    }

    pub(crate) fn take_distributions(&mut self) -> Vec<GasDistribution> {
        std::mem::take(&mut self.pending_distributions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_config::Hardfork;
    use neo_core::ECPoint;
    use neo_persistence::MemoryStore;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn settings() -> Arc<ProtocolSettings> {
        let key = ECPoint::from_str(
            "036b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296",
        )
        .unwrap();
        Arc::new(
            ProtocolSettings::new(vec![key], 1, HashMap::<Hardfork, u32>::new()).unwrap(),
        )
    }

    fn engine() -> ApplicationEngine {
        ApplicationEngine::new(
            settings(),
            DataCache::new(Arc::new(MemoryStore::new())),
            TriggerType::Application,
        )
    }

    #[test]
    fn fee_budget_is_enforced() {
        let mut engine = engine().with_gas_limit(100);
        engine.add_fee(60).unwrap();
        engine.add_fee(40).unwrap();
        assert!(matches!(engine.add_fee(1), Err(Error::GasExhausted { .. })));
        assert_eq!(engine.fee_consumed(), 100);
    }

    #[test]
    fn witnesses_come_from_signers_and_grants() {
        let signer = UInt160::from([1u8; 20]);
        let granted = UInt160::from([2u8; 20]);
        let other = UInt160::from([3u8; 20]);
        let mut engine = engine().with_transaction(Transaction {
            signers: vec![signer],
            ..Transaction::default()
        });
        engine.add_witness(granted);
        assert!(engine.check_witness(&signer));
        assert!(engine.check_witness(&granted));
        assert!(!engine.check_witness(&other));
    }

    #[test]
    fn deferred_calls_preserve_order() {
        let mut engine = engine();
        engine.call_from_native(UInt160::ZERO, UInt160::from([1u8; 20]), "a", Vec::new());
        engine.call_from_native(UInt160::ZERO, UInt160::from([2u8; 20]), "b", Vec::new());
        assert_eq!(engine.take_deferred_call().unwrap().method, "a");
        assert_eq!(engine.take_deferred_call().unwrap().method, "b");
        assert!(engine.take_deferred_call().is_none());
    }
}

//! A miniature block driver shared by the integration scenarios: it
//! pushes blocks through the registry the way the persistence pipeline
//! would, with transaction scripts running between the persist phases.

// Not every scenario file uses every helper.
#![allow(dead_code)]

use neo_config::ProtocolSettings;
use neo_core::{
    create_signature_redeem_script, get_bft_address, to_script_hash, Block, BlockHeader, ECPoint,
    Transaction, UInt160, UInt256,
};
use neo_persistence::{DataCache, MemoryStore};
use neo_smart_contract::native::{NativeRegistry, NeoToken};
use neo_smart_contract::{ApplicationEngine, Error, TriggerType};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use std::collections::HashMap;
use std::sync::Arc;

pub const GENESIS_TIMESTAMP_MS: u64 = 1_468_595_301_000;

/// Deterministic secp256r1 public key derived from a small scalar.
pub fn test_key(seed: u8) -> ECPoint {
    let mut scalar = [0u8; 32];
    scalar[31] = seed;
    let secret = SecretKey::from_slice(&scalar).unwrap();
    let encoded = secret.public_key().to_encoded_point(true);
    ECPoint::from_bytes(encoded.as_bytes()).unwrap()
}

/// The single-signature account of a public key.
pub fn signature_address(key: &ECPoint) -> UInt160 {
    to_script_hash(&create_signature_redeem_script(key))
}

pub struct Chain {
    pub settings: Arc<ProtocolSettings>,
    pub registry: NativeRegistry,
    snapshot: Option<DataCache>,
    next_index: u32,
}

impl Chain {
    /// A chain whose standby committee is `committee_size` test keys
    /// (seeds 1..), the first `validators` of them validating. The
    /// genesis block is persisted before this returns.
    pub fn new(committee_size: u8, validators: usize) -> Self {
        let committee: Vec<ECPoint> = (1..=committee_size).map(test_key).collect();
        let settings =
            Arc::new(ProtocolSettings::new(committee, validators, HashMap::new()).unwrap());
        let mut chain = Self {
            settings,
            registry: NativeRegistry::new(),
            snapshot: Some(DataCache::new(Arc::new(MemoryStore::new()))),
            next_index: 0,
        };
        chain.advance();
        chain
    }

    pub fn bft_address(&self) -> UInt160 {
        get_bft_address(&self.settings.standby_validators()).unwrap()
    }

    pub fn committee_address(&self) -> UInt160 {
        NeoToken::committee_address(self.snapshot()).unwrap()
    }

    pub fn snapshot(&self) -> &DataCache {
        self.snapshot.as_ref().unwrap()
    }

    pub fn snapshot_mut(&mut self) -> &mut DataCache {
        self.snapshot.as_mut().unwrap()
    }

    /// Height of the last persisted block.
    pub fn tip(&self) -> u32 {
        self.next_index - 1
    }

    fn make_block(&self, transactions: Vec<Transaction>) -> Block {
        let index = self.next_index;
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&index.to_le_bytes());
        hash[31] = 0xb1;
        Block {
            header: BlockHeader {
                hash: UInt256::from(hash),
                prev_hash: UInt256::ZERO,
                index,
                timestamp_ms: GENESIS_TIMESTAMP_MS
                    + index as u64 * self.settings.milliseconds_per_block as u64,
                next_consensus: UInt160::ZERO,
                primary_index: 0,
            },
            transactions,
        }
    }

    /// Persists an empty block.
    pub fn advance(&mut self) {
        self.advance_with(Transaction::default(), |_, _| Ok(()))
            .unwrap();
    }

    pub fn advance_blocks(&mut self, count: u32) {
        for _ in 0..count {
            self.advance();
        }
    }

    /// Persists one block, running `exec` between the persist phases
    /// with an application-trigger engine carrying `tx`. The block is
    /// persisted even when `exec` faults, like a faulted transaction in
    /// a valid block.
    pub fn advance_with<F>(&mut self, tx: Transaction, exec: F) -> Result<(), Error>
    where
        F: FnOnce(&NativeRegistry, &mut ApplicationEngine) -> Result<(), Error>,
    {
        let block = self.make_block(vec![tx.clone()]);
        let snapshot = self.snapshot.take().unwrap();

        let mut engine =
            ApplicationEngine::new(self.settings.clone(), snapshot, TriggerType::OnPersist)
                .with_block(block.clone());
        self.registry.on_persist(&mut engine)?;
        let snapshot = engine.into_snapshot();

        let mut engine =
            ApplicationEngine::new(self.settings.clone(), snapshot, TriggerType::Application)
                .with_block(block.clone())
                .with_transaction(tx);
        let outcome = exec(&self.registry, &mut engine);
        let snapshot = engine.into_snapshot();

        let mut engine =
            ApplicationEngine::new(self.settings.clone(), snapshot, TriggerType::PostPersist)
                .with_block(block);
        self.registry.post_persist(&mut engine)?;
        self.snapshot = Some(engine.into_snapshot());
        self.next_index += 1;
        outcome
    }

    /// Runs a single native call in its own block, signed by `signers`.
    pub fn call(
        &mut self,
        signers: &[UInt160],
        contract: &UInt160,
        method: &str,
        args: &[neo_smart_contract::StackItem],
    ) -> Result<neo_smart_contract::StackItem, Error> {
        let mut result = None;
        self.advance_with(
            Transaction {
                signers: signers.to_vec(),
                ..Transaction::default()
            },
            |registry, engine| {
                result = Some(registry.call(engine, contract, method, args)?);
                Ok(())
            },
        )?;
        Ok(result.expect("call did not run"))
    }
}

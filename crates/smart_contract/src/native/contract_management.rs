//! The ContractManagement contract: the deployed-contract registry and
//! the deploy/update/destroy lifecycle.

use crate::application_engine::ApplicationEngine;
use crate::contract_state::ContractState;
use crate::error::{Error, Result};
use crate::interop::{Interoperable, StackItem};
use crate::manifest::ContractManifest;
use crate::native::native_contract::{
    emit_event, EventDescriptor, MethodDescriptor, NativeContract, NativeContractMeta, ParamType,
};
use crate::native::neo_token::NeoToken;
use crate::native::policy_contract::PolicyContract;
use crate::nef::NefFile;
use crate::storage::SnapshotExt;
use crate::CallFlags;
use neo_config::Hardfork;
use neo_core::{get_contract_hash, UInt160};
use neo_persistence::{DataCache, KeyBuilder, SeekDirection, StorageItem, StorageKey};

pub const ID: i32 = -1;

const PREFIX_CONTRACT: u8 = 8;
const PREFIX_CONTRACT_HASH: u8 = 12;
const PREFIX_NEXT_AVAILABLE_ID: u8 = 15;
const PREFIX_MINIMUM_DEPLOYMENT_FEE: u8 = 20;

const DEFAULT_MINIMUM_DEPLOYMENT_FEE: i64 = 10_0000_0000;

/// Compiler tag stamped on the synthetic NEF of native contracts.
pub const NATIVE_COMPILER: &str = "neo-core-v3.0";

pub struct ContractManagement {
    meta: NativeContractMeta,
}

impl Default for ContractManagement {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractManagement {
    pub fn new() -> Self {
        let methods = vec![
            MethodDescriptor::new(
                "deploy",
                &[
                    ("nefFile", ParamType::ByteArray),
                    ("manifest", ParamType::ByteArray),
                ],
                ParamType::Array,
                0,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "deploy",
                &[
                    ("nefFile", ParamType::ByteArray),
                    ("manifest", ParamType::ByteArray),
                    ("data", ParamType::Any),
                ],
                ParamType::Array,
                0,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "update",
                &[
                    ("nefFile", ParamType::ByteArray),
                    ("manifest", ParamType::ByteArray),
                ],
                ParamType::Void,
                0,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "update",
                &[
                    ("nefFile", ParamType::ByteArray),
                    ("manifest", ParamType::ByteArray),
                    ("data", ParamType::Any),
                ],
                ParamType::Void,
                0,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "destroy",
                &[],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES | CallFlags::ALLOW_NOTIFY,
            ),
            MethodDescriptor::new(
                "getContract",
                &[("hash", ParamType::Hash160)],
                ParamType::Array,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "getContractById",
                &[("id", ParamType::Integer)],
                ParamType::Array,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "hasMethod",
                &[
                    ("hash", ParamType::Hash160),
                    ("method", ParamType::String),
                    ("pcount", ParamType::Integer),
                ],
                ParamType::Boolean,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "getMinimumDeploymentFee",
                &[],
                ParamType::Integer,
                1 << 15,
                CallFlags::READ_STATES,
            ),
            MethodDescriptor::new(
                "setMinimumDeploymentFee",
                &[("value", ParamType::Integer)],
                ParamType::Void,
                1 << 15,
                CallFlags::STATES,
            ),
        ];
        let events = vec![
            EventDescriptor::new("Deploy", &[("hash", ParamType::Hash160)]),
            EventDescriptor::new("Update", &[("hash", ParamType::Hash160)]),
            EventDescriptor::new("Destroy", &[("hash", ParamType::Hash160)]),
        ];
        Self {
            meta: NativeContractMeta::new("ContractManagement", ID, methods, events),
        }
    }

    /// Looks up a contract by hash. Native contracts are found too, via
    /// the records the registry persists for them.
    pub fn get_contract(snapshot: &DataCache, hash: &UInt160) -> Result<Option<ContractState>> {
        snapshot.get_interoperable(&contract_key(hash))
    }

    pub fn get_contract_by_id(snapshot: &DataCache, id: i32) -> Result<Option<ContractState>> {
        let key = contract_hash_key(id);
        match snapshot.try_get(&key) {
            Some(item) => {
                let hash = UInt160::from_bytes(item.as_bytes())?;
                Self::get_contract(snapshot, &hash)
            }
            None => Ok(None),
        }
    }

    pub fn has_method(
        snapshot: &DataCache,
        hash: &UInt160,
        method: &str,
        parameter_count: usize,
    ) -> Result<bool> {
        Ok(Self::get_contract(snapshot, hash)?
            .map(|state| state.has_method(method, parameter_count))
            .unwrap_or(false))
    }

    pub fn minimum_deployment_fee(snapshot: &DataCache) -> i64 {
        snapshot
            .try_get(&KeyBuilder::new(ID, PREFIX_MINIMUM_DEPLOYMENT_FEE).to_key())
            .map(|item| item.to_bigint())
            .and_then(|value| i64::try_from(value).ok())
            .unwrap_or(DEFAULT_MINIMUM_DEPLOYMENT_FEE)
    }

    /// Persists `state`, indexed both by hash and by id.
    pub(crate) fn put_contract_state(snapshot: &mut DataCache, state: &ContractState) -> Result<()> {
        snapshot.set_interoperable(contract_key(&state.hash), state)?;
        snapshot.put(
            contract_hash_key(state.id),
            StorageItem::new(state.hash.to_array().to_vec()),
        );
        Ok(())
    }

    /// Builds the stored record of a native contract at block `index`.
    pub(crate) fn native_contract_state(
        meta: &NativeContractMeta,
        settings: &neo_config::ProtocolSettings,
        index: u32,
    ) -> Result<ContractState> {
        let (script, _) = meta.active_script(settings, index);
        Ok(ContractState {
            id: meta.id,
            update_counter: 0,
            hash: meta.hash,
            nef: NefFile::new(NATIVE_COMPILER, script)?,
            manifest: meta.build_manifest(settings, index),
        })
    }

    fn next_available_id(snapshot: &mut DataCache) -> Result<i32> {
        let key = KeyBuilder::new(ID, PREFIX_NEXT_AVAILABLE_ID).to_key();
        let item = snapshot
            .get_and_change(&key, Some(StorageItem::from_i64(1)))
            .ok_or_else(|| Error::InvariantViolation("id counter unavailable".into()))?;
        let id = i32::try_from(item.to_bigint())
            .map_err(|_| Error::InvariantViolation("id counter overflowed".into()))?;
        item.add_assign(&1.into());
        Ok(id)
    }

    fn deploy(
        &self,
        engine: &mut ApplicationEngine,
        nef_bytes: &[u8],
        manifest_bytes: &[u8],
        data: StackItem,
    ) -> Result<StackItem> {
        let sender = engine
            .transaction()
            .map(|tx| tx.sender())
            .ok_or_else(|| Error::InvalidOperation("deployment requires a transaction".into()))?;
        if nef_bytes.is_empty() || manifest_bytes.is_empty() {
            return Err(Error::InvalidArgument("nef and manifest are required".into()));
        }
        let size_fee = PolicyContract::storage_price(engine.snapshot()) as i64
            * (nef_bytes.len() + manifest_bytes.len()) as i64;
        let fee = size_fee.max(Self::minimum_deployment_fee(engine.snapshot()));
        engine.add_fee(fee)?;

        let nef = NefFile::parse(nef_bytes)?;
        let manifest = ContractManifest::parse(manifest_bytes)?;
        let hash = get_contract_hash(&sender, nef.checksum, &manifest.name);
        if PolicyContract::is_blocked(engine.snapshot(), &hash) {
            return Err(Error::InvalidOperation(format!("contract {hash} is blocked")));
        }
        if engine.snapshot().contains(&contract_key(&hash)) {
            return Err(Error::InvalidOperation(format!(
                "contract {hash} already exists"
            )));
        }
        let id = Self::next_available_id(engine.snapshot_mut())?;
        let state = ContractState {
            id,
            update_counter: 0,
            hash,
            nef,
            manifest,
        };
        Self::put_contract_state(engine.snapshot_mut(), &state)?;
        emit_event(engine, &self.meta, "Deploy", vec![StackItem::from(&hash)])?;
        engine.call_from_native(
            self.meta.hash,
            hash,
            "_deploy",
            vec![data, StackItem::from(false)],
        );
        Ok(state.to_stack_item())
    }

    fn update(
        &self,
        engine: &mut ApplicationEngine,
        nef_bytes: Option<&[u8]>,
        manifest_bytes: Option<&[u8]>,
        data: StackItem,
    ) -> Result<()> {
        let hash = engine
            .calling_script_hash()
            .ok_or_else(|| Error::InvalidOperation("update must be called by a contract".into()))?;
        let mut state = Self::get_contract(engine.snapshot(), &hash)?
            .ok_or(Error::ContractNotFound(hash))?;
        let size = nef_bytes.map(<[u8]>::len).unwrap_or(0)
            + manifest_bytes.map(<[u8]>::len).unwrap_or(0);
        if size == 0 {
            return Err(Error::InvalidArgument(
                "update needs a new nef or manifest".into(),
            ));
        }
        engine.add_fee(PolicyContract::storage_price(engine.snapshot()) as i64 * size as i64)?;

        if let Some(bytes) = nef_bytes {
            state.nef = NefFile::parse(bytes)?;
        }
        if let Some(bytes) = manifest_bytes {
            let manifest = ContractManifest::parse(bytes)?;
            if manifest.name != state.manifest.name {
                return Err(Error::InvalidArgument(
                    "an update cannot rename the contract".into(),
                ));
            }
            state.manifest = manifest;
        }
        state.update_counter = state
            .update_counter
            .checked_add(1)
            .ok_or_else(|| Error::InvalidOperation("update counter exhausted".into()))?;
        Self::put_contract_state(engine.snapshot_mut(), &state)?;
        emit_event(engine, &self.meta, "Update", vec![StackItem::from(&hash)])?;
        engine.call_from_native(
            self.meta.hash,
            hash,
            "_deploy",
            vec![data, StackItem::from(true)],
        );
        Ok(())
    }

    fn destroy(&self, engine: &mut ApplicationEngine) -> Result<()> {
        let hash = engine
            .calling_script_hash()
            .ok_or_else(|| Error::InvalidOperation("destroy must be called by a contract".into()))?;
        let Some(state) = Self::get_contract(engine.snapshot(), &hash)? else {
            return Ok(());
        };
        let snapshot = engine.snapshot_mut();
        snapshot.delete(&contract_key(&hash));
        snapshot.delete(&contract_hash_key(state.id));
        // Sweep every key the contract owns.
        let prefix = state.id.to_be_bytes();
        let owned = snapshot.find(&prefix, SeekDirection::Forward);
        for (key, _) in owned {
            snapshot.delete(&key);
        }
        // The hash is retired for good; a redeploy under it is blocked.
        PolicyContract::block_account_unchecked(snapshot, &hash);
        emit_event(engine, &self.meta, "Destroy", vec![StackItem::from(&hash)])
    }

    fn set_minimum_deployment_fee(
        &self,
        engine: &mut ApplicationEngine,
        value: i64,
    ) -> Result<()> {
        if value < 0 {
            return Err(Error::InvalidArgument(
                "minimum deployment fee must not be negative".into(),
            ));
        }
        let committee = NeoToken::committee_address(engine.snapshot())?;
        if !engine.check_witness(&committee) {
            return Err(Error::InvalidOperation(
                "committee witness is required".into(),
            ));
        }
        engine.snapshot_mut().put(
            KeyBuilder::new(ID, PREFIX_MINIMUM_DEPLOYMENT_FEE).to_key(),
            StorageItem::from_i64(value),
        );
        Ok(())
    }
}

impl NativeContract for ContractManagement {
    fn meta(&self) -> &NativeContractMeta {
        &self.meta
    }

    fn invoke(
        &self,
        engine: &mut ApplicationEngine,
        method: &str,
        args: &[StackItem],
    ) -> Result<StackItem> {
        match (method, args.len()) {
            ("deploy", 2) => {
                self.deploy(engine, &args[0].as_bytes()?, &args[1].as_bytes()?, StackItem::Null)
            }
            ("deploy", 3) => self.deploy(
                engine,
                &args[0].as_bytes()?,
                &args[1].as_bytes()?,
                args[2].clone(),
            ),
            ("update", 2) | ("update", 3) => {
                let nef = optional_bytes(&args[0])?;
                let manifest = optional_bytes(&args[1])?;
                let data = args.get(2).cloned().unwrap_or(StackItem::Null);
                self.update(engine, nef.as_deref(), manifest.as_deref(), data)?;
                Ok(StackItem::Null)
            }
            ("destroy", 0) => {
                self.destroy(engine)?;
                Ok(StackItem::Null)
            }
            ("getContract", 1) => Ok(
                match Self::get_contract(engine.snapshot(), &args[0].as_uint160()?)? {
                    Some(state) => state.to_stack_item(),
                    None => StackItem::Null,
                },
            ),
            ("getContractById", 1) => Ok(
                match Self::get_contract_by_id(engine.snapshot(), args[0].as_i64()? as i32)? {
                    Some(state) => state.to_stack_item(),
                    None => StackItem::Null,
                },
            ),
            ("hasMethod", 3) => Ok(StackItem::from(Self::has_method(
                engine.snapshot(),
                &args[0].as_uint160()?,
                &args[1].as_string()?,
                args[2].as_u32()? as usize,
            )?)),
            ("getMinimumDeploymentFee", 0) => Ok(StackItem::from(Self::minimum_deployment_fee(
                engine.snapshot(),
            ))),
            ("setMinimumDeploymentFee", 1) => {
                self.set_minimum_deployment_fee(engine, args[0].as_i64()?)?;
                Ok(StackItem::Null)
            }
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
            snapshot.put(
                KeyBuilder::new(ID, PREFIX_MINIMUM_DEPLOYMENT_FEE).to_key(),
                StorageItem::from_i64(DEFAULT_MINIMUM_DEPLOYMENT_FEE),
            );
            snapshot.put(
                KeyBuilder::new(ID, PREFIX_NEXT_AVAILABLE_ID).to_key(),
                StorageItem::from_i64(1),
            );
        }
        Ok(())
    }
}

fn contract_key(hash: &UInt160) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_CONTRACT).add_uint160(hash).to_key()
}

fn contract_hash_key(id: i32) -> StorageKey {
    KeyBuilder::new(ID, PREFIX_CONTRACT_HASH)
        .add(&id.to_be_bytes())
        .to_key()
}

fn optional_bytes(item: &StackItem) -> Result<Option<Vec<u8>>> {
    match item {
        StackItem::Null => Ok(None),
        other => Ok(Some(other.as_bytes()?)),
    }
}

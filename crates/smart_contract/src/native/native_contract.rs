//! Metadata and dispatch plumbing shared by every native contract.
//!
//! Each contract declares a static method table and a static event table.
//! The registry resolves calls through the table, charges the declared
//! fees, and enforces call flags and hardfork gates before dispatching.

use crate::application_engine::{ApplicationEngine, NotificationEvent};
use crate::error::{Error, Result};
use crate::interop::StackItem;
use crate::manifest::{
    ContractAbi, ContractEventDescriptor, ContractManifest, ContractMethodDescriptor,
    ContractParameterDefinition, ContractParameterType, ContractPermission, Wildcard,
};
use crate::CallFlags;
use neo_config::{Hardfork, ProtocolSettings};
use neo_core::{get_contract_hash, interop_hash, UInt160};
use std::collections::BTreeMap;

const OP_PUSH0: u8 = 0x10;
const OP_RET: u8 = 0x40;
const OP_SYSCALL: u8 = 0x41;

/// Argument and return types of native methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Any,
    Boolean,
    Integer,
    ByteArray,
    String,
    Hash160,
    Hash256,
    PublicKey,
    Array,
    Map,
    Void,
}

impl ParamType {
    /// Checks that `item` can be read as this type. Conversions are
    /// lazy; handlers decode again when they consume the argument.
    /// Parameters are nullable, so `Null` always passes; handlers
    /// reject it where a value is required.
    pub fn check(&self, item: &StackItem) -> Result<()> {
        if item.is_null() {
            return Ok(());
        }
        match self {
            ParamType::Any | ParamType::Void => Ok(()),
            ParamType::Boolean => item.as_bool().map(|_| ()),
            ParamType::Integer => item.as_int().map(|_| ()),
            ParamType::ByteArray | ParamType::String => item.as_bytes().map(|_| ()),
            ParamType::Hash160 => item.as_uint160().map(|_| ()),
            ParamType::Hash256 => item.as_uint256().map(|_| ()),
            ParamType::PublicKey => item.as_ecpoint().map(|_| ()),
            ParamType::Array => item.as_array().map(|_| ()),
            ParamType::Map => match item {
                StackItem::Map(_) => Ok(()),
                other => Err(Error::InvalidArgument(format!(
                    "expected a map, got {}",
                    other.type_name()
                ))),
            },
        }
    }

    fn to_contract_parameter_type(self) -> ContractParameterType {
        match self {
            ParamType::Any => ContractParameterType::Any,
            ParamType::Boolean => ContractParameterType::Boolean,
            ParamType::Integer => ContractParameterType::Integer,
            ParamType::ByteArray => ContractParameterType::ByteArray,
            ParamType::String => ContractParameterType::String,
            ParamType::Hash160 => ContractParameterType::Hash160,
            ParamType::Hash256 => ContractParameterType::Hash256,
            ParamType::PublicKey => ContractParameterType::PublicKey,
            ParamType::Array => ContractParameterType::Array,
            ParamType::Map => ContractParameterType::Map,
            ParamType::Void => ContractParameterType::Void,
        }
    }
}

/// One entry of a native contract's method table.
#[derive(Clone, Debug)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameters: Vec<(String, ParamType)>,
    pub return_type: ParamType,
    /// Execution cost, multiplied by the execution fee factor.
    pub cpu_fee: i64,
    /// Storage cost, multiplied by the storage price.
    pub storage_fee: i64,
    pub required_flags: CallFlags,
    pub safe: bool,
    pub active_in: Option<Hardfork>,
    pub deprecated_in: Option<Hardfork>,
}

impl MethodDescriptor {
    pub fn new(
        name: &str,
        parameters: &[(&str, ParamType)],
        return_type: ParamType,
        cpu_fee: i64,
        required_flags: CallFlags,
    ) -> Self {
        Self {
            name: name.to_string(),
            parameters: parameters
                .iter()
                .map(|(n, t)| (n.to_string(), *t))
                .collect(),
            return_type,
            cpu_fee,
            storage_fee: 0,
            // Methods that cannot write are safe to call from read-only
            // contexts.
            safe: !required_flags.intersects(CallFlags::WRITE_STATES | CallFlags::ALLOW_NOTIFY),
            required_flags,
            active_in: None,
            deprecated_in: None,
        }
    }

    pub fn with_storage_fee(mut self, fee: i64) -> Self {
        self.storage_fee = fee;
        self
    }

    pub fn active_in(mut self, hardfork: Hardfork) -> Self {
        self.active_in = Some(hardfork);
        self
    }

    pub fn deprecated_in(mut self, hardfork: Hardfork) -> Self {
        self.deprecated_in = Some(hardfork);
        self
    }

    /// Whether this method exists at block `index`.
    pub fn is_active(&self, settings: &ProtocolSettings, index: u32) -> bool {
        settings.is_hardfork_enabled_opt(self.active_in, index)
            && !(self.deprecated_in.is_some()
                && settings.is_hardfork_enabled_opt(self.deprecated_in, index))
    }
}

/// One entry of a native contract's event table.
#[derive(Clone, Debug)]
pub struct EventDescriptor {
    pub name: String,
    pub parameters: Vec<(String, ParamType)>,
}

impl EventDescriptor {
    pub fn new(name: &str, parameters: &[(&str, ParamType)]) -> Self {
        Self {
            name: name.to_string(),
            parameters: parameters
                .iter()
                .map(|(n, t)| (n.to_string(), *t))
                .collect(),
        }
    }
}

/// The static identity of a native contract: name, id, hash and the
/// sorted method table.
#[derive(Clone, Debug)]
pub struct NativeContractMeta {
    pub name: &'static str,
    pub id: i32,
    pub hash: UInt160,
    pub active_in: Option<Hardfork>,
    pub supported_standards: Vec<String>,
    methods: Vec<MethodDescriptor>,
    events: Vec<EventDescriptor>,
}

impl NativeContractMeta {
    pub fn new(
        name: &'static str,
        id: i32,
        mut methods: Vec<MethodDescriptor>,
        events: Vec<EventDescriptor>,
    ) -> Self {
        // The table is ordered by (name, arity) so lookup and the
        // synthetic script layout are deterministic.
        methods.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.parameters.len().cmp(&b.parameters.len()))
        });
        Self {
            name,
            id,
            hash: get_contract_hash(&UInt160::ZERO, 0, name),
            active_in: None,
            supported_standards: Vec::new(),
            methods,
            events,
        }
    }

    pub fn with_active_in(mut self, hardfork: Hardfork) -> Self {
        self.active_in = Some(hardfork);
        self
    }

    pub fn with_standards(mut self, standards: &[&str]) -> Self {
        self.supported_standards = standards.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether the contract itself exists at block `index`.
    pub fn is_active(&self, settings: &ProtocolSettings, index: u32) -> bool {
        settings.is_hardfork_enabled_opt(self.active_in, index)
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn find_method(&self, name: &str, argc: usize) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.parameters.len() == argc)
    }

    pub fn event(&self, name: &str) -> Option<&EventDescriptor> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Builds the synthetic script for the methods active at `index`,
    /// plus the map from SYSCALL offset to method table position.
    pub fn active_script(
        &self,
        settings: &ProtocolSettings,
        index: u32,
    ) -> (Vec<u8>, BTreeMap<u32, usize>) {
        let token = interop_hash("System.Contract.CallNative");
        let mut script = Vec::with_capacity(self.methods.len() * 7);
        let mut offsets = BTreeMap::new();
        for (position, method) in self.methods.iter().enumerate() {
            if !method.is_active(settings, index) {
                continue;
            }
            // Stanza: PUSH0 (call version), SYSCALL <hash4>, RET. The
            // offset points at the SYSCALL so return addresses resolve
            // to the instruction after it.
            script.push(OP_PUSH0);
            offsets.insert(script.len() as u32, position);
            script.push(OP_SYSCALL);
            script.extend_from_slice(&token);
            script.push(OP_RET);
        }
        (script, offsets)
    }

    /// Builds the manifest published for this contract at `index`. The
    /// method offsets match the synthetic script from
    /// [`active_script`](Self::active_script).
    pub fn build_manifest(&self, settings: &ProtocolSettings, index: u32) -> ContractManifest {
        let methods = self
            .methods
            .iter()
            .filter(|m| m.is_active(settings, index))
            .enumerate()
            .map(|(active_position, m)| ContractMethodDescriptor {
                name: m.name.clone(),
                parameters: parameter_definitions(&m.parameters),
                return_type: m.return_type.to_contract_parameter_type(),
                offset: active_position as u32 * 7 + 1,
                safe: m.safe,
            })
            .collect();
        let events = self
            .events
            .iter()
            .map(|e| ContractEventDescriptor {
                name: e.name.clone(),
                parameters: parameter_definitions(&e.parameters),
            })
            .collect();
        ContractManifest {
            name: self.name.to_string(),
            groups: Vec::new(),
            supported_standards: self.supported_standards.clone(),
            abi: ContractAbi { methods, events },
            permissions: vec![ContractPermission::default()],
            trusts: Wildcard::List(Vec::new()),
            extra: None,
        }
    }
}

/// Validates the event against the contract's table and records it.
pub(crate) fn emit_event(
    engine: &mut ApplicationEngine,
    meta: &NativeContractMeta,
    name: &str,
    state: Vec<StackItem>,
) -> Result<()> {
    let descriptor = meta
        .event(name)
        .ok_or_else(|| Error::InvalidNotification(format!("{} declares no event {name}", meta.name)))?;
    if descriptor.parameters.len() != state.len() {
        return Err(Error::InvalidNotification(format!(
            "event {name} takes {} fields, got {}",
            descriptor.parameters.len(),
            state.len()
        )));
    }
    engine.push_notification(NotificationEvent {
        contract: meta.hash,
        name: name.to_string(),
        state,
    });
    Ok(())
}

/// Behavior shared by every native contract.
pub trait NativeContract {
    fn meta(&self) -> &NativeContractMeta;

    /// Dispatches a resolved method call. The registry has already
    /// checked activity, flags and fees.
    fn invoke(
        &self,
        engine: &mut ApplicationEngine,
        method: &str,
        args: &[StackItem],
    ) -> Result<StackItem>;

    /// Runs once when the contract becomes active, and again for each
    /// hardfork that alters its state layout.
    fn initialize(
        &self,
        _engine: &mut ApplicationEngine,
        _hardfork: Option<Hardfork>,
    ) -> Result<()> {
        Ok(())
    }

    fn on_persist(&self, _engine: &mut ApplicationEngine) -> Result<()> {
        Ok(())
    }

    fn post_persist(&self, _engine: &mut ApplicationEngine) -> Result<()> {
        Ok(())
    }
}

fn parameter_definitions(parameters: &[(String, ParamType)]) -> Vec<ContractParameterDefinition> {
    parameters
        .iter()
        .map(|(name, ty)| ContractParameterDefinition {
            name: name.clone(),
            parameter_type: ty.to_contract_parameter_type(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_core::ECPoint;
    use std::collections::HashMap;
    use std::str::FromStr;

    // Only the first fork is configured: an empty map would pin every
    // fork to height 0 and activate the gated method.
    fn settings() -> ProtocolSettings {
        let key = ECPoint::from_str(
            "036b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296",
        )
        .unwrap();
        let mut forks = HashMap::new();
        forks.insert(Hardfork::Aspidochelone, 0);
        ProtocolSettings::new(vec![key], 1, forks).unwrap()
    }

    fn meta() -> NativeContractMeta {
        NativeContractMeta::new(
            "TestContract",
            -99,
            vec![
                MethodDescriptor::new(
                    "zeta",
                    &[],
                    ParamType::Integer,
                    1 << 4,
                    CallFlags::READ_STATES,
                ),
                MethodDescriptor::new(
                    "alpha",
                    &[("x", ParamType::Integer)],
                    ParamType::Void,
                    1 << 15,
                    CallFlags::STATES,
                ),
                MethodDescriptor::new("alpha", &[], ParamType::Void, 1 << 4, CallFlags::READ_STATES),
                MethodDescriptor::new(
                    "gated",
                    &[],
                    ParamType::Void,
                    1 << 4,
                    CallFlags::READ_STATES,
                )
                .active_in(Hardfork::Gorgon),
            ],
            vec![EventDescriptor::new("Ping", &[("value", ParamType::Integer)])],
        )
    }

    #[test]
    fn table_is_sorted_by_name_then_arity() {
        let meta = meta();
        let order: Vec<(String, usize)> = meta
            .methods()
            .iter()
            .map(|m| (m.name.clone(), m.parameters.len()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha".to_string(), 0),
                ("alpha".to_string(), 1),
                ("gated".to_string(), 0),
                ("zeta".to_string(), 0),
            ]
        );
    }

    #[test]
    fn lookup_uses_name_and_arity() {
        let meta = meta();
        assert!(meta.find_method("alpha", 0).unwrap().safe);
        assert!(!meta.find_method("alpha", 1).unwrap().safe);
        assert!(meta.find_method("alpha", 2).is_none());
    }

    #[test]
    fn inactive_methods_are_left_out_of_the_script() {
        let meta = meta();
        let settings = settings();
        let (script, offsets) = meta.active_script(&settings, 0);
        // Three of four methods are active: "gated" waits on a hardfork.
        assert_eq!(script.len(), 3 * 7);
        assert_eq!(offsets.len(), 3);
        for (&offset, _) in &offsets {
            assert_eq!(script[offset as usize], 0x41);
        }
        assert!(!offsets.values().any(|&p| meta.methods()[p].name == "gated"));
    }

    #[test]
    fn manifest_mirrors_the_active_table() {
        let meta = meta();
        let manifest = meta.build_manifest(&settings(), 0);
        assert_eq!(manifest.name, "TestContract");
        assert_eq!(manifest.abi.methods.len(), 3);
        assert!(manifest.abi.get_method("gated", 0).is_none());
        assert_eq!(manifest.abi.events.len(), 1);
    }
}

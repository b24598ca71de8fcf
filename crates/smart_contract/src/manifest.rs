//! Contract manifests: the JSON document describing a contract's ABI,
//! permissions and trust settings.

use crate::error::{Error, Result};
use neo_core::UInt160;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum serialized manifest size in bytes.
pub const MAX_MANIFEST_LENGTH: usize = u16::MAX as usize;

/// Parameter and return types of the contract ABI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractParameterType {
    Any,
    Boolean,
    Integer,
    ByteArray,
    String,
    Hash160,
    Hash256,
    PublicKey,
    Signature,
    Array,
    Map,
    InteropInterface,
    Void,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParameterDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: ContractParameterType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMethodDescriptor {
    pub name: String,
    pub parameters: Vec<ContractParameterDefinition>,
    pub return_type: ContractParameterType,
    pub offset: u32,
    pub safe: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEventDescriptor {
    pub name: String,
    pub parameters: Vec<ContractParameterDefinition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAbi {
    pub methods: Vec<ContractMethodDescriptor>,
    pub events: Vec<ContractEventDescriptor>,
}

impl ContractAbi {
    /// Finds a method by name and parameter count.
    pub fn get_method(&self, name: &str, parameter_count: usize) -> Option<&ContractMethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.parameters.len() == parameter_count)
    }
}

/// Either everything (`"*"`) or an explicit list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wildcard<T> {
    Any,
    List(Vec<T>),
}

impl<T> Default for Wildcard<T> {
    fn default() -> Self {
        Wildcard::Any
    }
}

impl<T: PartialEq> Wildcard<T> {
    pub fn covers(&self, value: &T) -> bool {
        match self {
            Wildcard::Any => true,
            Wildcard::List(items) => items.contains(value),
        }
    }
}

impl<T: Serialize> Serialize for Wildcard<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Wildcard::Any => serializer.serialize_str("*"),
            Wildcard::List(items) => items.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Wildcard<T> {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<T> {
            Text(String),
            List(Vec<T>),
        }
        match Raw::<T>::deserialize(deserializer)? {
            Raw::Text(s) if s == "*" => Ok(Wildcard::Any),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected \"*\" or a list, got {s:?}"
            ))),
            Raw::List(items) => Ok(Wildcard::List(items)),
        }
    }
}

/// A permission entry: which contracts and methods this contract may
/// call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPermission {
    pub contract: Wildcard<String>,
    pub methods: Wildcard<String>,
}

impl Default for ContractPermission {
    fn default() -> Self {
        Self {
            contract: Wildcard::Any,
            methods: Wildcard::Any,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractGroup {
    pub pub_key: String,
    pub signature: String,
}

/// The manifest document carried next to a contract's NEF.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractManifest {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<ContractGroup>,
    #[serde(default)]
    pub supported_standards: Vec<String>,
    pub abi: ContractAbi,
    #[serde(default)]
    pub permissions: Vec<ContractPermission>,
    #[serde(default)]
    pub trusts: Wildcard<String>,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

impl ContractManifest {
    /// Parses and validates a manifest from its JSON bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_MANIFEST_LENGTH {
            return Err(Error::InvalidArgument(format!(
                "manifest of {} bytes exceeds the {MAX_MANIFEST_LENGTH} byte limit",
                bytes.len()
            )));
        }
        let manifest: ContractManifest = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("manifest name is empty".into()));
        }
        // Method table must be unambiguous per (name, arity).
        for (i, method) in self.abi.methods.iter().enumerate() {
            if self.abi.methods[..i]
                .iter()
                .any(|m| m.name == method.name && m.parameters.len() == method.parameters.len())
            {
                return Err(Error::InvalidArgument(format!(
                    "duplicate ABI method {}/{}",
                    method.name,
                    method.parameters.len()
                )));
            }
        }
        Ok(())
    }

    /// Whether this manifest permits calling `method` on `target`.
    pub fn can_call(&self, target: &UInt160, method: &str) -> bool {
        self.permissions.iter().any(|permission| {
            let contract_ok = match &permission.contract {
                Wildcard::Any => true,
                Wildcard::List(items) => items
                    .iter()
                    .any(|entry| UInt160::from_str(entry).map(|h| &h == target).unwrap_or(false)),
            };
            contract_ok && permission.methods.covers(&method.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r#"{
            "name": "SampleToken",
            "groups": [],
            "supportedStandards": ["NEP-17"],
            "abi": {
                "methods": [
                    {"name": "transfer", "parameters": [
                        {"name": "from", "type": "Hash160"},
                        {"name": "to", "type": "Hash160"},
                        {"name": "amount", "type": "Integer"},
                        {"name": "data", "type": "Any"}
                    ], "returnType": "Boolean", "offset": 0, "safe": false}
                ],
                "events": [
                    {"name": "Transfer", "parameters": [
                        {"name": "from", "type": "Hash160"},
                        {"name": "to", "type": "Hash160"},
                        {"name": "amount", "type": "Integer"}
                    ]}
                ]
            },
            "permissions": [{"contract": "*", "methods": "*"}],
            "trusts": [],
            "extra": null
        }"#
        .to_string()
    }

    #[test]
    fn parses_and_finds_methods() {
        let manifest = ContractManifest::parse(sample_json().as_bytes()).unwrap();
        assert_eq!(manifest.name, "SampleToken");
        assert!(manifest.abi.get_method("transfer", 4).is_some());
        assert!(manifest.abi.get_method("transfer", 3).is_none());
        assert!(manifest.can_call(&UInt160::ZERO, "anything"));
    }

    #[test]
    fn round_trips_through_json() {
        let manifest = ContractManifest::parse(sample_json().as_bytes()).unwrap();
        let bytes = manifest.to_json_bytes().unwrap();
        assert_eq!(ContractManifest::parse(&bytes).unwrap(), manifest);
    }

    #[test]
    fn rejects_duplicate_methods() {
        let json = r#"{
            "name": "Dup",
            "abi": {"methods": [
                {"name": "f", "parameters": [], "returnType": "Void", "offset": 0, "safe": true},
                {"name": "f", "parameters": [], "returnType": "Void", "offset": 3, "safe": true}
            ], "events": []}
        }"#;
        assert!(ContractManifest::parse(json.as_bytes()).is_err());
    }

    #[test]
    fn rejects_empty_name() {
        let json = r#"{"name": "", "abi": {"methods": [], "events": []}}"#;
        assert!(ContractManifest::parse(json.as_bytes()).is_err());
    }
}

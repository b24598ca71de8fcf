use crate::error::Result;
use crate::interop::interoperable::struct_fields;
use crate::interop::{Interoperable, StackItem};
use crate::manifest::ContractManifest;
use crate::nef::NefFile;
use neo_core::UInt160;

/// The stored record of a deployed contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractState {
    pub id: i32,
    pub update_counter: u16,
    pub hash: UInt160,
    pub nef: NefFile,
    pub manifest: ContractManifest,
}

impl ContractState {
    /// Whether the ABI declares `method` with `parameter_count`
    /// parameters.
    pub fn has_method(&self, method: &str, parameter_count: usize) -> bool {
        self.manifest.abi.get_method(method, parameter_count).is_some()
    }
}

// Persisted as [id, updateCounter, hash, nef bytes, manifest json].
impl Interoperable for ContractState {
    fn from_stack_item(item: &StackItem) -> Result<Self> {
        let fields = struct_fields(item, 5)?;
        Ok(Self {
            id: fields[0].as_i64()? as i32,
            update_counter: fields[1].as_u32()? as u16,
            hash: fields[2].as_uint160()?,
            nef: NefFile::parse(&fields[3].as_bytes()?)?,
            manifest: ContractManifest::parse(&fields[4].as_bytes()?)?,
        })
    }

    fn to_stack_item(&self) -> StackItem {
        let nef_bytes = self.nef.to_bytes().unwrap_or_default();
        let manifest_bytes = self.manifest.to_json_bytes().unwrap_or_default();
        StackItem::Struct(vec![
            StackItem::from(self.id as i64),
            StackItem::from(self.update_counter as u32),
            StackItem::from(&self.hash),
            StackItem::ByteString(nef_bytes),
            StackItem::ByteString(manifest_bytes),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ContractAbi, Wildcard};

    fn sample_state() -> ContractState {
        ContractState {
            id: 7,
            update_counter: 2,
            hash: UInt160::from([3u8; 20]),
            nef: NefFile::new("test-compiler", vec![0x40]).unwrap(),
            manifest: ContractManifest {
                name: "Sample".into(),
                groups: Vec::new(),
                supported_standards: Vec::new(),
                abi: ContractAbi::default(),
                permissions: Vec::new(),
                trusts: Wildcard::List(Vec::new()),
                extra: None,
            },
        }
    }

    #[test]
    fn stack_item_round_trip() {
        let state = sample_state();
        let item = state.to_stack_item();
        assert_eq!(ContractState::from_stack_item(&item).unwrap(), state);
    }
}

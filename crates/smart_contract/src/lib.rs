//! The native-contract layer: a deterministic, fee-metered execution
//! environment for the built-in contracts (NEO/GAS ledgers, committee
//! governance, contract lifecycle, policy, notary deposits, multi-asset
//! tokens) running directly against a key-value snapshot.
//!
//! The VM, networking and consensus are external collaborators. A block
//! driver calls [`native::NativeRegistry::on_persist`] and
//! [`native::NativeRegistry::post_persist`] once per block; transactions
//! reach native methods through [`native::NativeRegistry::call`].

pub mod application_engine;
pub mod binary;
pub mod call_flags;
pub mod contract_state;
pub mod error;
pub mod interop;
pub mod manifest;
pub mod native;
pub mod nef;
pub mod storage;

pub use application_engine::{ApplicationEngine, TriggerType};
pub use call_flags::CallFlags;
pub use contract_state::ContractState;
pub use error::{Error, Result};
pub use interop::{Interoperable, StackItem};
pub use manifest::ContractManifest;
pub use nef::NefFile;
pub use storage::SnapshotExt;

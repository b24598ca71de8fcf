//! The native contracts: services baked into the protocol and executed
//! in process rather than through deployed scripts.

pub mod contract_management;
pub mod fungible_token;
pub mod gas_token;
pub mod governance_types;
pub mod ledger_contract;
pub mod native_contract;
pub mod neo_token;
pub mod notary;
pub mod policy_contract;
pub mod registry;
pub mod token_management;

pub use contract_management::ContractManagement;
pub use gas_token::GasToken;
pub use ledger_contract::LedgerContract;
pub use native_contract::{
    EventDescriptor, MethodDescriptor, NativeContract, NativeContractMeta, ParamType,
};
pub use neo_token::NeoToken;
pub use notary::Notary;
pub use policy_contract::PolicyContract;
pub use registry::NativeRegistry;
pub use token_management::TokenManagement;

//! Core primitive types shared by the native-contract layer.
//!
//! This crate carries the fixed-width hash types, the compressed
//! secp256r1 point wrapper, the block/transaction records consumed by the
//! block driver interface, and the script-hash helpers used to derive
//! contract addresses deterministically.

pub mod block;
pub mod contract;
pub mod ecpoint;
pub mod error;
pub mod tx;
pub mod uint160;
pub mod uint256;

pub use block::{Block, BlockHeader};
pub use contract::{
    create_multisig_redeem_script, create_signature_redeem_script, get_bft_address,
    get_contract_hash, interop_hash, to_script_hash,
};
pub use ecpoint::ECPoint;
pub use error::{CoreError, CoreResult};
pub use tx::Transaction;
pub use uint160::UInt160;
pub use uint256::UInt256;

use crate::call_flags::CallFlags;
use neo_core::{CoreError, UInt160};
use thiserror::Error;

/// Errors raised by the native-contract layer.
///
/// Most variants are call-level faults: the dispatch framework catches
/// them and the VM call unwinds to a fault state, deterministically on
/// every node. `MissingHeader` and `InvariantViolation` are different:
/// they indicate chain corruption or a logic bug and the block driver is
/// expected to halt on them rather than persist.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Contract not found: {0}")]
    ContractNotFound(UInt160),

    #[error("Method not found: {contract}::{method}/{argc}")]
    MethodNotFound {
        contract: String,
        method: String,
        argc: usize,
    },

    #[error("Method {contract}::{method} is not active at the current height")]
    MethodInactive { contract: String, method: String },

    #[error("Missing call flags for {method}: requires {required:?}")]
    MissingCallFlags { method: String, required: CallFlags },

    #[error("Gas budget exhausted: consuming {required} exceeds limit {limit}")]
    GasExhausted { required: i64, limit: i64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Malformed encoding: {0}")]
    Encoding(String),

    #[error("Undeclared or mismatched notification: {0}")]
    InvalidNotification(String),

    #[error("Missing header for block {0}")]
    MissingHeader(u32),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Manifest parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error must halt block processing instead of merely
    /// faulting the current call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingHeader(_) | Error::InvariantViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

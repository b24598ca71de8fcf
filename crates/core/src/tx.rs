use crate::uint160::UInt160;
use crate::uint256::UInt256;
use serde::{Deserialize, Serialize};

/// A transaction as seen by the native-contract layer.
///
/// Execution of the attached script happens elsewhere; the natives only
/// need the identity, the signer set, and the fees to burn and refund.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Hash of the signed transaction.
    pub hash: UInt256,
    /// Script hashes whose witnesses are attached. The first signer is
    /// the sender and pays the fees.
    pub signers: Vec<UInt160>,
    /// Fee consumed by execution, in GAS fractions. Burned on persist.
    pub system_fee: i64,
    /// Fee paid for size and verification, in GAS fractions. Credited to
    /// the block's primary on persist.
    pub network_fee: i64,
    /// Expiry height. The transaction is valid while the chain height is
    /// below this value.
    pub valid_until_block: u32,
    /// Nonce chosen by the sender.
    pub nonce: u32,
}

impl Transaction {
    /// The account that pays the fees for this transaction.
    pub fn sender(&self) -> UInt160 {
        self.signers.first().copied().unwrap_or(UInt160::ZERO)
    }
}

//! Script construction and hashing helpers.
//!
//! Contract addresses are the RIPEMD160 of the SHA256 of a script, and
//! native contract hashes are derived from a tiny synthetic deployment
//! script so they stay stable across every network.

use crate::ecpoint::ECPoint;
use crate::error::CoreError;
use crate::uint160::UInt160;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

// Opcodes used by the scripts built here.
const OP_PUSHINT8: u8 = 0x00;
const OP_PUSHINT16: u8 = 0x01;
const OP_PUSHINT32: u8 = 0x02;
const OP_PUSHINT64: u8 = 0x03;
const OP_PUSHDATA1: u8 = 0x0c;
const OP_PUSH0: u8 = 0x10;
const OP_ABORT: u8 = 0x38;
const OP_SYSCALL: u8 = 0x41;

/// Computes RIPEMD160(SHA256(script)), the script hash used as an
/// account or contract address.
pub fn to_script_hash(script: &[u8]) -> UInt160 {
    let sha = Sha256::digest(script);
    let rip = Ripemd160::digest(sha);
    let mut data = [0u8; UInt160::LEN];
    data.copy_from_slice(&rip);
    UInt160::from(data)
}

/// First four bytes of SHA256 over the interop service name, the token
/// emitted after a SYSCALL opcode.
pub fn interop_hash(name: &str) -> [u8; 4] {
    let digest = Sha256::digest(name.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

fn emit_push_data(script: &mut Vec<u8>, data: &[u8]) {
    debug_assert!(data.len() < 0x100);
    script.push(OP_PUSHDATA1);
    script.push(data.len() as u8);
    script.extend_from_slice(data);
}

fn emit_push_int(script: &mut Vec<u8>, value: i64) {
    if (0..=16).contains(&value) {
        script.push(OP_PUSH0 + value as u8);
    } else if let Ok(v) = i8::try_from(value) {
        script.push(OP_PUSHINT8);
        script.push(v as u8);
    } else if let Ok(v) = i16::try_from(value) {
        script.push(OP_PUSHINT16);
        script.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = i32::try_from(value) {
        script.push(OP_PUSHINT32);
        script.extend_from_slice(&v.to_le_bytes());
    } else {
        script.push(OP_PUSHINT64);
        script.extend_from_slice(&value.to_le_bytes());
    }
}

/// Builds the verification script for a single signature account.
pub fn create_signature_redeem_script(pubkey: &ECPoint) -> Vec<u8> {
    let mut script = Vec::with_capacity(40);
    emit_push_data(&mut script, pubkey.as_bytes());
    script.push(OP_SYSCALL);
    script.extend_from_slice(&interop_hash("System.Crypto.CheckSig"));
    script
}

/// Builds the verification script for an m-of-n multisig account.
/// Public keys are sorted into canonical order before emission.
pub fn create_multisig_redeem_script(m: usize, pubkeys: &[ECPoint]) -> Result<Vec<u8>, CoreError> {
    let n = pubkeys.len();
    if m == 0 || m > n || n > 1024 {
        return Err(CoreError::InvalidOperation(format!(
            "invalid multisig parameters m={m} n={n}"
        )));
    }
    let mut sorted: Vec<ECPoint> = pubkeys.to_vec();
    sorted.sort();

    let mut script = Vec::with_capacity(8 + n * 35);
    emit_push_int(&mut script, m as i64);
    for key in &sorted {
        emit_push_data(&mut script, key.as_bytes());
    }
    emit_push_int(&mut script, n as i64);
    script.push(OP_SYSCALL);
    script.extend_from_slice(&interop_hash("System.Crypto.CheckMultisig"));
    Ok(script)
}

/// The consensus address for a validator set: an m-of-n multisig over
/// the validators with m = n - (n - 1) / 3.
pub fn get_bft_address(validators: &[ECPoint]) -> Result<UInt160, CoreError> {
    let n = validators.len();
    let m = n - (n - 1) / 3;
    Ok(to_script_hash(&create_multisig_redeem_script(
        m, validators,
    )?))
}

/// Derives the deterministic hash for a deployed contract from the
/// sender, the NEF checksum and the manifest name. Native contracts use
/// a zero sender and zero checksum, so their hashes never vary.
pub fn get_contract_hash(sender: &UInt160, nef_checksum: u32, name: &str) -> UInt160 {
    let mut script = Vec::with_capacity(64);
    script.push(OP_ABORT);
    emit_push_data(&mut script, sender.as_bytes());
    emit_push_int(&mut script, nef_checksum as i64);
    emit_push_data(&mut script, name.as_bytes());
    to_script_hash(&script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn native_hashes_are_stable() {
        // Well-known hashes of the NEO and GAS token contracts.
        let neo = get_contract_hash(&UInt160::ZERO, 0, "NeoToken");
        assert_eq!(
            neo,
            UInt160::from_str("0xef4073a0f2b305a38ec4050e4d3d28bc40ea63f5").unwrap()
        );
        let gas = get_contract_hash(&UInt160::ZERO, 0, "GasToken");
        assert_eq!(
            gas,
            UInt160::from_str("0xd2a4cff31913016155e38e474a2c06d08be276cf").unwrap()
        );
    }

    #[test]
    fn push_int_encodings() {
        let mut s = Vec::new();
        emit_push_int(&mut s, 0);
        assert_eq!(s, vec![0x10]);
        s.clear();
        emit_push_int(&mut s, 16);
        assert_eq!(s, vec![0x20]);
        s.clear();
        emit_push_int(&mut s, 100);
        assert_eq!(s, vec![OP_PUSHINT8, 100]);
        s.clear();
        emit_push_int(&mut s, 1000);
        assert_eq!(s, vec![OP_PUSHINT16, 0xe8, 0x03]);
        s.clear();
        emit_push_int(&mut s, 100_000);
        assert_eq!(s, vec![OP_PUSHINT32, 0xa0, 0x86, 0x01, 0x00]);
    }

    #[test]
    fn multisig_rejects_bad_parameters() {
        let key = ECPoint::from_str(
            "036b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296",
        )
        .unwrap();
        assert!(create_multisig_redeem_script(0, &[key]).is_err());
        assert!(create_multisig_redeem_script(2, &[key]).is_err());
        assert!(create_multisig_redeem_script(1, &[key]).is_ok());
    }
}

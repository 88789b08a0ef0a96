// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction signing and signature recovery.
//!
//! Signatures are secp256k1 over the 32-byte transaction digest, serialized
//! as 65 bytes `r || s || v` where `v` is the recovery id.

use alloy::primitives::keccak256;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::TransferError;

/// Length of a recoverable signature.
pub const SIGNATURE_LEN: usize = 65;

/// Sign a digest with a raw 32-byte private key.
pub fn sign_digest(private_key: &[u8], digest: &[u8; 32]) -> Result<Vec<u8>, TransferError> {
    let signing_key = SigningKey::from_slice(private_key)
        .map_err(|e| TransferError::KeyDerivation(format!("Invalid private key: {}", e)))?;

    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|e| TransferError::Encoding(format!("Signing failed: {}", e)))?;

    let mut out = Vec::with_capacity(SIGNATURE_LEN);
    out.extend_from_slice(&signature.to_bytes());
    out.push(recovery_id.to_byte());
    Ok(out)
}

/// Derive the raw 21-byte address of a public key.
///
/// Address = prefix || keccak256(uncompressed point without 0x04)[12..].
pub fn address_from_verifying_key(key: &VerifyingKey, prefix: u8) -> Vec<u8> {
    let point = key.as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);

    let mut address = Vec::with_capacity(21);
    address.push(prefix);
    address.extend_from_slice(&hash[12..]);
    address
}

/// Hex address of a raw private key.
pub fn address_from_private_key(private_key: &[u8], prefix: u8) -> Result<String, TransferError> {
    let signing_key = SigningKey::from_slice(private_key)
        .map_err(|e| TransferError::KeyDerivation(format!("Invalid private key: {}", e)))?;
    Ok(alloy::hex::encode(address_from_verifying_key(
        signing_key.verifying_key(),
        prefix,
    )))
}

/// Recover the signer's raw address from a digest and 65-byte signature.
pub fn recover_address(
    digest: &[u8; 32],
    signature: &[u8],
    prefix: u8,
) -> Result<Vec<u8>, TransferError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(TransferError::SignatureVerificationFailed(format!(
            "signature is {} bytes",
            signature.len()
        )));
    }

    let v = signature[64];
    // Some signers emit Ethereum-style 27/28.
    let v = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| {
        TransferError::SignatureVerificationFailed(format!("invalid recovery id {v}"))
    })?;
    let signature = Signature::from_slice(&signature[..64])
        .map_err(|e| TransferError::SignatureVerificationFailed(e.to_string()))?;

    let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|e| TransferError::SignatureVerificationFailed(e.to_string()))?;
    Ok(address_from_verifying_key(&key, prefix))
}

/// True when `signature` over `digest` was produced by `owner`.
pub fn verify_owner(digest: &[u8; 32], signature: &[u8], owner: &[u8]) -> bool {
    let Some(&prefix) = owner.first() else {
        return false;
    };
    match recover_address(digest, signature, prefix) {
        Ok(recovered) => recovered == owner,
        Err(e) => {
            tracing::debug!(error = %e, "Signature recovery failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    const KEY_A: [u8; 32] = [1u8; 32];
    const KEY_B: [u8; 32] = [2u8; 32];

    fn digest(msg: &[u8]) -> [u8; 32] {
        Sha256::digest(msg).into()
    }

    #[test]
    fn signature_is_65_bytes() {
        let sig = sign_digest(&KEY_A, &digest(b"payload")).unwrap();
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(sig[64] <= 1);
    }

    #[test]
    fn recovered_address_matches_signer() {
        let d = digest(b"payload");
        let sig = sign_digest(&KEY_A, &d).unwrap();

        let owner = alloy::hex::decode(address_from_private_key(&KEY_A, 0x41).unwrap()).unwrap();
        assert_eq!(owner.len(), 21);
        assert_eq!(owner[0], 0x41);
        assert!(verify_owner(&d, &sig, &owner));

        let mut legacy = sig.clone();
        legacy[64] += 27;
        assert!(verify_owner(&d, &legacy, &owner));
    }

    #[test]
    fn wrong_signer_is_rejected() {
        let d = digest(b"payload");
        let sig = sign_digest(&KEY_B, &d).unwrap();
        let owner = alloy::hex::decode(address_from_private_key(&KEY_A, 0x41).unwrap()).unwrap();
        assert!(!verify_owner(&d, &sig, &owner));
    }

    #[test]
    fn tampered_digest_is_rejected() {
        let sig = sign_digest(&KEY_A, &digest(b"payload")).unwrap();
        let owner = alloy::hex::decode(address_from_private_key(&KEY_A, 0x41).unwrap()).unwrap();
        assert!(!verify_owner(&digest(b"other"), &sig, &owner));
    }

    #[test]
    fn malformed_inputs_fail_cleanly() {
        assert!(matches!(
            sign_digest(&[0u8; 32], &digest(b"x")),
            Err(TransferError::KeyDerivation(_))
        ));
        assert!(matches!(
            recover_address(&digest(b"x"), &[0u8; 10], 0x41),
            Err(TransferError::SignatureVerificationFailed(_))
        ));
        assert!(!verify_owner(&digest(b"x"), &[0u8; 65], &[]));
    }
}

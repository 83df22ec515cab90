//! Solana address encoding and validation.
//!
//! An address is the raw 32-byte key; the human-readable form is its Base58
//! encoding. Instruction data always carries the raw bytes.

use crate::error::SolError;

/// A raw 32-byte Solana public key.
pub type Pubkey = [u8; 32];

/// Decode a Base58 address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<Pubkey, SolError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: Pubkey = bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as a Base58 address string.
pub fn bytes_to_address(bytes: &Pubkey) -> String {
    bs58::encode(bytes).into_string()
}

/// Whether the key is a valid ed25519 point, i.e. could have a private key.
///
/// Program-derived addresses are by construction off the curve.
pub fn is_on_curve(key: &Pubkey) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*key)
        .decompress()
        .is_some()
}

/// Encode a 64-byte transaction signature as Base58.
pub fn signature_to_string(signature: &[u8; 64]) -> String {
    bs58::encode(signature).into_string()
}

/// Decode a Base58 transaction signature.
pub fn signature_from_str(signature: &str) -> Result<[u8; 64], SolError> {
    let bytes = bs58::decode(signature)
        .into_vec()
        .map_err(|e| SolError::SerializationError(format!("signature decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::SerializationError(format!("expected 64-byte signature, got {}", v.len()))
    })
}

//! secp256k1 signer keys.

use alloy_signer_local::PrivateKeySigner;
use k256::ecdsa::SigningKey;
use rand::{CryptoRng, RngCore};

use crate::error::CryptoError;

/// Length of a raw secp256k1 private key.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Generates a signer from `rng`.
pub fn generate_signer<R: CryptoRng + RngCore>(rng: &mut R) -> PrivateKeySigner {
    PrivateKeySigner::from_signing_key(SigningKey::random(rng))
}

/// Parses a raw 32-byte private key.
pub fn signer_from_bytes(bytes: &[u8]) -> Result<PrivateKeySigner, CryptoError> {
    if bytes.len() != PRIVATE_KEY_LENGTH {
        return Err(CryptoError::InvalidPrivateKeyLength(bytes.len()));
    }
    let key = SigningKey::from_slice(bytes).map_err(|e| CryptoError::EcdsaKeyParse(e.to_string()))?;
    Ok(PrivateKeySigner::from_signing_key(key))
}

/// Parses a hex private key, with or without a `0x` prefix.
pub fn signer_from_hex(s: &str) -> Result<PrivateKeySigner, CryptoError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| CryptoError::HexParse(e.to_string()))?;
    signer_from_bytes(&bytes)
}

/// Uncompressed SEC1 public key: `0x04 || x || y`.
pub fn public_key_bytes(signer: &PrivateKeySigner) -> Vec<u8> {
    signer.credential().verifying_key().to_encoded_point(false).as_bytes().to_vec()
}

/// The raw 32-byte private key.
pub fn private_key_bytes(signer: &PrivateKeySigner) -> Vec<u8> {
    signer.credential().to_bytes().to_vec()
}

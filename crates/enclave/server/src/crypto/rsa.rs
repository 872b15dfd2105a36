//! RSA keys for moving the signer between enclaves.
//!
//! Public keys travel as PKIX (SubjectPublicKeyInfo) DER. Payloads are PKCS#1 v1.5.

use rand::{CryptoRng, RngCore};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1v15::{DecryptingKey, EncryptingKey},
    pkcs8::{DecodePublicKey, EncodePublicKey},
    traits::{RandomizedDecryptor, RandomizedEncryptor},
};

use crate::error::CryptoError;

/// Production key size.
pub const RSA_KEY_BITS: usize = 4096;

/// Generates an RSA key of `bits` bits.
pub fn generate_rsa_key<R: CryptoRng + RngCore>(
    rng: &mut R,
    bits: usize,
) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::new(rng, bits).map_err(|e| CryptoError::RsaKeyGeneration(e.to_string()))
}

/// Serializes `key` as PKIX DER.
pub fn public_key_to_pkix(key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
    key.to_public_key_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| CryptoError::PkixSerialize(e.to_string()))
}

/// Parses a PKIX DER RSA public key.
pub fn pkix_to_public_key(der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_der(der).map_err(|e| CryptoError::PkixParse(e.to_string()))
}

/// Encrypts `data` to `key`.
pub fn encrypt_pkcs1v15<R: CryptoRng + RngCore>(
    rng: &mut R,
    key: &RsaPublicKey,
    data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    EncryptingKey::new(key.clone())
        .encrypt_with_rng(rng, data)
        .map_err(|e| CryptoError::RsaEncrypt(e.to_string()))
}

/// Decrypts `ciphertext` with blinding drawn from `rng`.
pub fn decrypt_pkcs1v15<R: CryptoRng + RngCore>(
    rng: &mut R,
    key: &RsaPrivateKey,
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    DecryptingKey::new(key.clone())
        .decrypt_with_rng(rng, ciphertext)
        .map_err(|e| CryptoError::RsaDecrypt(e.to_string()))
}

//! Proposal signatures.
//!
//! Signatures are 65 bytes, `r || s || v` with `v` in `{0, 1}`. Verification recovers the
//! signer address from the digest rather than checking against a known public key.

use alloy_primitives::{Address, Bytes, Signature};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use rollup_enclave_core::ProposalMessage;

use crate::error::ProposalError;

/// Length of a proposal signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Signs the keccak256 digest of `message`.
pub fn sign_message(
    signer: &PrivateKeySigner,
    message: &ProposalMessage,
) -> Result<Bytes, ProposalError> {
    let signature = signer
        .sign_hash_sync(&message.digest())
        .map_err(|e| ProposalError::SigningFailed(e.to_string()))?;
    Ok(Bytes::copy_from_slice(&signature.as_rsy()))
}

/// Recovers the address that produced `signature` over `message`.
pub fn recover_signer(
    message: &ProposalMessage,
    signature: &[u8],
) -> Result<Address, ProposalError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(ProposalError::InvalidSignatureLength(signature.len()));
    }
    Signature::from_raw(signature)
        .and_then(|sig| sig.recover_address_from_prehash(&message.digest()))
        .map_err(|e| ProposalError::MalformedSignature(e.to_string()))
}

/// Whether `signature` over `message` was produced by `expected`.
pub fn verify_message(
    expected: Address,
    message: &ProposalMessage,
    signature: &[u8],
) -> Result<bool, ProposalError> {
    recover_signer(message, signature).map(|signer| signer == expected)
}

//! Error types for enclave server operations.

use std::time::Duration;

use rollup_enclave_core::{ExecutorError, WitnessError};
use thiserror::Error;

/// Errors from the hardware security module.
#[derive(Debug, Clone, Error)]
pub enum ModuleError {
    /// No hardware module answers on this host.
    #[error("hardware module unavailable: {0}")]
    Unavailable(String),
    /// The device returned an error.
    #[error("hardware module error: {0}")]
    Device(String),
    /// The device returned an empty measurement register.
    #[error("hardware module returned no PCR data")]
    NoMeasurement,
    /// The device did not return an attestation document.
    #[error("hardware module did not return an attestation")]
    NoAttestation,
}

/// Root pinning and attestation document verification failures.
#[derive(Debug, Clone, Error)]
pub enum AttestationError {
    /// The pinned root bundle is not valid base64.
    #[error("root bundle is not base64: {0}")]
    Base64Decode(String),
    /// The pinned root bundle hashes to something else.
    #[error("root bundle digest {actual} does not match pinned {expected}")]
    ChecksumMismatch {
        /// Pinned SHA-256, hex.
        expected: String,
        /// Computed SHA-256, hex.
        actual: String,
    },
    /// The root bundle archive could not be read.
    #[error("root bundle archive unreadable: {0}")]
    ZipRead(String),
    /// The root certificate PEM could not be parsed.
    #[error("root certificate PEM unreadable: {0}")]
    PemParse(String),
    /// The COSE envelope or its payload is not valid CBOR.
    #[error("attestation is not valid CBOR: {0}")]
    CborParse(String),
    /// The document decoded but is not a well-formed attestation.
    #[error("invalid attestation document: {0}")]
    InvalidDocument(String),
    /// The leaf key did not sign the document.
    #[error("attestation signature rejected: {0}")]
    CoseVerify(String),
    /// A certificate in the document could not be parsed.
    #[error("invalid certificate: {0}")]
    CertificateChain(String),
    /// A field the verifier needs is absent.
    #[error("attestation has no {0}")]
    MissingField(String),
    /// A certificate expired before the verification time.
    #[error("certificate expired at {not_after}")]
    CertificateExpired {
        /// End of the validity window.
        not_after: String,
    },
    /// A certificate starts after the verification time.
    #[error("certificate only valid from {not_before}")]
    CertificateNotYetValid {
        /// Start of the validity window.
        not_before: String,
    },
    /// The bundle does not lead from the leaf to the pinned root.
    #[error("certificate does not chain to the pinned root: {0}")]
    ChainVerificationFailed(String),
    /// Building the OpenSSL trust store failed.
    #[error("trust store: {0}")]
    X509Store(String),
    /// The verification time could not be represented.
    #[error("invalid verification time: {0}")]
    InvalidTime(String),
}

/// Key generation, encoding and wrapping failures.
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    /// RSA key generation failed.
    #[error("RSA key generation: {0}")]
    RsaKeyGeneration(String),
    /// An RSA public key could not be DER encoded.
    #[error("RSA public key encoding: {0}")]
    PkixSerialize(String),
    /// Bytes are not a PKIX RSA public key.
    #[error("not a PKIX RSA public key: {0}")]
    PkixParse(String),
    /// RSA encryption failed.
    #[error("RSA encrypt: {0}")]
    RsaEncrypt(String),
    /// The ciphertext did not decrypt under the migration key.
    #[error("RSA decrypt: {0}")]
    RsaDecrypt(String),
    /// Bytes are not a valid secp256k1 scalar.
    #[error("invalid secp256k1 private key: {0}")]
    EcdsaKeyParse(String),
    /// A supplied key is not hex.
    #[error("key is not hex: {0}")]
    HexParse(String),
    /// A signer key must be exactly 32 bytes.
    #[error("signer key must be 32 bytes, got {0}")]
    InvalidPrivateKeyLength(usize),
}

/// Proposal signing and aggregation failures.
#[derive(Debug, Clone, Error)]
pub enum ProposalError {
    /// Aggregation needs at least one proposal.
    #[error("no proposals provided for aggregation")]
    EmptyProposals,
    /// A link in the chain was not signed by this enclave over the running root.
    #[error("proposal {index} does not verify against the running output root")]
    InvalidSignature {
        /// Position in the submitted list.
        index: usize,
    },
    /// A signature that is not 65 bytes.
    #[error("signature must be 65 bytes, got {0}")]
    InvalidSignatureLength(usize),
    /// The signature bytes do not form a recoverable signature.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    /// The signer refused the digest.
    #[error("signing: {0}")]
    SigningFailed(String),
}

/// Everything an enclave operation can fail with.
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    /// See [`ModuleError`].
    #[error(transparent)]
    Module(#[from] ModuleError),
    /// See [`AttestationError`].
    #[error(transparent)]
    Attestation(#[from] AttestationError),
    /// The attested enclave runs different code.
    #[error("attestation PCR0 does not match this enclave's measurement")]
    MeasurementMismatch,
    /// See [`CryptoError`].
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The execution witness could not be decoded.
    #[error("witness decode failed: {0}")]
    Witness(#[from] WitnessError),
    /// The block failed stateless execution.
    #[error("block rejected: {0}")]
    Execution(#[from] ExecutorError),
    /// See [`ProposalError`].
    #[error(transparent)]
    Proposal(#[from] ProposalError),
    /// Invalid startup configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Unexpected internal failure.
    #[error("internal: {0}")]
    Internal(String),
}

/// Result alias over [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Caller-visible error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad chain, bad signature, expired or malformed attestation.
    AttestationInvalid,
    /// Key migration across different code measurements.
    MeasurementMismatch,
    /// Malformed key material.
    KeyEncoding,
    /// RSA decryption failed.
    Decryption,
    /// The witness could not be decoded.
    WitnessDecode,
    /// The state-transition checks rejected the block.
    ExecutionFailed,
    /// A proposal signature did not verify during aggregation.
    InvalidSignature,
    /// Aggregation was given no proposals.
    EmptyProposalSet,
    /// The operation needs a hardware module and none answers.
    HardwareModuleUnavailable,
    /// The request timed out.
    Timeout,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// JSON-RPC error code for this category.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::AttestationInvalid => -32001,
            Self::MeasurementMismatch => -32002,
            Self::KeyEncoding => -32003,
            Self::Decryption => -32004,
            Self::WitnessDecode => -32005,
            Self::ExecutionFailed => -32006,
            Self::InvalidSignature => -32007,
            Self::EmptyProposalSet => -32008,
            Self::HardwareModuleUnavailable => -32009,
            Self::Timeout => -32010,
            Self::Internal => -32000,
        }
    }
}

impl ServerError {
    /// The caller-visible category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Module(ModuleError::Unavailable(_) | ModuleError::NoAttestation) => {
                ErrorKind::HardwareModuleUnavailable
            }
            Self::Module(_) | Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::Attestation(_) => ErrorKind::AttestationInvalid,
            Self::MeasurementMismatch => ErrorKind::MeasurementMismatch,
            Self::Crypto(CryptoError::RsaDecrypt(_)) => ErrorKind::Decryption,
            Self::Crypto(
                CryptoError::PkixParse(_)
                | CryptoError::PkixSerialize(_)
                | CryptoError::EcdsaKeyParse(_)
                | CryptoError::HexParse(_)
                | CryptoError::InvalidPrivateKeyLength(_),
            ) => ErrorKind::KeyEncoding,
            Self::Crypto(CryptoError::RsaKeyGeneration(_) | CryptoError::RsaEncrypt(_)) => {
                ErrorKind::Internal
            }
            Self::Witness(_) => ErrorKind::WitnessDecode,
            Self::Execution(_) => ErrorKind::ExecutionFailed,
            Self::Proposal(ProposalError::EmptyProposals) => ErrorKind::EmptyProposalSet,
            Self::Proposal(
                ProposalError::InvalidSignature { .. }
                | ProposalError::InvalidSignatureLength(_)
                | ProposalError::MalformedSignature(_),
            ) => ErrorKind::InvalidSignature,
            Self::Proposal(ProposalError::SigningFailed(_)) => ErrorKind::Internal,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rollup_enclave_core::B256;
    use rstest::rstest;

    use super::*;

    const fn crosses_threads<T: Send + Sync + 'static>() {}

    #[test]
    fn errors_cross_threads() {
        crosses_threads::<ModuleError>();
        crosses_threads::<AttestationError>();
        crosses_threads::<CryptoError>();
        crosses_threads::<ProposalError>();
        crosses_threads::<ServerError>();
    }

    #[rstest]
    #[case(AttestationError::Base64Decode("x".into()).into(), ErrorKind::AttestationInvalid)]
    #[case(ServerError::MeasurementMismatch, ErrorKind::MeasurementMismatch)]
    #[case(CryptoError::PkixParse("x".into()).into(), ErrorKind::KeyEncoding)]
    #[case(CryptoError::InvalidPrivateKeyLength(31).into(), ErrorKind::KeyEncoding)]
    #[case(CryptoError::RsaDecrypt("x".into()).into(), ErrorKind::Decryption)]
    #[case(WitnessError::MissingHeaders.into(), ErrorKind::WitnessDecode)]
    #[case(ExecutorError::MissingCode(B256::ZERO).into(), ErrorKind::ExecutionFailed)]
    #[case(ProposalError::InvalidSignature { index: 1 }.into(), ErrorKind::InvalidSignature)]
    #[case(ProposalError::EmptyProposals.into(), ErrorKind::EmptyProposalSet)]
    #[case(ModuleError::Unavailable("x".into()).into(), ErrorKind::HardwareModuleUnavailable)]
    #[case(ServerError::Timeout(Duration::from_secs(1)), ErrorKind::Timeout)]
    #[case(ModuleError::Device("x".into()).into(), ErrorKind::Internal)]
    fn kinds(#[case] err: ServerError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn codes_are_distinct() {
        let kinds = [
            ErrorKind::AttestationInvalid,
            ErrorKind::MeasurementMismatch,
            ErrorKind::KeyEncoding,
            ErrorKind::Decryption,
            ErrorKind::WitnessDecode,
            ErrorKind::ExecutionFailed,
            ErrorKind::InvalidSignature,
            ErrorKind::EmptyProposalSet,
            ErrorKind::HardwareModuleUnavailable,
            ErrorKind::Timeout,
            ErrorKind::Internal,
        ];
        let codes: HashSet<i32> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), kinds.len());
    }
}

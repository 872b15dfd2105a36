//! Nitro attestation documents.
//!
//! A document is a COSE_Sign1 envelope around a CBOR map. The envelope is
//! signed by a short-lived leaf certificate that chains through the
//! document's CA bundle to a pinned root.

use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

use aws_nitro_enclaves_cose::{CoseSign1, crypto::Openssl};
use openssl::{
    asn1::Asn1Time,
    stack::Stack,
    x509::{X509, X509StoreContext, store::X509StoreBuilder, verify::X509VerifyFlags},
};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use tracing::debug;

use super::{AttestationVerifier, PinnedRoots, VerifiedAttestation};
use crate::error::AttestationError;

/// The only digest Nitro modules produce.
const EXPECTED_DIGEST: &str = "SHA384";

/// The CBOR payload of an attestation document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationDocument {
    /// Module ID
    pub module_id: String,
    /// Digest algorithm
    pub digest: String,
    /// Timestamp in milliseconds
    pub timestamp: u64,
    /// PCR values (index -> value)
    pub pcrs: BTreeMap<u16, ByteBuf>,
    /// Leaf certificate, DER
    pub certificate: ByteBuf,
    /// Root-first CA bundle, DER
    #[serde(default)]
    pub cabundle: Vec<ByteBuf>,
    /// Optional public key
    #[serde(default)]
    pub public_key: Option<ByteBuf>,
    /// Optional user data
    #[serde(default)]
    pub user_data: Option<ByteBuf>,
    /// Optional nonce
    #[serde(default)]
    pub nonce: Option<ByteBuf>,
}

impl AttestationDocument {
    fn check_shape(&self) -> Result<(), AttestationError> {
        if self.module_id.is_empty() {
            return Err(AttestationError::InvalidDocument("empty module_id".into()));
        }
        if self.digest != EXPECTED_DIGEST {
            return Err(AttestationError::InvalidDocument(format!(
                "unsupported digest {}",
                self.digest
            )));
        }
        if self.pcrs.is_empty() || self.pcrs.len() > 32 {
            return Err(AttestationError::InvalidDocument(format!(
                "expected 1 to 32 PCRs, got {}",
                self.pcrs.len()
            )));
        }
        if self.cabundle.is_empty() {
            return Err(AttestationError::MissingField("cabundle".into()));
        }
        Ok(())
    }
}

impl From<AttestationDocument> for VerifiedAttestation {
    fn from(doc: AttestationDocument) -> Self {
        Self {
            module_id: doc.module_id,
            timestamp: doc.timestamp,
            pcrs: doc.pcrs.into_iter().map(|(i, v)| (i, v.into_vec())).collect(),
            public_key: doc.public_key.map(ByteBuf::into_vec),
        }
    }
}

/// Verifies Nitro attestation documents against a pinned root.
#[derive(Debug, Clone)]
pub struct NitroVerifier {
    roots: PinnedRoots,
}

impl NitroVerifier {
    /// Creates a verifier trusting `roots`.
    pub const fn new(roots: PinnedRoots) -> Self {
        Self { roots }
    }

    /// The trust anchor.
    pub const fn roots(&self) -> &PinnedRoots {
        &self.roots
    }
}

impl AttestationVerifier for NitroVerifier {
    fn verify(
        &self,
        document: &[u8],
        now: SystemTime,
    ) -> Result<VerifiedAttestation, AttestationError> {
        let cose = CoseSign1::from_bytes(document)
            .map_err(|e| AttestationError::CoseVerify(format!("failed to parse COSE: {e:?}")))?;
        let payload = cose
            .get_payload::<Openssl>(None)
            .map_err(|e| AttestationError::CoseVerify(format!("failed to get payload: {e:?}")))?;
        let doc: AttestationDocument = ciborium::from_reader(payload.as_slice())
            .map_err(|e| AttestationError::CborParse(e.to_string()))?;
        doc.check_shape()?;

        let leaf = X509::from_der(&doc.certificate)
            .map_err(|e| AttestationError::CertificateChain(format!("invalid leaf: {e}")))?;
        let bundle = doc
            .cabundle
            .iter()
            .map(|der| X509::from_der(der))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AttestationError::CertificateChain(format!("invalid CA bundle: {e}")))?;

        let leaf_key = leaf
            .public_key()
            .map_err(|e| AttestationError::CertificateChain(format!("missing public key: {e}")))?;
        let signed = cose
            .verify_signature::<Openssl>(&leaf_key)
            .map_err(|e| AttestationError::CoseVerify(format!("{e:?}")))?;
        if !signed {
            return Err(AttestationError::CoseVerify("signature does not match leaf key".into()));
        }

        let at = asn1_time(now)?;
        check_certificate_validity(&leaf, &at)?;
        for cert in &bundle {
            check_certificate_validity(cert, &at)?;
        }
        check_certificate_validity(self.roots.certificate(), &at)?;
        verify_certificate_chain(&leaf, &bundle, self.roots.certificate())?;

        debug!(
            module_id = %doc.module_id,
            timestamp = doc.timestamp,
            pcrs = doc.pcrs.len(),
            has_public_key = doc.public_key.is_some(),
            "attestation verified"
        );
        Ok(doc.into())
    }
}

fn asn1_time(now: SystemTime) -> Result<Asn1Time, AttestationError> {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AttestationError::InvalidTime(e.to_string()))?
        .as_secs();
    let secs = i64::try_from(secs).map_err(|e| AttestationError::InvalidTime(e.to_string()))?;
    Asn1Time::from_unix(secs).map_err(|e| AttestationError::InvalidTime(e.to_string()))
}

fn check_certificate_validity(cert: &X509, at: &Asn1Time) -> Result<(), AttestationError> {
    let not_before = cert.not_before();
    let not_after = cert.not_after();
    if at < not_before {
        return Err(AttestationError::CertificateNotYetValid { not_before: not_before.to_string() });
    }
    if at > not_after {
        return Err(AttestationError::CertificateExpired { not_after: not_after.to_string() });
    }
    Ok(())
}

/// Chains `leaf` through `bundle` to `root`.
///
/// Validity periods are checked separately against the caller's clock, so
/// the store skips its own wall-clock check.
fn verify_certificate_chain(
    leaf: &X509,
    bundle: &[X509],
    root: &X509,
) -> Result<(), AttestationError> {
    let mut builder = X509StoreBuilder::new()
        .map_err(|e| AttestationError::X509Store(format!("failed to create store: {e}")))?;
    builder
        .add_cert(root.clone())
        .map_err(|e| AttestationError::X509Store(format!("failed to add root: {e}")))?;
    builder
        .set_flags(X509VerifyFlags::NO_CHECK_TIME)
        .map_err(|e| AttestationError::X509Store(format!("failed to set flags: {e}")))?;
    let store = builder.build();

    let mut chain = Stack::new()
        .map_err(|e| AttestationError::X509Store(format!("failed to create stack: {e}")))?;
    for cert in bundle {
        chain
            .push(cert.clone())
            .map_err(|e| AttestationError::X509Store(format!("failed to add bundle cert: {e}")))?;
    }

    let mut ctx = X509StoreContext::new()
        .map_err(|e| AttestationError::X509Store(format!("failed to create context: {e}")))?;
    let verified = ctx
        .init(&store, leaf, &chain, |c| c.verify_cert())
        .map_err(|e| AttestationError::ChainVerificationFailed(e.to_string()))?;
    if !verified {
        return Err(AttestationError::ChainVerificationFailed(
            ctx.error().error_string().to_string(),
        ));
    }
    Ok(())
}

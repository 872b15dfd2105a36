//! Attestation document verification.

use std::{collections::BTreeMap, fmt::Debug, time::SystemTime};

use crate::error::AttestationError;

mod nitro;
pub use nitro::{AttestationDocument, NitroVerifier};

mod roots;
pub use roots::{DEFAULT_CA_ROOTS, DEFAULT_CA_ROOTS_SHA256, PinnedRoots};

/// The parts of a verified attestation document the enclave acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAttestation {
    /// Issuing module.
    pub module_id: String,
    /// Document timestamp, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// PCR values by index.
    pub pcrs: BTreeMap<u16, Vec<u8>>,
    /// Public key the document binds, if any.
    pub public_key: Option<Vec<u8>>,
}

impl VerifiedAttestation {
    /// The code measurement.
    #[must_use]
    pub fn pcr0(&self) -> Option<&[u8]> {
        self.pcrs.get(&0).map(Vec::as_slice)
    }
}

/// Checks an attestation document against a trust anchor.
pub trait AttestationVerifier: Send + Sync + Debug {
    /// Verifies `document` as of `now`.
    fn verify(&self, document: &[u8], now: SystemTime)
    -> Result<VerifiedAttestation, AttestationError>;
}

//! Software stand-ins for the hardware module and the attestation verifier.
//!
//! [`FakeModule`] "attests" by writing a JSON document that [`FakeVerifier`] accepts, which
//! lets two in-process enclaves run the full migration handshake.

use std::{collections::BTreeMap, time::SystemTime};

use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

pub use rollup_enclave_core::test_utils::*;

use crate::{
    attestation::{AttestationVerifier, VerifiedAttestation},
    error::{AttestationError, ModuleError},
    module::SecureModule,
};

/// RSA size for tests; production keys take seconds to generate in debug builds.
pub const TEST_RSA_BITS: usize = 1024;

#[derive(Debug, Serialize, Deserialize)]
struct FakeDocument {
    pcr0: String,
    public_key: Option<String>,
}

/// A module with a fixed measurement.
#[derive(Debug, Clone)]
pub struct FakeModule {
    pcr0: Vec<u8>,
}

impl FakeModule {
    /// A module reporting `pcr0`; an empty value reports no measurement.
    pub const fn new(pcr0: Vec<u8>) -> Self {
        Self { pcr0 }
    }

    /// A well-formed document that binds no public key.
    pub fn attestation_without_key(&self) -> Vec<u8> {
        encode(&FakeDocument { pcr0: hex::encode(&self.pcr0), public_key: None })
    }
}

fn encode(doc: &FakeDocument) -> Vec<u8> {
    serde_json::to_vec(doc).unwrap_or_default()
}

impl SecureModule for FakeModule {
    fn fill_random(&self, dest: &mut [u8]) -> Result<(), ModuleError> {
        OsRng.fill_bytes(dest);
        Ok(())
    }

    fn describe_measurement(&self) -> Result<Vec<u8>, ModuleError> {
        if self.pcr0.is_empty() {
            return Err(ModuleError::NoMeasurement);
        }
        Ok(self.pcr0.clone())
    }

    fn attest(&self, public_key: &[u8]) -> Result<Vec<u8>, ModuleError> {
        Ok(encode(&FakeDocument {
            pcr0: hex::encode(&self.pcr0),
            public_key: Some(hex::encode(public_key)),
        }))
    }
}

/// Accepts documents produced by [`FakeModule`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeVerifier;

impl AttestationVerifier for FakeVerifier {
    fn verify(
        &self,
        document: &[u8],
        _now: SystemTime,
    ) -> Result<VerifiedAttestation, AttestationError> {
        let doc: FakeDocument = serde_json::from_slice(document)
            .map_err(|e| AttestationError::CborParse(e.to_string()))?;
        let pcr0 =
            hex::decode(&doc.pcr0).map_err(|e| AttestationError::InvalidDocument(e.to_string()))?;
        let public_key = doc
            .public_key
            .map(hex::decode)
            .transpose()
            .map_err(|e| AttestationError::InvalidDocument(e.to_string()))?;
        Ok(VerifiedAttestation {
            module_id: "fake".into(),
            timestamp: 0,
            pcrs: BTreeMap::from([(0, pcr0)]),
            public_key,
        })
    }
}

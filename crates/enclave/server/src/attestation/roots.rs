//! Pinned AWS Nitro Enclaves root certificate.
//!
//! The root ships inside the binary as the zip AWS publishes at
//! <https://docs.aws.amazon.com/enclaves/latest/user/verify-root.html>. Loading checks the
//! zip's SHA-256 before anything is parsed and fails closed on mismatch.

use std::io::Read;

use base64::Engine;
use openssl::x509::X509;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::AttestationError;

/// AWS Nitro Enclaves root bundle (base64-encoded zip).
pub const DEFAULT_CA_ROOTS: &str = "UEsDBBQAAAAIALkYV1GVtvolRwIAAAkDAAAIABwAcm9vdC5wZW1VVAkAA10ekl9dHpJfdXgLAAEESHEtDwQUAAAAZZJLk6JQDIX3/IrZW10Igo2LWdwXiBoE5HXZCSq0iNgKfYVfP9guJ8tTqS85Ofn4GAszy3b+EOYHtmkTFLCX+CGBbRMWEILSfYGEjVFh+8itnoe4yKq1XC7DDNptcJ2YXJCC2+smtYfzlCEBYhewjQSospASMlwCiSJ40gE5uHAijBrAldny5PaTnRkAan77iBDUiw4B+A9heZxKkedRilflYQZdVl+meW20aayfM8tU0wTEsswdCKonUFuDAPotRUo8ag59axIE3ls84xV4D0FG6gi1mFhF4cBcQNP35GIcGCvlsV504ImXnVffRqLjxpECT2tA6Xt1AFabs7zXu33i91mvXLLaefAkveQDVgEjC/ff1g60BSqYJeFdhzFCX0i1EXYFibZdTWA57Jf0q26/vZ+Ka3BbDVlz2chy2qv8wnYK9vVgVz1OWSZpBjFi3PTtp6li8Xlk7X7vTprSUrNr+FgspofpKlGNIHe9hDA3nWGE7WPgcsEaEqdMKo2LzhtPBHkoL9YOgTEgKkZ//jRA3lLGKBRIMCwP6PCyuPQ0ZhZeWJFYoYfKlPzJMRZ6Ns9vM7feX087nQta/ALcN8CjqLCsV4yEvL2Pd6JIrRBYnEjgkfOpn/hNXi+S7qjxq4hrZxUhTTuhqavH6vbGG7HYchL5e3b82RjdVkn4vdOfLbixdD8BGSFfhv6IcbYS63Vy2M3xrfXMLs2Cz1kjF7hUvsPnRb46d0UNtwY/iftcuJtsMnckW2yGmcz/Sr+fzRz637f/A1BLAQIeAxQAAAAIALkYV1GVtvolRwIAAAkDAAAIABgAAAAAAAEAAACkgQAAAAByb290LnBlbVVUBQADXR6SX3V4CwABBEhxLQ8EFAAAAFBLBQYAAAAAAQABAE4AAACJAgAAAAA=";

/// SHA-256 of the decoded root bundle.
pub const DEFAULT_CA_ROOTS_SHA256: &str =
    "8cf60e2b2efca96c6a9e71e851d00c1b6991cc09eadbe64a6a1d1b1eb9faff7c";

/// The trusted root certificate for attestation chains.
#[derive(Debug, Clone)]
pub struct PinnedRoots {
    pem: Vec<u8>,
    root: X509,
}

impl PinnedRoots {
    /// Loads the bundled AWS root.
    pub fn load() -> Result<Self, AttestationError> {
        Self::from_bundle(DEFAULT_CA_ROOTS, DEFAULT_CA_ROOTS_SHA256)
    }

    /// Loads a base64 zip bundle whose SHA-256 must equal `expected_sha256` (hex).
    pub fn from_bundle(bundle_b64: &str, expected_sha256: &str) -> Result<Self, AttestationError> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(bundle_b64)
            .map_err(|e| AttestationError::Base64Decode(e.to_string()))?;

        let actual = hex::encode(Sha256::digest(&decoded));
        if actual != expected_sha256 {
            return Err(AttestationError::ChecksumMismatch {
                expected: expected_sha256.to_string(),
                actual,
            });
        }

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&decoded))
            .map_err(|e| AttestationError::ZipRead(e.to_string()))?;
        let mut pem = Vec::new();
        archive
            .by_index(0)
            .map_err(|e| AttestationError::ZipRead(e.to_string()))?
            .read_to_end(&mut pem)
            .map_err(|e| AttestationError::ZipRead(e.to_string()))?;

        let root = X509::from_pem(&pem).map_err(|e| AttestationError::PemParse(e.to_string()))?;
        debug!(subject = ?root.subject_name(), "loaded pinned attestation root");

        Ok(Self { pem, root })
    }

    /// Trusts `root` directly, for private test chains.
    pub fn from_certificate(root: X509) -> Result<Self, AttestationError> {
        let pem = root.to_pem().map_err(|e| AttestationError::PemParse(e.to_string()))?;
        Ok(Self { pem, root })
    }

    /// The root certificate.
    #[must_use]
    pub const fn certificate(&self) -> &X509 {
        &self.root
    }

    /// The root as PEM.
    #[must_use]
    pub fn pem(&self) -> &[u8] {
        &self.pem
    }
}

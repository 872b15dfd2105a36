//! Key custody.
//!
//! [`KeyCustody`] owns the proposal signer, the per-boot RSA key that receives a migrated
//! signer, and the code measurement both are bound to. It is created once per boot.
//!
//! # Local mode
//!
//! When no hardware module answers, custody runs without a measurement: keys come from the OS
//! RNG, attestations are unavailable, and migration out of this instance always fails the
//! measurement check. An operator-supplied signer key is honoured only here, and only with
//! `insecure_local_mode` set.

use std::{
    fmt,
    ops::Deref,
    sync::Arc,
    time::SystemTime,
};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use parking_lot::{RwLock, RwLockReadGuard};
use rsa::RsaPrivateKey;
use tracing::{info, warn};

use crate::{
    attestation::AttestationVerifier,
    config::EnclaveConfig,
    crypto::{
        RSA_KEY_BITS, decrypt_pkcs1v15, encrypt_pkcs1v15, generate_rsa_key, generate_signer,
        pkix_to_public_key, private_key_bytes, public_key_bytes, public_key_to_pkix,
        signer_from_bytes, signer_from_hex,
    },
    error::{AttestationError, ModuleError, Result, ServerError},
    module::{ModuleRng, SecureModule},
};

#[derive(Debug)]
struct VersionedSigner {
    version: u64,
    signer: PrivateKeySigner,
}

/// The current signer behind a read/write lock.
///
/// Signing holds a read guard for as long as it needs a consistent key; replacement takes
/// the write lock, so no signature is ever produced from a half-replaced key.
pub struct SignerCell {
    inner: RwLock<VersionedSigner>,
}

impl SignerCell {
    /// Wraps `signer` as version 0.
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { inner: RwLock::new(VersionedSigner { version: 0, signer }) }
    }

    /// Borrows the current signer.
    pub fn read(&self) -> SignerRef<'_> {
        SignerRef { guard: self.inner.read() }
    }

    /// Swaps in `signer`, returning the previous address and the new version.
    pub fn replace(&self, signer: PrivateKeySigner) -> (Address, u64) {
        let mut current = self.inner.write();
        let previous = current.signer.address();
        current.version += 1;
        current.signer = signer;
        (previous, current.version)
    }
}

impl fmt::Debug for SignerCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.inner.read();
        f.debug_struct("SignerCell")
            .field("address", &current.signer.address())
            .field("version", &current.version)
            .finish()
    }
}

/// A read guard on a [`SignerCell`].
#[derive(Debug)]
pub struct SignerRef<'a> {
    guard: RwLockReadGuard<'a, VersionedSigner>,
}

impl SignerRef<'_> {
    /// How many times the cell has been replaced.
    pub fn version(&self) -> u64 {
        self.guard.version
    }
}

impl Deref for SignerRef<'_> {
    type Target = PrivateKeySigner;

    fn deref(&self) -> &PrivateKeySigner {
        &self.guard.signer
    }
}

/// The enclave's keys and the measurement they are bound to.
pub struct KeyCustody {
    module: Arc<dyn SecureModule>,
    verifier: Arc<dyn AttestationVerifier>,
    measurement: Option<Vec<u8>>,
    decryption_key: RsaPrivateKey,
    decryption_public_key: Vec<u8>,
    signer: SignerCell,
}

impl KeyCustody {
    /// Creates the boot identity with a production-size RSA key.
    pub fn boot(
        module: Arc<dyn SecureModule>,
        verifier: Arc<dyn AttestationVerifier>,
        config: &EnclaveConfig,
    ) -> Result<Self> {
        Self::boot_with_key_size(module, verifier, config, RSA_KEY_BITS)
    }

    /// Creates the boot identity with an RSA key of `rsa_bits`.
    ///
    /// A module that answers but cannot produce a measurement is fatal, as is an
    /// operator-supplied signer key on measured hardware.
    pub fn boot_with_key_size(
        module: Arc<dyn SecureModule>,
        verifier: Arc<dyn AttestationVerifier>,
        config: &EnclaveConfig,
        rsa_bits: usize,
    ) -> Result<Self> {
        let measurement = match module.describe_measurement() {
            Ok(pcr0) => Some(pcr0),
            Err(ModuleError::Unavailable(reason)) if !config.require_hardware => {
                warn!(%reason, "hardware module unavailable, running in local mode");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let (decryption_key, signer) = {
            let mut rng = ModuleRng::new(module.as_ref());
            let decryption_key = generate_rsa_key(&mut rng, rsa_bits)?;
            let signer = match config.signer_key.as_deref() {
                None => generate_signer(&mut rng),
                Some(_) if measurement.is_some() => {
                    return Err(ServerError::Config(
                        "a signer key cannot be supplied to a measured enclave".into(),
                    ));
                }
                Some(_) if !config.insecure_local_mode => {
                    return Err(ServerError::Config(
                        "a supplied signer key requires insecure local mode".into(),
                    ));
                }
                Some(hex) => {
                    warn!("using operator-supplied signer key");
                    signer_from_hex(hex)?
                }
            };
            (decryption_key, signer)
        };
        let decryption_public_key = public_key_to_pkix(&decryption_key.to_public_key())?;

        info!(
            address = %signer.address(),
            local_mode = measurement.is_none(),
            rsa_bits,
            "key custody initialized"
        );

        Ok(Self {
            module,
            verifier,
            measurement,
            decryption_key,
            decryption_public_key,
            signer: SignerCell::new(signer),
        })
    }

    /// Whether custody runs without a hardware measurement.
    pub const fn is_local_mode(&self) -> bool {
        self.measurement.is_none()
    }

    /// PCR0, if measured.
    pub fn measurement(&self) -> Option<&[u8]> {
        self.measurement.as_deref()
    }

    /// The signer cell.
    pub const fn signer(&self) -> &SignerCell {
        &self.signer
    }

    /// Address of the current signer.
    pub fn signer_address(&self) -> Address {
        self.signer.read().address()
    }

    /// Uncompressed SEC1 public key of the current signer.
    pub fn signer_public_key(&self) -> Vec<u8> {
        public_key_bytes(&self.signer.read())
    }

    /// Attestation binding the current signer's public key.
    pub fn signer_attestation(&self) -> Result<Vec<u8>> {
        Ok(self.module.attest(&self.signer_public_key())?)
    }

    /// PKIX DER of the migration key.
    pub fn decryption_public_key(&self) -> &[u8] {
        &self.decryption_public_key
    }

    /// Attestation binding the migration key.
    pub fn decryption_attestation(&self) -> Result<Vec<u8>> {
        Ok(self.module.attest(&self.decryption_public_key)?)
    }

    /// Encrypts the signer key to the enclave that produced `attestation`.
    ///
    /// The recipient must run the same code as this enclave.
    pub fn encrypted_signer_key(&self, attestation: &[u8], now: SystemTime) -> Result<Vec<u8>> {
        let verified = self.verifier.verify(attestation, now)?;
        match (self.measurement.as_deref(), verified.pcr0()) {
            (Some(ours), Some(theirs)) if ours == theirs => {}
            _ => {
                warn!(module_id = %verified.module_id, "refusing migration to a different measurement");
                return Err(ServerError::MeasurementMismatch);
            }
        }

        let der = verified
            .public_key
            .as_deref()
            .ok_or_else(|| AttestationError::MissingField("public_key".into()))?;
        let recipient = pkix_to_public_key(der)?;

        let secret = private_key_bytes(&self.signer.read());
        let ciphertext =
            encrypt_pkcs1v15(&mut ModuleRng::new(self.module.as_ref()), &recipient, &secret)?;
        info!(module_id = %verified.module_id, "signer key encrypted for migration");
        Ok(ciphertext)
    }

    /// Replaces the signer with the key in `ciphertext`.
    ///
    /// Any failure leaves the current signer in place.
    pub fn set_signer_key(&self, ciphertext: &[u8]) -> Result<Address> {
        let plaintext = decrypt_pkcs1v15(
            &mut ModuleRng::new(self.module.as_ref()),
            &self.decryption_key,
            ciphertext,
        )?;
        let signer = signer_from_bytes(&plaintext)?;
        let current = signer.address();
        let (previous, version) = self.signer.replace(signer);
        info!(%previous, %current, version, "signer key replaced");
        Ok(current)
    }
}

impl fmt::Debug for KeyCustody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCustody")
            .field("module", &self.module)
            .field("verifier", &self.verifier)
            .field("measurement", &self.measurement.as_ref().map(hex::encode))
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use rand::rngs::OsRng;

    use super::*;
    use crate::{
        crypto::{SIGNATURE_LENGTH, sign_message},
        error::{CryptoError, ErrorKind},
        module::SoftwareModule,
        test_utils::{FakeModule, FakeVerifier, TEST_RSA_BITS},
    };

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn boot(module: Arc<dyn SecureModule>, config: &EnclaveConfig) -> Result<KeyCustody> {
        KeyCustody::boot_with_key_size(module, Arc::new(FakeVerifier), config, TEST_RSA_BITS)
    }

    fn hardware(pcr0: u8) -> KeyCustody {
        boot(Arc::new(FakeModule::new(vec![pcr0; 48])), &EnclaveConfig::default()).unwrap()
    }

    #[test]
    fn signer_cell_versions_replacements() {
        let first = generate_signer(&mut OsRng);
        let second = generate_signer(&mut OsRng);
        let cell = SignerCell::new(first.clone());
        assert_eq!(cell.read().version(), 0);

        let (previous, version) = cell.replace(second.clone());
        assert_eq!(previous, first.address());
        assert_eq!(version, 1);
        assert_eq!(cell.read().address(), second.address());
    }

    #[test]
    fn readers_never_see_a_partial_key() {
        let keys: Vec<_> = (0..4).map(|_| generate_signer(&mut OsRng)).collect();
        let known: Vec<_> = keys.iter().map(|k| k.address()).collect();
        let cell = Arc::new(SignerCell::new(keys[0].clone()));

        let writer = {
            let cell = Arc::clone(&cell);
            let keys = keys.clone();
            thread::spawn(move || {
                for key in keys.iter().cycle().take(200) {
                    cell.replace(key.clone());
                }
            })
        };
        for _ in 0..200 {
            let signer = cell.read();
            assert!(known.contains(&signer.address()));
        }
        writer.join().unwrap();
        assert_eq!(cell.read().version(), 200);
    }

    #[test]
    fn hardware_boot_records_measurement() {
        let custody = hardware(0xaa);
        assert!(!custody.is_local_mode());
        assert_eq!(custody.measurement(), Some(&[0xaa; 48][..]));
        assert_eq!(custody.signer_public_key().len(), 65);
        assert!(custody.signer_attestation().is_ok());
    }

    #[test]
    fn software_boot_is_local_mode() {
        let custody = boot(Arc::new(SoftwareModule), &EnclaveConfig::default()).unwrap();
        assert!(custody.is_local_mode());
        assert_eq!(custody.measurement(), None);

        let err = custody.decryption_attestation().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HardwareModuleUnavailable);
    }

    #[test]
    fn require_hardware_refuses_local_mode() {
        let config = EnclaveConfig { require_hardware: true, ..Default::default() };
        let err = boot(Arc::new(SoftwareModule), &config).unwrap_err();
        assert!(matches!(err, ServerError::Module(ModuleError::Unavailable(_))));
    }

    #[test]
    fn module_without_measurement_is_fatal() {
        let err = boot(Arc::new(FakeModule::new(Vec::new())), &EnclaveConfig::default()).unwrap_err();
        assert!(matches!(err, ServerError::Module(ModuleError::NoMeasurement)));
    }

    #[test]
    fn signer_key_override_rules() {
        let supplied = EnclaveConfig { signer_key: Some(DEV_KEY.into()), ..Default::default() };
        let err = boot(Arc::new(SoftwareModule), &supplied).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));

        let insecure = EnclaveConfig { insecure_local_mode: true, ..supplied };
        let custody = boot(Arc::new(SoftwareModule), &insecure).unwrap();
        assert_eq!(
            custody.signer_address().to_checksum(None),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );

        let err = boot(Arc::new(FakeModule::new(vec![1; 48])), &insecure).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn migrates_between_identical_measurements() {
        let old = hardware(0x11);
        let new = hardware(0x11);
        assert_ne!(old.signer_address(), new.signer_address());

        let attestation = new.decryption_attestation().unwrap();
        let ciphertext = old.encrypted_signer_key(&attestation, SystemTime::now()).unwrap();
        let address = new.set_signer_key(&ciphertext).unwrap();

        assert_eq!(address, old.signer_address());
        assert_eq!(new.signer_address(), old.signer_address());
        assert_eq!(new.signer().read().version(), 1);
    }

    #[test]
    fn refuses_migration_to_other_measurement() {
        let old = hardware(0x11);
        let new = hardware(0x22);
        let attestation = new.decryption_attestation().unwrap();
        let err = old.encrypted_signer_key(&attestation, SystemTime::now()).unwrap_err();
        assert!(matches!(err, ServerError::MeasurementMismatch));
    }

    #[test]
    fn local_mode_never_migrates_out() {
        let old = boot(Arc::new(SoftwareModule), &EnclaveConfig::default()).unwrap();
        let new = hardware(0x11);
        let attestation = new.decryption_attestation().unwrap();
        let err = old.encrypted_signer_key(&attestation, SystemTime::now()).unwrap_err();
        assert!(matches!(err, ServerError::MeasurementMismatch));
    }

    #[test]
    fn attestation_without_public_key_is_rejected() {
        let old = hardware(0x11);
        let module = FakeModule::new(vec![0x11; 48]);
        let attestation = module.attestation_without_key();
        let err = old.encrypted_signer_key(&attestation, SystemTime::now()).unwrap_err();
        assert!(matches!(err, ServerError::Attestation(AttestationError::MissingField(_))));
    }

    #[test]
    fn bad_ciphertext_leaves_signer_untouched() {
        let custody = hardware(0x11);
        let before = custody.signer_address();

        let err = custody.set_signer_key(b"garbage").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decryption);

        let short = encrypt_pkcs1v15(
            &mut OsRng,
            &pkix_to_public_key(custody.decryption_public_key()).unwrap(),
            &[7u8; 31],
        )
        .unwrap();
        let err = custody.set_signer_key(&short).unwrap_err();
        assert!(matches!(err, ServerError::Crypto(CryptoError::InvalidPrivateKeyLength(31))));

        assert_eq!(custody.signer_address(), before);
        assert_eq!(custody.signer().read().version(), 0);
    }

    #[test]
    fn signing_holds_a_consistent_key() {
        let custody = hardware(0x11);
        let signer = custody.signer().read();
        let message = rollup_enclave_core::ProposalMessage {
            config_hash: Default::default(),
            l1_origin_hash: Default::default(),
            l2_block_number: Default::default(),
            prev_output_root: Default::default(),
            output_root: Default::default(),
        };
        assert_eq!(sign_message(&signer, &message).unwrap().len(), SIGNATURE_LENGTH);
    }
}

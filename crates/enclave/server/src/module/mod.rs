//! The hardware security module as an injected capability.
//!
//! Key custody never talks to `/dev/nsm` directly. It holds an `Arc<dyn SecureModule>`, so
//! production runs on [`NitroModule`] while local runs and tests substitute
//! [`SoftwareModule`] or a fake.

use std::fmt::Debug;

use crate::error::ModuleError;

mod nitro;
pub use nitro::NitroModule;

mod rng;
pub use rng::ModuleRng;

mod software;
pub use software::SoftwareModule;

/// Entropy, measurement and attestation from a trusted execution environment.
pub trait SecureModule: Send + Sync + Debug {
    /// Fills `dest` with random bytes.
    fn fill_random(&self, dest: &mut [u8]) -> Result<(), ModuleError>;

    /// Returns the code measurement (PCR0).
    ///
    /// [`ModuleError::Unavailable`] means there is no module at all; any other error means a
    /// module answered but could not produce a measurement.
    fn describe_measurement(&self) -> Result<Vec<u8>, ModuleError>;

    /// Returns an attestation document binding `public_key` to the measurement.
    fn attest(&self, public_key: &[u8]) -> Result<Vec<u8>, ModuleError>;
}

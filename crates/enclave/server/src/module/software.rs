//! Software stand-in used when no hardware module is present.

use rand::{RngCore, rngs::OsRng};

use super::SecureModule;
use crate::error::ModuleError;

/// OS entropy with no measurement and no attestation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareModule;

impl SecureModule for SoftwareModule {
    fn fill_random(&self, dest: &mut [u8]) -> Result<(), ModuleError> {
        OsRng.try_fill_bytes(dest).map_err(|e| ModuleError::Device(e.to_string()))
    }

    fn describe_measurement(&self) -> Result<Vec<u8>, ModuleError> {
        Err(ModuleError::Unavailable("software module has no measurement".to_string()))
    }

    fn attest(&self, _public_key: &[u8]) -> Result<Vec<u8>, ModuleError> {
        Err(ModuleError::Unavailable("software module cannot attest".to_string()))
    }
}

//! A `rand` RNG over a [`SecureModule`].

use rand::{CryptoRng, RngCore, rngs::OsRng};
use tracing::warn;

use super::SecureModule;

/// Cryptographically secure RNG drawing from a module.
///
/// A failed module read falls back to the OS RNG for that fill only; the next fill asks the
/// module again.
#[derive(Debug, Clone, Copy)]
pub struct ModuleRng<'a> {
    module: &'a dyn SecureModule,
}

impl<'a> ModuleRng<'a> {
    /// Wraps `module`.
    #[must_use]
    pub const fn new(module: &'a dyn SecureModule) -> Self {
        Self { module }
    }
}

impl RngCore for ModuleRng<'_> {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(e) = self.module.fill_random(dest) {
            warn!(error = %e, "module entropy unavailable, falling back to OS RNG");
            OsRng.fill_bytes(dest);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for ModuleRng<'_> {}

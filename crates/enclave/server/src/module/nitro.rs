//! AWS Nitro Secure Module.
//!
//! Sessions are opened fresh for each operation and closed on drop, so a failing device
//! never poisons later calls and unrelated requests never queue behind one handle.

use super::SecureModule;
use crate::error::ModuleError;

/// The Nitro Secure Module at `/dev/nsm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NitroModule;

impl NitroModule {
    /// Creates a handle. No device is touched until an operation runs.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SecureModule for NitroModule {
    fn fill_random(&self, dest: &mut [u8]) -> Result<(), ModuleError> {
        NsmSession::open()?.fill_random(dest)
    }

    fn describe_measurement(&self) -> Result<Vec<u8>, ModuleError> {
        NsmSession::open()?.describe_pcr(0)
    }

    fn attest(&self, public_key: &[u8]) -> Result<Vec<u8>, ModuleError> {
        NsmSession::open()?.attestation(public_key)
    }
}

#[cfg(target_os = "linux")]
use aws_nitro_enclaves_nsm_api::{
    api::{Request, Response},
    driver::{nsm_exit, nsm_init, nsm_process_request},
};

/// An open NSM file descriptor.
#[derive(Debug)]
struct NsmSession {
    #[cfg(target_os = "linux")]
    fd: i32,
}

#[cfg(target_os = "linux")]
impl NsmSession {
    fn open() -> Result<Self, ModuleError> {
        let fd = nsm_init();
        if fd < 0 {
            return Err(ModuleError::Unavailable("failed to open /dev/nsm".to_string()));
        }
        Ok(Self { fd })
    }

    fn describe_pcr(&self, index: u16) -> Result<Vec<u8>, ModuleError> {
        match nsm_process_request(self.fd, Request::DescribePCR { index }) {
            Response::DescribePCR { lock: _, data } if data.is_empty() => {
                Err(ModuleError::NoMeasurement)
            }
            Response::DescribePCR { lock: _, data } => Ok(data),
            Response::Error(err) => Err(ModuleError::Device(format!("describe PCR: {err:?}"))),
            _ => Err(ModuleError::Device("describe PCR: unexpected response".to_string())),
        }
    }

    fn attestation(&self, public_key: &[u8]) -> Result<Vec<u8>, ModuleError> {
        let request = Request::Attestation {
            user_data: None,
            nonce: None,
            public_key: Some(public_key.to_vec().into()),
        };
        match nsm_process_request(self.fd, request) {
            Response::Attestation { document } => Ok(document),
            Response::Error(err) => Err(ModuleError::Device(format!("attestation: {err:?}"))),
            _ => Err(ModuleError::NoAttestation),
        }
    }

    fn fill_random(&self, dest: &mut [u8]) -> Result<(), ModuleError> {
        let mut filled = 0;
        while filled < dest.len() {
            match nsm_process_request(self.fd, Request::GetRandom) {
                Response::GetRandom { random } if random.is_empty() => {
                    return Err(ModuleError::Device("get random: empty response".to_string()));
                }
                Response::GetRandom { random } => {
                    let n = (dest.len() - filled).min(random.len());
                    dest[filled..filled + n].copy_from_slice(&random[..n]);
                    filled += n;
                }
                Response::Error(err) => {
                    return Err(ModuleError::Device(format!("get random: {err:?}")));
                }
                _ => return Err(ModuleError::Device("get random: unexpected response".to_string())),
            }
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl Drop for NsmSession {
    fn drop(&mut self) {
        nsm_exit(self.fd);
    }
}

#[cfg(not(target_os = "linux"))]
impl NsmSession {
    fn open() -> Result<Self, ModuleError> {
        Err(ModuleError::Unavailable("NSM is only available on Linux".to_string()))
    }

    fn describe_pcr(&self, _index: u16) -> Result<Vec<u8>, ModuleError> {
        Err(ModuleError::Unavailable("NSM is only available on Linux".to_string()))
    }

    fn attestation(&self, _public_key: &[u8]) -> Result<Vec<u8>, ModuleError> {
        Err(ModuleError::Unavailable("NSM is only available on Linux".to_string()))
    }

    fn fill_random(&self, _dest: &mut [u8]) -> Result<(), ModuleError> {
        Err(ModuleError::Unavailable("NSM is only available on Linux".to_string()))
    }
}

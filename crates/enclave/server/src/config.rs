//! Launch configuration.

use std::{fmt, time::Duration};

use crate::transport::{DEFAULT_PROXY_PORT, DEFAULT_VSOCK_CID, DEFAULT_VSOCK_PORT, TransportConfig};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Key custody and request handling settings.
#[derive(Clone)]
pub struct EnclaveConfig {
    /// Refuse to start without a hardware module.
    pub require_hardware: bool,
    /// Allow [`Self::signer_key`] and signing on boundary checks alone when no hardware
    /// module answers.
    pub insecure_local_mode: bool,
    /// Hex signer key to use instead of a generated one.
    pub signer_key: Option<String>,
    /// Upper bound on a single RPC call.
    pub request_timeout: Duration,
}

impl Default for EnclaveConfig {
    fn default() -> Self {
        Self {
            require_hardware: false,
            insecure_local_mode: false,
            signer_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl fmt::Debug for EnclaveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnclaveConfig")
            .field("require_hardware", &self.require_hardware)
            .field("insecure_local_mode", &self.insecure_local_mode)
            .field("signer_key", &self.signer_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// HTTP-to-vsock proxy settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Vsock CID of the enclave.
    pub vsock_cid: u32,
    /// Vsock port to connect to.
    pub vsock_port: u32,
    /// HTTP port to listen on.
    pub http_port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            vsock_cid: DEFAULT_VSOCK_CID,
            vsock_port: DEFAULT_VSOCK_PORT,
            http_port: DEFAULT_PROXY_PORT,
        }
    }
}

/// What the process runs.
#[derive(Debug, Clone)]
pub enum LaunchConfig {
    /// The enclave service.
    Nitro {
        /// Key custody and request handling.
        enclave: EnclaveConfig,
        /// Listener settings.
        transport: TransportConfig,
    },
    /// The host-side HTTP proxy.
    Proxy(ProxyConfig),
}

impl LaunchConfig {
    /// Runs until the listener stops.
    pub async fn run(self) -> eyre::Result<()> {
        match self {
            Self::Nitro { enclave, transport } => crate::run_enclave(enclave, transport).await,
            Self::Proxy(config) => crate::run_proxy(config).await,
        }
    }
}

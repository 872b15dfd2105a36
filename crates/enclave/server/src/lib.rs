//! The rollup enclave service.
//!
//! Holds the proposer's signing key inside a Nitro enclave, hands it only to enclaves running
//! the same measured image, and signs output-root transitions for blocks it has checked.
//! Requests arrive as JSON-RPC over vsock (or HTTP when vsock is unavailable); the [`proxy`]
//! module relays host HTTP traffic into the enclave.

#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![deny(unused_must_use)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use tracing::{info, warn};

pub mod attestation;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod custody;
pub mod enclave;
pub mod error;
pub mod module;
pub mod proxy;
pub mod rpc;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use attestation::{AttestationVerifier, NitroVerifier, PinnedRoots, VerifiedAttestation};
pub use config::{EnclaveConfig, LaunchConfig, ProxyConfig};
pub use custody::KeyCustody;
pub use enclave::{Enclave, select_executor};
pub use error::{ErrorKind, Result, ServerError};
pub use module::{NitroModule, SecureModule, SoftwareModule};
pub use proxy::run as run_proxy;
pub use rpc::{EnclaveApiClient, EnclaveApiServer, RpcServerImpl};
pub use transport::TransportConfig;

use crate::error::ModuleError;

/// Boots key custody and serves the RPC surface until the listener stops.
///
/// Vsock is tried first; if it cannot be bound the same methods are served over HTTP.
pub async fn run_enclave(config: EnclaveConfig, transport: TransportConfig) -> eyre::Result<()> {
    let verifier = Arc::new(NitroVerifier::new(PinnedRoots::load()?));
    let module: Arc<dyn SecureModule> = match NitroModule::new().describe_measurement() {
        Err(ModuleError::Unavailable(reason)) if !config.require_hardware => {
            warn!(%reason, "no Nitro Secure Module, using software entropy");
            Arc::new(SoftwareModule)
        }
        _ => Arc::new(NitroModule::new()),
    };

    let timeout = config.request_timeout;
    let insecure_local_mode = config.insecure_local_mode;
    let custody =
        tokio::task::spawn_blocking(move || KeyCustody::boot(module, verifier, &config)).await??;

    let executor = select_executor(&custody, insecure_local_mode);
    let enclave = Arc::new(Enclave::new(custody, executor));
    let methods: jsonrpsee::server::Methods =
        RpcServerImpl::new(enclave, timeout).into_rpc().into();

    info!(?timeout, "enclave ready");
    match transport::serve_vsock(methods.clone(), &transport).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(error = %e, "vsock unavailable, falling back to HTTP");
            transport::serve_http(methods, &transport).await
        }
    }
}

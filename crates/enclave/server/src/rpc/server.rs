//! `EnclaveApiServer` over an [`Enclave`].

use std::{sync::Arc, time::Duration};

use alloy_primitives::{B256, Bytes};
use async_trait::async_trait;
use jsonrpsee::types::ErrorObjectOwned;
use rollup_enclave_core::{
    AccountResult, ExecutionWitness, Header, PerChainConfig, Proposal, ReceiptEnvelope,
    StatelessRequest,
};
use tracing::warn;

use super::api::EnclaveApiServer;
use crate::{enclave::Enclave, error::ServerError};

/// Maps a server error to its JSON-RPC error object.
pub fn to_rpc_error(err: ServerError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(err.kind().code(), err.to_string(), None::<()>)
}

/// RPC handler. Every call runs on the blocking pool under `timeout`, except `setSignerKey`:
/// a key replacement that has started always runs to completion and reports its outcome.
#[derive(Debug, Clone)]
pub struct RpcServerImpl {
    enclave: Arc<Enclave>,
    timeout: Duration,
}

impl RpcServerImpl {
    /// Creates a handler.
    pub const fn new(enclave: Arc<Enclave>, timeout: Duration) -> Self {
        Self { enclave, timeout }
    }

    async fn call<T, F>(&self, method: &'static str, f: F) -> Result<T, ErrorObjectOwned>
    where
        T: Send + 'static,
        F: FnOnce(&Enclave) -> crate::error::Result<T> + Send + 'static,
    {
        self.run(method, Some(self.timeout), f).await
    }

    async fn call_to_completion<T, F>(
        &self,
        method: &'static str,
        f: F,
    ) -> Result<T, ErrorObjectOwned>
    where
        T: Send + 'static,
        F: FnOnce(&Enclave) -> crate::error::Result<T> + Send + 'static,
    {
        self.run(method, None, f).await
    }

    async fn run<T, F>(
        &self,
        method: &'static str,
        timeout: Option<Duration>,
        f: F,
    ) -> Result<T, ErrorObjectOwned>
    where
        T: Send + 'static,
        F: FnOnce(&Enclave) -> crate::error::Result<T> + Send + 'static,
    {
        let enclave = Arc::clone(&self.enclave);
        let task = tokio::task::spawn_blocking(move || f(&enclave));
        let joined = match timeout {
            Some(limit) => tokio::time::timeout(limit, task).await,
            None => Ok(task.await),
        };
        let result = match joined {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ServerError::Internal(format!("task failed: {e}"))),
            Err(_) => Err(ServerError::Timeout(self.timeout)),
        };
        result.map_err(|err| {
            warn!(method, code = err.kind().code(), error = %err, "rpc call failed");
            to_rpc_error(err)
        })
    }
}

#[async_trait]
impl EnclaveApiServer for RpcServerImpl {
    async fn signer_public_key(&self) -> Result<Bytes, ErrorObjectOwned> {
        self.call("signerPublicKey", |e| Ok(e.custody().signer_public_key().into())).await
    }

    async fn signer_attestation(&self) -> Result<Bytes, ErrorObjectOwned> {
        self.call("signerAttestation", |e| e.custody().signer_attestation().map(Into::into)).await
    }

    async fn decryption_public_key(&self) -> Result<Bytes, ErrorObjectOwned> {
        self.call("decryptionPublicKey", |e| {
            Ok(Bytes::copy_from_slice(e.custody().decryption_public_key()))
        })
        .await
    }

    async fn decryption_attestation(&self) -> Result<Bytes, ErrorObjectOwned> {
        self.call("decryptionAttestation", |e| {
            e.custody().decryption_attestation().map(Into::into)
        })
        .await
    }

    async fn encrypted_signer_key(&self, attestation: Bytes) -> Result<Bytes, ErrorObjectOwned> {
        self.call("encryptedSignerKey", move |e| {
            e.encrypted_signer_key(&attestation).map(Into::into)
        })
        .await
    }

    async fn set_signer_key(&self, encrypted: Bytes) -> Result<(), ErrorObjectOwned> {
        self.call_to_completion("setSignerKey", move |e| {
            e.custody().set_signer_key(&encrypted).map(|_| ())
        })
        .await
    }

    async fn execute_stateless(
        &self,
        config: PerChainConfig,
        chain_params: serde_json::Value,
        l1_origin: Header,
        l1_receipts: Vec<ReceiptEnvelope>,
        previous_block_txs: Vec<Bytes>,
        block_header: Header,
        sequenced_txs: Vec<Bytes>,
        witness: ExecutionWitness,
        message_account: AccountResult,
        prev_message_account_hash: B256,
    ) -> Result<Proposal, ErrorObjectOwned> {
        let request = StatelessRequest {
            config,
            chain_params,
            l1_origin,
            l1_receipts,
            previous_block_txs,
            block_header,
            sequenced_txs,
            witness,
            message_account,
            prev_message_account_hash,
        };
        self.call("executeStateless", move |e| e.execute_stateless(&request)).await
    }

    async fn aggregate(
        &self,
        config_hash: B256,
        prev_output_root: B256,
        proposals: Vec<Proposal>,
    ) -> Result<Proposal, ErrorObjectOwned> {
        self.call("aggregate", move |e| e.aggregate(config_hash, prev_output_root, &proposals))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::SystemTime};

    use rollup_enclave_core::BoundaryChecks;

    use super::*;
    use crate::{
        config::EnclaveConfig,
        custody::KeyCustody,
        error::{ErrorKind, ProposalError},
        test_utils::{FakeModule, FakeVerifier, TEST_RSA_BITS},
    };

    fn custody() -> KeyCustody {
        KeyCustody::boot_with_key_size(
            Arc::new(FakeModule::new(vec![3; 48])),
            Arc::new(FakeVerifier),
            &EnclaveConfig::default(),
            TEST_RSA_BITS,
        )
        .unwrap()
    }

    fn serve(custody: KeyCustody, timeout: Duration) -> RpcServerImpl {
        RpcServerImpl::new(
            Arc::new(Enclave::new(custody, Arc::new(BoundaryChecks::new()))),
            timeout,
        )
    }

    fn handler(timeout: Duration) -> RpcServerImpl {
        serve(custody(), timeout)
    }

    #[test]
    fn error_object_carries_kind_code() {
        let obj = to_rpc_error(ProposalError::EmptyProposals.into());
        assert_eq!(obj.code(), ErrorKind::EmptyProposalSet.code());
        assert_eq!(obj.message(), "no proposals provided for aggregation");
    }

    #[tokio::test]
    async fn empty_aggregate_maps_to_its_code() {
        let err = handler(Duration::from_secs(5))
            .aggregate(B256::ZERO, B256::ZERO, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32008);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let handler = handler(Duration::from_millis(20));
        let err = handler
            .call("sleep", |_| {
                thread::sleep(Duration::from_millis(500));
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorKind::Timeout.code());
    }

    #[tokio::test]
    async fn signer_replacement_is_never_reported_as_timed_out() {
        let source = custody();
        let target = custody();
        let attestation = target.decryption_attestation().unwrap();
        let ciphertext = source.encrypted_signer_key(&attestation, SystemTime::now()).unwrap();
        let before = target.signer_address();

        let handler = serve(target, Duration::ZERO);
        handler.set_signer_key(ciphertext.into()).await.unwrap();

        let after = handler.enclave.custody().signer_address();
        assert_ne!(after, before);
        assert_eq!(after, source.signer_address());
    }
}

//! The `enclave` namespace.
//!
//! Parameters are positional.

use alloy_primitives::{B256, Bytes};
use jsonrpsee::{proc_macros::rpc, types::ErrorObjectOwned};
use rollup_enclave_core::{
    AccountResult, ExecutionWitness, Header, PerChainConfig, Proposal, ReceiptEnvelope,
};

/// Enclave RPC API.
#[rpc(server, client, namespace = "enclave")]
pub trait EnclaveApi {
    /// The signer's 65-byte uncompressed public key.
    #[method(name = "signerPublicKey")]
    async fn signer_public_key(&self) -> Result<Bytes, ErrorObjectOwned>;

    /// An attestation binding the signer's public key.
    #[method(name = "signerAttestation")]
    async fn signer_attestation(&self) -> Result<Bytes, ErrorObjectOwned>;

    /// The migration key as PKIX DER.
    #[method(name = "decryptionPublicKey")]
    async fn decryption_public_key(&self) -> Result<Bytes, ErrorObjectOwned>;

    /// An attestation binding the migration key.
    #[method(name = "decryptionAttestation")]
    async fn decryption_attestation(&self) -> Result<Bytes, ErrorObjectOwned>;

    /// The signer key encrypted to the enclave that produced `attestation`.
    #[method(name = "encryptedSignerKey")]
    async fn encrypted_signer_key(&self, attestation: Bytes) -> Result<Bytes, ErrorObjectOwned>;

    /// Installs a signer key produced by `encryptedSignerKey`.
    #[method(name = "setSignerKey")]
    async fn set_signer_key(&self, encrypted: Bytes) -> Result<(), ErrorObjectOwned>;

    /// Executes one block and returns its signed proposal.
    #[method(name = "executeStateless")]
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
    ) -> Result<Proposal, ErrorObjectOwned>;

    /// Folds consecutive proposals into one.
    #[method(name = "aggregate")]
    async fn aggregate(
        &self,
        config_hash: B256,
        prev_output_root: B256,
        proposals: Vec<Proposal>,
    ) -> Result<Proposal, ErrorObjectOwned>;
}

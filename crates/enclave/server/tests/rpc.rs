//! The RPC surface end to end over HTTP.

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256, U256};
use jsonrpsee::{
    core::ClientError,
    http_client::{HttpClient, HttpClientBuilder},
    server::{ServerBuilder, ServerHandle},
};
use rollup_enclave_core::{
    BoundaryChecks, ExecutorError, Proposal, StatelessExecutor, StatelessInput, StatelessRequest,
    output_root_v0,
};
use rollup_enclave_server::{
    Enclave, EnclaveApiClient, EnclaveApiServer, EnclaveConfig, ErrorKind, KeyCustody,
    RpcServerImpl,
    crypto::recover_signer,
    test_utils::{ChainBuilder, FakeModule, FakeVerifier, TEST_RSA_BITS, chain_config},
};

#[derive(Debug)]
struct MissingCode;

impl StatelessExecutor for MissingCode {
    fn execute(&self, _input: &StatelessInput<'_>) -> Result<(), ExecutorError> {
        Err(ExecutorError::MissingCode(B256::repeat_byte(0xcc)))
    }
}

struct Running {
    client: HttpClient,
    _handle: ServerHandle,
}

async fn start(pcr0: u8, executor: Arc<dyn StatelessExecutor>) -> Running {
    let custody = KeyCustody::boot_with_key_size(
        Arc::new(FakeModule::new(vec![pcr0; 48])),
        Arc::new(FakeVerifier),
        &EnclaveConfig::default(),
        TEST_RSA_BITS,
    )
    .unwrap();
    let rpc = RpcServerImpl::new(
        Arc::new(Enclave::new(custody, executor)),
        Duration::from_secs(30),
    );

    let server = ServerBuilder::default().build("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.start(rpc.into_rpc());
    let client = HttpClientBuilder::default().build(format!("http://{addr}")).unwrap();
    Running { client, _handle: handle }
}

async fn execute(client: &HttpClient, r: StatelessRequest) -> Result<Proposal, ClientError> {
    client
        .execute_stateless(
            r.config,
            r.chain_params,
            r.l1_origin,
            r.l1_receipts,
            r.previous_block_txs,
            r.block_header,
            r.sequenced_txs,
            r.witness,
            r.message_account,
            r.prev_message_account_hash,
        )
        .await
}

fn code(err: ClientError) -> i32 {
    match err {
        ClientError::Call(obj) => obj.code(),
        other => panic!("expected a call error, got {other:?}"),
    }
}

#[tokio::test]
async fn exposes_the_signer() {
    let enclave = start(1, Arc::new(BoundaryChecks::new())).await;
    let public_key = enclave.client.signer_public_key().await.unwrap();
    assert_eq!(public_key.len(), 65);
    assert_eq!(public_key[0], 0x04);

    let decryption_key = enclave.client.decryption_public_key().await.unwrap();
    assert!(!decryption_key.is_empty());
    assert!(!enclave.client.signer_attestation().await.unwrap().is_empty());
}

#[tokio::test]
async fn migrates_the_signer_between_matching_enclaves() {
    let old = start(7, Arc::new(BoundaryChecks::new())).await;
    let new = start(7, Arc::new(BoundaryChecks::new())).await;
    let old_key = old.client.signer_public_key().await.unwrap();
    assert_ne!(old_key, new.client.signer_public_key().await.unwrap());

    let attestation = new.client.decryption_attestation().await.unwrap();
    let encrypted = old.client.encrypted_signer_key(attestation).await.unwrap();
    new.client.set_signer_key(encrypted).await.unwrap();

    assert_eq!(new.client.signer_public_key().await.unwrap(), old_key);
}

#[tokio::test]
async fn refuses_a_different_measurement() {
    let old = start(7, Arc::new(BoundaryChecks::new())).await;
    let other = start(8, Arc::new(BoundaryChecks::new())).await;

    let attestation = other.client.decryption_attestation().await.unwrap();
    let err = old.client.encrypted_signer_key(attestation).await.unwrap_err();
    assert_eq!(code(err), ErrorKind::MeasurementMismatch.code());
}

#[tokio::test]
async fn garbage_ciphertext_is_a_decryption_error() {
    let enclave = start(1, Arc::new(BoundaryChecks::new())).await;
    let err = enclave.client.set_signer_key(vec![0u8; 16].into()).await.unwrap_err();
    assert_eq!(code(err), ErrorKind::Decryption.code());
}

#[tokio::test]
async fn executes_and_aggregates_a_range() {
    let enclave = start(1, Arc::new(BoundaryChecks::boundary_only())).await;
    let mut chain = ChainBuilder::new(chain_config());
    let start_root = output_root_v0(chain.head(), chain.head_storage_hash());
    let config_hash = chain.config().hash();

    let mut proposals = Vec::new();
    for txs in [0, 2, 1] {
        proposals.push(execute(&enclave.client, chain.next_block(txs)).await.unwrap());
    }
    let last = proposals.last().unwrap().clone();
    assert_eq!(last.l2_block_number, U256::from(chain.head().number));

    let folded = enclave.client.aggregate(config_hash, start_root, proposals).await.unwrap();
    assert_eq!(folded.output_root, last.output_root);
    assert_eq!(folded.l1_origin_hash, last.l1_origin_hash);

    let signer =
        recover_signer(&folded.message(config_hash, start_root), &folded.signature).unwrap();
    let public_key = enclave.client.signer_public_key().await.unwrap();
    assert_eq!(signer, Address::from_raw_public_key(&public_key[1..]));
}

#[tokio::test]
async fn aggregate_rejects_a_broken_chain() {
    let enclave = start(1, Arc::new(BoundaryChecks::boundary_only())).await;
    let mut chain = ChainBuilder::new(chain_config());
    let start_root = output_root_v0(chain.head(), chain.head_storage_hash());
    let config_hash = chain.config().hash();

    let first = execute(&enclave.client, chain.next_block(1)).await.unwrap();
    let _skipped = chain.next_block(1);
    let third = execute(&enclave.client, chain.next_block(1)).await.unwrap();

    let err = enclave
        .client
        .aggregate(config_hash, start_root, vec![first, third])
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorKind::InvalidSignature.code());

    let err = enclave.client.aggregate(config_hash, start_root, Vec::new()).await.unwrap_err();
    assert_eq!(code(err), ErrorKind::EmptyProposalSet.code());
}

#[tokio::test]
async fn unlinked_engine_refuses_to_sign() {
    let enclave = start(1, Arc::new(BoundaryChecks::new())).await;
    let mut request = ChainBuilder::new(chain_config()).next_block(1);
    request.witness.state.clear();
    let err = execute(&enclave.client, request).await.unwrap_err();
    assert_eq!(code(err), ErrorKind::ExecutionFailed.code());
}

#[tokio::test]
async fn engine_failure_maps_to_execution_failed() {
    let enclave = start(1, Arc::new(MissingCode)).await;
    let request = ChainBuilder::new(chain_config()).next_block(0);
    let err = execute(&enclave.client, request).await.unwrap_err();
    assert_eq!(code(err), ErrorKind::ExecutionFailed.code());
}

#[tokio::test]
async fn bad_witness_hex_maps_to_witness_decode() {
    let enclave = start(1, Arc::new(BoundaryChecks::new())).await;
    let mut request = ChainBuilder::new(chain_config()).next_block(0);
    request.witness.codes.insert("0x00".into(), "0xzz".into());
    let err = execute(&enclave.client, request).await.unwrap_err();
    assert_eq!(code(err), ErrorKind::WitnessDecode.code());
}

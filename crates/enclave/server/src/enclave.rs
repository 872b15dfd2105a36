//! The enclave service: key custody plus stateless execution.

use std::{sync::Arc, time::SystemTime};

use alloy_primitives::{B256, U256};
use rollup_enclave_core::{
    BoundaryChecks, Proposal, ProposalMessage, StatelessExecutor, StatelessRequest,
    decode_witness, output_root_v0,
};
use tracing::{debug, info, warn};

use crate::{
    chain::{aggregate, sign_proposal},
    custody::KeyCustody,
    error::Result,
};

/// The executor a booted enclave signs behind when no engine is linked.
///
/// Blocks are accepted on boundary checks alone only for an unmeasured custody started with
/// `insecure_local_mode`. Everything else refuses to sign.
pub fn select_executor(
    custody: &KeyCustody,
    insecure_local_mode: bool,
) -> Arc<dyn StatelessExecutor> {
    if insecure_local_mode && custody.is_local_mode() {
        warn!("insecure local mode: signing blocks on boundary checks alone");
        Arc::new(BoundaryChecks::boundary_only())
    } else {
        warn!("no state-transition engine linked, blocks will be refused");
        Arc::new(BoundaryChecks::new())
    }
}

/// Everything an RPC call can reach.
#[derive(Debug)]
pub struct Enclave {
    custody: KeyCustody,
    executor: Arc<dyn StatelessExecutor>,
}

impl Enclave {
    /// Creates the service.
    pub fn new(custody: KeyCustody, executor: Arc<dyn StatelessExecutor>) -> Self {
        Self { custody, executor }
    }

    /// Key custody.
    pub const fn custody(&self) -> &KeyCustody {
        &self.custody
    }

    /// See [`KeyCustody::encrypted_signer_key`], verified as of now.
    pub fn encrypted_signer_key(&self, attestation: &[u8]) -> Result<Vec<u8>> {
        self.custody.encrypted_signer_key(attestation, SystemTime::now())
    }

    /// Executes one block and signs its transition.
    ///
    /// The previous output root comes from the witness's first header and the caller's
    /// previous message-passer storage hash; the new one from `block_header` and the proven
    /// message-passer account.
    pub fn execute_stateless(&self, request: &StatelessRequest) -> Result<Proposal> {
        let witness = decode_witness(&request.witness)?;
        self.executor.execute(&request.input(&witness))?;

        let prev_output_root =
            output_root_v0(witness.previous_header(), request.prev_message_account_hash);
        let output_root =
            output_root_v0(&request.block_header, request.message_account.storage_hash);
        let message = ProposalMessage {
            config_hash: request.config.hash(),
            l1_origin_hash: request.l1_origin.hash_slow(),
            l2_block_number: U256::from(request.block_header.number),
            prev_output_root,
            output_root,
        };
        debug!(?message, "signing block transition");

        let proposal = sign_proposal(&self.custody.signer().read(), &message)?;
        info!(
            block = request.block_header.number,
            %prev_output_root,
            %output_root,
            "block proposal signed"
        );
        Ok(proposal)
    }

    /// Folds `proposals` under one read of the signer.
    pub fn aggregate(
        &self,
        config_hash: B256,
        prev_output_root: B256,
        proposals: &[Proposal],
    ) -> Result<Proposal> {
        let signer = self.custody.signer().read();
        let proposal = aggregate(&signer, config_hash, prev_output_root, proposals)?;
        info!(
            count = proposals.len(),
            block = %proposal.l2_block_number,
            output_root = %proposal.output_root,
            "proposals aggregated"
        );
        Ok(proposal)
    }
}

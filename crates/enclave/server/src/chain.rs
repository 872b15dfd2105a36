//! Proposal signing and aggregation.
//!
//! Aggregation is a verified fold: every link is checked against the running output root
//! before one signature covers the whole range.

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use rollup_enclave_core::{Proposal, ProposalMessage};
use tracing::{debug, warn};

use crate::{
    crypto::{sign_message, verify_message},
    error::ProposalError,
};

/// Signs `message` and wraps it as a proposal.
pub fn sign_proposal(
    signer: &PrivateKeySigner,
    message: &ProposalMessage,
) -> Result<Proposal, ProposalError> {
    Ok(Proposal {
        output_root: message.output_root,
        signature: sign_message(signer, message)?,
        l1_origin_hash: message.l1_origin_hash,
        l2_block_number: message.l2_block_number,
    })
}

/// Folds `proposals` into one proposal starting at `prev_output_root`.
///
/// Proposals must be in ascending block order. A single proposal is returned as is. Otherwise
/// each link must have been signed by `signer` over the running root, and the result carries
/// the last proposal's L1 origin and block number.
pub fn aggregate(
    signer: &PrivateKeySigner,
    config_hash: B256,
    prev_output_root: B256,
    proposals: &[Proposal],
) -> Result<Proposal, ProposalError> {
    let last = match proposals {
        [] => return Err(ProposalError::EmptyProposals),
        [only] => return Ok(only.clone()),
        [.., last] => last,
    };

    let expected = signer.address();
    let mut output_root = prev_output_root;
    for (index, proposal) in proposals.iter().enumerate() {
        let message = proposal.message(config_hash, output_root);
        match verify_message(expected, &message, &proposal.signature) {
            Ok(true) => {}
            Ok(false) => {
                warn!(index, block = %proposal.l2_block_number, "proposal signed by another key");
                return Err(ProposalError::InvalidSignature { index });
            }
            Err(e) => {
                warn!(index, block = %proposal.l2_block_number, error = %e, "unreadable proposal signature");
                return Err(ProposalError::InvalidSignature { index });
            }
        }
        output_root = proposal.output_root;
    }

    debug!(count = proposals.len(), last_block = %last.l2_block_number, "proposal chain verified");
    sign_proposal(
        signer,
        &ProposalMessage {
            config_hash,
            l1_origin_hash: last.l1_origin_hash,
            l2_block_number: last.l2_block_number,
            prev_output_root,
            output_root,
        },
    )
}

//! The owned input bundle behind `executeStateless`.

use alloy_consensus::{Header, ReceiptEnvelope};
use alloy_primitives::{B256, Bytes};
use serde::{Deserialize, Serialize};

use crate::{types::account::AccountResult, types::config::PerChainConfig, witness::ExecutionWitness};

/// Everything the enclave needs to validate and commit to one L2 block.
///
/// Uses camelCase to match go-ethereum's JSON-RPC conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatelessRequest {
    /// The chain identity committed to by the signature.
    pub config: PerChainConfig,

    /// The L2 chain parameters, passed through to the execution engine.
    pub chain_params: serde_json::Value,

    /// The L1 origin block header.
    pub l1_origin: Header,

    /// The L1 origin block receipts.
    pub l1_receipts: Vec<ReceiptEnvelope>,

    /// Transactions from the previous L2 block (EIP-2718 encoded).
    pub previous_block_txs: Vec<Bytes>,

    /// The L2 block header to validate.
    pub block_header: Header,

    /// Sequenced transactions for this block (EIP-2718 encoded).
    pub sequenced_txs: Vec<Bytes>,

    /// The execution witness.
    pub witness: ExecutionWitness,

    /// The `L2ToL1MessagePasser` account proof at `block_header`.
    pub message_account: AccountResult,

    /// The storage hash of the message account in the previous block.
    pub prev_message_account_hash: B256,
}

//! The seam between the enclave and the stateless state-transition engine.
//!
//! The engine itself is opaque: given the verified inputs for one block it either accepts
//! the block or returns an error. [`BoundaryChecks`] performs every check that does not
//! need the EVM before handing the block to an engine.

use alloy_consensus::{Header, ReceiptEnvelope};
use alloy_primitives::{Address, Bytes, address};

use crate::{
    error::ExecutorError,
    types::{account::AccountResult, request::StatelessRequest},
    witness::WitnessSet,
};

mod boundary;
pub use boundary::{BoundaryChecks, validate_sequencer_drift};

mod l1_info;
pub use l1_info::{
    BEDROCK_SELECTOR, ECOTONE_SELECTOR, ISTHMUS_SELECTOR, JOVIAN_SELECTOR, L1BlockRef,
    decode_l1_info,
};

/// Maximum sequencer drift in seconds (Fjord hardfork).
///
/// If a block's timestamp exceeds `l1_origin.timestamp + MAX_SEQUENCER_DRIFT_FJORD`,
/// the block can only contain deposit transactions.
pub const MAX_SEQUENCER_DRIFT_FJORD: u64 = 1800;

/// L2 to L1 Message Passer predeploy address.
pub const L2_TO_L1_MESSAGE_PASSER: Address = address!("4200000000000000000000000000000000000016");

/// Borrowed inputs for executing one block.
#[derive(Debug, Clone, Copy)]
pub struct StatelessInput<'a> {
    /// L2 chain parameters.
    pub chain_params: &'a serde_json::Value,
    /// Full rollup config, when the caller supplied one.
    pub rollup_config: Option<&'a serde_json::Value>,
    /// The L1 origin block header.
    pub l1_origin: &'a Header,
    /// The L1 origin block receipts.
    pub l1_receipts: &'a [ReceiptEnvelope],
    /// Transactions from the previous L2 block.
    pub previous_block_txs: &'a [Bytes],
    /// The L2 block header to validate.
    pub block_header: &'a Header,
    /// Sequenced transactions for this block.
    pub sequenced_txs: &'a [Bytes],
    /// The decoded witness.
    pub witness: &'a WitnessSet,
    /// The `L2ToL1MessagePasser` account proof at `block_header`.
    pub message_account: &'a AccountResult,
}

impl StatelessRequest {
    /// Borrows the request as executor input, pairing it with its decoded witness.
    #[must_use]
    pub fn input<'a>(&'a self, witness: &'a WitnessSet) -> StatelessInput<'a> {
        StatelessInput {
            chain_params: &self.chain_params,
            rollup_config: self.config.rollup_cfg.as_ref(),
            l1_origin: &self.l1_origin,
            l1_receipts: &self.l1_receipts,
            previous_block_txs: &self.previous_block_txs,
            block_header: &self.block_header,
            sequenced_txs: &self.sequenced_txs,
            witness,
            message_account: &self.message_account,
        }
    }
}

/// A stateless state-transition function.
///
/// Implementations must be deterministic: the same input always yields the same outcome.
pub trait StatelessExecutor: Send + Sync + std::fmt::Debug {
    /// Accepts the block described by `input` or explains why it is invalid.
    fn execute(&self, input: &StatelessInput<'_>) -> Result<(), ExecutorError>;
}

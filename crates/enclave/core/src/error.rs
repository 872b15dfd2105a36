//! Error types for enclave core operations.

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

/// Errors that can occur while building a chain configuration.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    /// The rollup configuration document could not be read.
    #[error("invalid rollup config: {0}")]
    InvalidRollupConfig(String),
}

/// Errors that can occur while decoding an execution witness.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum WitnessError {
    /// The witness carries no headers, so there is no previous block.
    #[error("witness has no headers")]
    MissingHeaders,
    /// A code or state entry is not `0x`-prefixed.
    #[error("witness {section} entry {key} is missing the 0x prefix")]
    MissingPrefix {
        /// Which map the entry came from.
        section: &'static str,
        /// The map key of the entry.
        key: String,
    },
    /// A code or state entry is not valid hex.
    #[error("witness {section} entry {key} is not valid hex: {reason}")]
    InvalidHex {
        /// Which map the entry came from.
        section: &'static str,
        /// The map key of the entry.
        key: String,
        /// The decoder error.
        reason: String,
    },
}

/// Errors that can occur while verifying an account proof.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ProofError {
    /// The account nonce does not fit the trie encoding.
    #[error("account nonce {0} does not fit in 64 bits")]
    NonceOverflow(U256),
    /// The account proof does not lead to the claimed account.
    #[error("account proof for {address} failed: {reason}")]
    Account {
        /// The account being proven.
        address: Address,
        /// The verifier error.
        reason: String,
    },
    /// A storage proof does not lead to the claimed slot value.
    #[error("storage proof for slot {slot} failed: {reason}")]
    Storage {
        /// The storage slot being proven.
        slot: B256,
        /// The verifier error.
        reason: String,
    },
}

/// Errors that can occur during stateless execution.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ExecutorError {
    /// The L1 receipts do not hash to the L1 origin's receipts root.
    #[error("invalid L1 receipts: expected root {expected}, computed {computed}")]
    InvalidReceipts {
        /// Receipts root from the L1 origin header.
        expected: B256,
        /// Root computed from the supplied receipts.
        computed: B256,
    },
    /// The block does not build on the witness's previous header.
    #[error("invalid parent hash: block parent is {expected}, previous header hashes to {actual}")]
    InvalidParentHash {
        /// The block header's parent hash.
        expected: B256,
        /// Hash of the previous header in the witness.
        actual: B256,
    },
    /// The block carries sequenced transactions past the sequencer drift.
    #[error("L1 origin too old: block time {block_timestamp}, origin time {l1_timestamp}")]
    L1OriginTooOld {
        /// L2 block timestamp.
        block_timestamp: u64,
        /// L1 origin timestamp.
        l1_timestamp: u64,
    },
    /// The previous block's transactions do not hash to its transactions root.
    #[error("invalid previous block txs: expected root {expected}, computed {computed}")]
    InvalidTxHash {
        /// Transactions root from the previous header.
        expected: B256,
        /// Root computed from the supplied transactions.
        computed: B256,
    },
    /// The previous block does not start with the L1 attributes deposit.
    #[error("previous block is missing the L1 info deposit")]
    MissingL1InfoDeposit,
    /// The L1 attributes deposit calldata could not be decoded.
    #[error("invalid L1 info deposit: {0}")]
    InvalidL1Info(String),
    /// The supplied L1 origin is neither the previous block's origin nor its successor.
    #[error("L1 origin {l1_origin} does not follow previous block origin {parent_origin}")]
    InvalidL1Origin {
        /// L1 block hash recorded in the previous block's attributes deposit.
        parent_origin: B256,
        /// Hash of the supplied L1 origin header.
        l1_origin: B256,
    },
    /// A transaction could not be decoded.
    #[error("failed to decode transaction {index}: {reason}")]
    TxDecodeFailed {
        /// Position of the transaction in its list.
        index: usize,
        /// The decoder error.
        reason: String,
    },
    /// A sequenced transaction is a deposit.
    #[error("sequenced transaction {index} is a deposit")]
    SequencedTxCannotBeDeposit {
        /// Position of the transaction in the sequenced list.
        index: usize,
    },
    /// The message account proof is for the wrong contract.
    #[error("message account proof is for {0}, not the L2 to L1 message passer")]
    InvalidMessageAccountAddress(Address),
    /// The message account proof does not verify against the block's state root.
    #[error("message account verification failed: {0}")]
    MessageAccount(#[from] ProofError),
    /// The witness does not contain bytecode the execution needed.
    #[error("witness is missing code for hash {0}")]
    MissingCode(B256),
    /// The witness does not contain a trie node the execution needed.
    #[error("witness is missing state node {0}")]
    MissingStateNode(B256),
    /// The state-transition engine rejected the block.
    #[error("state transition failed: {0}")]
    Engine(String),
    /// No state-transition engine is linked, so the block's post-state cannot be checked.
    #[error("no state-transition engine linked")]
    NoEngine,
}

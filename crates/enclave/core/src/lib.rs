//! Core types for the rollup enclave.
//!
//! Everything in this crate is pure: the binary commitments a proposal signs over, the
//! Go-compatible JSON shapes the caller sends, witness decoding, account proof checks and
//! the seam behind which the stateless state-transition engine lives. Key material and
//! hardware access live in `rollup-enclave-server`.

#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![deny(unused_must_use)]
#![deny(rust_2018_idioms)]

pub mod error;
pub mod executor;
pub mod serde_utils;
pub mod trie;
pub mod types;
pub mod witness;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ConfigError, ExecutorError, ProofError, WitnessError};
pub use executor::{
    BoundaryChecks, L1BlockRef, L2_TO_L1_MESSAGE_PASSER, MAX_SEQUENCER_DRIFT_FJORD,
    StatelessExecutor, StatelessInput, decode_l1_info, validate_sequencer_drift,
};
pub use trie::{compute_receipt_root, compute_tx_root};
pub use types::account::{AccountResult, StorageProof};
pub use types::config::{
    BlockId, Genesis, GenesisSystemConfig, MARSHAL_BINARY_SIZE, PerChainConfig,
};
pub use types::message::{MESSAGE_LENGTH, ProposalMessage, build_message};
pub use types::output::output_root_v0;
pub use types::proposal::Proposal;
pub use types::request::StatelessRequest;
pub use witness::{ExecutionWitness, WitnessSet, decode_witness};

pub use alloy_consensus::{Header, ReceiptEnvelope};
pub use alloy_primitives::{Address, B256, Bytes, U256};

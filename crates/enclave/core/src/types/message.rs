//! The message every proposal signature covers.
//!
//! Signing and verification both go through [`ProposalMessage::encode`], which is the only
//! caller of [`build_message`], so the field order cannot drift between the two paths.

use alloy_primitives::{B256, U256, keccak256};

/// Length of an encoded [`ProposalMessage`]: five 32-byte words.
pub const MESSAGE_LENGTH: usize = 160;

/// Concatenates 32-byte words in order.
#[must_use]
pub fn build_message(parts: &[B256]) -> Vec<u8> {
    let mut data = Vec::with_capacity(parts.len() * 32);
    for part in parts {
        data.extend_from_slice(part.as_slice());
    }
    data
}

/// The fields bound by a proposal signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalMessage {
    /// Hash of the chain's [`PerChainConfig`](crate::PerChainConfig).
    pub config_hash: B256,
    /// Hash of the L1 block the L2 block was derived from.
    pub l1_origin_hash: B256,
    /// L2 block number, encoded as a big-endian 32-byte word.
    pub l2_block_number: U256,
    /// Output root the transition starts from.
    pub prev_output_root: B256,
    /// Output root the transition ends at.
    pub output_root: B256,
}

impl ProposalMessage {
    /// `config_hash || l1_origin_hash || l2_block_number || prev_output_root || output_root`
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        build_message(&[
            self.config_hash,
            self.l1_origin_hash,
            B256::new(self.l2_block_number.to_be_bytes::<32>()),
            self.prev_output_root,
            self.output_root,
        ])
    }

    /// The 32-byte digest that gets signed.
    #[must_use]
    pub fn digest(&self) -> B256 {
        keccak256(self.encode())
    }
}

//! Output root (version 0) commitment.

use alloy_consensus::Header;
use alloy_primitives::{B256, keccak256};

/// Computes the V0 output root of an L2 block.
///
/// ```text
/// keccak256(version (32 zero bytes) || state_root || message_passer_storage_root || block_hash)
/// ```
#[must_use]
pub fn output_root_v0(header: &Header, storage_root: B256) -> B256 {
    let mut buf = [0u8; 128];
    buf[32..64].copy_from_slice(header.state_root.as_slice());
    buf[64..96].copy_from_slice(storage_root.as_slice());
    buf[96..128].copy_from_slice(header.hash_slow().as_slice());
    keccak256(buf)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::b256;

    use super::*;

    fn header() -> Header {
        Header {
            parent_hash: B256::with_last_byte(1),
            state_root: B256::repeat_byte(0xaa),
            number: 1,
            gas_limit: 30_000_000,
            timestamp: 1_700_000_000,
            base_fee_per_gas: Some(1_000_000_000),
            ..Default::default()
        }
    }

    #[test]
    fn layout_is_version_state_storage_hash() {
        let header = header();
        let storage_root = B256::repeat_byte(0xbb);

        let mut expected = [0u8; 128];
        expected[32..64].copy_from_slice(header.state_root.as_slice());
        expected[64..96].copy_from_slice(storage_root.as_slice());
        expected[96..].copy_from_slice(header.hash_slow().as_slice());

        assert_eq!(output_root_v0(&header, storage_root), keccak256(expected));
        assert_eq!(output_root_v0(&header, storage_root), output_root_v0(&header, storage_root));
    }

    #[test]
    fn every_input_moves_the_root() {
        let storage_root = b256!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        let root = output_root_v0(&header(), storage_root);

        let mut flipped = storage_root;
        flipped.0[31] ^= 1;
        assert_ne!(output_root_v0(&header(), flipped), root);

        let mut other_state = header();
        other_state.state_root.0[0] ^= 1;
        assert_ne!(output_root_v0(&other_state, storage_root), root);

        // Any header field reaches the root through the block hash.
        let mut other_block = header();
        other_block.timestamp += 1;
        assert_ne!(output_root_v0(&other_block, storage_root), root);
    }
}

//! Decoding of the L1 attributes deposit that opens every L2 block.
//!
//! The deposit's calldata names the L1 block the L2 block was derived from. Four calldata
//! layouts exist, one per hardfork that changed the `L1Block` predeploy's setter.

use alloy_primitives::B256;

use crate::error::ExecutorError;

/// `setL1BlockValues(uint64,uint64,uint256,bytes32,uint64,bytes32,uint256,uint256)`
pub const BEDROCK_SELECTOR: [u8; 4] = [0x01, 0x5d, 0x8e, 0xb9];
/// `setL1BlockValuesEcotone()`
pub const ECOTONE_SELECTOR: [u8; 4] = [0x44, 0x0a, 0x5e, 0x20];
/// `setL1BlockValuesIsthmus()`
pub const ISTHMUS_SELECTOR: [u8; 4] = [0x09, 0x89, 0x99, 0xbe];
/// `setL1BlockValuesJovian()`
pub const JOVIAN_SELECTOR: [u8; 4] = [0x3d, 0xb6, 0xbe, 0x2b];

const BEDROCK_LEN: usize = 4 + 32 * 8;
const ECOTONE_LEN: usize = 4 + 32 * 5;
const ISTHMUS_LEN: usize = ECOTONE_LEN + 4 + 8;
const JOVIAN_LEN: usize = ISTHMUS_LEN + 2;

/// The L1 block an L2 block was derived from, as recorded by its attributes deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1BlockRef {
    /// L1 block number.
    pub number: u64,
    /// L1 block hash.
    pub hash: B256,
    /// Position of the L2 block within the epoch.
    pub sequence_number: u64,
}

/// Decodes the L1 origin out of L1 attributes deposit calldata.
pub fn decode_l1_info(calldata: &[u8]) -> Result<L1BlockRef, ExecutorError> {
    let Some(selector) = calldata.get(..4) else {
        return Err(ExecutorError::InvalidL1Info(format!(
            "calldata too short for a selector: {} bytes",
            calldata.len()
        )));
    };

    let selector = <[u8; 4]>::try_from(selector).unwrap_or_default();
    let expected_len = match selector {
        BEDROCK_SELECTOR => BEDROCK_LEN,
        ECOTONE_SELECTOR => ECOTONE_LEN,
        ISTHMUS_SELECTOR => ISTHMUS_LEN,
        JOVIAN_SELECTOR => JOVIAN_LEN,
        other => {
            return Err(ExecutorError::InvalidL1Info(format!(
                "unknown selector 0x{}",
                alloy_primitives::hex::encode(other)
            )));
        }
    };
    if calldata.len() != expected_len {
        return Err(ExecutorError::InvalidL1Info(format!(
            "expected {expected_len} bytes of calldata, got {}",
            calldata.len()
        )));
    }

    if selector == BEDROCK_SELECTOR {
        return Ok(L1BlockRef {
            number: be_u64(&calldata[28..36]),
            hash: B256::from_slice(&calldata[100..132]),
            sequence_number: be_u64(&calldata[156..164]),
        });
    }

    // Packed layout from Ecotone on: scalars (8), sequence number (8), time (8),
    // number (8), base fees (64), hash (32), batcher hash (32), then fork additions.
    Ok(L1BlockRef {
        number: be_u64(&calldata[28..36]),
        hash: B256::from_slice(&calldata[100..132]),
        sequence_number: be_u64(&calldata[12..20]),
    })
}

fn be_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_be_bytes(word)
}

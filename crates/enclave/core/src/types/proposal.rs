//! Signed state-transition proposals.

use alloy_primitives::{B256, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::{serde_utils::u256_hex, types::message::ProposalMessage};

/// A signed commitment to an L2 state transition, or to a folded range of them.
///
/// Field names are PascalCase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Output root the transition ends at.
    #[serde(rename = "OutputRoot")]
    pub output_root: B256,
    /// 65-byte `r || s || v` signature with `v` in `{0, 1}`.
    #[serde(rename = "Signature")]
    pub signature: Bytes,
    /// L1 origin of the last block covered.
    #[serde(rename = "L1OriginHash")]
    pub l1_origin_hash: B256,
    /// Number of the last block covered.
    #[serde(rename = "L2BlockNumber", with = "u256_hex")]
    pub l2_block_number: U256,
}

impl Proposal {
    /// Rebuilds the message this proposal's signature should cover when it starts from
    /// `prev_output_root`.
    #[must_use]
    pub const fn message(&self, config_hash: B256, prev_output_root: B256) -> ProposalMessage {
        ProposalMessage {
            config_hash,
            l1_origin_hash: self.l1_origin_hash,
            l2_block_number: self.l2_block_number,
            prev_output_root,
            output_root: self.output_root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal {
            output_root: B256::repeat_byte(0xab),
            signature: Bytes::from(vec![0x01; 65]),
            l1_origin_hash: B256::repeat_byte(0xcd),
            l2_block_number: U256::from(12345),
        }
    }

    #[test]
    fn wire_format_is_pascal_case() {
        let json = serde_json::to_value(proposal()).unwrap();
        let object = json.as_object().unwrap();

        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["L1OriginHash", "L2BlockNumber", "OutputRoot", "Signature"]);
        assert_eq!(json["L2BlockNumber"], "0x3039");
        assert_eq!(json["Signature"], format!("0x{}", "01".repeat(65)));
    }

    #[test]
    fn parses_go_output() {
        let json = r#"{
            "OutputRoot": "0xabababababababababababababababababababababababababababababababab",
            "Signature": "0x0101",
            "L1OriginHash": "0xcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcd",
            "L2BlockNumber": "0x3039"
        }"#;
        let parsed: Proposal = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.l2_block_number, U256::from(12345));
        assert_eq!(parsed.signature.as_ref(), &[1, 1]);
    }

    #[test]
    fn message_carries_proposal_fields() {
        let p = proposal();
        let message = p.message(B256::repeat_byte(1), B256::repeat_byte(2));
        assert_eq!(message.output_root, p.output_root);
        assert_eq!(message.l1_origin_hash, p.l1_origin_hash);
        assert_eq!(message.l2_block_number, p.l2_block_number);
        assert_eq!(message.prev_output_root, B256::repeat_byte(2));
    }
}

//! `eth_getProof` account results and their verification.

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_trie::{Nibbles, TrieAccount, proof::verify_proof};
use serde::{Deserialize, Serialize};

use crate::error::ProofError;

/// Proof for one storage slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProof {
    /// Storage slot.
    pub key: B256,
    /// Slot value.
    pub value: U256,
    /// Trie nodes from the storage root to the slot.
    pub proof: Vec<Bytes>,
}

/// An account and its Merkle proof, as returned by `eth_getProof`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResult {
    /// Account address.
    pub address: Address,
    /// Trie nodes from the state root to the account.
    pub account_proof: Vec<Bytes>,
    /// Account balance.
    pub balance: U256,
    /// Code hash.
    pub code_hash: B256,
    /// Account nonce.
    pub nonce: U256,
    /// Storage root.
    pub storage_hash: B256,
    /// Proofs for the requested storage slots.
    #[serde(default)]
    pub storage_proof: Vec<StorageProof>,
}

impl AccountResult {
    /// Verifies the account against `state_root` and every storage proof against the
    /// account's storage root. A zero slot value is checked as an exclusion proof.
    pub fn verify(&self, state_root: B256) -> Result<(), ProofError> {
        let nonce = u64::try_from(self.nonce).map_err(|_| ProofError::NonceOverflow(self.nonce))?;
        let account = TrieAccount {
            nonce,
            balance: self.balance,
            storage_root: self.storage_hash,
            code_hash: self.code_hash,
        };

        verify_proof(
            state_root,
            Nibbles::unpack(keccak256(self.address)),
            Some(alloy_rlp::encode(account)),
            &self.account_proof,
        )
        .map_err(|e| ProofError::Account { address: self.address, reason: e.to_string() })?;

        for slot in &self.storage_proof {
            let expected = (!slot.value.is_zero()).then(|| alloy_rlp::encode(slot.value));
            verify_proof(self.storage_hash, Nibbles::unpack(keccak256(slot.key)), expected, &slot.proof)
                .map_err(|e| ProofError::Storage { slot: slot.key, reason: e.to_string() })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256};
    use alloy_trie::KECCAK_EMPTY;

    use super::*;
    use crate::{
        L2_TO_L1_MESSAGE_PASSER,
        test_utils::{proven_account, single_leaf_trie},
    };

    fn message_passer(storage_hash: B256) -> AccountResult {
        AccountResult {
            address: address!("4200000000000000000000000000000000000016"),
            account_proof: Vec::new(),
            balance: U256::ZERO,
            code_hash: KECCAK_EMPTY,
            nonce: U256::ZERO,
            storage_hash,
            storage_proof: Vec::new(),
        }
    }

    fn proven_message_passer() -> (B256, AccountResult) {
        let slot = B256::with_last_byte(1);
        let (storage_root, slot_proof) =
            single_leaf_trie(keccak256(slot), &alloy_rlp::encode(U256::from(7)));

        let (state_root, mut account) = proven_account(L2_TO_L1_MESSAGE_PASSER, storage_root);
        account.storage_proof =
            vec![StorageProof { key: slot, value: U256::from(7), proof: slot_proof }];
        (state_root, account)
    }

    #[test]
    fn verifies_account_and_storage() {
        let (state_root, account) = proven_message_passer();
        account.verify(state_root).unwrap();
    }

    #[test]
    fn rejects_wrong_state_root() {
        let (_, account) = proven_message_passer();
        let err = account.verify(B256::repeat_byte(0x42)).unwrap_err();
        assert!(matches!(err, ProofError::Account { .. }));
    }

    #[test]
    fn rejects_tampered_storage_hash() {
        let (state_root, mut account) = proven_message_passer();
        account.storage_hash = B256::repeat_byte(0x01);
        assert!(matches!(account.verify(state_root), Err(ProofError::Account { .. })));
    }

    #[test]
    fn rejects_wrong_slot_value() {
        let (state_root, mut account) = proven_message_passer();
        account.storage_proof[0].value = U256::from(8);
        assert!(matches!(account.verify(state_root), Err(ProofError::Storage { .. })));
    }

    #[test]
    fn rejects_oversized_nonce() {
        let mut account = message_passer(B256::ZERO);
        account.nonce = U256::MAX;
        assert!(matches!(account.verify(B256::ZERO), Err(ProofError::NonceOverflow(_))));
    }

    #[test]
    fn parses_rpc_json() {
        let json = r#"{
            "address": "0x4200000000000000000000000000000000000016",
            "accountProof": ["0xabcd"],
            "balance": "0x0",
            "codeHash": "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
            "nonce": "0x0",
            "storageHash": "0x0000000000000000000000000000000000000000000000000000000000000001",
            "storageProof": [{
                "key": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "value": "0x2a",
                "proof": ["0xdead"]
            }]
        }"#;
        let account: AccountResult = serde_json::from_str(json).unwrap();
        assert_eq!(account.code_hash, KECCAK_EMPTY);
        assert_eq!(
            account.storage_hash,
            b256!("0000000000000000000000000000000000000000000000000000000000000001")
        );
        assert_eq!(account.storage_proof[0].value, U256::from(42));
    }
}

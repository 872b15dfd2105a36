//! Ordered trie roots over transactions and receipts.
//!
//! Matches go-ethereum's `DeriveSha`: item `i` sits under key `RLP(i)` and the value is the
//! item's EIP-2718 encoding, with no outer RLP wrapper for typed items.

use alloy_consensus::ReceiptEnvelope;
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{B256, Bytes};
use alloy_rlp::Encodable;
use alloy_trie::{EMPTY_ROOT_HASH, HashBuilder, Nibbles};

/// Computes the receipts root of an L1 block, blob receipts included.
#[must_use]
pub fn compute_receipt_root(receipts: &[ReceiptEnvelope]) -> B256 {
    ordered_root(receipts.iter().map(|receipt| {
        let mut value = Vec::with_capacity(receipt.encode_2718_len());
        receipt.encode_2718(&mut value);
        value
    }))
}

/// Computes the transactions root from already-encoded transactions.
#[must_use]
pub fn compute_tx_root(txs: &[Bytes]) -> B256 {
    ordered_root(txs.iter().map(|tx| tx.to_vec()))
}

fn ordered_root(values: impl ExactSizeIterator<Item = Vec<u8>>) -> B256 {
    if values.len() == 0 {
        return EMPTY_ROOT_HASH;
    }

    let mut pairs: Vec<(Vec<u8>, Vec<u8>)> =
        values.enumerate().map(|(i, value)| (encode_index(i), value)).collect();
    // RLP(0) is 0x80, which sorts after 1..=127.
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut builder = HashBuilder::default();
    for (key, value) in pairs {
        builder.add_leaf(Nibbles::unpack(&key), &value);
    }
    builder.root()
}

fn encode_index(index: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    index.encode(&mut buf);
    buf
}

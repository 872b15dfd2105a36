//! Execution witness types and decoding.
//!
//! The caller sends the witness as geth's `debug_executionWitness` shape: a header list with
//! the previous block first, and two maps of hex-encoded blobs. Map keys carry no meaning;
//! every blob is re-indexed by its own keccak256, so duplicates collapse and a key that
//! disagrees with its value cannot smuggle a node in under a false hash.

use std::collections::{BTreeMap, HashMap};

use alloy_consensus::Header;
use alloy_primitives::{B256, Bytes, keccak256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExecutorError, WitnessError};

/// Execution witness as received over RPC.
///
/// Accepts both the lowercase geth field names and Go's PascalCase encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionWitness {
    /// Block headers, the previous block header first.
    #[serde(alias = "Headers")]
    pub headers: Vec<Header>,

    /// Contract bytecode, hex-encoded.
    #[serde(alias = "Codes", default)]
    pub codes: BTreeMap<String, String>,

    /// Trie nodes, hex-encoded RLP.
    #[serde(alias = "State", default)]
    pub state: BTreeMap<String, String>,
}

/// A decoded witness, content-addressed by keccak256.
#[derive(Debug, Clone)]
pub struct WitnessSet {
    headers: Vec<Header>,
    headers_by_hash: HashMap<B256, usize>,
    codes: HashMap<B256, Bytes>,
    state: HashMap<B256, Bytes>,
}

impl WitnessSet {
    /// The header of the block preceding the one being executed.
    #[must_use]
    pub fn previous_header(&self) -> &Header {
        &self.headers[0]
    }

    /// All witness headers in the order supplied.
    #[must_use]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Looks up a header by hash, for `BLOCKHASH` support.
    #[must_use]
    pub fn header_by_hash(&self, hash: &B256) -> Option<&Header> {
        self.headers_by_hash.get(hash).map(|&i| &self.headers[i])
    }

    /// Bytecode whose keccak256 is `hash`.
    #[must_use]
    pub fn code(&self, hash: &B256) -> Option<&Bytes> {
        self.codes.get(hash)
    }

    /// Trie node whose keccak256 is `hash`.
    #[must_use]
    pub fn state_node(&self, hash: &B256) -> Option<&Bytes> {
        self.state.get(hash)
    }

    /// Like [`Self::code`], failing with [`ExecutorError::MissingCode`].
    pub fn require_code(&self, hash: &B256) -> Result<&Bytes, ExecutorError> {
        self.code(hash).ok_or(ExecutorError::MissingCode(*hash))
    }

    /// Like [`Self::state_node`], failing with [`ExecutorError::MissingStateNode`].
    pub fn require_state_node(&self, hash: &B256) -> Result<&Bytes, ExecutorError> {
        self.state_node(hash).ok_or(ExecutorError::MissingStateNode(*hash))
    }

    /// Number of distinct bytecode entries.
    #[must_use]
    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    /// Number of distinct trie nodes.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.state.len()
    }
}

/// Decodes a witness into a [`WitnessSet`].
///
/// # Errors
///
/// Returns [`WitnessError::MissingHeaders`] when there are no headers, and a prefix or hex
/// error for the first malformed code or state entry.
pub fn decode_witness(witness: &ExecutionWitness) -> Result<WitnessSet, WitnessError> {
    if witness.headers.is_empty() {
        return Err(WitnessError::MissingHeaders);
    }

    let codes = decode_section("codes", &witness.codes)?;
    let state = decode_section("state", &witness.state)?;

    let headers = witness.headers.clone();
    let headers_by_hash =
        headers.iter().enumerate().map(|(i, header)| (header.hash_slow(), i)).collect();

    debug!(
        headers = headers.len(),
        codes = codes.len(),
        state = state.len(),
        "decoded execution witness"
    );

    Ok(WitnessSet { headers, headers_by_hash, codes, state })
}

fn decode_section(
    section: &'static str,
    entries: &BTreeMap<String, String>,
) -> Result<HashMap<B256, Bytes>, WitnessError> {
    let mut out = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or_else(|| WitnessError::MissingPrefix { section, key: key.clone() })?;
        let bytes = hex::decode(digits).map_err(|e| WitnessError::InvalidHex {
            section,
            key: key.clone(),
            reason: e.to_string(),
        })?;
        out.insert(keccak256(&bytes), Bytes::from(bytes));
    }
    Ok(out)
}

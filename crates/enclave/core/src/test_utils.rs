//! Builders for internally consistent block inputs.

use alloy_consensus::{
    Eip658Value, Header, Receipt, ReceiptEnvelope, ReceiptWithBloom, SignableTransaction,
    TxEip1559, TxEnvelope,
};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, B256, Bloom, Bytes, Sealed, Signature, TxKind, U256, keccak256};
use alloy_trie::{HashBuilder, KECCAK_EMPTY, Nibbles, TrieAccount, proof::ProofRetainer};
use op_alloy_consensus::{OpTxEnvelope, TxDeposit};

use crate::{
    executor::{ECOTONE_SELECTOR, L2_TO_L1_MESSAGE_PASSER},
    trie::{compute_receipt_root, compute_tx_root},
    types::{
        account::AccountResult,
        config::{BlockId, Genesis, GenesisSystemConfig, PerChainConfig},
        request::StatelessRequest,
    },
    witness::ExecutionWitness,
};

/// A mainnet-shaped chain identity.
pub fn chain_config() -> PerChainConfig {
    PerChainConfig {
        chain_id: U256::from(8453),
        genesis: Genesis {
            l1: BlockId { hash: B256::repeat_byte(0x11), number: 17_481_768 },
            l2: BlockId { hash: B256::repeat_byte(0x22), number: 0 },
            l2_time: 1_686_789_347,
            system_config: GenesisSystemConfig {
                batcher_addr: Address::repeat_byte(0x33),
                scalar: B256::with_last_byte(0x01),
                ..Default::default()
            },
        },
        block_time: 2,
        deposit_contract_address: Address::repeat_byte(0x44),
        l1_system_config_address: Address::repeat_byte(0x55),
        rollup_cfg: None,
    }
}

/// Builds a one-entry trie keyed by `hashed_key` and returns its root and the proof for it.
pub fn single_leaf_trie(hashed_key: B256, value: &[u8]) -> (B256, Vec<Bytes>) {
    let path = Nibbles::unpack(hashed_key);
    let mut builder =
        HashBuilder::default().with_proof_retainer(ProofRetainer::new(vec![path.clone()]));
    builder.add_leaf(path, value);
    let root = builder.root();
    let proof = builder
        .take_proof_nodes()
        .into_nodes_sorted()
        .into_iter()
        .map(|(_, node)| node)
        .collect();
    (root, proof)
}

/// An account with no storage proofs, proven in a state trie of its own.
pub fn proven_account(address: Address, storage_hash: B256) -> (B256, AccountResult) {
    let encoded = alloy_rlp::encode(TrieAccount {
        nonce: 0,
        balance: U256::ZERO,
        storage_root: storage_hash,
        code_hash: KECCAK_EMPTY,
    });
    let (state_root, account_proof) = single_leaf_trie(keccak256(address), &encoded);
    let account = AccountResult {
        address,
        account_proof,
        balance: U256::ZERO,
        code_hash: KECCAK_EMPTY,
        nonce: U256::ZERO,
        storage_hash,
        storage_proof: Vec::new(),
    };
    (state_root, account)
}

/// Ecotone `setL1BlockValuesEcotone` calldata naming L1 block `number` with `hash`.
pub fn l1_info_calldata(number: u64, hash: B256, sequence_number: u64) -> Bytes {
    let mut calldata = Vec::with_capacity(164);
    calldata.extend_from_slice(&ECOTONE_SELECTOR);
    calldata.extend_from_slice(&1_368u32.to_be_bytes());
    calldata.extend_from_slice(&810_949u32.to_be_bytes());
    calldata.extend_from_slice(&sequence_number.to_be_bytes());
    calldata.extend_from_slice(&0u64.to_be_bytes());
    calldata.extend_from_slice(&number.to_be_bytes());
    calldata.extend_from_slice(&U256::from(7).to_be_bytes::<32>());
    calldata.extend_from_slice(&U256::from(1).to_be_bytes::<32>());
    calldata.extend_from_slice(hash.as_slice());
    calldata.extend_from_slice(B256::left_padding_from(&[0x33; 20]).as_slice());
    calldata.into()
}

/// An encoded L1 attributes deposit for the `sequence_number`th block of `l1_origin`'s epoch.
pub fn l1_info_deposit(l1_origin: &Header, sequence_number: u64) -> Bytes {
    let hash = l1_origin.hash_slow();
    let source_hash = keccak256([hash.as_slice(), &sequence_number.to_be_bytes()].concat());
    deposit_with_input(source_hash, l1_info_calldata(l1_origin.number, hash, sequence_number))
}

/// An encoded L1 attributes deposit naming an arbitrary L1 block derived from `seed`.
pub fn deposit_tx(seed: u8) -> Bytes {
    deposit_with_input(
        B256::repeat_byte(seed),
        l1_info_calldata(u64::from(seed), B256::repeat_byte(seed), 0),
    )
}

/// An encoded system deposit carrying `input` as calldata.
pub fn deposit_with_input(source_hash: B256, input: Bytes) -> Bytes {
    let tx = TxDeposit {
        source_hash,
        from: Address::repeat_byte(0xde),
        to: TxKind::Call(Address::repeat_byte(0x15)),
        gas_limit: 1_000_000,
        is_system_transaction: false,
        input,
        ..Default::default()
    };
    OpTxEnvelope::Deposit(Sealed::new(tx)).encoded_2718().into()
}

/// An encoded EIP-1559 user transaction.
pub fn user_tx(nonce: u64) -> Bytes {
    let tx = TxEip1559 {
        chain_id: 8453,
        nonce,
        gas_limit: 21_000,
        max_fee_per_gas: 1_000_000_000,
        max_priority_fee_per_gas: 1_000,
        to: TxKind::Call(Address::repeat_byte(0x77)),
        value: U256::from(1),
        ..Default::default()
    };
    let signature = Signature::new(U256::from(1), U256::from(1), false);
    TxEnvelope::Eip1559(tx.into_signed(signature)).encoded_2718().into()
}

/// A receipt as found in an L1 block.
pub fn l1_receipt(cumulative_gas_used: u64) -> ReceiptEnvelope {
    let receipt = Receipt { status: Eip658Value::Eip658(true), cumulative_gas_used, logs: vec![] };
    ReceiptEnvelope::Eip1559(ReceiptWithBloom { receipt, logs_bloom: Bloom::default() })
}

/// Produces a run of consecutive blocks whose inputs pass every boundary check.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    config: PerChainConfig,
    parent: Header,
    parent_txs: Vec<Bytes>,
    parent_storage_hash: B256,
    l1_origin: Header,
    l1_receipts: Vec<ReceiptEnvelope>,
    sequence_number: u64,
}

impl ChainBuilder {
    /// Starts a chain on top of a block holding only its L1 info deposit.
    pub fn new(config: PerChainConfig) -> Self {
        let l1_receipts = vec![l1_receipt(21_000), l1_receipt(42_000)];
        let l1_origin = Header {
            number: 20_000_000,
            timestamp: 1_699_999_990,
            gas_limit: 30_000_000,
            receipts_root: compute_receipt_root(&l1_receipts),
            ..Default::default()
        };
        let parent_txs = vec![l1_info_deposit(&l1_origin, 0)];
        let parent = Header {
            number: 10,
            timestamp: 1_700_000_000,
            gas_limit: 30_000_000,
            transactions_root: compute_tx_root(&parent_txs),
            ..Default::default()
        };
        Self {
            config,
            parent_storage_hash: Self::storage_hash(parent.number),
            parent,
            parent_txs,
            l1_origin,
            l1_receipts,
            sequence_number: 0,
        }
    }

    /// The chain configuration every block is built for.
    pub const fn config(&self) -> &PerChainConfig {
        &self.config
    }

    /// Header of the most recently built block.
    pub const fn head(&self) -> &Header {
        &self.parent
    }

    /// Message-passer storage hash of the most recently built block.
    pub const fn head_storage_hash(&self) -> B256 {
        self.parent_storage_hash
    }

    /// The L1 origin all blocks reference.
    pub const fn l1_origin(&self) -> &Header {
        &self.l1_origin
    }

    /// Builds the next block carrying `user_txs` sequenced transactions.
    pub fn next_block(&mut self, user_txs: u64) -> StatelessRequest {
        let number = self.parent.number + 1;
        let sequenced_txs: Vec<Bytes> = (0..user_txs).map(|n| user_tx(number * 100 + n)).collect();

        self.sequence_number += 1;
        let mut block_txs = vec![l1_info_deposit(&self.l1_origin, self.sequence_number)];
        block_txs.extend(sequenced_txs.iter().cloned());

        let storage_hash = Self::storage_hash(number);
        let (state_root, message_account) = proven_account(L2_TO_L1_MESSAGE_PASSER, storage_hash);

        let block_header = Header {
            parent_hash: self.parent.hash_slow(),
            number,
            timestamp: self.parent.timestamp + 2,
            gas_limit: 30_000_000,
            state_root,
            transactions_root: compute_tx_root(&block_txs),
            ..Default::default()
        };

        let request = StatelessRequest {
            config: self.config.clone(),
            chain_params: serde_json::json!({ "chainId": 8453 }),
            l1_origin: self.l1_origin.clone(),
            l1_receipts: self.l1_receipts.clone(),
            previous_block_txs: self.parent_txs.clone(),
            block_header: block_header.clone(),
            sequenced_txs,
            witness: ExecutionWitness {
                headers: vec![self.parent.clone()],
                codes: Default::default(),
                state: [("0x00".to_string(), "0xc0".to_string())].into_iter().collect(),
            },
            message_account,
            prev_message_account_hash: self.parent_storage_hash,
        };

        self.parent = block_header;
        self.parent_txs = block_txs;
        self.parent_storage_hash = storage_hash;
        request
    }

    fn storage_hash(number: u64) -> B256 {
        keccak256(number.to_be_bytes())
    }
}

//! Checks on the block boundary that need no EVM.

use std::sync::Arc;

use alloy_eips::eip2718::Decodable2718;
use op_alloy_consensus::OpTxEnvelope;
use tracing::{debug, warn};

use super::{
    L2_TO_L1_MESSAGE_PASSER, MAX_SEQUENCER_DRIFT_FJORD, StatelessExecutor, StatelessInput,
    l1_info::decode_l1_info,
};
use crate::{
    error::ExecutorError,
    trie::{compute_receipt_root, compute_tx_root},
};

/// Validates everything about a block that can be checked without executing it, then
/// delegates to an inner engine if one is linked.
///
/// Checks, in order:
///
/// 1. L1 receipts hash to the L1 origin's receipts root
/// 2. The block's parent is the witness's previous header
/// 3. Sequenced transactions are only allowed within the sequencer drift
/// 4. Previous block transactions hash to its transactions root
/// 5. The previous block opens with the L1 info deposit, and the L1 origin it names is
///    either the supplied L1 origin or that origin's parent
/// 6. No sequenced transaction is a deposit
/// 7. The message account proof is for the message passer and verifies against the
///    block's state root
///
/// Without an engine the post-state root is unverified, so every block is refused with
/// [`ExecutorError::NoEngine`] unless the checks were built with [`Self::boundary_only`].
#[derive(Debug, Clone, Default)]
pub struct BoundaryChecks {
    engine: Option<Arc<dyn StatelessExecutor>>,
    accept_without_engine: bool,
}

impl BoundaryChecks {
    /// Boundary checks with no engine linked. Refuses every block that passes them.
    #[must_use]
    pub const fn new() -> Self {
        Self { engine: None, accept_without_engine: false }
    }

    /// Boundary checks followed by `engine`.
    #[must_use]
    pub fn with_engine(engine: Arc<dyn StatelessExecutor>) -> Self {
        Self { engine: Some(engine), accept_without_engine: false }
    }

    /// Boundary checks that accept a block without running any engine.
    ///
    /// The block's state root is taken on trust. Only for local development.
    #[must_use]
    pub const fn boundary_only() -> Self {
        Self { engine: None, accept_without_engine: true }
    }

    /// Whether a state-transition engine runs after the boundary checks.
    #[must_use]
    pub const fn has_engine(&self) -> bool {
        self.engine.is_some()
    }
}

impl StatelessExecutor for BoundaryChecks {
    fn execute(&self, input: &StatelessInput<'_>) -> Result<(), ExecutorError> {
        let computed = compute_receipt_root(input.l1_receipts);
        if computed != input.l1_origin.receipts_root {
            return Err(ExecutorError::InvalidReceipts {
                expected: input.l1_origin.receipts_root,
                computed,
            });
        }

        let previous_header = input.witness.previous_header();
        let previous_hash = previous_header.hash_slow();
        if input.block_header.parent_hash != previous_hash {
            return Err(ExecutorError::InvalidParentHash {
                expected: input.block_header.parent_hash,
                actual: previous_hash,
            });
        }

        if !validate_sequencer_drift(
            input.block_header.timestamp,
            input.l1_origin.timestamp,
            !input.sequenced_txs.is_empty(),
        ) {
            return Err(ExecutorError::L1OriginTooOld {
                block_timestamp: input.block_header.timestamp,
                l1_timestamp: input.l1_origin.timestamp,
            });
        }

        let computed = compute_tx_root(input.previous_block_txs);
        if computed != previous_header.transactions_root {
            return Err(ExecutorError::InvalidTxHash {
                expected: previous_header.transactions_root,
                computed,
            });
        }

        let first = input.previous_block_txs.first().ok_or(ExecutorError::MissingL1InfoDeposit)?;
        let OpTxEnvelope::Deposit(deposit) = decode_tx(0, first)? else {
            return Err(ExecutorError::MissingL1InfoDeposit);
        };
        let parent_origin = decode_l1_info(&deposit.inner().input)?;
        let l1_origin_hash = input.l1_origin.hash_slow();
        if parent_origin.hash != l1_origin_hash && parent_origin.hash != input.l1_origin.parent_hash
        {
            return Err(ExecutorError::InvalidL1Origin {
                parent_origin: parent_origin.hash,
                l1_origin: l1_origin_hash,
            });
        }

        for (index, tx) in input.sequenced_txs.iter().enumerate() {
            if decode_tx(index, tx)?.is_deposit() {
                return Err(ExecutorError::SequencedTxCannotBeDeposit { index });
            }
        }

        if input.message_account.address != L2_TO_L1_MESSAGE_PASSER {
            return Err(ExecutorError::InvalidMessageAccountAddress(input.message_account.address));
        }
        input.message_account.verify(input.block_header.state_root)?;

        debug!(
            block = input.block_header.number,
            sequenced = input.sequenced_txs.len(),
            "boundary checks passed"
        );

        match &self.engine {
            Some(engine) => engine.execute(input),
            None if self.accept_without_engine => {
                warn!(
                    block = input.block_header.number,
                    "accepting block without a state-transition engine"
                );
                Ok(())
            }
            None => Err(ExecutorError::NoEngine),
        }
    }
}

/// Whether a block may carry sequenced transactions given its L1 origin.
#[must_use]
pub const fn validate_sequencer_drift(
    block_timestamp: u64,
    l1_origin_timestamp: u64,
    has_sequenced_txs: bool,
) -> bool {
    !has_sequenced_txs
        || block_timestamp <= l1_origin_timestamp.saturating_add(MAX_SEQUENCER_DRIFT_FJORD)
}

fn decode_tx(index: usize, raw: &[u8]) -> Result<OpTxEnvelope, ExecutorError> {
    OpTxEnvelope::decode_2718(&mut &raw[..])
        .map_err(|e| ExecutorError::TxDecodeFailed { index, reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy_consensus::Header;
    use alloy_primitives::{Address, B256, Bytes};
    use rstest::rstest;

    use super::*;
    use crate::{
        decode_witness,
        test_utils::{
            ChainBuilder, chain_config, deposit_tx, deposit_with_input, proven_account, user_tx,
        },
        types::request::StatelessRequest,
    };

    fn request(user_txs: u64) -> StatelessRequest {
        ChainBuilder::new(chain_config()).next_block(user_txs)
    }

    fn run(checks: &BoundaryChecks, request: &StatelessRequest) -> Result<(), ExecutorError> {
        let witness = decode_witness(&request.witness).unwrap();
        checks.execute(&request.input(&witness))
    }

    #[derive(Debug, Default)]
    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl StatelessExecutor for CountingEngine {
        fn execute(&self, _input: &StatelessInput<'_>) -> Result<(), ExecutorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ExecutorError::Engine("state root mismatch".to_string()))
        }
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    fn consistent_block_passes(#[case] user_txs: u64) {
        run(&BoundaryChecks::boundary_only(), &request(user_txs)).unwrap();
    }

    #[test]
    fn refuses_fabricated_state_without_engine() {
        let checks = BoundaryChecks::new();
        assert!(!checks.has_engine());

        let mut req = request(2);
        let (state_root, account) =
            proven_account(L2_TO_L1_MESSAGE_PASSER, B256::repeat_byte(0xee));
        req.block_header.state_root = state_root;
        req.message_account = account;
        req.witness.state.clear();
        assert_eq!(run(&checks, &req), Err(ExecutorError::NoEngine));
        assert_eq!(run(&BoundaryChecks::default(), &req), Err(ExecutorError::NoEngine));
    }

    #[test]
    fn engine_runs_after_checks() {
        let engine = Arc::new(CountingEngine::default());
        let checks = BoundaryChecks::with_engine(engine.clone());
        assert!(checks.has_engine());

        let err = run(&checks, &request(1)).unwrap_err();
        assert_eq!(err, ExecutorError::Engine("state root mismatch".to_string()));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn engine_skipped_when_checks_fail() {
        let engine = Arc::new(CountingEngine::default());
        let checks = BoundaryChecks::with_engine(engine.clone());

        let mut req = request(1);
        req.l1_receipts.pop();
        assert!(matches!(run(&checks, &req), Err(ExecutorError::InvalidReceipts { .. })));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejects_wrong_parent() {
        let mut req = request(1);
        req.block_header.parent_hash = B256::repeat_byte(0xaa);
        assert!(matches!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::InvalidParentHash { .. })
        ));
    }

    #[test]
    fn rejects_drift_with_sequenced_txs() {
        let mut req = request(1);
        req.block_header.timestamp = req.l1_origin.timestamp + MAX_SEQUENCER_DRIFT_FJORD + 1;
        assert!(matches!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::L1OriginTooOld { .. })
        ));
    }

    #[test]
    fn drift_allowed_for_deposit_only_block() {
        let mut req = request(0);
        req.block_header.timestamp = req.l1_origin.timestamp + MAX_SEQUENCER_DRIFT_FJORD + 1;
        run(&BoundaryChecks::boundary_only(), &req).unwrap();
    }

    #[test]
    fn rejects_tampered_previous_txs() {
        let mut req = request(1);
        req.previous_block_txs.push(user_tx(1));
        assert!(matches!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::InvalidTxHash { .. })
        ));
    }

    #[test]
    fn rejects_previous_block_without_deposit() {
        let mut req = request(1);
        let txs = vec![user_tx(1)];
        req.witness.headers[0].transactions_root = crate::compute_tx_root(&txs);
        req.block_header.parent_hash = req.witness.headers[0].hash_slow();
        req.previous_block_txs = txs;
        assert_eq!(run(&BoundaryChecks::boundary_only(), &req), Err(ExecutorError::MissingL1InfoDeposit));
    }

    #[test]
    fn rejects_empty_previous_block() {
        let mut req = request(1);
        req.witness.headers[0].transactions_root = crate::compute_tx_root(&[]);
        req.block_header.parent_hash = req.witness.headers[0].hash_slow();
        req.previous_block_txs.clear();
        assert_eq!(run(&BoundaryChecks::boundary_only(), &req), Err(ExecutorError::MissingL1InfoDeposit));
    }

    #[test]
    fn accepts_next_l1_origin() {
        let mut req = request(1);
        let next = Header {
            parent_hash: req.l1_origin.hash_slow(),
            number: req.l1_origin.number + 1,
            timestamp: req.l1_origin.timestamp + 12,
            ..req.l1_origin.clone()
        };
        req.l1_origin = next;
        run(&BoundaryChecks::boundary_only(), &req).unwrap();
    }

    #[test]
    fn rejects_unrelated_l1_origin() {
        let mut req = request(0);
        let parent_origin = req.l1_origin.hash_slow();
        req.l1_origin = Header {
            number: 1,
            parent_hash: B256::repeat_byte(0xab),
            receipts_root: req.l1_origin.receipts_root,
            ..Default::default()
        };
        assert_eq!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::InvalidL1Origin {
                parent_origin,
                l1_origin: req.l1_origin.hash_slow(),
            })
        );
    }

    #[test]
    fn rejects_malformed_l1_info_deposit() {
        let mut req = request(1);
        let txs = vec![deposit_with_input(B256::ZERO, Bytes::from_static(&[0x44, 0x0a, 0x5e, 0x20]))];
        req.witness.headers[0].transactions_root = crate::compute_tx_root(&txs);
        req.block_header.parent_hash = req.witness.headers[0].hash_slow();
        req.previous_block_txs = txs;
        assert!(matches!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::InvalidL1Info(_))
        ));
    }

    #[test]
    fn rejects_sequenced_deposit() {
        let mut req = request(2);
        req.sequenced_txs.push(deposit_tx(9));
        assert_eq!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::SequencedTxCannotBeDeposit { index: 2 })
        );
    }

    #[test]
    fn rejects_undecodable_sequenced_tx() {
        let mut req = request(0);
        req.sequenced_txs.push(Bytes::from_static(&[0x7f, 0x01]));
        assert!(matches!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::TxDecodeFailed { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_wrong_message_account() {
        let mut req = request(1);
        let other = Address::repeat_byte(0x99);
        let (state_root, account) = proven_account(other, B256::ZERO);
        req.block_header.state_root = state_root;
        req.message_account = account;
        assert_eq!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::InvalidMessageAccountAddress(other))
        );
    }

    #[test]
    fn rejects_unproven_message_account() {
        let mut req = request(1);
        req.block_header.state_root = B256::repeat_byte(0x42);
        assert!(matches!(
            run(&BoundaryChecks::boundary_only(), &req),
            Err(ExecutorError::MessageAccount(_))
        ));
    }

    #[rstest]
    #[case(10_000, 1_000, false, true)]
    #[case(2_800, 1_000, true, true)]
    #[case(2_801, 1_000, true, false)]
    #[case(u64::MAX, u64::MAX, true, true)]
    fn sequencer_drift(
        #[case] block: u64,
        #[case] origin: u64,
        #[case] has_txs: bool,
        #[case] ok: bool,
    ) {
        assert_eq!(validate_sequencer_drift(block, origin, has_txs), ok);
    }
}

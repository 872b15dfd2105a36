//! Chain identity and its binary commitment.
//!
//! `PerChainConfig` is hashed into every signed message, so its binary encoding is frozen:
//! a version tag followed by every identifying field at fixed width, big-endian. Fields that
//! are not part of the encoding (`block_time`, block numbers, `overhead`, the full rollup
//! config) never influence the hash.

use alloy_primitives::{Address, B256, U256, keccak256};
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, serde_utils::u256_number};

/// Version tag written at the start of the binary encoding.
const VERSION_0: u64 = 0;

/// Size of [`PerChainConfig::marshal_binary`] output in bytes.
pub const MARSHAL_BINARY_SIZE: usize = 212;

/// A block identified by hash and number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockId {
    /// Block hash.
    pub hash: B256,
    /// Block number.
    pub number: u64,
}

/// System configuration in effect at genesis.
///
/// Keys follow the rollup node's camelCase form; snake_case is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisSystemConfig {
    /// Batch submitter address.
    #[serde(alias = "batcher_addr")]
    pub batcher_addr: Address,
    /// Legacy L1 fee overhead, always zero in the committed form.
    #[serde(default)]
    pub overhead: B256,
    /// L1 fee scalar.
    pub scalar: B256,
    /// L2 block gas limit.
    #[serde(alias = "gas_limit")]
    pub gas_limit: u64,
}

impl Default for GenesisSystemConfig {
    fn default() -> Self {
        Self {
            batcher_addr: Address::ZERO,
            overhead: B256::ZERO,
            scalar: B256::ZERO,
            gas_limit: 30_000_000,
        }
    }
}

/// Rollup genesis anchors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// L1 block the rollup starts from.
    pub l1: BlockId,
    /// L2 genesis block.
    pub l2: BlockId,
    /// L2 genesis timestamp.
    #[serde(default)]
    pub l2_time: u64,
    /// System configuration at genesis.
    pub system_config: GenesisSystemConfig,
}

/// Immutable identity of one rollup chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerChainConfig {
    /// L2 chain id.
    #[serde(with = "u256_number")]
    pub chain_id: U256,
    /// Genesis anchors.
    pub genesis: Genesis,
    /// L2 block time in seconds. Not committed.
    #[serde(default)]
    pub block_time: u64,
    /// L1 deposit contract (`OptimismPortal`).
    pub deposit_contract_address: Address,
    /// L1 `SystemConfig` contract.
    pub l1_system_config_address: Address,
    /// The full rollup configuration, handed to the execution engine. Not committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup_cfg: Option<serde_json::Value>,
}

impl Default for PerChainConfig {
    fn default() -> Self {
        Self {
            chain_id: U256::from(1),
            genesis: Genesis::default(),
            block_time: 2,
            deposit_contract_address: Address::ZERO,
            l1_system_config_address: Address::ZERO,
            rollup_cfg: None,
        }
    }
}

/// The subset of a rollup node config document that identifies the chain.
#[derive(Deserialize)]
struct RollupIdentity {
    #[serde(with = "u256_number")]
    l2_chain_id: U256,
    genesis: Genesis,
    #[serde(default)]
    block_time: u64,
    deposit_contract_address: Address,
    l1_system_config_address: Address,
}

impl PerChainConfig {
    /// Builds the chain identity from a rollup node configuration document, keeping the
    /// whole document as [`rollup_cfg`](Self::rollup_cfg).
    pub fn from_rollup_config(rollup_cfg: serde_json::Value) -> Result<Self, ConfigError> {
        let identity = RollupIdentity::deserialize(&rollup_cfg)
            .map_err(|e| ConfigError::InvalidRollupConfig(e.to_string()))?;
        Ok(Self {
            chain_id: identity.l2_chain_id,
            genesis: identity.genesis,
            block_time: identity.block_time,
            deposit_contract_address: identity.deposit_contract_address,
            l1_system_config_address: identity.l1_system_config_address,
            rollup_cfg: Some(rollup_cfg),
        })
    }

    /// Fixed-width binary encoding.
    ///
    /// ```text
    /// Offset | Size | Field
    /// -------|------|------------------------------------
    /// 0      | 8    | version (0)
    /// 8      | 32   | chain_id, left-padded
    /// 40     | 32   | genesis.l1.hash
    /// 72     | 32   | genesis.l2.hash
    /// 104    | 8    | genesis.l2_time
    /// 112    | 20   | genesis.system_config.batcher_addr
    /// 132    | 32   | genesis.system_config.scalar
    /// 164    | 8    | genesis.system_config.gas_limit
    /// 172    | 20   | deposit_contract_address
    /// 192    | 20   | l1_system_config_address
    /// ```
    #[must_use]
    pub fn marshal_binary(&self) -> Vec<u8> {
        let system_config = &self.genesis.system_config;
        let mut data = Vec::with_capacity(MARSHAL_BINARY_SIZE);
        data.extend_from_slice(&VERSION_0.to_be_bytes());
        data.extend_from_slice(&self.chain_id.to_be_bytes::<32>());
        data.extend_from_slice(self.genesis.l1.hash.as_slice());
        data.extend_from_slice(self.genesis.l2.hash.as_slice());
        data.extend_from_slice(&self.genesis.l2_time.to_be_bytes());
        data.extend_from_slice(system_config.batcher_addr.as_slice());
        data.extend_from_slice(system_config.scalar.as_slice());
        data.extend_from_slice(&system_config.gas_limit.to_be_bytes());
        data.extend_from_slice(self.deposit_contract_address.as_slice());
        data.extend_from_slice(self.l1_system_config_address.as_slice());
        debug_assert_eq!(data.len(), MARSHAL_BINARY_SIZE);
        data
    }

    /// `keccak256` of [`marshal_binary`](Self::marshal_binary); domain-separates every
    /// proposal signature.
    #[must_use]
    pub fn hash(&self) -> B256 {
        keccak256(self.marshal_binary())
    }

    /// Pins the uncommitted fields to their canonical values.
    pub const fn force_defaults(&mut self) {
        self.block_time = 1;
        self.genesis.l2.number = 0;
        self.genesis.system_config.overhead = B256::ZERO;
    }
}

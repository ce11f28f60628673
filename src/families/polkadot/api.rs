//! Polkadot Network Collaborator
//!
//! The node/indexer client is supplied by the host. This module only fixes
//! its interface and the raw record shapes it returns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::preload::{StakingProgress, ValidatorInfo};
use crate::error::HawalaResult;

/// Chain parameters needed to build a signing payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub spec_version: u32,
    pub transaction_version: u32,
    #[serde(with = "crate::serde_utils::hex32")]
    pub genesis_hash: [u8; 32],
    /// Latest finalized block, the mortality checkpoint
    #[serde(with = "crate::serde_utils::hex32")]
    pub block_hash: [u8; 32],
    pub block_number: u64,
}

/// One unlocking chunk of a staking ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUnlocking {
    #[serde(with = "crate::serde_utils::u128_string")]
    pub value: u128,
    /// Era at which the chunk becomes withdrawable
    pub era: u32,
}

/// Staking ledger of a stash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStakingLedger {
    pub stash: String,
    pub controller: String,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub total: u128,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub active: u128,
    pub unlocking: Vec<RawUnlocking>,
    pub num_slashing_spans: u32,
}

/// Balances, nonce and staking state of one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccountState {
    #[serde(with = "crate::serde_utils::u128_string")]
    pub free: u128,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub reserved: u128,
    /// Balance that cannot be spent (staking locks, vesting)
    #[serde(with = "crate::serde_utils::u128_string")]
    pub frozen: u128,
    pub nonce: u64,
    pub block_height: u64,
    pub active_era: u32,
    pub staking: Option<RawStakingLedger>,
    /// Validators nominated by the stash
    pub nominations: Vec<String>,
}

/// An indexed extrinsic touching the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtrinsic {
    pub hash: String,
    pub block_height: u64,
    pub block_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub signer: String,
    pub pallet: String,
    pub method: String,
    pub nonce: Option<u64>,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub fee: u128,
    pub success: bool,
    /// Transfer destination, for balance transfers
    pub recipient: Option<String>,
    /// Transferred or staked value
    #[serde(with = "crate::serde_utils::u128_string", default)]
    pub value: u128,
    #[serde(default)]
    pub validators: Vec<String>,
    pub era: Option<u32>,
}

/// A staking reward paid or a slash applied to the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStakingEvent {
    /// Hash of the extrinsic or block that emitted the event
    pub hash: String,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub value: u128,
    pub validator_stash: Option<String>,
    pub era: Option<u32>,
}

/// Any record the indexer returns for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawRecord {
    Extrinsic(RawExtrinsic),
    Reward(RawStakingEvent),
    Slash(RawStakingEvent),
}


/// Node and indexer access for one Polkadot-style network
#[async_trait]
pub trait PolkadotApi: Send + Sync {
    async fn account_state(&self, address: &str) -> HawalaResult<RawAccountState>;

    /// Page of records at or above `start_at`, newest first
    async fn records(&self, address: &str, start_at: u64, page: u32, limit: usize) -> HawalaResult<Vec<RawRecord>>;

    async fn network_info(&self) -> HawalaResult<NetworkInfo>;

    /// Partial fee of a signed extrinsic
    async fn estimate_fee(&self, signed_extrinsic: &[u8]) -> HawalaResult<u128>;

    /// Submit a signed extrinsic, returning its network hash
    async fn submit(&self, signed_extrinsic: &[u8]) -> HawalaResult<String>;

    /// Whether `address` holds no balance yet
    async fn is_new_account(&self, address: &str) -> HawalaResult<bool>;

    async fn validators(&self) -> HawalaResult<Vec<ValidatorInfo>>;

    async fn staking_progress(&self) -> HawalaResult<StakingProgress>;
}

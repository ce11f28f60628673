//! Polkadot Family
//!
//! Transfers and nominated staking on Polkadot-style chains:
//! - SS58 addresses and extrinsic encoding
//! - Draft transactions, validation and fee estimation
//! - Mapping of indexer records into operations
//! - Chain-wide staking preload (validators, era progress)

pub mod address;
pub mod api;
pub mod bridge;
pub mod currency;
pub mod extrinsic;
pub mod fees;
pub mod mapping;
pub mod preload;
pub mod status;
pub mod sync;
pub mod transaction;


pub use address::{is_valid_address, public_key_of, Ss58Address};
pub use api::{
    NetworkInfo, PolkadotApi, RawAccountState, RawExtrinsic, RawRecord, RawStakingEvent, RawStakingLedger, RawUnlocking,
};
pub use bridge::PolkadotBridge;
pub use currency::{currency_by_id, PolkadotCurrency, KUSAMA, POLKADOT};
pub use extrinsic::RewardDestination;
pub use preload::{PolkadotPreloadData, PolkadotPreloadSource, StakingProgress, ValidatorInfo};
pub use sync::PolkadotShapeSource;
pub use transaction::{PolkadotMode, PolkadotTransaction, PolkadotTransactionPatch};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Account Resources
// =============================================================================

/// Funds scheduled to unlock at the end of the bonding duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unlocking {
    #[serde(with = "crate::serde_utils::u128_string")]
    pub amount: u128,
    pub completion_date: DateTime<Utc>,
}

/// A validator this account nominates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nomination {
    pub address: String,
    /// Stake backing the validator from this account in the active era
    #[serde(with = "crate::serde_utils::u128_string", default)]
    pub value: u128,
    /// `active`, `inactive` or `waiting`
    #[serde(default)]
    pub status: Option<String>,
}

/// Staking and nonce state of a Polkadot account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolkadotResources {
    pub controller: Option<String>,
    pub stash: Option<String>,
    pub nonce: u64,
    /// Total bonded, including unlocking funds
    #[serde(with = "crate::serde_utils::u128_string")]
    pub locked_balance: u128,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub unlocking_balance: u128,
    /// Unlocking funds whose bonding period is over
    #[serde(with = "crate::serde_utils::u128_string")]
    pub unlocked_balance: u128,
    pub unlockings: Vec<Unlocking>,
    pub nominations: Vec<Nomination>,
    pub num_slashing_spans: u32,
}

impl PolkadotResources {
    /// Bonded funds still earning rewards
    pub fn active_bonded(&self) -> u128 {
        self.locked_balance.saturating_sub(self.unlocking_balance)
    }

    pub fn is_stash(&self, address: &str) -> bool {
        self.stash.as_deref() == Some(address)
    }

    pub fn is_controller(&self, address: &str) -> bool {
        self.controller.as_deref() == Some(address)
    }

    pub fn has_nominations(&self) -> bool {
        !self.nominations.is_empty()
    }
}

// =============================================================================
// Operation Extra
// =============================================================================

/// Polkadot metadata attached to operations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolkadotOperationExtra {
    /// `pallet.method` of the originating extrinsic
    pub pallet_method: Option<String>,
    /// Transferred, bonded or unbonded amount
    #[serde(with = "crate::serde_utils::u128_string")]
    pub amount: u128,
    pub validators: Vec<String>,
    pub validator_stash: Option<String>,
    pub era: Option<u32>,
}

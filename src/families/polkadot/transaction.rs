//! Polkadot Draft Transactions
//!
//! A draft is a plain value. Updates go through
//! [`PolkadotTransaction::apply`], which returns a new draft and never
//! validates; validation belongs to the status computation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::extrinsic::RewardDestination;
use crate::types::{Family, OperationType};

/// What the extrinsic does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolkadotMode {
    #[default]
    Send,
    Bond,
    Unbond,
    Rebond,
    WithdrawUnbonded,
    Nominate,
    Chill,
    SetController,
    ClaimReward,
}

impl PolkadotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolkadotMode::Send => "send",
            PolkadotMode::Bond => "bond",
            PolkadotMode::Unbond => "unbond",
            PolkadotMode::Rebond => "rebond",
            PolkadotMode::WithdrawUnbonded => "withdrawUnbonded",
            PolkadotMode::Nominate => "nominate",
            PolkadotMode::Chill => "chill",
            PolkadotMode::SetController => "setController",
            PolkadotMode::ClaimReward => "claimReward",
        }
    }

    /// Type of the optimistic operation produced by this mode
    pub fn operation_type(&self) -> OperationType {
        match self {
            PolkadotMode::Send => OperationType::Out,
            PolkadotMode::Bond => OperationType::Bond,
            PolkadotMode::Unbond => OperationType::Unbond,
            PolkadotMode::Rebond => OperationType::Rebond,
            PolkadotMode::WithdrawUnbonded => OperationType::WithdrawUnbonded,
            PolkadotMode::Nominate => OperationType::Nominate,
            PolkadotMode::Chill => OperationType::Chill,
            PolkadotMode::SetController => OperationType::SetController,
            PolkadotMode::ClaimReward => OperationType::Fees,
        }
    }

    /// Staking modes locked out while the validator election runs
    pub fn blocked_by_election(&self) -> bool {
        !matches!(self, PolkadotMode::Send | PolkadotMode::ClaimReward)
    }

    /// Whether the user supplies an amount
    pub fn takes_amount(&self) -> bool {
        matches!(
            self,
            PolkadotMode::Send | PolkadotMode::Bond | PolkadotMode::Unbond | PolkadotMode::Rebond
        )
    }
}

impl fmt::Display for PolkadotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Draft of a Polkadot extrinsic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolkadotTransaction {
    pub family: Family,
    pub mode: PolkadotMode,
    pub recipient: String,
    #[serde(with = "crate::serde_utils::u128_string")]
    pub amount: u128,
    pub use_all_amount: bool,
    /// Unknown until prepared
    pub fees: Option<u128>,
    pub validators: Vec<String>,
    /// Era to claim rewards for
    pub era: Option<u32>,
    pub reward_destination: Option<RewardDestination>,
}

impl Default for PolkadotTransaction {
    fn default() -> Self {
        Self {
            family: Family::Polkadot,
            mode: PolkadotMode::Send,
            recipient: String::new(),
            amount: 0,
            use_all_amount: false,
            fees: None,
            validators: Vec::new(),
            era: None,
            reward_destination: None,
        }
    }
}

/// Partial update of a [`PolkadotTransaction`]; `None` leaves a field as is
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolkadotTransactionPatch {
    pub mode: Option<PolkadotMode>,
    pub recipient: Option<String>,
    pub amount: Option<u128>,
    pub use_all_amount: Option<bool>,
    pub fees: Option<u128>,
    pub validators: Option<Vec<String>>,
    pub era: Option<u32>,
    pub reward_destination: Option<RewardDestination>,
}

impl PolkadotTransaction {
    /// New draft with `patch` applied
    pub fn apply(&self, patch: PolkadotTransactionPatch) -> Self {
        let mut next = self.clone();
        if let Some(mode) = patch.mode {
            next.mode = mode;
        }
        if let Some(recipient) = patch.recipient {
            next.recipient = recipient;
        }
        if let Some(amount) = patch.amount {
            next.amount = amount;
        }
        if let Some(use_all_amount) = patch.use_all_amount {
            next.use_all_amount = use_all_amount;
        }
        if let Some(fees) = patch.fees {
            next.fees = Some(fees);
        }
        if let Some(validators) = patch.validators {
            next.validators = validators;
        }
        if let Some(era) = patch.era {
            next.era = Some(era);
        }
        if let Some(destination) = patch.reward_destination {
            next.reward_destination = Some(destination);
        }
        next
    }
}

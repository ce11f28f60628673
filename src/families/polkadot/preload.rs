//! Polkadot Staking Preload
//!
//! Validator set and era progress, refreshed when the active era changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::api::PolkadotApi;
use crate::error::HawalaResult;
use crate::preload::PreloadSource;

/// A validator of the current set or waiting list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorInfo {
    pub address: String,
    pub identity: Option<String>,
    /// Fraction of rewards kept by the validator, 0.0 to 1.0
    pub commission: f64,
    pub is_elected: bool,
    pub is_oversubscribed: bool,
}

/// Era and election state of the staking pallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StakingProgress {
    pub active_era: u32,
    pub election_closed: bool,
    pub max_nominator_rewarded_per_validator: u32,
    /// Eras before unbonded funds can be withdrawn
    pub bonding_duration: u32,
}

impl Default for StakingProgress {
    fn default() -> Self {
        Self {
            active_era: 0,
            election_closed: true,
            max_nominator_rewarded_per_validator: 512,
            bonding_duration: 28,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolkadotPreloadData {
    pub validators: Vec<ValidatorInfo>,
    pub staking_progress: StakingProgress,
}

impl PolkadotPreloadData {
    pub fn validator(&self, address: &str) -> Option<&ValidatorInfo> {
        self.validators.iter().find(|v| v.address == address)
    }

    pub fn is_validator(&self, address: &str) -> bool {
        self.validator(address).is_some()
    }
}

/// Preload source backed by a [`PolkadotApi`]
pub struct PolkadotPreloadSource {
    api: Arc<dyn PolkadotApi>,
}

impl PolkadotPreloadSource {
    pub fn new(api: Arc<dyn PolkadotApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PreloadSource for PolkadotPreloadSource {
    type Data = PolkadotPreloadData;

    async fn marker(&self) -> HawalaResult<u64> {
        Ok(self.api.staking_progress().await?.active_era as u64)
    }

    async fn fetch(&self) -> HawalaResult<PolkadotPreloadData> {
        let (validators, staking_progress) = tokio::try_join!(self.api.validators(), self.api.staking_progress())?;
        Ok(PolkadotPreloadData {
            validators,
            staking_progress,
        })
    }

    fn hydrate(&self, value: &Value) -> PolkadotPreloadData {
        hydrate_preload_data(value)
    }
}

/// Parse persisted preload data, skipping malformed validators and
/// defaulting a malformed staking progress
pub fn hydrate_preload_data(value: &Value) -> PolkadotPreloadData {
    let validators = value
        .get("validators")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<ValidatorInfo>(item.clone()).ok())
                .filter(|v| !v.address.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let staking_progress = value
        .get("stakingProgress")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    PolkadotPreloadData {
        validators,
        staking_progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hydrate_skips_malformed_validators() {
        let data = hydrate_preload_data(&json!({
            "validators": [
                {"address": "val-1", "commission": 0.05, "isElected": true},
                {"address": 12},
                "garbage",
                {"identity": "no address"}
            ],
            "stakingProgress": {"activeEra": 1200, "electionClosed": true}
        }));

        assert_eq!(data.validators.len(), 1);
        assert!(data.validators[0].is_elected);
        assert_eq!(data.staking_progress.active_era, 1200);
        assert!(data.staking_progress.election_closed);
    }

    #[test]
    fn test_hydrate_defaults_everything() {
        assert_eq!(hydrate_preload_data(&Value::Null), PolkadotPreloadData::default());
        let data = hydrate_preload_data(&json!({"stakingProgress": "broken"}));
        assert_eq!(data.staking_progress, StakingProgress::default());
    }
}

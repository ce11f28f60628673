//! Polkadot Account Shape
//!
//! Adapts a [`PolkadotApi`] into the generic synchronization source.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::api::{PolkadotApi, RawAccountState};
use super::currency::PolkadotCurrency;
use super::mapping::map_record;
use super::{Nomination, PolkadotResources, Unlocking};
use crate::error::HawalaResult;
use crate::sync::{AccountBalances, AccountShapeSource, OperationsCursor};
use crate::types::{Account, FamilyResources, Operation};

pub struct PolkadotShapeSource {
    api: Arc<dyn PolkadotApi>,
    currency: &'static PolkadotCurrency,
}

impl PolkadotShapeSource {
    pub fn new(api: Arc<dyn PolkadotApi>, currency: &'static PolkadotCurrency) -> Self {
        Self { api, currency }
    }
}

/// Resources and balances derived from a raw account state
pub fn account_balances(state: &RawAccountState, currency: &PolkadotCurrency) -> AccountBalances {
    let now = Utc::now();
    let mut resources = PolkadotResources {
        nonce: state.nonce,
        nominations: state
            .nominations
            .iter()
            .map(|address| Nomination {
                address: address.clone(),
                value: 0,
                status: None,
            })
            .collect(),
        ..Default::default()
    };

    if let Some(ledger) = &state.staking {
        resources.stash = Some(ledger.stash.clone());
        resources.controller = Some(ledger.controller.clone());
        resources.locked_balance = ledger.total;
        resources.num_slashing_spans = ledger.num_slashing_spans;

        for chunk in &ledger.unlocking {
            resources.unlocking_balance += chunk.value;
            if chunk.era <= state.active_era {
                resources.unlocked_balance += chunk.value;
            }
            let eras_left = chunk.era.saturating_sub(state.active_era);
            let remaining = currency.era_duration * eras_left;
            resources.unlockings.push(Unlocking {
                amount: chunk.value,
                completion_date: now + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero()),
            });
        }
    }

    AccountBalances {
        balance: state.free.saturating_add(state.reserved),
        spendable_balance: state.free.saturating_sub(state.frozen),
        block_height: state.block_height,
        confirmed_nonce: state.nonce,
        resources: Some(FamilyResources::Polkadot(resources)),
    }
}

#[async_trait]
impl AccountShapeSource for PolkadotShapeSource {
    async fn fetch_balances(&self, account: &Account) -> HawalaResult<AccountBalances> {
        let state = self.api.account_state(&account.fresh_address).await?;
        Ok(account_balances(&state, self.currency))
    }

    async fn fetch_operations(&self, account: &Account, cursor: &OperationsCursor) -> HawalaResult<Vec<Operation>> {
        let records = self
            .api
            .records(&account.fresh_address, cursor.start_at, cursor.page, cursor.limit)
            .await?;
        Ok(records
            .into_iter()
            .map(|record| map_record(&account.id, &account.fresh_address, record))
            .collect())
    }
}

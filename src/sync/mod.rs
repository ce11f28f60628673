//! Account Synchronization
//!
//! Fetches balances and new operations from a family-specific source,
//! merges them into the stored account, and reconciles pending operations.
//!
//! The account's `last_synced_height` only advances after every page was
//! fetched. When a page fails, the already fetched pages are still merged
//! into the returned partial account; since merging is idempotent, the next
//! run simply refetches from the old cursor.

mod merge;
mod pagination;

pub use merge::{compare_operations, highest_block_height, merge_operations, next_nonce, reconcile_pending};
pub use pagination::{fetch_all_pages, is_last_page, OperationsCursor, PageRun};

use async_trait::async_trait;
use chrono::Utc;

use crate::config::SyncSettings;
use crate::error::{HawalaError, HawalaResult};
use crate::types::{Account, FamilyResources};

/// Balances and resources at the chain head
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalances {
    pub balance: u128,
    pub spendable_balance: u128,
    pub block_height: u64,
    /// Sequence number the chain expects next
    pub confirmed_nonce: u64,
    pub resources: Option<FamilyResources>,
}

/// Family-specific view of an account on chain
#[async_trait]
pub trait AccountShapeSource: Send + Sync {
    async fn fetch_balances(&self, account: &Account) -> HawalaResult<AccountBalances>;

    /// One page of operations, newest first
    async fn fetch_operations(&self, account: &Account, cursor: &OperationsCursor) -> HawalaResult<Vec<crate::types::Operation>>;
}

/// A synchronization that stopped early
#[derive(Debug, thiserror::Error)]
#[error("synchronization of {} failed: {error}", .partial.id)]
pub struct SyncFailure {
    /// Account with everything merged before the failure
    pub partial: Box<Account>,
    pub error: HawalaError,
}

/// First block height to request for `account`
pub fn sync_start_height(account: &Account) -> u64 {
    account.last_synced_height.map_or(0, |h| h + 1)
}

/// Bring `account` up to date with its source.
pub async fn synchronize_account(
    account: &Account,
    source: &dyn AccountShapeSource,
    settings: &SyncSettings,
) -> Result<Account, SyncFailure> {
    let balances = match source.fetch_balances(account).await {
        Ok(b) => b,
        Err(error) => {
            crate::log_warn!("sync", "Balance fetch failed", account = account.id, error = error);
            return Err(SyncFailure {
                partial: Box::new(account.clone()),
                error,
            });
        }
    };

    let start_at = sync_start_height(account);
    let run = fetch_all_pages(source, account, start_at, settings.page_size).await;
    let fetched_count = run.fetched.len();

    let mut next = account.clone();
    next.balance = balances.balance;
    next.spendable_balance = balances.spendable_balance;
    next.block_height = balances.block_height;
    if balances.resources.is_some() {
        next.resources = balances.resources;
    }
    next.operations = merge_operations(&account.operations, run.fetched);
    next.pending_operations = reconcile_pending(&account.pending_operations, &next.operations, balances.confirmed_nonce);

    if let Some(error) = run.error {
        return Err(SyncFailure {
            partial: Box::new(next),
            error,
        });
    }

    next.last_synced_height = match (account.last_synced_height, highest_block_height(&next.operations)) {
        (Some(previous), Some(seen)) => Some(previous.max(seen)),
        (previous, seen) => previous.or(seen),
    };
    next.last_sync_date = Some(Utc::now());

    crate::log_info!(
        "sync",
        "Account synchronized",
        account = next.id,
        pages = run.pages,
        fetched = fetched_count,
        operations = next.operations.len(),
        pending = next.pending_operations.len(),
    );
    Ok(next)
}

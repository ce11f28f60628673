//! Paginated History Fetch
//!
//! Pages are requested newest first until either the source runs out
//! (a short or empty page) or a page reaches below the cursor.

use crate::error::HawalaError;
use crate::types::{Account, Operation};

use super::AccountShapeSource;

/// Position in an account's operation history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationsCursor {
    /// Lowest block height of interest
    pub start_at: u64,
    /// Zero-based page index
    pub page: u32,
    /// Records per page
    pub limit: usize,
}

/// Outcome of a paginated run; pages fetched before a failure are kept
#[derive(Debug, Default)]
pub struct PageRun {
    pub fetched: Vec<Operation>,
    pub pages: u32,
    pub error: Option<HawalaError>,
}

/// Whether pagination stops after `page`
pub fn is_last_page(page: &[Operation], start_at: u64, limit: usize) -> bool {
    if page.is_empty() || page.len() < limit {
        return true;
    }
    match page.last().and_then(|oldest| oldest.block_height) {
        Some(height) => height < start_at,
        None => false,
    }
}

/// Fetch every page at or above `start_at`
pub async fn fetch_all_pages(
    source: &dyn AccountShapeSource,
    account: &Account,
    start_at: u64,
    limit: usize,
) -> PageRun {
    let mut run = PageRun::default();
    let mut cursor = OperationsCursor {
        start_at,
        page: 0,
        limit,
    };

    loop {
        let page = match source.fetch_operations(account, &cursor).await {
            Ok(page) => page,
            Err(e) => {
                crate::log_warn!(
                    "sync",
                    "Page fetch failed",
                    page = cursor.page,
                    error = e,
                );
                run.error = Some(e);
                break;
            }
        };

        run.pages += 1;
        let done = is_last_page(&page, start_at, limit);
        run.fetched.extend(page);

        if done {
            break;
        }
        cursor.page += 1;
    }

    run
}

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::check_limit;
use crate::error::{PageError, Result};
use crate::model::{OffsetPage, Pagination};
use crate::store::RecordStore;

/// Limit/offset pagination, oldest record first, with page navigation.
///
/// Each call issues two independent reads: the page itself, then the total
/// count. They do not share a snapshot, so a concurrent insert can make
/// `total_pages` disagree with the page contents by one write.
#[derive(Clone)]
pub struct OffsetPaginator {
    store: Arc<dyn RecordStore>,
}

impl OffsetPaginator {
    /// Pages over `store`.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetches page `page` (1-based; anything below 1 reads page 1).
    pub fn retrieve(&self, page: i64, limit: i64, cancel: &CancellationToken) -> Result<OffsetPage> {
        check_limit(limit)?;
        let page = page.max(1);
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or(PageError::OffsetOverflow { page, limit })?;

        let users = self
            .store
            .scan_ascending(offset, limit, cancel)
            .map_err(PageError::Scan)?;
        let total = self.store.count(cancel).map_err(PageError::Count)?;

        let pagination = navigation(page, limit, total);
        debug!(
            page,
            limit,
            offset,
            total,
            rows = users.len(),
            total_pages = pagination.total_pages,
            "offset page"
        );
        Ok(OffsetPage { users, pagination })
    }
}

/// Navigation metadata for `page` given `total` records.
///
/// `page` is clamped to at least 1 and `limit` must be positive. With an empty
/// store `total_pages` and `next_page` are both 0.
pub fn navigation(page: i64, limit: i64, total: u64) -> Pagination {
    debug_assert!(limit > 0, "limit validated by the caller");
    let current_page = page.max(1).unsigned_abs();
    let total_pages = total.div_ceil(limit.unsigned_abs());
    Pagination {
        current_page,
        next_page: current_page.saturating_add(1).min(total_pages),
        prev_page: current_page.saturating_sub(1).max(1),
        total_pages,
    }
}

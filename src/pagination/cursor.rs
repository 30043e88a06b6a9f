use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::check_limit;
use crate::error::{PageError, Result};
use crate::model::{CursorPage, KeyBound, RecordId};
use crate::store::RecordStore;

/// Keyset pagination, newest record first.
///
/// A cursor of 1 or less starts at the newest record; any other cursor returns
/// records with `id < cursor`. Cost depends only on `limit`, never on depth, and
/// no count query is issued.
#[derive(Clone)]
pub struct CursorPaginator {
    store: Arc<dyn RecordStore>,
}

impl CursorPaginator {
    /// Pages over `store`.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetches the page below `cursor`.
    ///
    /// `next_cursor` is the smallest id on the page, to be sent back as the next
    /// `cursor`. An empty page yields `None`: there is nothing further to fetch.
    pub fn retrieve(
        &self,
        cursor: RecordId,
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<CursorPage> {
        check_limit(limit)?;
        let bound = bound_for(cursor);
        let users = self
            .store
            .scan_descending(bound, limit, cancel)
            .map_err(PageError::Scan)?;
        let next_cursor = users.last().map(|record| record.id);
        debug!(cursor, limit, rows = users.len(), ?next_cursor, "cursor page");
        Ok(CursorPage { users, next_cursor })
    }
}

fn bound_for(cursor: RecordId) -> KeyBound {
    if cursor <= 1 {
        KeyBound::Newest
    } else {
        KeyBound::Before(cursor)
    }
}

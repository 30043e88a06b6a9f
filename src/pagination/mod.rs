//! Cursor (keyset) and offset pagination over a [`RecordStore`](crate::store::RecordStore).
//!
//! Both strategies are stateless: every call reads the store afresh and either
//! returns a complete page with consistent navigation metadata or an error.

mod cursor;
mod offset;

pub use cursor::CursorPaginator;
pub use offset::{navigation, OffsetPaginator};

use crate::error::PageError;

/// Rejects page sizes that cannot produce a page.
pub(crate) fn check_limit(limit: i64) -> Result<(), PageError> {
    if limit <= 0 {
        return Err(PageError::InvalidLimit(limit));
    }
    Ok(())
}

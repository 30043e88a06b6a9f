//! Record storage contract and the SQLite implementation.
//!
//! Strategies only see the [`RecordStore`] trait, so a test double can stand in
//! for the database without touching pagination logic.

mod sqlite;

use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::model::{KeyBound, NewRecord, Record};

pub use sqlite::{SqliteStore, StoreOptions, RECORD_TABLE};

/// The four operations the pagination engine needs from the record table.
///
/// Every call takes the caller's cancellation token. A cancelled call fails with
/// [`StoreError::Cancelled`] and never returns a truncated result.
pub trait RecordStore: Send + Sync {
    /// Up to `limit` records below `bound`, ordered by descending id.
    fn scan_descending(
        &self,
        bound: KeyBound,
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, StoreError>;

    /// Up to `limit` records ordered by ascending id, skipping the first `offset`.
    fn scan_ascending(
        &self,
        offset: i64,
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, StoreError>;

    /// Number of records currently stored.
    fn count(&self, cancel: &CancellationToken) -> Result<u64, StoreError>;

    /// Inserts every record in one transaction, or none of them.
    fn bulk_insert(
        &self,
        records: &[NewRecord],
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError>;
}

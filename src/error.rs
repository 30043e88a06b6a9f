use std::fmt;

use thiserror::Error;

/// Result alias for pagination operations.
pub type Result<T> = std::result::Result<T, PageError>;

/// Identifies which store operation produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Opening connections or applying pragmas.
    Open,
    /// Creating the record table.
    Migrate,
    /// Keyset scan ordered by descending id.
    ScanDescending,
    /// Offset scan ordered by ascending id.
    ScanAscending,
    /// Total record count.
    Count,
    /// Transactional bulk insert.
    BulkInsert,
}

impl StoreOp {
    /// Stable name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOp::Open => "open",
            StoreOp::Migrate => "migrate",
            StoreOp::ScanDescending => "scan_descending",
            StoreOp::ScanAscending => "scan_ascending",
            StoreOp::Count => "count",
            StoreOp::BulkInsert => "bulk_insert",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a [`RecordStore`](crate::store::RecordStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not hand out a usable connection.
    #[error("store unavailable during {op}: {reason}")]
    Unavailable {
        /// Operation that was attempted.
        op: StoreOp,
        /// Human readable cause.
        reason: String,
    },
    /// The database rejected or failed the statement.
    #[error("{op} query failed: {source}")]
    Query {
        /// Operation that was attempted.
        op: StoreOp,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// The caller cancelled the request before the statement finished.
    #[error("{op} cancelled")]
    Cancelled {
        /// Operation that was attempted.
        op: StoreOp,
    },
    /// Store options were rejected before opening.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    pub(crate) fn query(op: StoreOp, source: rusqlite::Error) -> Self {
        match source.sqlite_error_code() {
            Some(rusqlite::ErrorCode::OperationInterrupted) => StoreError::Cancelled { op },
            _ => StoreError::Query { op, source },
        }
    }

    pub(crate) fn unavailable(op: StoreOp, reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            op,
            reason: reason.into(),
        }
    }

    /// Operation that failed, when known.
    pub fn op(&self) -> Option<StoreOp> {
        match self {
            StoreError::Unavailable { op, .. }
            | StoreError::Query { op, .. }
            | StoreError::Cancelled { op } => Some(*op),
            StoreError::InvalidConfig(_) => None,
        }
    }

    /// Returns true when the failure came from request cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cancelled { .. })
    }
}

/// Errors returned by the pagination strategies.
#[derive(Debug, Error)]
pub enum PageError {
    /// Page size must be at least one row.
    #[error("limit must be positive, got {0}")]
    InvalidLimit(i64),
    /// `(page - 1) * limit` does not fit in a row offset.
    #[error("page {page} with limit {limit} overflows the row offset")]
    OffsetOverflow {
        /// Requested page after clamping.
        page: i64,
        /// Requested page size.
        limit: i64,
    },
    /// Fetching page contents failed.
    #[error("failed to scan page: {0}")]
    Scan(#[source] StoreError),
    /// Counting records failed after the page was fetched.
    #[error("failed to count records: {0}")]
    Count(#[source] StoreError),
}

impl PageError {
    /// True for errors caused by the request parameters rather than the store.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            PageError::InvalidLimit(_) | PageError::OffsetOverflow { .. }
        )
    }

    /// Underlying store error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            PageError::Scan(err) | PageError::Count(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors returned by the seeding path.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The bulk insert failed and was rolled back.
    #[error("failed to insert seed records: {0}")]
    Insert(#[source] StoreError),
    /// The blocking seeding task panicked or was cancelled.
    #[error("seeding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

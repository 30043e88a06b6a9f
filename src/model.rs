use serde::{Deserialize, Serialize};

/// Store-assigned record identifier.
pub type RecordId = i64;

/// Field values for a record that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
}

impl NewRecord {
    /// Builds a record from its two name fields.
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
        }
    }
}

/// A stored record. Ids increase strictly in insertion order and are never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Primary key; the pagination key for both strategies.
    pub id: RecordId,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
}

/// Upper bound for a descending keyset scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBound {
    /// No bound: start from the newest record.
    Newest,
    /// Only records with `id` strictly below the key.
    Before(RecordId),
}

/// One page produced by the cursor strategy, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPage {
    /// Page contents, descending by id.
    pub users: Vec<Record>,
    /// Smallest id in `users`; `None` once the collection is exhausted.
    pub next_cursor: Option<RecordId>,
}

/// Navigation metadata for the offset strategy. All page numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Requested page, clamped to at least 1.
    pub current_page: u64,
    /// Following page, capped at `total_pages`.
    pub next_page: u64,
    /// Preceding page, never below 1.
    pub prev_page: u64,
    /// `ceil(total / limit)`.
    pub total_pages: u64,
}

/// One page produced by the offset strategy, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPage {
    /// Page contents, ascending by id.
    pub users: Vec<Record>,
    /// Navigation for this page.
    pub pagination: Pagination,
}

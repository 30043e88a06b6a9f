//! Offset and keyset pagination over a single growing record table.
//!
//! The engine lives in [`pagination`]: [`CursorPaginator`] pages newest-first by
//! key, [`OffsetPaginator`] pages oldest-first by row offset and reports page
//! navigation. Both read through the [`RecordStore`] trait, implemented for
//! SQLite by [`SqliteStore`]. [`seed`] populates the table, [`server`] exposes
//! the strategies over HTTP, with request metrics from [`telemetry`].

#![warn(missing_docs)]

pub mod config;
/// Generated person records for seeding.
pub mod data_generator;
/// Store, pagination and seeding errors.
pub mod error;
/// `tracing` subscriber setup.
pub mod logging;
/// Records and page payloads.
pub mod model;
pub mod pagination;
pub mod seed;
pub mod server;
pub mod store;
pub mod telemetry;

pub use error::{PageError, Result, SeedError, StoreError, StoreOp};
pub use model::{CursorPage, KeyBound, NewRecord, OffsetPage, Pagination, Record, RecordId};
pub use pagination::{CursorPaginator, OffsetPaginator};
pub use store::{RecordStore, SqliteStore, StoreOptions};

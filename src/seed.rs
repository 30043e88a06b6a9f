//! Initial population of the record table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::data_generator::RecordGenerator;
use crate::error::SeedError;
use crate::model::NewRecord;
use crate::store::RecordStore;

/// Outcome of a seeding run.
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    /// Rows committed.
    pub inserted: u64,
    /// Wall time spent generating and inserting.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

/// Generates records and writes them through the store's bulk insert.
pub struct Seeder<G> {
    generator: G,
    store: Arc<dyn RecordStore>,
}

impl<G: RecordGenerator> Seeder<G> {
    /// Seeds `store` with records from `generator`.
    pub fn new(generator: G, store: Arc<dyn RecordStore>) -> Self {
        Self { generator, store }
    }

    /// Generates `count` records and inserts them in a single transaction.
    pub fn seed(&mut self, count: usize, cancel: &CancellationToken) -> Result<SeedReport, SeedError> {
        let started = Instant::now();
        if count == 0 {
            return Ok(SeedReport {
                inserted: 0,
                elapsed: started.elapsed(),
            });
        }
        let records = self.generator.generate(count);
        let inserted = self.create(&records, cancel)?;
        let report = SeedReport {
            inserted,
            elapsed: started.elapsed(),
        };
        info!(
            inserted = report.inserted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "seeding completed"
        );
        Ok(report)
    }

    /// Writes caller-supplied records; all or nothing.
    pub fn create(&self, records: &[NewRecord], cancel: &CancellationToken) -> Result<u64, SeedError> {
        self.store
            .bulk_insert(records, cancel)
            .map_err(SeedError::Insert)
    }
}

impl<G: RecordGenerator + Send + 'static> Seeder<G> {
    /// Runs [`Seeder::seed`] on the blocking pool so async callers keep their worker thread.
    pub async fn seed_blocking(
        mut self,
        count: usize,
        cancel: CancellationToken,
    ) -> Result<SeedReport, SeedError> {
        tokio::task::spawn_blocking(move || self.seed(count, &cancel)).await?
    }
}

fn as_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

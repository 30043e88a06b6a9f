use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, InterruptHandle, Params, Row};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::RecordStore;
use crate::error::{StoreError, StoreOp};
use crate::model::{KeyBound, NewRecord, Record};

/// Name of the table holding paginated records.
pub const RECORD_TABLE: &str = "users";

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    surname TEXT NOT NULL
)";
const SCAN_NEWEST_SQL: &str = "SELECT id, name, surname FROM users ORDER BY id DESC LIMIT ?1";
const SCAN_BEFORE_SQL: &str =
    "SELECT id, name, surname FROM users WHERE id < ?1 ORDER BY id DESC LIMIT ?2";
const SCAN_OFFSET_SQL: &str =
    "SELECT id, name, surname FROM users ORDER BY id ASC LIMIT ?1 OFFSET ?2";
const COUNT_SQL: &str = "SELECT COUNT(id) FROM users";
const INSERT_SQL: &str = "INSERT INTO users (name, surname) VALUES (?1, ?2)";

/// Connection settings for [`SqliteStore::open`].
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Number of read connections shared by concurrent page requests.
    pub read_pool_size: usize,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            read_pool_size: 4,
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

/// SQLite-backed [`RecordStore`].
///
/// One connection serves writes. Reads rotate over a fixed pool of `query_only`
/// connections so page requests do not queue behind each other or behind a
/// running bulk insert (WAL mode). An in-memory store has no pool and routes
/// every call through its single connection.
pub struct SqliteStore {
    path: Option<PathBuf>,
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the table exists.
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self, StoreError> {
        if options.read_pool_size == 0 {
            return Err(StoreError::InvalidConfig(
                "read_pool_size must be greater than zero".into(),
            ));
        }
        let path = path.as_ref().to_path_buf();

        let writer = open_connection(&path, options)?;
        writer
            .execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|err| StoreError::query(StoreOp::Open, err))?;
        migrate(&writer)?;

        let mut readers = Vec::with_capacity(options.read_pool_size);
        for _ in 0..options.read_pool_size {
            let reader = open_connection(&path, options)?;
            reader
                .execute_batch("PRAGMA query_only=ON;")
                .map_err(|err| StoreError::query(StoreOp::Open, err))?;
            readers.push(Mutex::new(reader));
        }

        info!(
            path = %path.display(),
            read_pool_size = options.read_pool_size,
            "record store opened"
        );
        Ok(Self {
            path: Some(path),
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Private in-memory database, mostly for tests and benchmarks.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|err| StoreError::query(StoreOp::Open, err))?;
        migrate(&conn)?;
        Ok(Self {
            path: None,
            writer: Mutex::new(conn),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
        })
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn reader(&self) -> MutexGuard<'_, Connection> {
        if self.readers.is_empty() {
            return self.writer.lock();
        }
        let start = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        for step in 0..self.readers.len() {
            let idx = (start + step) % self.readers.len();
            if let Some(guard) = self.readers[idx].try_lock() {
                return guard;
            }
        }
        self.readers[start].lock()
    }

    fn read<T>(
        &self,
        op: StoreOp,
        cancel: &CancellationToken,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled { op });
        }
        let conn = self.reader();
        let _watch = CancelWatch::arm(&conn, cancel);
        f(&*conn).map_err(|err| StoreError::query(op, err))
    }
}

impl RecordStore for SqliteStore {
    fn scan_descending(
        &self,
        bound: KeyBound,
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, StoreError> {
        let records = self.read(StoreOp::ScanDescending, cancel, |conn| match bound {
            KeyBound::Newest => query_records(conn, SCAN_NEWEST_SQL, params![limit]),
            KeyBound::Before(key) => query_records(conn, SCAN_BEFORE_SQL, params![key, limit]),
        })?;
        debug!(?bound, limit, rows = records.len(), "descending scan");
        Ok(records)
    }

    fn scan_ascending(
        &self,
        offset: i64,
        limit: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, StoreError> {
        let records = self.read(StoreOp::ScanAscending, cancel, |conn| {
            query_records(conn, SCAN_OFFSET_SQL, params![limit, offset])
        })?;
        debug!(offset, limit, rows = records.len(), "ascending scan");
        Ok(records)
    }

    fn count(&self, cancel: &CancellationToken) -> Result<u64, StoreError> {
        self.read(StoreOp::Count, cancel, |conn| {
            let count: i64 = conn
                .prepare_cached(COUNT_SQL)?
                .query_row([], |row| row.get(0))?;
            u64::try_from(count).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, count))
        })
    }

    fn bulk_insert(
        &self,
        records: &[NewRecord],
        cancel: &CancellationToken,
    ) -> Result<u64, StoreError> {
        let op = StoreOp::BulkInsert;
        if records.is_empty() {
            return Ok(0);
        }
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled { op });
        }

        let started = Instant::now();
        let mut conn = self.writer.lock();
        let _watch = CancelWatch::arm(&conn, cancel);
        let insert = |conn: &mut Connection| -> rusqlite::Result<u64> {
            // Dropping `tx` on any early return rolls the whole batch back.
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(INSERT_SQL)?;
                for record in records {
                    if cancel.is_cancelled() {
                        return Err(interrupted());
                    }
                    stmt.execute(params![record.name, record.surname])?;
                }
            }
            tx.commit()?;
            Ok(records.len() as u64)
        };
        let inserted = insert(&mut *conn).map_err(|err| StoreError::query(op, err))?;

        info!(
            rows = inserted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bulk insert committed"
        );
        Ok(inserted)
    }
}

fn open_connection(path: &Path, options: &StoreOptions) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(|err| StoreError::query(StoreOp::Open, err))?;
    conn.busy_timeout(options.busy_timeout)
        .map_err(|err| StoreError::query(StoreOp::Open, err))?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|err| StoreError::query(StoreOp::Migrate, err))
}

fn query_records(conn: &Connection, sql: &str, params: impl Params) -> rusqlite::Result<Vec<Record>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, row_to_record)?;
    rows.collect()
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
    })
}

fn interrupted() -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
        None,
    )
}

/// Interrupts the statement running on a connection once the token fires.
///
/// Only armed inside a tokio runtime; plain synchronous callers still get the
/// up-front cancellation check in [`SqliteStore::read`]. Dropping the watch
/// disarms it under the same lock the watcher interrupts with, so once drop
/// returns the connection can be handed to another caller safely.
struct CancelWatch {
    armed: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl CancelWatch {
    fn arm(conn: &Connection, cancel: &CancellationToken) -> Self {
        let armed = Arc::new(Mutex::new(true));
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return Self { armed, task: None };
        };
        let handle = conn.get_interrupt_handle();
        let token = cancel.clone();
        let watcher = armed.clone();
        let task = runtime.spawn(async move {
            token.cancelled().await;
            interrupt_if_armed(&watcher, &handle);
        });
        Self {
            armed,
            task: Some(task),
        }
    }
}

fn interrupt_if_armed(armed: &Mutex<bool>, handle: &InterruptHandle) -> bool {
    let armed = armed.lock();
    if *armed {
        handle.interrupt();
    }
    *armed
}

impl Drop for CancelWatch {
    fn drop(&mut self) {
        *self.armed.lock() = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

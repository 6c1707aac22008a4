// Record store adapters
//
// The store is shared by many sessions that never coordinate with each other.
// Every read is a snapshot; every write is a compare-and-set against the
// version the writer read. Folio uniqueness is enforced here, on insert, so it
// holds even when a caller's snapshot missed a concurrent insert.

pub mod json_file;
pub mod memory;
pub mod retry;
#[cfg(feature = "database")]
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::domain::{Folio, PickingRecord, RecordUpdate, Status};
use crate::scans::ScanRecord;

pub use json_file::JsonFileStore;
pub use memory::InMemoryRecordStore;
pub use retry::RetryPolicy;
#[cfg(feature = "database")]
pub use sqlite::SqliteRecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("version conflict on {folio}: expected version {expected}, found {found}")]
    VersionConflict {
        folio: Folio,
        expected: u64,
        found: u64,
    },

    #[error("folio not found: {0}")]
    NotFound(Folio),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("store data corrupted: {0}")]
    Corrupted(String),
}

impl StoreError {
    /// Failures worth retrying after a short delay
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupted(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Why the store refused one row of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertRejection {
    /// The folio is already stored. Never retried.
    AlreadyExists,
    /// The row was not written for a transient reason and may be retried.
    Failed(String),
}

/// Per-row result of `insert_batch`.
///
/// Adapters that write atomically report either every row in `inserted` /
/// `AlreadyExists`, or return `Err` having written nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: Vec<Folio>,
    pub rejected: Vec<(Folio, InsertRejection)>,
}

impl InsertOutcome {
    pub fn failed(&self) -> impl Iterator<Item = (&Folio, &str)> {
        self.rejected.iter().filter_map(|(folio, rejection)| match rejection {
            InsertRejection::Failed(reason) => Some((folio, reason.as_str())),
            InsertRejection::AlreadyExists => None,
        })
    }
}

/// Read/write access to the persisted table of picking records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Snapshot of every record, in store order
    async fn read_all(&self) -> Result<Vec<PickingRecord>, StoreError>;

    /// Fresh read of a single record
    async fn read_one(&self, folio: &Folio) -> Result<Option<PickingRecord>, StoreError>;

    /// Insert new records. Rows whose folio already exists are rejected, not written.
    async fn insert_batch(&self, records: Vec<PickingRecord>) -> Result<InsertOutcome, StoreError>;

    /// Compare-and-set update: applies only if the stored version equals
    /// `expected_version`, and returns the record as written.
    async fn update_one(
        &self,
        folio: &Folio,
        expected_version: u64,
        update: RecordUpdate,
    ) -> Result<PickingRecord, StoreError>;
}

/// Storage for the per-folio document scans
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Insert a scan. A QR already present is `DuplicateKey`.
    async fn insert_scan(&self, scan: ScanRecord) -> Result<(), StoreError>;

    async fn find_scan(&self, qr_data: &str) -> Result<Option<ScanRecord>, StoreError>;

    /// Scans whose parent is `folio`, in registration order
    async fn scans_for_folio(&self, folio: &Folio) -> Result<Vec<ScanRecord>, StoreError>;

    /// Returns the updated scan, `Ok(None)` if absent
    async fn update_scan_status(
        &self,
        qr_data: &str,
        status: Status,
    ) -> Result<Option<ScanRecord>, StoreError>;

    /// Returns whether a scan was removed
    async fn delete_scan(&self, qr_data: &str) -> Result<bool, StoreError>;
}

/// Conflict check shared by adapters that hold the table in memory
pub(crate) fn check_version(
    record: &PickingRecord,
    expected_version: u64,
) -> Result<(), StoreError> {
    if record.version != expected_version {
        return Err(StoreError::VersionConflict {
            folio: record.folio.clone(),
            expected: expected_version,
            found: record.version,
        });
    }
    Ok(())
}

// File-backed record store
//
// The whole table lives in one JSON document. Each operation takes a
// non-blocking advisory lock on a sibling `.lock` file for its own duration
// only; a busy lock is reported as `Unavailable` instead of waited on. Writes
// go to a temp file that is renamed over the document, so a batch either
// lands completely or not at all.

use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::memory::Tables;
use super::{InsertOutcome, RecordStore, ScanStore, StoreError};
use crate::domain::{Folio, PickingRecord, RecordUpdate, Status};
use crate::scans::ScanRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.clone().into_os_string();
        lock_name.push(".lock");
        Self {
            path,
            lock_path: PathBuf::from(lock_name),
        }
    }

    async fn with_tables<T, F>(&self, access: Access, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Tables) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();

        tokio::task::spawn_blocking(move || locked(&path, &lock_path, access, op))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}

fn locked<T, F>(path: &Path, lock_path: &Path, access: Access, op: F) -> Result<T, StoreError>
where
    F: FnOnce(&mut Tables) -> Result<T, StoreError>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    let mut lock = fd_lock::RwLock::new(lock_file);

    match access {
        Access::Read => {
            let _guard = lock.try_read().map_err(busy)?;
            let mut tables = load(path)?;
            op(&mut tables)
        }
        Access::Write => {
            let _guard = lock.try_write().map_err(busy)?;
            let mut tables = load(path)?;
            let result = op(&mut tables)?;
            save(path, &tables)?;
            Ok(result)
        }
    }
}

fn busy(err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::WouldBlock {
        StoreError::Unavailable("record store is locked by another session".to_string())
    } else {
        err.into()
    }
}

fn load(path: &Path) -> Result<Tables, StoreError> {
    if !path.exists() {
        return Ok(Tables::default());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Tables::default());
    }
    Ok(serde_json::from_str(&content)?)
}

fn save(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let content = serde_json::to_string_pretty(tables)?;
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)?;
    debug!(
        path = %path.display(),
        records = tables.records.len(),
        scans = tables.scans.len(),
        "Record store written"
    );
    Ok(())
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn read_all(&self) -> Result<Vec<PickingRecord>, StoreError> {
        self.with_tables(Access::Read, |tables| Ok(tables.records.clone()))
            .await
    }

    async fn read_one(&self, folio: &Folio) -> Result<Option<PickingRecord>, StoreError> {
        let folio = folio.clone();
        self.with_tables(Access::Read, move |tables| Ok(tables.get(&folio).cloned()))
            .await
    }

    async fn insert_batch(&self, records: Vec<PickingRecord>) -> Result<InsertOutcome, StoreError> {
        self.with_tables(Access::Write, move |tables| Ok(tables.insert_batch(records)))
            .await
    }

    async fn update_one(
        &self,
        folio: &Folio,
        expected_version: u64,
        update: RecordUpdate,
    ) -> Result<PickingRecord, StoreError> {
        let folio = folio.clone();
        self.with_tables(Access::Write, move |tables| {
            tables.update_one(&folio, expected_version, &update)
        })
        .await
    }
}

#[async_trait]
impl ScanStore for JsonFileStore {
    async fn insert_scan(&self, scan: ScanRecord) -> Result<(), StoreError> {
        self.with_tables(Access::Write, move |tables| tables.insert_scan(scan))
            .await
    }

    async fn find_scan(&self, qr_data: &str) -> Result<Option<ScanRecord>, StoreError> {
        let qr_data = qr_data.to_string();
        self.with_tables(Access::Read, move |tables| {
            Ok(tables.find_scan(&qr_data).cloned())
        })
        .await
    }

    async fn scans_for_folio(&self, folio: &Folio) -> Result<Vec<ScanRecord>, StoreError> {
        let folio = folio.clone();
        self.with_tables(Access::Read, move |tables| Ok(tables.scans_for_folio(&folio)))
            .await
    }

    async fn update_scan_status(
        &self,
        qr_data: &str,
        status: Status,
    ) -> Result<Option<ScanRecord>, StoreError> {
        let qr_data = qr_data.to_string();
        self.with_tables(Access::Write, move |tables| {
            Ok(tables.update_scan_status(&qr_data, status))
        })
        .await
    }

    async fn delete_scan(&self, qr_data: &str) -> Result<bool, StoreError> {
        let qr_data = qr_data.to_string();
        self.with_tables(Access::Write, move |tables| Ok(tables.delete_scan(&qr_data)))
            .await
    }
}

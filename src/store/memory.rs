// In-process record store. Authoritative only within one process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{check_version, InsertOutcome, InsertRejection, RecordStore, ScanStore, StoreError};
use crate::domain::{Folio, PickingRecord, RecordUpdate, Status};
use crate::scans::ScanRecord;

/// The two tables, as held in memory and as serialized by the JSON store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    pub records: Vec<PickingRecord>,
    #[serde(default)]
    pub scans: Vec<ScanRecord>,
}

impl Tables {
    fn position(&self, folio: &Folio) -> Option<usize> {
        self.records.iter().position(|r| &r.folio == folio)
    }

    pub fn get(&self, folio: &Folio) -> Option<&PickingRecord> {
        self.position(folio).map(|idx| &self.records[idx])
    }

    pub fn insert_batch(&mut self, records: Vec<PickingRecord>) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();
        for mut record in records {
            if self.position(&record.folio).is_some() {
                outcome
                    .rejected
                    .push((record.folio.clone(), InsertRejection::AlreadyExists));
                continue;
            }
            record.version = 1;
            outcome.inserted.push(record.folio.clone());
            self.records.push(record);
        }
        outcome
    }

    pub fn update_one(
        &mut self,
        folio: &Folio,
        expected_version: u64,
        update: &RecordUpdate,
    ) -> Result<PickingRecord, StoreError> {
        let idx = self
            .position(folio)
            .ok_or_else(|| StoreError::NotFound(folio.clone()))?;
        let record = &mut self.records[idx];
        check_version(record, expected_version)?;
        record.apply(update);
        record.version += 1;
        Ok(record.clone())
    }

    pub fn insert_scan(&mut self, scan: ScanRecord) -> Result<(), StoreError> {
        if self.scans.iter().any(|s| s.qr_data == scan.qr_data) {
            return Err(StoreError::DuplicateKey(scan.qr_data));
        }
        self.scans.push(scan);
        Ok(())
    }

    pub fn find_scan(&self, qr_data: &str) -> Option<&ScanRecord> {
        self.scans.iter().find(|s| s.qr_data == qr_data)
    }

    pub fn scans_for_folio(&self, folio: &Folio) -> Vec<ScanRecord> {
        self.scans
            .iter()
            .filter(|s| &s.parent_folio == folio)
            .cloned()
            .collect()
    }

    pub fn update_scan_status(&mut self, qr_data: &str, status: Status) -> Option<ScanRecord> {
        let scan = self.scans.iter_mut().find(|s| s.qr_data == qr_data)?;
        scan.status = status;
        Some(scan.clone())
    }

    pub fn delete_scan(&mut self, qr_data: &str) -> bool {
        let before = self.scans.len();
        self.scans.retain(|s| s.qr_data != qr_data);
        self.scans.len() != before
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing records, keeping their versions
    pub fn with_records(records: Vec<PickingRecord>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                records,
                scans: Vec::new(),
            }),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn read_all(&self) -> Result<Vec<PickingRecord>, StoreError> {
        Ok(self.tables.read().await.records.clone())
    }

    async fn read_one(&self, folio: &Folio) -> Result<Option<PickingRecord>, StoreError> {
        Ok(self.tables.read().await.get(folio).cloned())
    }

    async fn insert_batch(&self, records: Vec<PickingRecord>) -> Result<InsertOutcome, StoreError> {
        Ok(self.tables.write().await.insert_batch(records))
    }

    async fn update_one(
        &self,
        folio: &Folio,
        expected_version: u64,
        update: RecordUpdate,
    ) -> Result<PickingRecord, StoreError> {
        self.tables
            .write()
            .await
            .update_one(folio, expected_version, &update)
    }
}

#[async_trait]
impl ScanStore for InMemoryRecordStore {
    async fn insert_scan(&self, scan: ScanRecord) -> Result<(), StoreError> {
        self.tables.write().await.insert_scan(scan)
    }

    async fn find_scan(&self, qr_data: &str) -> Result<Option<ScanRecord>, StoreError> {
        Ok(self.tables.read().await.find_scan(qr_data).cloned())
    }

    async fn scans_for_folio(&self, folio: &Folio) -> Result<Vec<ScanRecord>, StoreError> {
        Ok(self.tables.read().await.scans_for_folio(folio))
    }

    async fn update_scan_status(
        &self,
        qr_data: &str,
        status: Status,
    ) -> Result<Option<ScanRecord>, StoreError> {
        Ok(self.tables.write().await.update_scan_status(qr_data, status))
    }

    async fn delete_scan(&self, qr_data: &str) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.delete_scan(qr_data))
    }
}

// SQLite-backed record store (feature = "database")

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use super::{InsertOutcome, InsertRejection, RecordStore, ScanStore, StoreError};
use crate::config::DatabaseConfig;
use crate::domain::{Folio, Metadata, PickingRecord, RecordUpdate, Status, UserId};
use crate::scans::ScanRecord;

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Connect, creating the database file and its directory if needed,
    /// and optionally migrate
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let filename = options.get_filename();
        if filename != Path::new(":memory:") {
            if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        if config.auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub async fn shutdown(&self) {
        self.pool.close().await;
        info!("Database connections closed");
    }
}

fn corrupted(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupted(err.to_string())
}

fn record_from_row(row: &SqliteRow) -> Result<PickingRecord, StoreError> {
    let folio: String = row.try_get("folio")?;
    let status: String = row.try_get("status")?;
    let operator: Option<String> = row.try_get("assigned_operator")?;
    let metadata: String = row.try_get("metadata")?;
    let version: i64 = row.try_get("version")?;

    Ok(PickingRecord {
        folio: Folio::new(&folio).map_err(corrupted)?,
        status: status.parse().map_err(corrupted)?,
        assigned_operator: operator
            .filter(|o| !o.trim().is_empty())
            .map(UserId::new)
            .transpose()
            .map_err(corrupted)?,
        metadata: serde_json::from_str::<Metadata>(&metadata)?,
        version: version as u64,
    })
}

fn scan_from_row(row: &SqliteRow) -> Result<ScanRecord, StoreError> {
    let parent: String = row.try_get("parent_folio")?;
    let operator: String = row.try_get("operator")?;
    let status: String = row.try_get("status")?;
    let scanned_at: String = row.try_get("scanned_at")?;

    Ok(ScanRecord {
        qr_data: row.try_get("qr_data")?,
        parent_folio: Folio::new(&parent).map_err(corrupted)?,
        operator: UserId::new(&operator).map_err(corrupted)?,
        status: status.parse().map_err(corrupted)?,
        scanned_at: DateTime::parse_from_rfc3339(&scanned_at)
            .map_err(corrupted)?
            .with_timezone(&Utc),
        details: row.try_get("details")?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn read_all(&self) -> Result<Vec<PickingRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT folio, status, assigned_operator, metadata, version FROM pickings ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn read_one(&self, folio: &Folio) -> Result<Option<PickingRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT folio, status, assigned_operator, metadata, version FROM pickings WHERE folio = ?1",
        )
        .bind(folio.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert_batch(&self, records: Vec<PickingRecord>) -> Result<InsertOutcome, StoreError> {
        let mut outcome = InsertOutcome::default();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let metadata = serde_json::to_string(&record.metadata)?;
            let result = sqlx::query(
                r#"
                INSERT INTO pickings (folio, status, assigned_operator, metadata, version)
                VALUES (?1, ?2, ?3, ?4, 1)
                ON CONFLICT(folio) DO NOTHING
                "#,
            )
            .bind(record.folio.as_str())
            .bind(record.status.as_str())
            .bind(record.assigned_operator.as_ref().map(|o| o.as_str()))
            .bind(metadata)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                outcome
                    .rejected
                    .push((record.folio, InsertRejection::AlreadyExists));
            } else {
                outcome.inserted.push(record.folio);
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn update_one(
        &self,
        folio: &Folio,
        expected_version: u64,
        update: RecordUpdate,
    ) -> Result<PickingRecord, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE pickings
            SET status = COALESCE(?1, status),
                assigned_operator = COALESCE(?2, assigned_operator),
                version = version + 1
            WHERE folio = ?3 AND version = ?4
            "#,
        )
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.assigned_operator.as_ref().map(|o| o.as_str()))
        .bind(folio.as_str())
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await?;

        let current = self
            .read_one(folio)
            .await?
            .ok_or_else(|| StoreError::NotFound(folio.clone()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                folio: folio.clone(),
                expected: expected_version,
                found: current.version,
            });
        }
        Ok(current)
    }
}

#[async_trait]
impl ScanStore for SqliteRecordStore {
    async fn insert_scan(&self, scan: ScanRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO picking_scans (qr_data, parent_folio, operator, status, scanned_at, details)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(qr_data) DO NOTHING
            "#,
        )
        .bind(&scan.qr_data)
        .bind(scan.parent_folio.as_str())
        .bind(scan.operator.as_str())
        .bind(scan.status.as_str())
        .bind(scan.scanned_at.to_rfc3339())
        .bind(&scan.details)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateKey(scan.qr_data));
        }
        Ok(())
    }

    async fn find_scan(&self, qr_data: &str) -> Result<Option<ScanRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT qr_data, parent_folio, operator, status, scanned_at, details FROM picking_scans WHERE qr_data = ?1",
        )
        .bind(qr_data)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(scan_from_row).transpose()
    }

    async fn scans_for_folio(&self, folio: &Folio) -> Result<Vec<ScanRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT qr_data, parent_folio, operator, status, scanned_at, details
            FROM picking_scans
            WHERE parent_folio = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(folio.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scan_from_row).collect()
    }

    async fn update_scan_status(
        &self,
        qr_data: &str,
        status: Status,
    ) -> Result<Option<ScanRecord>, StoreError> {
        let result = sqlx::query("UPDATE picking_scans SET status = ?1 WHERE qr_data = ?2")
            .bind(status.as_str())
            .bind(qr_data)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_scan(qr_data).await
    }

    async fn delete_scan(&self, qr_data: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM picking_scans WHERE qr_data = ?1")
            .bind(qr_data)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

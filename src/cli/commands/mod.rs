use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use picking_control::store::{InsertOutcome, StoreError};
use picking_control::{
    Actor, Folio, InMemoryRecordStore, JsonFileStore, PickingControlConfig, PickingRecord,
    PickingService, RecordStore, RecordUpdate, Role, ScanRecord, ScanStore, Status, StoreBackend,
    UserId,
};

pub mod import;
pub mod list;
pub mod scan;
pub mod status;

/// The configured record store
pub enum Backend {
    Memory(InMemoryRecordStore),
    Json(JsonFileStore),
    #[cfg(feature = "database")]
    Sqlite(picking_control::SqliteRecordStore),
}

impl Backend {
    pub async fn open(config: &PickingControlConfig) -> Result<Self> {
        match config.store.backend {
            StoreBackend::Memory => Ok(Backend::Memory(InMemoryRecordStore::new())),
            StoreBackend::Json => {
                if let Some(parent) = config.store.json_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).with_context(|| {
                            format!("creating store directory {}", parent.display())
                        })?;
                    }
                }
                Ok(Backend::Json(JsonFileStore::new(config.store.json_path.clone())))
            }
            #[cfg(feature = "database")]
            StoreBackend::Sqlite => {
                let database = config
                    .database
                    .as_ref()
                    .context("sqlite backend selected but [database] is not configured")?;
                Ok(Backend::Sqlite(
                    picking_control::SqliteRecordStore::connect(database).await?,
                ))
            }
            #[cfg(not(feature = "database"))]
            StoreBackend::Sqlite => {
                anyhow::bail!("sqlite backend requires building with the `database` feature")
            }
        }
    }

    /// Release backend resources before exit
    pub async fn close(&self) {
        #[cfg(feature = "database")]
        if let Backend::Sqlite(store) = self {
            store.shutdown().await;
        }
    }
}

macro_rules! delegate {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Backend::Memory($store) => $call,
            Backend::Json($store) => $call,
            #[cfg(feature = "database")]
            Backend::Sqlite($store) => $call,
        }
    };
}

#[async_trait]
impl RecordStore for Backend {
    async fn read_all(&self) -> Result<Vec<PickingRecord>, StoreError> {
        delegate!(self, store => store.read_all().await)
    }

    async fn read_one(&self, folio: &Folio) -> Result<Option<PickingRecord>, StoreError> {
        delegate!(self, store => store.read_one(folio).await)
    }

    async fn insert_batch(&self, records: Vec<PickingRecord>) -> Result<InsertOutcome, StoreError> {
        delegate!(self, store => store.insert_batch(records).await)
    }

    async fn update_one(
        &self,
        folio: &Folio,
        expected_version: u64,
        update: RecordUpdate,
    ) -> Result<PickingRecord, StoreError> {
        delegate!(self, store => store.update_one(folio, expected_version, update).await)
    }
}

#[async_trait]
impl ScanStore for Backend {
    async fn insert_scan(&self, scan: ScanRecord) -> Result<(), StoreError> {
        delegate!(self, store => store.insert_scan(scan).await)
    }

    async fn find_scan(&self, qr_data: &str) -> Result<Option<ScanRecord>, StoreError> {
        delegate!(self, store => store.find_scan(qr_data).await)
    }

    async fn scans_for_folio(&self, folio: &Folio) -> Result<Vec<ScanRecord>, StoreError> {
        delegate!(self, store => store.scans_for_folio(folio).await)
    }

    async fn update_scan_status(
        &self,
        qr_data: &str,
        status: Status,
    ) -> Result<Option<ScanRecord>, StoreError> {
        delegate!(self, store => store.update_scan_status(qr_data, status).await)
    }

    async fn delete_scan(&self, qr_data: &str) -> Result<bool, StoreError> {
        delegate!(self, store => store.delete_scan(qr_data).await)
    }
}

/// Who is asking, and the service they are asking
pub struct Session {
    pub actor: Actor,
    pub service: PickingService<Backend>,
    pub json: bool,
}

impl Session {
    pub async fn open(
        config: &PickingControlConfig,
        user: Option<String>,
        role: Option<Role>,
        json: bool,
    ) -> Result<Self> {
        let user = user.context("--user is required")?;
        let role = role.context("--role is required")?;
        let actor = Actor::new(UserId::new(&user)?, role);

        let store = Backend::open(config).await?;
        let service = PickingService::from_config(Arc::new(store), config);
        Ok(Self {
            actor,
            service,
            json,
        })
    }

    pub async fn close(&self) {
        self.service.store().close().await;
    }

    /// Print `value` as pretty JSON when `--json` was given
    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(self.json)
    }
}

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self, session: &Session) -> Result<()>;
}

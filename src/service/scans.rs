// Document scans: every operation is authorized against the parent folio

use chrono::Utc;
use tracing::info;

use super::PickingService;
use crate::access::Action;
use crate::domain::{Actor, Folio, Status};
use crate::error::PickingError;
use crate::scans::{parse_qr, ScanRecord};
use crate::store::{RecordStore, ScanStore, StoreError};

impl<S: RecordStore + ScanStore> PickingService<S> {
    /// Register a scanned QR under the folio it encodes. New scans start as `SURTIDO`.
    pub async fn register_scan(&self, actor: &Actor, qr_data: &str) -> Result<ScanRecord, PickingError> {
        let payload = parse_qr(qr_data)?;
        let parent = self.read_fresh(&payload.folio).await?;
        self.policy().ensure(actor, Action::RegisterScan, Some(&parent))?;

        let scan = ScanRecord {
            qr_data: qr_data.to_string(),
            parent_folio: payload.folio,
            operator: actor.identity.clone(),
            status: Status::Surtido,
            scanned_at: Utc::now(),
            details: payload.details,
        };

        match self.store.insert_scan(scan.clone()).await {
            Ok(()) => {}
            Err(StoreError::DuplicateKey(_)) => {
                return Err(PickingError::DuplicateScan {
                    qr: qr_data.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            folio = %scan.parent_folio,
            operator = %scan.operator,
            "Scan registered"
        );
        Ok(scan)
    }

    pub async fn update_scan_status(
        &self,
        actor: &Actor,
        qr_data: &str,
        status: Status,
    ) -> Result<ScanRecord, PickingError> {
        let scan = self.existing_scan(qr_data).await?;
        let parent = self.read_fresh(&scan.parent_folio).await?;
        self.policy().ensure(actor, Action::UpdateScan, Some(&parent))?;

        let allowed = status != Status::Pending
            && self
                .policy()
                .capabilities(actor.role)
                .map(|caps| caps.target_statuses.contains(&status))
                .unwrap_or(false);
        if !allowed {
            return Err(PickingError::InvalidTransition {
                role: actor.role,
                from: scan.status,
                to: status,
            });
        }

        let updated = self
            .store_retry
            .run("update_scan_status", || self.store.update_scan_status(qr_data, status))
            .await?
            .ok_or_else(|| PickingError::ScanNotFound {
                qr: qr_data.to_string(),
            })?;
        info!(folio = %updated.parent_folio, status = %status, "Scan status updated");
        Ok(updated)
    }

    pub async fn delete_scan(&self, actor: &Actor, qr_data: &str) -> Result<(), PickingError> {
        let scan = self.existing_scan(qr_data).await?;
        let parent = self.read_fresh(&scan.parent_folio).await?;
        self.policy().ensure(actor, Action::DeleteScan, Some(&parent))?;

        if !self.store.delete_scan(qr_data).await? {
            return Err(PickingError::ScanNotFound {
                qr: qr_data.to_string(),
            });
        }
        info!(folio = %scan.parent_folio, "Scan deleted");
        Ok(())
    }

    /// Scans registered under `folio`, oldest first
    pub async fn folio_scans(&self, actor: &Actor, folio: &Folio) -> Result<Vec<ScanRecord>, PickingError> {
        let parent = self.read_fresh(folio).await?;
        self.policy().ensure(actor, Action::ViewScans, Some(&parent))?;
        Ok(self
            .store_retry
            .run("scans_for_folio", || self.store.scans_for_folio(folio))
            .await?)
    }

    async fn existing_scan(&self, qr_data: &str) -> Result<ScanRecord, PickingError> {
        self.store_retry
            .run("find_scan", || self.store.find_scan(qr_data))
            .await?
            .ok_or_else(|| PickingError::ScanNotFound {
                qr: qr_data.to_string(),
            })
    }
}

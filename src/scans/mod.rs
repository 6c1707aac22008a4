// Document scans attached to a folio
//
// Each scanned QR is registered once, linked to the folio encoded in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Folio, Status, UserId};
use crate::error::PickingError;

/// Details stored when the QR carries nothing but the folio
pub const RAW_QR_DETAILS: &str = "Raw QR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub qr_data: String,
    pub parent_folio: Folio,
    pub operator: UserId,
    pub status: Status,
    pub scanned_at: DateTime<Utc>,
    pub details: String,
}

/// Parsed QR payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    pub folio: Folio,
    pub details: String,
}

/// Extract the folio from a QR string.
///
/// `folio|financiamiento|piezas|...` yields the first field; text without a
/// separator is taken to be the folio itself.
pub fn parse_qr(qr_data: &str) -> Result<QrPayload, PickingError> {
    let invalid = || PickingError::InvalidInput(format!("unreadable QR: {qr_data:?}"));

    if !qr_data.contains('|') {
        let folio = Folio::new(qr_data).map_err(|_| invalid())?;
        return Ok(QrPayload {
            folio,
            details: RAW_QR_DETAILS.to_string(),
        });
    }

    let first = qr_data.split('|').next().unwrap_or_default();
    let folio = Folio::new(first).map_err(|_| invalid())?;
    Ok(QrPayload {
        folio,
        details: qr_data.to_string(),
    })
}

use thiserror::Error;

use crate::access::Action;
use crate::domain::{Folio, Role, Status, UserId};
use crate::store::StoreError;

/// Why an import row was rejected as a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    AlreadyExists,
    DuplicateInBatch,
}

impl std::fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateReason::AlreadyExists => f.write_str("already_exists"),
            DuplicateReason::DuplicateInBatch => f.write_str("duplicate_in_batch"),
        }
    }
}

/// Every failure the workflow layer reports.
///
/// Authorization and transition failures abort a single operation. Row-level
/// variants are attached to individual import rows. Store variants are batch-level.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PickingError {
    #[error("{actor} ({role}) is not allowed to {action}: {reason}")]
    AuthorizationDenied {
        actor: UserId,
        role: Role,
        action: Action,
        reason: String,
    },

    #[error("{role} may not move a picking from {from} to {to}")]
    InvalidTransition { role: Role, from: Status, to: Status },

    #[error("Folio not found: {folio}")]
    NotFound { folio: Folio },

    #[error("Row {row} is malformed: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Folio {folio} skipped: {reason}")]
    DuplicateFolio { folio: Folio, reason: DuplicateReason },

    #[error("Record store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Partial write: {persisted} rows persisted, {not_persisted} rows not persisted ({reason})")]
    PartialWriteFailure {
        persisted: usize,
        not_persisted: usize,
        reason: String,
    },

    #[error("Folio {folio} kept changing underneath us; gave up after {attempts} attempts")]
    ConcurrentModification { folio: Folio, attempts: u32 },

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("QR already registered: {qr}")]
    DuplicateScan { qr: String },

    #[error("QR not found: {qr}")]
    ScanNotFound { qr: String },
}

impl PickingError {
    /// True for failures caused by the caller's role or ownership
    pub fn is_authorization(&self) -> bool {
        matches!(self, PickingError::AuthorizationDenied { .. })
    }

    /// True for store-side failures that a caller may retry later
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            PickingError::StoreUnavailable { .. } | PickingError::PartialWriteFailure { .. }
        )
    }
}

impl From<StoreError> for PickingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(folio) => PickingError::NotFound { folio },
            StoreError::DuplicateKey(key) => match Folio::new(&key) {
                Ok(folio) => PickingError::DuplicateFolio {
                    folio,
                    reason: DuplicateReason::AlreadyExists,
                },
                Err(_) => PickingError::StoreUnavailable {
                    reason: format!("duplicate key rejected by store: {key}"),
                },
            },
            other => PickingError::StoreUnavailable {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let folio = Folio::new("F1").unwrap();
        let err: PickingError = StoreError::NotFound(folio.clone()).into();
        assert_eq!(err, PickingError::NotFound { folio });
    }

    #[test]
    fn test_store_unavailable_is_store_failure() {
        let err: PickingError = StoreError::Unavailable("lock busy".to_string()).into();
        assert!(err.is_store_failure());
        assert!(!err.is_authorization());
    }

    #[test]
    fn test_duplicate_reason_display_uses_report_names() {
        assert_eq!(DuplicateReason::AlreadyExists.to_string(), "already_exists");
        assert_eq!(
            DuplicateReason::DuplicateInBatch.to_string(),
            "duplicate_in_batch"
        );
    }
}

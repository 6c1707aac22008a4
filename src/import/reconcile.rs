// Bulk import reconciliation
//
// Partitions incoming rows against a snapshot of existing folios. Pure: no
// store access happens here, so the result is only as fresh as the snapshot.
// The store still rejects any folio the snapshot missed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::source::ImportRow;
use crate::domain::{Folio, PickingRecord};
use crate::error::{DuplicateReason, PickingError};

/// Final (or, straight out of `reconcile`, provisional) fate of one input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    /// Passed reconciliation; not yet confirmed by the store
    Accepted,
    Inserted,
    AlreadyExists,
    DuplicateInBatch,
    Malformed { reason: String },
    /// Accepted, but the store never confirmed the write
    NotPersisted { reason: String },
    /// Rejected as existing after an earlier attempt for this batch failed;
    /// that attempt may have written it
    Unconfirmed { reason: String },
}

impl RowOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RowOutcome::Accepted => "accepted",
            RowOutcome::Inserted => "inserted",
            RowOutcome::AlreadyExists => "skipped-already-exists",
            RowOutcome::DuplicateInBatch => "skipped-duplicate-in-batch",
            RowOutcome::Malformed { .. } => "skipped-malformed",
            RowOutcome::NotPersisted { .. } => "not-persisted",
            RowOutcome::Unconfirmed { .. } => "unconfirmed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowReport {
    /// Position of the row in the incoming batch, starting at 0
    pub index: usize,
    pub folio: Option<Folio>,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

impl RowReport {
    /// The per-row error this outcome stands for, if any
    pub fn error(&self) -> Option<PickingError> {
        let duplicate = |reason| {
            self.folio.clone().map(|folio| PickingError::DuplicateFolio { folio, reason })
        };
        match &self.outcome {
            RowOutcome::AlreadyExists => duplicate(DuplicateReason::AlreadyExists),
            RowOutcome::DuplicateInBatch => duplicate(DuplicateReason::DuplicateInBatch),
            RowOutcome::Malformed { reason } => Some(PickingError::MalformedRow {
                row: self.index,
                reason: reason.clone(),
            }),
            RowOutcome::Accepted
            | RowOutcome::Inserted
            | RowOutcome::NotPersisted { .. }
            | RowOutcome::Unconfirmed { .. } => None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(
            self.outcome,
            RowOutcome::AlreadyExists | RowOutcome::DuplicateInBatch
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// New records, pending and unassigned, in batch order
    pub insert_set: Vec<PickingRecord>,
    /// One entry per input row, in input order
    pub rows: Vec<RowReport>,
}

impl Reconciliation {
    /// Rows excluded because their folio already exists or repeats in the batch
    pub fn duplicate_report(&self) -> impl Iterator<Item = &RowReport> {
        self.rows.iter().filter(|row| row.is_duplicate())
    }
}

/// Split `incoming` into new records and rejected rows.
///
/// The first occurrence of a new folio wins; later repeats are
/// `DuplicateInBatch`. A folio already in `existing` is `AlreadyExists` every
/// time it appears.
pub fn reconcile<I>(existing: &HashSet<Folio>, incoming: I) -> Reconciliation
where
    I: IntoIterator<Item = ImportRow>,
{
    let mut seen_in_batch: HashSet<Folio> = HashSet::new();
    let mut result = Reconciliation::default();

    for (index, row) in incoming.into_iter().enumerate() {
        let folio = match row.folio().map(Folio::new) {
            Some(Ok(folio)) => folio,
            _ => {
                result.rows.push(RowReport {
                    index,
                    folio: None,
                    outcome: RowOutcome::Malformed {
                        reason: "missing FOLIO value".to_string(),
                    },
                });
                continue;
            }
        };

        let outcome = if existing.contains(&folio) {
            RowOutcome::AlreadyExists
        } else if !seen_in_batch.insert(folio.clone()) {
            RowOutcome::DuplicateInBatch
        } else {
            result
                .insert_set
                .push(PickingRecord::pending(folio.clone(), row.metadata()));
            RowOutcome::Accepted
        };

        result.rows.push(RowReport {
            index,
            folio: Some(folio),
            outcome,
        });
    }

    result
}

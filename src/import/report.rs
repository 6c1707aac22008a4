use serde::Serialize;

use super::reconcile::{RowOutcome, RowReport};
use crate::error::PickingError;

/// Full accounting of one bulk import: exactly one outcome per input row,
/// plus the batch-level store failure when not every accepted row was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows: Vec<RowReport>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "display_error")]
    pub batch_error: Option<PickingError>,
}

fn display_error<S: serde::Serializer>(
    error: &Option<PickingError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_str(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub inserted: usize,
    pub already_exists: usize,
    pub duplicate_in_batch: usize,
    pub malformed: usize,
    pub not_persisted: usize,
    pub unconfirmed: usize,
}

impl ImportCounts {
    pub fn skipped(&self) -> usize {
        self.already_exists + self.duplicate_in_batch + self.malformed
    }
}

impl ImportReport {
    pub fn counts(&self) -> ImportCounts {
        let mut counts = ImportCounts::default();
        for row in &self.rows {
            match row.outcome {
                RowOutcome::Inserted => counts.inserted += 1,
                RowOutcome::AlreadyExists => counts.already_exists += 1,
                RowOutcome::DuplicateInBatch => counts.duplicate_in_batch += 1,
                RowOutcome::Malformed { .. } => counts.malformed += 1,
                // Accepted never survives persistence; count it as unconfirmed
                RowOutcome::NotPersisted { .. } | RowOutcome::Accepted => {
                    counts.not_persisted += 1
                }
                RowOutcome::Unconfirmed { .. } => counts.unconfirmed += 1,
            }
        }
        counts
    }

    /// Whether every accepted row is confirmed persisted
    pub fn is_complete(&self) -> bool {
        self.batch_error.is_none()
    }

    /// Rows whose folio conflicted with the store or the batch
    pub fn duplicates(&self) -> impl Iterator<Item = &RowReport> {
        self.rows.iter().filter(|row| row.is_duplicate())
    }

    pub fn summary(&self) -> String {
        let counts = self.counts();
        let mut summary = if counts.inserted == 0 && counts.not_persisted == 0 && counts.unconfirmed == 0 {
            "No new records to add.".to_string()
        } else {
            format!("Added {} new records.", counts.inserted)
        };
        summary.push_str(&format!(
            " Skipped {} existing, {} repeated in batch, {} malformed.",
            counts.already_exists, counts.duplicate_in_batch, counts.malformed
        ));
        if counts.not_persisted > 0 {
            summary.push_str(&format!(" {} rows NOT saved.", counts.not_persisted));
        }
        if counts.unconfirmed > 0 {
            summary.push_str(&format!(
                " {} rows unconfirmed: a failed attempt may have saved them.",
                counts.unconfirmed
            ));
        }
        summary
    }
}

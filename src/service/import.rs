// Bulk import: snapshot, reconcile, persist with retry, account for every row

use std::collections::{HashMap, HashSet};
use tracing::{info, warn, Instrument};

use super::PickingService;
use crate::access::Action;
use crate::domain::{Actor, Folio, PickingRecord};
use crate::error::PickingError;
use crate::import::{reconcile, ImportReport, ImportRow, Reconciliation, RowOutcome, RowReport};
use crate::observability::{workflow_metrics, OperationTimer};
use crate::store::{InsertRejection, RecordStore};
use crate::telemetry::{create_operation_span, generate_correlation_id};

impl<S: RecordStore> PickingService<S> {
    /// Import a batch of rows.
    ///
    /// Row-level problems (missing folio, duplicates) never abort the batch.
    /// `Err` is returned only when the actor may not import or the snapshot of
    /// existing folios cannot be read; store failures while writing are carried
    /// in the report's `batch_error`, with rows the store never confirmed marked
    /// `NotPersisted` or `Unconfirmed`.
    pub async fn import_rows(
        &self,
        actor: &Actor,
        rows: Vec<ImportRow>,
    ) -> Result<ImportReport, PickingError> {
        self.policy().ensure(actor, Action::BulkImport, None)?;

        let span = create_operation_span(
            "bulk_import",
            actor.identity.as_str(),
            None,
            &generate_correlation_id(),
        );
        self.run_import(actor, rows).instrument(span).await
    }

    async fn run_import(
        &self,
        actor: &Actor,
        rows: Vec<ImportRow>,
    ) -> Result<ImportReport, PickingError> {
        let timer = OperationTimer::new("bulk_import");
        let incoming = rows.len();

        let snapshot = self
            .import_retry
            .run("read_all", || self.store.read_all())
            .await?;
        let existing: HashSet<Folio> = snapshot.into_iter().map(|r| r.folio).collect();

        let Reconciliation {
            insert_set,
            mut rows,
        } = reconcile(&existing, rows);

        let batch_error = self.persist(&mut rows, insert_set).await;
        let report = ImportReport { rows, batch_error };

        let counts = report.counts();
        workflow_metrics().record_import(counts.inserted, counts.skipped());
        info!(
            actor = %actor.identity,
            rows = incoming,
            inserted = counts.inserted,
            already_exists = counts.already_exists,
            duplicate_in_batch = counts.duplicate_in_batch,
            malformed = counts.malformed,
            not_persisted = counts.not_persisted,
            unconfirmed = counts.unconfirmed,
            "Bulk import finished"
        );
        timer.finish();

        Ok(report)
    }

    /// Write the accepted rows, retrying what the store did not confirm.
    /// Returns the batch-level error if any accepted row is left unconfirmed.
    async fn persist(
        &self,
        rows: &mut [RowReport],
        insert_set: Vec<PickingRecord>,
    ) -> Option<PickingError> {
        let row_of: HashMap<Folio, usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.outcome == RowOutcome::Accepted)
            .filter_map(|(pos, row)| row.folio.clone().map(|folio| (folio, pos)))
            .collect();

        let mut pending = insert_set;
        if pending.is_empty() {
            return None;
        }

        // Folios sent in an attempt that returned an error: the adapter may
        // have written some of them before failing
        let mut maybe_written: HashSet<Folio> = HashSet::new();
        let mut delays = self.import_retry.strategy();
        let mut persisted = 0usize;
        let mut last_failure = String::new();
        let mut attempt = 1u32;

        loop {
            match self.store.insert_batch(pending.clone()).await {
                Ok(outcome) => {
                    for folio in &outcome.inserted {
                        if let Some(&pos) = row_of.get(folio) {
                            rows[pos].outcome = RowOutcome::Inserted;
                            persisted += 1;
                        }
                    }
                    for (folio, rejection) in &outcome.rejected {
                        if *rejection != InsertRejection::AlreadyExists {
                            continue;
                        }
                        let Some(&pos) = row_of.get(folio) else { continue };
                        if maybe_written.contains(folio) {
                            warn!(folio = %folio, "Folio exists after a failed attempt; write unconfirmed");
                            rows[pos].outcome = RowOutcome::Unconfirmed {
                                reason: last_failure.clone(),
                            };
                        } else {
                            warn!(folio = %folio, "Folio inserted concurrently; skipping");
                            rows[pos].outcome = RowOutcome::AlreadyExists;
                        }
                    }
                    if let Some((_, reason)) = outcome.failed().last() {
                        last_failure = reason.to_string();
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(attempt = attempt, error = %err, "Batch insert failed, will retry");
                    last_failure = err.to_string();
                    maybe_written.extend(pending.iter().map(|record| record.folio.clone()));
                }
                Err(err) => {
                    warn!(attempt = attempt, error = %err, "Batch insert failed permanently");
                    last_failure = err.to_string();
                    maybe_written.extend(pending.iter().map(|record| record.folio.clone()));
                    break;
                }
            }

            // Anything the store neither confirmed nor rejected is still pending
            pending.retain(|record| {
                row_of
                    .get(&record.folio)
                    .map(|&pos| rows[pos].outcome == RowOutcome::Accepted)
                    .unwrap_or(false)
            });
            if pending.is_empty() {
                break;
            }
            let Some(delay) = delays.next() else { break };
            tokio::time::sleep(delay).await;
            attempt += 1;
        }

        let unconfirmed = rows
            .iter()
            .filter(|row| matches!(row.outcome, RowOutcome::Unconfirmed { .. }))
            .count();
        if pending.is_empty() && unconfirmed == 0 {
            return None;
        }

        if last_failure.is_empty() {
            last_failure = "store did not confirm the write".to_string();
        }
        for record in &pending {
            if let Some(&pos) = row_of.get(&record.folio) {
                rows[pos].outcome = RowOutcome::NotPersisted {
                    reason: last_failure.clone(),
                };
            }
        }

        let not_persisted = pending.len() + unconfirmed;
        tracing::error!(
            persisted = persisted,
            not_persisted = pending.len(),
            unconfirmed = unconfirmed,
            reason = %last_failure,
            "Bulk import left rows unsaved or unconfirmed"
        );
        Some(if persisted == 0 {
            PickingError::StoreUnavailable {
                reason: last_failure,
            }
        } else {
            PickingError::PartialWriteFailure {
                persisted,
                not_persisted,
                reason: last_failure,
            }
        })
    }
}

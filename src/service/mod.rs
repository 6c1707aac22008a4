// Picking service: the entry point the presentation layer calls.
//
// Every request is (actor, action, target). Reads of the full table are
// snapshots; mutations re-read the single record, re-authorize against that
// fresh value, and write with compare-and-set, retrying on a lost race.

mod import;
mod scans;
mod status;

use std::sync::Arc;
use tracing::debug;

use crate::access::{AccessPolicy, Action};
use crate::config::PickingControlConfig;
use crate::domain::{Actor, AuditEvent, Folio, PickingRecord, RecordUpdate, UserId};
use crate::error::PickingError;
use crate::observability::workflow_metrics;
use crate::store::{RecordStore, RetryPolicy, StoreError};
use crate::visibility::{visible_records, RecordFilter};
use crate::workflows::{StatusStateMachine, TransitionPlan};

/// Result of a status change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The record as stored after the request
    pub record: PickingRecord,
    pub plan: TransitionPlan,
    /// Present when something was written
    pub event: Option<AuditEvent>,
}

/// Result of a reassignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignOutcome {
    pub record: PickingRecord,
    pub previous_operator: Option<UserId>,
    pub event: AuditEvent,
}

enum Written {
    Unchanged(PickingRecord),
    Updated(PickingRecord),
}

pub struct PickingService<S> {
    store: Arc<S>,
    machine: StatusStateMachine,
    max_conflict_retries: u32,
    store_retry: RetryPolicy,
    import_retry: RetryPolicy,
}

impl<S> PickingService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            machine: StatusStateMachine::default(),
            max_conflict_retries: 3,
            store_retry: RetryPolicy::default(),
            import_retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(store: Arc<S>, config: &PickingControlConfig) -> Self {
        Self::new(store)
            .with_conflict_retries(config.workflow.max_conflict_retries)
            .with_store_retry(RetryPolicy::from(&config.workflow.retry))
            .with_import_retry(RetryPolicy::from(&config.import.retry))
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.machine = StatusStateMachine::new(policy);
        self
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Backoff for reads and compare-and-set writes outside of imports
    pub fn with_store_retry(mut self, retry: RetryPolicy) -> Self {
        self.store_retry = retry;
        self
    }

    pub fn with_import_retry(mut self, retry: RetryPolicy) -> Self {
        self.import_retry = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &AccessPolicy {
        self.machine.policy()
    }
}

impl<S: RecordStore> PickingService<S> {
    /// Every record the actor may see, in store order
    pub async fn visible_records(&self, actor: &Actor) -> Result<Vec<PickingRecord>, PickingError> {
        self.policy().ensure(actor, Action::ViewRecords, None)?;
        let snapshot = self
            .store_retry
            .run("read_all", || self.store.read_all())
            .await?;
        Ok(visible_records(self.policy(), actor, snapshot))
    }

    /// Visible records narrowed by dashboard criteria
    pub async fn dashboard(
        &self,
        actor: &Actor,
        filter: &RecordFilter,
    ) -> Result<Vec<PickingRecord>, PickingError> {
        Ok(filter.apply(self.visible_records(actor).await?))
    }

    /// One record, if the actor may see it
    pub async fn record(&self, actor: &Actor, folio: &Folio) -> Result<PickingRecord, PickingError> {
        let record = self.read_fresh(folio).await?;
        self.policy().ensure(actor, Action::ViewRecords, Some(&record))?;
        Ok(record)
    }

    async fn read_fresh(&self, folio: &Folio) -> Result<PickingRecord, PickingError> {
        self.store_retry
            .run("read_one", || self.store.read_one(folio))
            .await?
            .ok_or_else(|| PickingError::NotFound {
                folio: folio.clone(),
            })
    }

    /// Read-modify-write on one record.
    ///
    /// `decide` sees the freshly read record on every attempt and returns the
    /// update to write, or `None` for a no-op. A lost compare-and-set re-reads
    /// and asks again.
    async fn compare_and_set<F>(&self, folio: &Folio, mut decide: F) -> Result<Written, PickingError>
    where
        F: FnMut(&PickingRecord) -> Result<Option<RecordUpdate>, PickingError> + Send,
    {
        let attempts = self.max_conflict_retries + 1;
        for attempt in 1..=attempts {
            let current = self.read_fresh(folio).await?;
            let Some(update) = decide(&current)? else {
                return Ok(Written::Unchanged(current));
            };

            let written = self
                .store_retry
                .run("update_one", || {
                    self.store.update_one(folio, current.version, update.clone())
                })
                .await;
            match written {
                Ok(written) => return Ok(Written::Updated(written)),
                Err(StoreError::VersionConflict { expected, found, .. }) => {
                    workflow_metrics().record_conflict_retry();
                    debug!(
                        folio = %folio,
                        attempt = attempt,
                        expected = expected,
                        found = found,
                        "Record changed since read, re-checking"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::warn!(folio = %folio, attempts = attempts, "Giving up after repeated write conflicts");
        Err(PickingError::ConcurrentModification {
            folio: folio.clone(),
            attempts,
        })
    }
}

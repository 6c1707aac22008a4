// Status transitions and operator reassignment

use tracing::{info, Instrument};

use super::{PickingService, ReassignOutcome, TransitionOutcome, Written};
use crate::access::Action;
use crate::domain::{Actor, AuditEvent, Folio, RecordUpdate, Status, UserId};
use crate::error::PickingError;
use crate::observability::workflow_metrics;
use crate::store::RecordStore;
use crate::telemetry::{create_operation_span, generate_correlation_id};
use crate::workflows::TransitionPlan;

impl<S: RecordStore> PickingService<S> {
    /// Move `folio` to `new_status` on behalf of `actor`.
    ///
    /// Authorization, ownership and the status table are checked against the
    /// record as read immediately before the write, never against an earlier
    /// snapshot.
    pub async fn transition(
        &self,
        actor: &Actor,
        folio: &Folio,
        new_status: Status,
    ) -> Result<TransitionOutcome, PickingError> {
        let span = create_operation_span(
            "set_status",
            actor.identity.as_str(),
            Some(folio.as_str()),
            &generate_correlation_id(),
        );

        self.apply_transition(actor, folio, new_status)
            .instrument(span)
            .await
    }

    async fn apply_transition(
        &self,
        actor: &Actor,
        folio: &Folio,
        new_status: Status,
    ) -> Result<TransitionOutcome, PickingError> {
        let mut last_plan = None;
        let written = self
            .compare_and_set(folio, |current| {
                let plan = self.machine.plan(actor, current, new_status)?;
                last_plan = Some(plan);
                Ok(match plan {
                    TransitionPlan::NoChange { .. } => None,
                    TransitionPlan::Change { to, .. } => Some(RecordUpdate::status(to)),
                })
            })
            .await?;

        let plan = last_plan.unwrap_or(TransitionPlan::NoChange { status: new_status });
        match written {
            Written::Unchanged(record) => {
                workflow_metrics().record_noop_transition();
                info!(folio = %folio, status = %new_status, "Status already set, nothing to do");
                Ok(TransitionOutcome {
                    record,
                    plan,
                    event: None,
                })
            }
            Written::Updated(record) => {
                workflow_metrics().record_transition();
                let event = AuditEvent::status_changed(folio, new_status, &actor.identity);
                info!(
                    folio = %folio,
                    actor = %actor.identity,
                    role = %actor.role,
                    to = %new_status,
                    version = record.version,
                    "{}",
                    event.description
                );
                Ok(TransitionOutcome {
                    record,
                    plan,
                    event: Some(event),
                })
            }
        }
    }

    /// Hand `folio` to `new_operator`. Administrative only; the status is left as is.
    pub async fn reassign(
        &self,
        actor: &Actor,
        folio: &Folio,
        new_operator: UserId,
    ) -> Result<ReassignOutcome, PickingError> {
        // Role check first: a denied actor learns nothing about the folio
        self.policy().ensure(actor, Action::Reassign, None)?;

        let span = create_operation_span(
            "reassign",
            actor.identity.as_str(),
            Some(folio.as_str()),
            &generate_correlation_id(),
        );

        self.apply_reassignment(actor, folio, new_operator)
            .instrument(span)
            .await
    }

    async fn apply_reassignment(
        &self,
        actor: &Actor,
        folio: &Folio,
        new_operator: UserId,
    ) -> Result<ReassignOutcome, PickingError> {
        let mut previous_operator = None;
        let written = self
            .compare_and_set(folio, |current| {
                self.policy().ensure(actor, Action::Reassign, Some(current))?;
                previous_operator = current.assigned_operator.clone();
                Ok(Some(RecordUpdate::assign(new_operator.clone())))
            })
            .await?;

        let record = match written {
            Written::Updated(record) | Written::Unchanged(record) => record,
        };
        workflow_metrics().record_reassignment();
        let event = AuditEvent::reassigned(folio, &new_operator, &actor.identity);
        info!(
            folio = %folio,
            actor = %actor.identity,
            from = ?previous_operator.as_ref().map(|o| o.as_str()),
            to = %new_operator,
            "{}",
            event.description
        );

        Ok(ReassignOutcome {
            record,
            previous_operator,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metadata, PickingRecord};
    use crate::access::{AccessPolicy, Capabilities, RecordScope};
    use crate::domain::Role;
    use crate::store::{InMemoryRecordStore, MockRecordStore, RetryPolicy, StoreError};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
        }
    }

    fn record(folio: &str, status: Status, owner: Option<&str>) -> PickingRecord {
        let mut record = PickingRecord::pending(Folio::new(folio).unwrap(), Metadata::new());
        record.status = status;
        record.assigned_operator = owner.map(|o| UserId::new(o).unwrap());
        record
    }

    fn service(records: Vec<PickingRecord>) -> PickingService<InMemoryRecordStore> {
        PickingService::new(Arc::new(InMemoryRecordStore::with_records(records)))
    }

    #[tokio::test]
    async fn test_transition_writes_only_status() {
        let svc = service(vec![record("X", Status::Surtido, Some("Juan"))]);
        let juan = Actor::capturista("Juan").unwrap();
        let folio = Folio::new("X").unwrap();

        let outcome = svc.transition(&juan, &folio, Status::Capturado).await.unwrap();
        assert_eq!(outcome.record.status, Status::Capturado);
        assert_eq!(outcome.record.assigned_operator, Some(UserId::new("Juan").unwrap()));
        assert_eq!(outcome.record.version, 2);
        assert_eq!(
            outcome.event.unwrap().description,
            "Status changed to CAPTURADO by Juan"
        );
    }

    #[tokio::test]
    async fn test_noop_transition_does_not_write() {
        let svc = service(vec![record("X", Status::Surtido, Some("Juan"))]);
        let juan = Actor::capturista("Juan").unwrap();
        let folio = Folio::new("X").unwrap();

        let outcome = svc.transition(&juan, &folio, Status::Surtido).await.unwrap();
        assert!(outcome.event.is_none());
        assert_eq!(outcome.record.version, 1);
        assert_eq!(outcome.plan, TransitionPlan::NoChange { status: Status::Surtido });
    }

    #[tokio::test]
    async fn test_unknown_folio_is_not_found() {
        let svc = service(vec![]);
        let admin = Actor::responsable("Admin").unwrap();

        let err = svc
            .transition(&admin, &Folio::new("NOPE").unwrap(), Status::Surtido)
            .await
            .unwrap_err();
        assert!(matches!(err, PickingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reassign_denied_for_capturista_without_reading() {
        let mut store = MockRecordStore::new();
        store.expect_read_one().never();
        store.expect_update_one().never();
        let svc = PickingService::new(Arc::new(store));
        let juan = Actor::capturista("Juan").unwrap();

        let err = svc
            .reassign(&juan, &Folio::new("X").unwrap(), UserId::new("Juan").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_authorization());
    }

    #[tokio::test]
    async fn test_reassign_keeps_status() {
        let svc = service(vec![record("X", Status::EnValidacion, Some("U1"))]);
        let admin = Actor::responsable("Admin").unwrap();

        let outcome = svc
            .reassign(&admin, &Folio::new("X").unwrap(), UserId::new("U2").unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.previous_operator, Some(UserId::new("U1").unwrap()));
        assert_eq!(outcome.record.assigned_operator, Some(UserId::new("U2").unwrap()));
        assert_eq!(outcome.record.status, Status::EnValidacion);
    }

    #[tokio::test]
    async fn test_reassign_unknown_folio_is_not_found() {
        let svc = service(vec![]);
        let admin = Actor::responsable("Admin").unwrap();

        let err = svc
            .reassign(&admin, &Folio::new("X").unwrap(), UserId::new("U2").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PickingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_ownership_rechecked_after_concurrent_reassignment() {
        // First read says Juan owns X; by the time of the write Maria does.
        let mut store = MockRecordStore::new();
        let mut reads = vec![
            record("X", Status::Surtido, Some("Maria")),
            record("X", Status::Surtido, Some("Juan")),
        ];
        store
            .expect_read_one()
            .times(2)
            .returning(move |_| {
                let mut next = reads.pop().unwrap();
                if next.assigned_operator.as_ref().map(|o| o.as_str()) == Some("Maria") {
                    next.version = 2;
                }
                Ok(Some(next))
            });
        store
            .expect_update_one()
            .times(1)
            .returning(|folio, expected, _| {
                Err(StoreError::VersionConflict {
                    folio: folio.clone(),
                    expected,
                    found: 2,
                })
            });

        let svc = PickingService::new(Arc::new(store));
        let juan = Actor::capturista("Juan").unwrap();

        let err = svc
            .transition(&juan, &Folio::new("X").unwrap(), Status::Capturado)
            .await
            .unwrap_err();
        assert!(err.is_authorization());
    }

    #[tokio::test]
    async fn test_persistent_conflicts_give_up() {
        let mut store = MockRecordStore::new();
        store
            .expect_read_one()
            .returning(|_| Ok(Some(record("X", Status::Surtido, None))));
        store.expect_update_one().times(3).returning(|folio, expected, _| {
            Err(StoreError::VersionConflict {
                folio: folio.clone(),
                expected,
                found: expected + 1,
            })
        });

        let svc = PickingService::new(Arc::new(store)).with_conflict_retries(2);
        let admin = Actor::responsable("Admin").unwrap();

        let err = svc
            .transition(&admin, &Folio::new("X").unwrap(), Status::DocLista)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PickingError::ConcurrentModification {
                folio: Folio::new("X").unwrap(),
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn test_store_outage_surfaces_as_unavailable() {
        let mut store = MockRecordStore::new();
        store
            .expect_read_one()
            .returning(|_| Err(StoreError::Unavailable("connection refused".to_string())));

        let svc = PickingService::new(Arc::new(store)).with_store_retry(fast_retry(2));
        let admin = Actor::responsable("Admin").unwrap();

        let err = svc
            .transition(&admin, &Folio::new("X").unwrap(), Status::DocLista)
            .await
            .unwrap_err();
        assert!(matches!(err, PickingError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_transient_read_and_write_failures_are_retried() {
        let mut store = MockRecordStore::new();
        let mut read_failures = 1;
        store.expect_read_one().times(2).returning(move |_| {
            if read_failures > 0 {
                read_failures -= 1;
                return Err(StoreError::Unavailable("lock busy".to_string()));
            }
            Ok(Some(record("X", Status::Surtido, None)))
        });
        let mut write_failures = 1;
        store
            .expect_update_one()
            .times(2)
            .returning(move |_, expected, update| {
                if write_failures > 0 {
                    write_failures -= 1;
                    return Err(StoreError::Unavailable("lock busy".to_string()));
                }
                let mut written = record("X", Status::Surtido, None);
                written.apply(&update);
                written.version = expected + 1;
                Ok(written)
            });

        let svc = PickingService::new(Arc::new(store)).with_store_retry(fast_retry(3));
        let admin = Actor::responsable("Admin").unwrap();

        let outcome = svc
            .transition(&admin, &Folio::new("X").unwrap(), Status::DocLista)
            .await
            .unwrap();
        assert_eq!(outcome.record.status, Status::DocLista);
        assert_eq!(outcome.record.version, 2);
    }

    #[tokio::test]
    async fn test_custom_policy_is_enforced() {
        let read_only = Capabilities {
            actions: [Action::ViewRecords].into_iter().collect(),
            scope: RecordScope::Owned,
            target_statuses: Status::OPERATIVE.into_iter().collect(),
            source_statuses: Status::OPERATIVE.into_iter().collect(),
        };
        let svc = service(vec![record("X", Status::Surtido, Some("Juan"))])
            .with_policy(AccessPolicy::standard().with_capabilities(Role::Capturista, read_only));
        let juan = Actor::capturista("Juan").unwrap();
        let folio = Folio::new("X").unwrap();

        let err = svc.transition(&juan, &folio, Status::Capturado).await.unwrap_err();
        assert!(err.is_authorization());
        assert_eq!(svc.record(&juan, &folio).await.unwrap().status, Status::Surtido);
    }
}

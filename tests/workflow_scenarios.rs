//! End-to-end workflow scenarios against the in-memory store
//!
//! Each test drives the public service API the way a session would: import,
//! assign, work the picking, and check who sees what.

use picking_control::{
    Actor, Folio, ImportRow, InMemoryRecordStore, PickingError, PickingService, RecordFilter,
    RecordStore, RowOutcome, Status, UserId,
};
use std::sync::Arc;

fn rows(folios: &[&str]) -> Vec<ImportRow> {
    folios
        .iter()
        .map(|folio| ImportRow::from_columns([("folio", *folio), ("cliente", "ACME")]))
        .collect()
}

fn folio(raw: &str) -> Folio {
    Folio::new(raw).unwrap()
}

fn user(raw: &str) -> UserId {
    UserId::new(raw).unwrap()
}

async fn seeded(folios: &[&str]) -> PickingService<InMemoryRecordStore> {
    let service = PickingService::new(Arc::new(InMemoryRecordStore::new()));
    let admin = Actor::responsable("Admin").unwrap();
    let report = service.import_rows(&admin, rows(folios)).await.unwrap();
    assert!(report.is_complete());
    service
}

#[tokio::test]
async fn test_import_reconciles_against_existing_folios() {
    let service = seeded(&["A", "B"]).await;
    let admin = Actor::responsable("Admin").unwrap();

    let report = service
        .import_rows(&admin, rows(&["A", "C", "C", ""]))
        .await
        .unwrap();

    let outcomes: Vec<_> = report.rows.iter().map(|r| r.outcome.clone()).collect();
    assert_eq!(outcomes[0], RowOutcome::AlreadyExists);
    assert_eq!(outcomes[1], RowOutcome::Inserted);
    assert_eq!(outcomes[2], RowOutcome::DuplicateInBatch);
    assert!(matches!(outcomes[3], RowOutcome::Malformed { .. }));

    let stored = service.store().read_all().await.unwrap();
    let folios: Vec<_> = stored.iter().map(|r| r.folio.as_str()).collect();
    assert_eq!(folios, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_reimporting_the_same_batch_inserts_nothing() {
    let service = seeded(&["A", "B", "C"]).await;
    let admin = Actor::responsable("Admin").unwrap();

    let report = service
        .import_rows(&admin, rows(&["A", "B", "C"]))
        .await
        .unwrap();

    assert_eq!(report.counts().inserted, 0);
    assert!(report
        .rows
        .iter()
        .all(|row| row.outcome == RowOutcome::AlreadyExists));
    assert_eq!(service.store().read_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_metadata_survives_import() {
    let service = seeded(&["A"]).await;
    let admin = Actor::responsable("Admin").unwrap();

    let record = service.record(&admin, &folio("A")).await.unwrap();
    assert_eq!(record.metadata.get("CLIENTE"), Some("ACME"));
    assert_eq!(record.metadata.get("FOLIO"), None);
}

#[tokio::test]
async fn test_capturista_cannot_touch_unowned_folio() {
    let service = seeded(&["X", "Y"]).await;
    let admin = Actor::responsable("Admin").unwrap();
    let juan = Actor::capturista("Juan").unwrap();

    service.reassign(&admin, &folio("X"), user("Juan")).await.unwrap();
    service.transition(&admin, &folio("X"), Status::Surtido).await.unwrap();

    let err = service
        .transition(&juan, &folio("Y"), Status::Capturado)
        .await
        .unwrap_err();
    assert!(matches!(err, PickingError::AuthorizationDenied { .. }));

    let untouched = service.record(&admin, &folio("Y")).await.unwrap();
    assert_eq!(untouched.status, Status::Pending);
}

#[tokio::test]
async fn test_capturista_status_rules_are_reported_as_invalid_transitions() {
    let service = seeded(&["X"]).await;
    let admin = Actor::responsable("Admin").unwrap();
    let juan = Actor::capturista("Juan").unwrap();
    service.reassign(&admin, &folio("X"), user("Juan")).await.unwrap();

    // Still PENDIENTE: operators may not move a record out of it
    let err = service
        .transition(&juan, &folio("X"), Status::Surtido)
        .await
        .unwrap_err();
    assert!(matches!(err, PickingError::InvalidTransition { .. }));

    service.transition(&admin, &folio("X"), Status::Surtido).await.unwrap();
    for next in [Status::Capturado, Status::EnValidacion, Status::DocLista] {
        let outcome = service.transition(&juan, &folio("X"), next).await.unwrap();
        assert_eq!(outcome.record.status, next);
    }

    for forbidden in [Status::Pending, Status::Liberado] {
        let err = service
            .transition(&juan, &folio("X"), forbidden)
            .await
            .unwrap_err();
        assert!(matches!(err, PickingError::InvalidTransition { .. }));
    }
}

#[tokio::test]
async fn test_reassignment_moves_visibility() {
    let service = seeded(&["X", "Z"]).await;
    let admin = Actor::responsable("Admin").unwrap();
    let u1 = Actor::capturista("U1").unwrap();
    let u2 = Actor::capturista("U2").unwrap();

    service.reassign(&admin, &folio("X"), user("U1")).await.unwrap();
    assert_eq!(service.visible_records(&u1).await.unwrap().len(), 1);
    assert!(service.visible_records(&u2).await.unwrap().is_empty());

    let outcome = service.reassign(&admin, &folio("X"), user("U2")).await.unwrap();
    assert_eq!(outcome.previous_operator, Some(user("U1")));
    assert_eq!(outcome.event.description, "Reassigned to U2 by Admin");

    assert!(service.visible_records(&u1).await.unwrap().is_empty());
    let visible = service.visible_records(&u2).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].folio, folio("X"));

    let err = service.record(&u1, &folio("X")).await.unwrap_err();
    assert!(err.is_authorization());
}

#[tokio::test]
async fn test_responsable_may_skip_states() {
    let service = seeded(&["X"]).await;
    let admin = Actor::responsable("Admin").unwrap();

    let outcome = service
        .transition(&admin, &folio("X"), Status::DocLista)
        .await
        .unwrap();
    assert_eq!(outcome.record.status, Status::DocLista);

    let outcome = service
        .transition(&admin, &folio("X"), Status::Pending)
        .await
        .unwrap();
    assert_eq!(outcome.record.status, Status::Pending);
}

#[tokio::test]
async fn test_dashboard_narrows_visible_records() {
    let service = seeded(&["PK-100", "PK-101", "OT-200"]).await;
    let admin = Actor::responsable("Admin").unwrap();
    service.transition(&admin, &folio("PK-101"), Status::Surtido).await.unwrap();
    service.reassign(&admin, &folio("PK-101"), user("Juan")).await.unwrap();

    let by_search = service
        .dashboard(&admin, &RecordFilter::new().with_folio_search("pk-"))
        .await
        .unwrap();
    assert_eq!(by_search.len(), 2);

    let by_status = service
        .dashboard(&admin, &RecordFilter::new().with_status(Status::Surtido))
        .await
        .unwrap();
    assert_eq!(by_status.len(), 1);
    assert_eq!(by_status[0].folio, folio("PK-101"));

    let by_operator = service
        .dashboard(&admin, &RecordFilter::new().with_operator(user("Juan")))
        .await
        .unwrap();
    assert_eq!(by_operator.len(), 1);
}

#[tokio::test]
async fn test_concurrent_transitions_never_lose_a_write() {
    let service = Arc::new(seeded(&["X"]).await);
    let admin = Actor::responsable("Admin").unwrap();

    let mut handles = Vec::new();
    for status in [Status::Surtido, Status::Capturado, Status::EnValidacion, Status::DocLista] {
        let service = service.clone();
        let admin = admin.clone();
        handles.push(tokio::spawn(async move {
            service.transition(&admin, &Folio::new("X").unwrap(), status).await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().event.is_some() {
            applied += 1;
        }
    }

    let record = service.record(&admin, &folio("X")).await.unwrap();
    assert_eq!(record.version, 1 + applied);
}

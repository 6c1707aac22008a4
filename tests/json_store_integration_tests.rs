//! Integration tests for the file-backed store
//!
//! Two services opened on the same file stand in for two independent sessions.

use picking_control::{
    Actor, Folio, ImportRow, JsonFileStore, PickingError, PickingService, RecordStore,
    RowOutcome, Status, UserId,
};
use std::sync::Arc;
use tempfile::TempDir;

fn session(dir: &TempDir) -> PickingService<JsonFileStore> {
    PickingService::new(Arc::new(JsonFileStore::new(dir.path().join("data/pickings.json"))))
}

fn rows(folios: &[&str]) -> Vec<ImportRow> {
    folios
        .iter()
        .map(|folio| ImportRow::from_columns([("FOLIO", *folio), ("RUTA", "NORTE")]))
        .collect()
}

#[tokio::test]
async fn test_second_session_sees_first_session_import() {
    let dir = TempDir::new().unwrap();
    let admin = Actor::responsable("Admin").unwrap();

    let first = session(&dir);
    first.import_rows(&admin, rows(&["A", "B"])).await.unwrap();

    let second = session(&dir);
    let report = second.import_rows(&admin, rows(&["B", "C"])).await.unwrap();
    assert_eq!(report.rows[0].outcome, RowOutcome::AlreadyExists);
    assert_eq!(report.rows[1].outcome, RowOutcome::Inserted);

    let all = first.visible_records(&admin).await.unwrap();
    let folios: Vec<_> = all.iter().map(|r| r.folio.as_str()).collect();
    assert_eq!(folios, vec!["A", "B", "C"]);
    assert_eq!(all[0].metadata.get("RUTA"), Some("NORTE"));
}

#[tokio::test]
async fn test_stale_session_cannot_act_on_lost_ownership() {
    let dir = TempDir::new().unwrap();
    let admin = Actor::responsable("Admin").unwrap();
    let juan = Actor::capturista("Juan").unwrap();
    let folio = Folio::new("X").unwrap();

    let admin_session = session(&dir);
    admin_session.import_rows(&admin, rows(&["X"])).await.unwrap();
    admin_session.transition(&admin, &folio, Status::Surtido).await.unwrap();
    admin_session
        .reassign(&admin, &folio, UserId::new("Juan").unwrap())
        .await
        .unwrap();

    // Juan's dashboard snapshot still lists X
    let juan_session = session(&dir);
    assert_eq!(juan_session.visible_records(&juan).await.unwrap().len(), 1);

    admin_session
        .reassign(&admin, &folio, UserId::new("Maria").unwrap())
        .await
        .unwrap();

    let err = juan_session
        .transition(&juan, &folio, Status::Capturado)
        .await
        .unwrap_err();
    assert!(matches!(err, PickingError::AuthorizationDenied { .. }));

    let stored = admin_session.store().read_one(&folio).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Surtido);
}

#[tokio::test]
async fn test_scan_ledger_persists() {
    let dir = TempDir::new().unwrap();
    let admin = Actor::responsable("Admin").unwrap();
    let folio = Folio::new("PK-9").unwrap();

    let first = session(&dir);
    first.import_rows(&admin, rows(&["PK-9"])).await.unwrap();
    first.register_scan(&admin, "PK-9|CREDITO|4").await.unwrap();
    first.register_scan(&admin, "PK-9").await.unwrap();

    let second = session(&dir);
    let scans = second.folio_scans(&admin, &folio).await.unwrap();
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0].details, "PK-9|CREDITO|4");
    assert_eq!(scans[1].details, "Raw QR");

    second
        .update_scan_status(&admin, "PK-9", Status::Liberado)
        .await
        .unwrap();
    second.delete_scan(&admin, "PK-9|CREDITO|4").await.unwrap();

    let remaining = first.folio_scans(&admin, &folio).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].status, Status::Liberado);
}

// CLI behaviour against a temporary JSON store
// The store location comes from the environment, as it would in production

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn picking_control(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("picking-control").unwrap();
    cmd.current_dir(dir.path())
        .env("PICKING_CONTROL__STORE__BACKEND", "json")
        .env(
            "PICKING_CONTROL__STORE__JSON_PATH",
            dir.path().join("pickings.json"),
        )
        .env("PICKING_CONTROL__OBSERVABILITY__METRICS_ENABLED", "false")
        .env_remove("RUST_LOG");
    cmd
}

fn write_batch(dir: &TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("batch.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("picking-control").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("set-status"))
        .stdout(predicate::str::contains("reassign"))
        .stdout(predicate::str::contains("scan"));
}

#[test]
fn test_identity_is_required() {
    let dir = TempDir::new().unwrap();

    picking_control(&dir)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user is required"));
}

#[test]
fn test_import_then_list() {
    let dir = TempDir::new().unwrap();
    let batch = write_batch(
        &dir,
        r#"[{"FOLIO": "A", "cliente": "ACME"}, {"FOLIO": "A"}, {"FOLIO": ""}, {"FOLIO": 42}]"#,
    );

    picking_control(&dir)
        .args(["--user", "Admin", "--role", "responsable", "import"])
        .arg(&batch)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 2 new records."))
        .stdout(predicate::str::contains("skipped-duplicate-in-batch"))
        .stdout(predicate::str::contains("skipped-malformed"));

    picking_control(&dir)
        .args(["--user", "Admin", "--role", "responsable", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PENDIENTE"))
        .stdout(predicate::str::contains("42"))
        .stdout(predicate::str::contains("2 pickings"));
}

#[test]
fn test_capturista_workflow() {
    let dir = TempDir::new().unwrap();
    let batch = write_batch(&dir, r#"[{"FOLIO": "X"}, {"FOLIO": "Y"}]"#);
    let admin = ["--user", "Admin", "--role", "responsable"];
    let juan = ["--user", "Juan", "--role", "capturista"];

    picking_control(&dir).args(admin).arg("import").arg(&batch).assert().success();
    picking_control(&dir)
        .args(admin)
        .args(["reassign", "X", "Juan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reassigned to Juan by Admin"));
    picking_control(&dir)
        .args(admin)
        .args(["set-status", "X", "SURTIDO"])
        .assert()
        .success();

    picking_control(&dir)
        .args(juan)
        .args(["set-status", "X", "CAPTURADO"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status changed to CAPTURADO by Juan"));

    picking_control(&dir)
        .args(juan)
        .args(["set-status", "Y", "CAPTURADO"])
        .assert()
        .failure();

    picking_control(&dir)
        .args(juan)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("X"))
        .stdout(predicate::str::contains("1 pickings"));
}

//! Tests del ledger JSON: durabilidad entre reaperturas, forma del documento
//! y operaciones de mantenimiento.
use std::fs;

use serde_json::{json, Value};
use tempfile::TempDir;

use prodflow_core::{LedgerError, NewTask, TaskLedger, TransitionFields};
use prodflow_domain::{TaskStatus, WorkflowType};
use prodflow_persistence::JsonLedger;

fn new_task(task_id: &str, row_index: u32) -> NewTask {
    NewTask { task_id: task_id.to_string(),
              row_index,
              workflow_type: WorkflowType::ImageComposition,
              product_name: format!("product {row_index}"),
              image_prompt: "compose".to_string(),
              video_prompt: "pan".to_string(),
              metadata: json!({}) }
}

#[test]
fn state_survives_a_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.json");
    {
        let ledger = JsonLedger::open(&path).unwrap();
        ledger.create(new_task("t1", 1)).unwrap();
        ledger.create(new_task("t2", 2)).unwrap();
        ledger.set_remote_job_id("t1", "job-1").unwrap();
        ledger.transition("t1", TaskStatus::ImageGenerating, TransitionFields::default()).unwrap();
        ledger.merge_metadata("t1", json!({ "product_file": "p.png" })).unwrap();
    }

    let ledger = JsonLedger::open(&path).unwrap();
    let t1 = ledger.get("t1").unwrap().expect("t1 survived");
    assert_eq!(t1.status, TaskStatus::ImageGenerating);
    assert_eq!(t1.remote_job_id.as_deref(), Some("job-1"));
    assert_eq!(t1.metadata["product_file"], "p.png");

    let stats = ledger.statistics().unwrap();
    assert_eq!(stats.total_tasks, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.image_generating, 1);

    // la unicidad de task_id también vale tras reapertura
    let err = ledger.create(new_task("t1", 9)).unwrap_err();
    assert_eq!(err, LedgerError::AlreadyExists("t1".to_string()));
}

#[test]
fn document_carries_metadata_and_flat_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.json");
    let ledger = JsonLedger::open(&path).unwrap();
    ledger.create(new_task("t1", 1)).unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    let doc: Value = serde_json::from_str(&raw).unwrap();
    assert!(doc["tasks"]["t1"].is_object());
    assert_eq!(doc["tasks"]["t1"]["status"], "pending");
    assert_eq!(doc["statistics"]["total_tasks"], 1);
    assert_eq!(doc["metadata"]["version"], "1.0");
    assert!(doc["metadata"]["last_updated"].is_string());
}

#[test]
fn a_corrupt_document_is_an_error_not_a_reset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.json");
    fs::write(&path, "{ not json").unwrap();

    let err = JsonLedger::open(&path).unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)));
    // el archivo original queda intacto
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn missing_parent_directories_are_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/deep/ledger.json");
    let ledger = JsonLedger::open(&path).unwrap();
    ledger.create(new_task("t1", 1)).unwrap();
    assert!(path.exists());
}

#[test]
fn clear_completed_removes_only_completed_tasks() {
    let dir = TempDir::new().unwrap();
    let ledger = JsonLedger::open(dir.path().join("ledger.json")).unwrap();
    ledger.create(new_task("done", 1)).unwrap();
    ledger.create(new_task("failed", 2)).unwrap();
    ledger.create(new_task("open", 3)).unwrap();
    ledger.transition("done", TaskStatus::Completed, TransitionFields::default()).unwrap();
    ledger.transition("failed", TaskStatus::Failed, TransitionFields::error("boom")).unwrap();

    let removed = ledger.clear_completed().unwrap();
    assert_eq!(removed, 1);
    assert!(ledger.get("done").unwrap().is_none());
    assert!(ledger.get("failed").unwrap().is_some());
    assert!(ledger.get("open").unwrap().is_some());

    let stats = ledger.statistics().unwrap();
    assert_eq!(stats.total_tasks, 2);
    assert_eq!(stats.completed, 0);
}

#[test]
fn cleanup_respects_the_age_cutoff() {
    let dir = TempDir::new().unwrap();
    let ledger = JsonLedger::open(dir.path().join("ledger.json")).unwrap();
    ledger.create(new_task("done", 1)).unwrap();
    ledger.transition("done", TaskStatus::Completed, TransitionFields::default()).unwrap();

    // una tarea recién completada no es más vieja que 365 días
    assert_eq!(ledger.cleanup_older_than(365).unwrap(), 0);
    // con corte en cero días sí cae
    assert_eq!(ledger.cleanup_older_than(0).unwrap(), 1);
    assert!(ledger.get("done").unwrap().is_none());
}

#[test]
fn backup_produces_an_equivalent_document() {
    let dir = TempDir::new().unwrap();
    let ledger = JsonLedger::open(dir.path().join("ledger.json")).unwrap();
    ledger.create(new_task("t1", 1)).unwrap();

    let dest = dir.path().join("backups/ledger-copy.json");
    ledger.backup_to(&dest).unwrap();

    let copy: Value = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    assert!(copy["tasks"]["t1"].is_object());
    assert_eq!(copy["metadata"]["version"], "1.0");
}

#[test]
fn csv_export_escapes_awkward_fields() {
    let dir = TempDir::new().unwrap();
    let ledger = JsonLedger::open(dir.path().join("ledger.json")).unwrap();
    let mut new = new_task("t1", 1);
    new.product_name = "chair, \"deluxe\"".to_string();
    ledger.create(new).unwrap();
    ledger.create(new_task("t2", 2)).unwrap();

    let dest = dir.path().join("export.csv");
    let exported = ledger.export_csv(&dest).unwrap();
    assert_eq!(exported, 2);

    let csv = fs::read_to_string(&dest).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("task_id,workflow_type,status"));
    let first = lines.next().unwrap();
    assert!(first.starts_with("t1,image_composition,pending,1,\"chair, \"\"deluxe\"\"\""));
    assert_eq!(lines.count(), 1);
}

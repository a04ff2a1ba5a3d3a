//! Tests del ledger en memoria: altas, transiciones, invariantes de estado
//! terminal y contadores agregados.
use serde_json::json;

use prodflow_core::{ArtifactKind, InMemoryLedger, LedgerError, NewTask, TaskLedger,
                    TransitionFields};
use prodflow_domain::{TaskStatus, WorkflowType};

fn new_task(task_id: &str, row_index: u32, workflow_type: WorkflowType) -> NewTask {
    NewTask { task_id: task_id.to_string(),
              row_index,
              workflow_type,
              product_name: format!("product {row_index}"),
              image_prompt: "compose the product".to_string(),
              video_prompt: "animate the scene".to_string(),
              metadata: json!({}) }
}

#[test]
fn create_starts_pending_and_counts() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("t1", 2, WorkflowType::ImageComposition)).unwrap();

    let task = ledger.get("t1").unwrap().expect("task exists");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.row_index, 2);
    assert!(task.remote_job_id.is_none());
    assert_eq!(task.created_at, task.updated_at);

    let stats = ledger.statistics().unwrap();
    assert_eq!(stats.total_tasks, 1);
    assert_eq!(stats.pending, 1);
}

#[test]
fn duplicate_task_id_is_rejected() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("t1", 2, WorkflowType::ImageComposition)).unwrap();
    let err = ledger.create(new_task("t1", 3, WorkflowType::ImageComposition)).unwrap_err();
    assert_eq!(err, LedgerError::AlreadyExists("t1".to_string()));
    assert_eq!(ledger.statistics().unwrap().total_tasks, 1);
}

#[test]
fn transition_moves_counters_and_sets_fields() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("t1", 2, WorkflowType::ImageComposition)).unwrap();
    ledger.transition("t1", TaskStatus::ImageGenerating, TransitionFields::default()).unwrap();
    ledger.transition("t1", TaskStatus::VideoGenerating, TransitionFields::image("/out/a.png"))
          .unwrap();

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::VideoGenerating);
    assert_eq!(task.image_path.as_deref(), Some("/out/a.png"));

    let stats = ledger.statistics().unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.video_generating, 1);
    assert_eq!(stats.in_progress(), 1);
}

#[test]
fn transition_keeps_absent_fields_untouched() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("t1", 2, WorkflowType::ImageComposition)).unwrap();
    ledger.transition("t1", TaskStatus::VideoGenerating, TransitionFields::image("/out/a.png"))
          .unwrap();
    ledger.transition("t1", TaskStatus::Completed, TransitionFields::video("/out/a.mp4"))
          .unwrap();

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.image_path.as_deref(), Some("/out/a.png"));
    assert_eq!(task.video_path.as_deref(), Some("/out/a.mp4"));
}

#[test]
fn terminal_tasks_reject_new_status_but_allow_reapply() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("t1", 2, WorkflowType::ImageComposition)).unwrap();
    ledger.transition("t1", TaskStatus::Failed, TransitionFields::error("boom")).unwrap();

    // re-aplicar el mismo estado terminal es un no-op permitido
    ledger.transition("t1", TaskStatus::Failed, TransitionFields::default()).unwrap();
    let stats = ledger.statistics().unwrap();
    assert_eq!(stats.failed, 1);

    let err = ledger.transition("t1", TaskStatus::Pending, TransitionFields::default())
                    .unwrap_err();
    assert_eq!(err, LedgerError::TerminalTask("t1".to_string()));

    let err = ledger.set_remote_job_id("t1", "job-9").unwrap_err();
    assert_eq!(err, LedgerError::TerminalTask("t1".to_string()));
}

#[test]
fn set_output_files_derives_path_per_phase() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("img", 1, WorkflowType::ImageComposition)).unwrap();
    ledger.create(new_task("vid", 2, WorkflowType::ImageToVideo)).unwrap();

    let files = vec!["https://files.example/a.png".to_string(),
                     "https://files.example/b.png".to_string()];
    ledger.set_output_files("img", &files, ArtifactKind::Image).unwrap();
    ledger.set_output_files("vid", &files, ArtifactKind::Video).unwrap();

    let img = ledger.get("img").unwrap().unwrap();
    assert_eq!(img.output_files, files);
    assert_eq!(img.image_path.as_deref(), Some("https://files.example/a.png"));
    assert!(img.video_path.is_none());

    let vid = ledger.get("vid").unwrap().unwrap();
    assert_eq!(vid.video_path.as_deref(), Some("https://files.example/a.png"));
    assert!(vid.image_path.is_none());
}

#[test]
fn video_phase_files_keep_the_image_artifact() {
    // tarea de composición encadenada: recibe artefactos de imagen y luego de
    // video; el resultado de la fase de imagen no debe perderse
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("t1", 1, WorkflowType::ImageComposition)).unwrap();

    let image_files = vec!["https://files.example/composite.png".to_string()];
    ledger.set_output_files("t1", &image_files, ArtifactKind::Image).unwrap();
    let video_files = vec!["https://files.example/clip.mp4".to_string()];
    ledger.set_output_files("t1", &video_files, ArtifactKind::Video).unwrap();

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.image_path.as_deref(), Some("https://files.example/composite.png"));
    assert_eq!(task.video_path.as_deref(), Some("https://files.example/clip.mp4"));
    assert_eq!(task.output_files, video_files);
}

#[test]
fn merge_metadata_is_a_shallow_merge() {
    let ledger = InMemoryLedger::new();
    let mut new = new_task("t1", 2, WorkflowType::ImageComposition);
    new.metadata = json!({ "model_name": "Ana" });
    ledger.create(new).unwrap();

    ledger.merge_metadata("t1", json!({ "product_file": "p.png" })).unwrap();
    ledger.merge_metadata("t1", json!({ "model_file": "m.png" })).unwrap();

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.metadata["model_name"], "Ana");
    assert_eq!(task.metadata["product_file"], "p.png");
    assert_eq!(task.metadata["model_file"], "m.png");
}

#[test]
fn find_by_row_returns_latest_task() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("first", 7, WorkflowType::ImageComposition)).unwrap();
    ledger.create(new_task("second", 7, WorkflowType::ImageToVideo)).unwrap();
    ledger.create(new_task("other", 8, WorkflowType::ImageComposition)).unwrap();

    let found = ledger.find_by_row(7).unwrap().unwrap();
    assert_eq!(found.task_id, "second");
    assert!(ledger.find_by_row(99).unwrap().is_none());
}

#[test]
fn incomplete_listings_filter_by_status_and_type() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("a", 1, WorkflowType::ImageComposition)).unwrap();
    ledger.create(new_task("b", 2, WorkflowType::ImageComposition)).unwrap();
    ledger.create(new_task("c", 3, WorkflowType::ImageToVideo)).unwrap();
    ledger.transition("a", TaskStatus::Completed, TransitionFields::default()).unwrap();
    ledger.transition("c", TaskStatus::VideoGenerating, TransitionFields::default()).unwrap();

    let incomplete = ledger.list_incomplete().unwrap();
    assert_eq!(incomplete.len(), 2);

    let videos = ledger.list_incomplete_by_type(WorkflowType::ImageToVideo).unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].task_id, "c");

    let completed = ledger.list_by_status(TaskStatus::Completed).unwrap();
    assert_eq!(completed.len(), 1);
}

#[test]
fn delete_removes_task_and_adjusts_counters() {
    let ledger = InMemoryLedger::new();
    ledger.create(new_task("t1", 2, WorkflowType::ImageComposition)).unwrap();
    ledger.transition("t1", TaskStatus::Completed, TransitionFields::default()).unwrap();
    ledger.delete("t1").unwrap();

    assert!(ledger.get("t1").unwrap().is_none());
    let stats = ledger.statistics().unwrap();
    assert_eq!(stats.total_tasks, 0);
    assert_eq!(stats.completed, 0);

    let err = ledger.delete("t1").unwrap_err();
    assert_eq!(err, LedgerError::NotFound("t1".to_string()));
}

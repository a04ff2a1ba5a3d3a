//! Tests del barrido de recuperación al arranque.
use serde_json::json;

use prodflow_adapters::MockJobClient;
use prodflow_core::{AppConfig, InMemoryLedger, NewTask, PollError, RecoveryManager, RemoteStatus,
                    SubmitError, TaskLedger, TransitionFields};
use prodflow_domain::{TaskStatus, WorkflowType};

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.service.image_workflow_id = "wf-image".to_string();
    config.service.video_workflow_id = "wf-video".to_string();
    config
}

fn seed(ledger: &InMemoryLedger, task_id: &str, row: u32, workflow: WorkflowType,
        with_snapshot: bool) {
    let metadata = if with_snapshot {
        match workflow {
            WorkflowType::ImageComposition => json!({ "product_file": "p.png",
                                                      "model_file": "m.png" }),
            WorkflowType::ImageToVideo => json!({ "composite_file": "c.png" }),
        }
    } else {
        json!({})
    };
    ledger.create(NewTask { task_id: task_id.to_string(),
                            row_index: row,
                            workflow_type: workflow,
                            product_name: format!("product {row}"),
                            image_prompt: "compose".to_string(),
                            video_prompt: "pan".to_string(),
                            metadata })
          .unwrap();
}

fn advance(ledger: &InMemoryLedger, task_id: &str, status: TaskStatus, remote: Option<&str>) {
    if let Some(job_id) = remote {
        ledger.set_remote_job_id(task_id, job_id).unwrap();
    }
    ledger.transition(task_id, status, TransitionFields::default()).unwrap();
}

#[tokio::test(start_paused = true)]
async fn startup_sweep_routes_each_task_once() {
    let config = config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();

    // nunca llegó a submit
    seed(&ledger, "t1", 1, WorkflowType::ImageComposition, true);
    // quedó en curso sin job remoto confirmado
    seed(&ledger, "t2", 2, WorkflowType::ImageComposition, true);
    advance(&ledger, "t2", TaskStatus::ImageGenerating, None);
    // completó en remoto mientras el proceso estaba caído
    seed(&ledger, "t3", 3, WorkflowType::ImageComposition, true);
    advance(&ledger, "t3", TaskStatus::ImageGenerating, Some("job-old"));
    client.enqueue_poll(Ok(RemoteStatus::Success));
    // sigue corriendo en remoto: no se toca
    seed(&ledger, "t4", 4, WorkflowType::ImageToVideo, true);
    advance(&ledger, "t4", TaskStatus::VideoGenerating, Some("job-live"));
    client.enqueue_poll(Ok(RemoteStatus::Running));

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    let totals = summary.totals();
    assert_eq!(totals.scanned, 4);
    assert_eq!(totals.recovered, 3);
    assert_eq!(totals.failed, 0);
    assert_eq!(totals.skipped, 1);

    let t1 = ledger.get("t1").unwrap().unwrap();
    assert_eq!(t1.status, TaskStatus::ImageGenerating);
    assert!(t1.remote_job_id.is_some());

    let t2 = ledger.get("t2").unwrap().unwrap();
    assert_eq!(t2.status, TaskStatus::ImageGenerating);
    assert!(t2.remote_job_id.is_some());

    // la fase de imagen completada encadena a la de video
    let t3 = ledger.get("t3").unwrap().unwrap();
    assert_eq!(t3.status, TaskStatus::VideoGenerating);
    assert!(!t3.output_files.is_empty());

    let t4 = ledger.get("t4").unwrap().unwrap();
    assert_eq!(t4.status, TaskStatus::VideoGenerating);
    assert_eq!(t4.remote_job_id.as_deref(), Some("job-live"));
}

#[tokio::test(start_paused = true)]
async fn one_task_per_incomplete_status_lands_where_expected() {
    let config = config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();

    seed(&ledger, "p", 1, WorkflowType::ImageToVideo, true);
    seed(&ledger, "ig", 2, WorkflowType::ImageComposition, true);
    advance(&ledger, "ig", TaskStatus::ImageGenerating, None);
    seed(&ledger, "vg_done", 3, WorkflowType::ImageToVideo, true);
    advance(&ledger, "vg_done", TaskStatus::VideoGenerating, Some("job-done"));
    seed(&ledger, "vg_live", 4, WorkflowType::ImageToVideo, true);
    advance(&ledger, "vg_live", TaskStatus::VideoGenerating, Some("job-live"));
    client.enqueue_poll(Ok(RemoteStatus::Success)); // vg_done
    client.enqueue_poll(Ok(RemoteStatus::Running)); // vg_live

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    let totals = summary.totals();
    assert_eq!(totals.recovered, 3);
    assert_eq!(totals.failed, 0);
    assert_eq!(totals.skipped, 1);

    assert_eq!(ledger.get("p").unwrap().unwrap().status, TaskStatus::VideoGenerating);
    assert_eq!(ledger.get("ig").unwrap().unwrap().status, TaskStatus::ImageGenerating);
    let done = ledger.get("vg_done").unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert!(!done.output_files.is_empty());
    assert!(done.video_path.is_some());
    let live = ledger.get("vg_live").unwrap().unwrap();
    assert_eq!(live.status, TaskStatus::VideoGenerating);
    assert_eq!(live.remote_job_id.as_deref(), Some("job-live"));
}

#[tokio::test(start_paused = true)]
async fn pending_task_without_snapshot_cannot_be_resubmitted() {
    let config = config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();
    seed(&ledger, "t1", 1, WorkflowType::ImageComposition, false);

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    assert_eq!(summary.image.failed, 1);

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error_message.unwrap().contains("insufficient metadata"));
    assert_eq!(client.submitted_requests().len(), 0);
}

#[tokio::test(start_paused = true)]
async fn remote_failure_while_down_marks_the_task_failed() {
    let config = config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();
    seed(&ledger, "t1", 1, WorkflowType::ImageComposition, true);
    advance(&ledger, "t1", TaskStatus::ImageGenerating, Some("job-1"));
    client.enqueue_poll(Ok(RemoteStatus::Failed));

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    assert_eq!(summary.image.failed, 1);

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error_message.unwrap().contains("while process was down"));
}

#[tokio::test(start_paused = true)]
async fn unreachable_or_unknown_status_resubmits() {
    let config = config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();
    seed(&ledger, "t1", 1, WorkflowType::ImageComposition, true);
    advance(&ledger, "t1", TaskStatus::ImageGenerating, Some("job-a"));
    client.enqueue_poll(Err(PollError::Transport("conn refused".to_string())));
    seed(&ledger, "t2", 2, WorkflowType::ImageComposition, true);
    advance(&ledger, "t2", TaskStatus::ImageGenerating, Some("job-b"));
    client.enqueue_poll(Ok(RemoteStatus::Unknown("ARCHIVED".to_string())));

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    assert_eq!(summary.image.recovered, 2);
    assert_eq!(client.submitted_requests().len(), 2);

    let t1 = ledger.get("t1").unwrap().unwrap();
    assert_ne!(t1.remote_job_id.as_deref(), Some("job-a"));
}

#[tokio::test(start_paused = true)]
async fn completed_job_without_outputs_fails_explicitly() {
    let config = config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();
    seed(&ledger, "t1", 1, WorkflowType::ImageComposition, true);
    advance(&ledger, "t1", TaskStatus::ImageGenerating, Some("job-1"));
    client.enqueue_poll(Ok(RemoteStatus::Success));
    client.enqueue_fetch(Ok(Vec::new()));

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    assert_eq!(summary.image.failed, 1);

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error_message.unwrap().contains("no retrievable output"));
}

#[tokio::test(start_paused = true)]
async fn chained_composition_task_waits_for_its_video_phase() {
    let config = config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();
    seed(&ledger, "t1", 1, WorkflowType::ImageComposition, true);
    advance(&ledger, "t1", TaskStatus::ImageGenerating, Some("job-1"));
    ledger.transition("t1", TaskStatus::VideoGenerating, TransitionFields::default()).unwrap();

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    assert_eq!(summary.totals().skipped, 1);
    assert_eq!(client.poll_count(), 0);

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::VideoGenerating);
}

#[tokio::test(start_paused = true)]
async fn recovered_image_phase_is_terminal_when_video_is_disabled() {
    let mut config = config();
    config.service.video_workflow_enabled = false;
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();
    seed(&ledger, "t1", 1, WorkflowType::ImageComposition, true);
    advance(&ledger, "t1", TaskStatus::ImageGenerating, Some("job-1"));
    client.enqueue_poll(Ok(RemoteStatus::Success));

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    assert_eq!(summary.image.recovered, 1);
    assert_eq!(summary.video, Default::default());

    let task = ledger.get("t1").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn one_failing_recovery_never_stops_the_sweep() {
    let config = config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();
    seed(&ledger, "t1", 1, WorkflowType::ImageComposition, true);
    client.enqueue_submit(Err(SubmitError::Api("workflow deleted".to_string())));
    seed(&ledger, "t2", 2, WorkflowType::ImageComposition, true);

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    assert_eq!(summary.image.failed, 1);
    assert_eq!(summary.image.recovered, 1);

    let t1 = ledger.get("t1").unwrap().unwrap();
    assert_eq!(t1.status, TaskStatus::Failed);
    assert!(t1.error_message.unwrap().contains("recovery error"));

    let t2 = ledger.get("t2").unwrap().unwrap();
    assert_eq!(t2.status, TaskStatus::ImageGenerating);
}

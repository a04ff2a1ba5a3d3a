use prodflow_domain::{generate_task_id, CellValue, RowData, Statistics, Task, TaskStatus, WorkflowType};
use chrono::Utc;
use serde_json::json;

#[test]
fn task_id_contains_row_and_sanitized_name() {
    let id = generate_task_id(7, "Red Chair #12, Deluxe Edition");
    assert!(id.starts_with("task_7_RedChair12"), "unexpected id: {id}");
    // Sanitized name is truncated to 10 alphanumeric chars
    let clean: String = "RedChair12DeluxeEdition".chars().take(10).collect();
    assert!(id.contains(&clean));
}

#[test]
fn task_id_without_product_name_still_unique() {
    let a = generate_task_id(3, "");
    let b = generate_task_id(3, "");
    assert!(a.starts_with("task_3_"));
    // The uuid suffix keeps two ids for the same row apart even within one second
    assert_ne!(a, b);
}

#[test]
fn new_task_starts_pending_with_empty_optionals() {
    let now = Utc::now();
    let t = Task::new("t1".into(), 1, WorkflowType::ImageComposition, "p".into(), "ip".into(),
                      "vp".into(), json!({}), now);
    assert_eq!(t.status, TaskStatus::Pending);
    assert!(t.remote_job_id.is_none());
    assert!(t.image_path.is_none());
    assert!(t.video_path.is_none());
    assert!(t.output_files.is_empty());
    assert!(t.error_message.is_none());
    assert_eq!(t.created_at, t.updated_at);
}

#[test]
fn status_terminality() {
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    for s in [TaskStatus::Pending, TaskStatus::ImageGenerating, TaskStatus::VideoGenerating] {
        assert!(!s.is_terminal());
        assert!(s.is_incomplete());
    }
}

#[test]
fn status_serde_uses_snake_case() {
    let s = serde_json::to_string(&TaskStatus::ImageGenerating).unwrap();
    assert_eq!(s, "\"image_generating\"");
    let back: TaskStatus = serde_json::from_str(&s).unwrap();
    assert_eq!(back, TaskStatus::ImageGenerating);
}

#[test]
fn statistics_follow_transitions() {
    let mut stats = Statistics::default();
    stats.on_create();
    stats.on_create();
    assert_eq!(stats.total_tasks, 2);
    assert_eq!(stats.pending, 2);

    stats.on_transition(TaskStatus::Pending, TaskStatus::ImageGenerating);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.image_generating, 1);

    stats.on_transition(TaskStatus::ImageGenerating, TaskStatus::Completed);
    assert_eq!(stats.image_generating, 0);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.in_progress(), 0);
    assert!((stats.completion_rate() - 50.0).abs() < f64::EPSILON);
}

#[test]
fn statistics_same_status_transition_is_noop() {
    let mut stats = Statistics::default();
    stats.on_create();
    stats.on_transition(TaskStatus::Pending, TaskStatus::VideoGenerating);
    let before = stats.clone();
    stats.on_transition(TaskStatus::VideoGenerating, TaskStatus::VideoGenerating);
    assert_eq!(stats, before);
}

#[test]
fn statistics_delete_decrements_bucket_and_total() {
    let mut stats = Statistics::default();
    stats.on_create();
    stats.on_transition(TaskStatus::Pending, TaskStatus::Failed);
    stats.on_delete(TaskStatus::Failed);
    assert_eq!(stats.total_tasks, 0);
    assert_eq!(stats.failed, 0);
}

#[test]
fn cell_value_deserializes_text_and_embedded() {
    let text: CellValue = serde_json::from_value(json!("https://host/x.png")).unwrap();
    assert_eq!(text, CellValue::Text("https://host/x.png".into()));
    assert!(text.is_present());

    let embed: CellValue = serde_json::from_value(json!({"file_token": "tok123"})).unwrap();
    assert_eq!(embed, CellValue::EmbeddedImage { file_token: "tok123".into() });

    let blank: CellValue = serde_json::from_value(json!("   ")).unwrap();
    assert!(!blank.is_present());
}

#[test]
fn row_falls_back_to_general_prompt_for_video() {
    let row = RowData { row_number: 1,
                        product_image: CellValue::empty(),
                        model_image: CellValue::empty(),
                        composite_image: CellValue::Text("c.png".into()),
                        prompt: "general".into(),
                        video_prompt: "  ".into(),
                        product_name: String::new(),
                        model_name: String::new(),
                        image_processed: false,
                        video_processed: false };
    assert_eq!(row.effective_video_prompt(), "general");
}

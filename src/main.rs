//! Demo ejecutable del pipeline con colaboradores en memoria.
//!
//! Corre dos escenarios contra el cliente simulado: un batch de composición
//! de imagen y una recuperación tras "reinicio" sobre el ledger JSON. Sirve
//! como verificación rápida de punta a punta sin servicio remoto real.
use std::fs;

use serde_json::json;

use prodflow_adapters::{MemoryRowSource, MemorySheetWriter, MockJobClient};
use prodflow_core::{AppConfig, BatchSummary, InMemoryLedger, NewTask, Orchestrator,
                    RecoveryManager, RemoteStatus, TaskLedger, TransitionFields};
use prodflow_domain::{CellValue, RowData, TaskStatus, WorkflowType};
use prodflow_persistence::JsonLedger;

fn demo_config() -> AppConfig {
    let out = std::env::temp_dir().join("prodflow-demo");
    let mut config = AppConfig::default();
    config.service.image_workflow_id = "wf-image".to_string();
    config.service.video_workflow_id = "wf-video".to_string();
    config.service.settle_delay_secs = 0;
    config.pipeline.row_delay_secs = 0;
    config.pipeline.output_dir = out.to_string_lossy().into_owned();
    config
}

fn demo_row(row_number: u32, prompt: &str) -> RowData {
    RowData { row_number,
              product_image: CellValue::Text("https://sheet.example/p.png".to_string()),
              model_image: CellValue::Text("https://sheet.example/m.png".to_string()),
              composite_image: CellValue::empty(),
              prompt: prompt.to_string(),
              video_prompt: String::new(),
              product_name: format!("Producto {row_number}"),
              model_name: "Ana".to_string(),
              image_processed: false,
              video_processed: false }
}

/// Batch de composición: una fila elegible y una sin prompt.
async fn run_batch_demo() {
    println!("== batch de composición de imagen ==");
    let config = demo_config();
    let client = MockJobClient::new();
    let ledger = InMemoryLedger::new();
    let rows = MemoryRowSource::new(Vec::new());
    let sheet = MemorySheetWriter::new();
    let orchestrator = Orchestrator::new(&config, &client, &ledger, &rows, &sheet);

    let batch = [demo_row(2, "producto en la playa"), demo_row(3, "")];
    let outcomes = orchestrator.process_batch(WorkflowType::ImageComposition, &batch).await;
    let summary = BatchSummary::of(&outcomes);
    assert_eq!(summary.succeeded, 1, "demo: la fila con prompt debe completar");
    assert_eq!(summary.skipped, 1, "demo: la fila sin prompt debe saltarse");

    let task = ledger.find_by_row(2).unwrap().expect("tarea registrada");
    assert_eq!(task.status, TaskStatus::VideoGenerating);
    println!("fila 2 -> {} ({})", task.task_id, task.status.as_str());
    println!("artefacto local: {}", task.image_path.as_deref().unwrap_or("-"));
    println!("escrituras al origen: {}", sheet.updates().len());
}

/// Recuperación tras reinicio: una tarea quedó en curso y el job remoto
/// terminó mientras tanto.
async fn run_recovery_demo() {
    println!("\n== recuperación al arranque ==");
    let config = demo_config();
    let path = std::env::temp_dir().join("prodflow-demo").join("ledger.json");
    let _ = fs::remove_file(&path);
    {
        let ledger = JsonLedger::open(&path).expect("demo: ledger abre");
        ledger.create(NewTask { task_id: "task_interrupted".to_string(),
                                row_index: 5,
                                workflow_type: WorkflowType::ImageComposition,
                                product_name: "Producto 5".to_string(),
                                image_prompt: "producto en la playa".to_string(),
                                video_prompt: "paneo lento".to_string(),
                                metadata: json!({ "product_file": "p.png",
                                                  "model_file": "m.png" }) })
              .unwrap();
        ledger.set_remote_job_id("task_interrupted", "job-42").unwrap();
        ledger.transition("task_interrupted",
                          TaskStatus::ImageGenerating,
                          TransitionFields::default())
              .unwrap();
        // aquí "muere" el proceso: el ledger queda con la tarea en curso
    }

    let ledger = JsonLedger::open(&path).expect("demo: ledger reabre");
    let client = MockJobClient::new();
    client.enqueue_poll(Ok(RemoteStatus::Success));

    let summary = RecoveryManager::new(&config, &client, &ledger).run().await.unwrap();
    let totals = summary.totals();
    assert_eq!(totals.recovered, 1, "demo: la tarea interrumpida debe recuperarse");

    let task = ledger.get("task_interrupted").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::VideoGenerating);
    println!("tarea interrumpida -> {} con {} artefacto(s)",
             task.status.as_str(),
             task.output_files.len());
    println!("recuperación: {} examinadas, {} recuperadas, {} omitidas",
             totals.scanned, totals.recovered, totals.skipped);
}

#[tokio::main]
async fn main() {
    env_logger::init();
    run_batch_demo().await;
    run_recovery_demo().await;
    println!("\ndemo ok");
}

//! CLI de operación del pipeline: correr batches, inspeccionar el ledger y
//! tareas de mantenimiento.
use std::process::exit;

use prodflow_adapters::{HttpJobClient, JsonRowSource, LogSheetWriter};
use prodflow_core::{AppConfig, BatchSummary, Orchestrator, RecoveryManager, RowSource,
                    TaskLedger};
use prodflow_domain::WorkflowType;
use prodflow_persistence::{JsonLedger, LedgerConfig};

const USAGE: &str = "\
Uso: prodflow-cli <comando> [opciones]

Comandos:
  run --workflow <image_composition|image_to_video> [--rows <archivo>] [--skip-recovery]
      Recupera tareas pendientes y procesa las filas del archivo (default rows.json).
  stats
      Imprime los contadores agregados del ledger.
  cleanup (--completed | --days <N>)
      Borra tareas completadas (todas, o las más viejas que N días).
  export [--out <archivo>]
      Exporta el ledger a CSV (default tasks_export.csv).
  backup [--out <archivo>]
      Copia el documento del ledger (default backups/ledger_<timestamp>.json).";

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("{USAGE}");
        exit(2);
    }
    match args[1].as_str() {
        "run" => cmd_run(&args[2..]).await,
        "stats" => cmd_stats(),
        "cleanup" => cmd_cleanup(&args[2..]),
        "export" => cmd_export(&args[2..]),
        "backup" => cmd_backup(&args[2..]),
        other => {
            eprintln!("comando desconocido: {other}\n{USAGE}");
            exit(2);
        }
    }
}

fn open_ledger() -> JsonLedger {
    let config = LedgerConfig::from_env();
    match JsonLedger::open(&config.path) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("[prodflow] ledger error: {e}");
            exit(5);
        }
    }
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_workflow(value: &str) -> Option<WorkflowType> {
    match value {
        "image_composition" | "image" => Some(WorkflowType::ImageComposition),
        "image_to_video" | "video" => Some(WorkflowType::ImageToVideo),
        _ => None,
    }
}

async fn cmd_run(args: &[String]) {
    let workflow = match flag_value(args, "--workflow").and_then(parse_workflow) {
        Some(workflow) => workflow,
        None => {
            eprintln!("Uso: prodflow-cli run --workflow <image_composition|image_to_video> \
                       [--rows <archivo>] [--skip-recovery]");
            exit(2);
        }
    };
    let rows_path = flag_value(args, "--rows").unwrap_or("rows.json");
    let skip_recovery = args.iter().any(|a| a == "--skip-recovery");

    let config = AppConfig::from_env();
    let ledger = open_ledger();
    let client = HttpJobClient::from_config(&config.service);
    let source = JsonRowSource::new(rows_path);
    let writer = LogSheetWriter;

    if skip_recovery {
        println!("recuperación omitida (--skip-recovery)");
    } else {
        let recovery = RecoveryManager::new(&config, &client, &ledger);
        match recovery.run().await {
            Ok(summary) => {
                let totals = summary.totals();
                println!("recuperación: {} examinadas, {} recuperadas, {} fallidas, {} omitidas",
                         totals.scanned, totals.recovered, totals.failed, totals.skipped);
            }
            Err(e) => {
                eprintln!("[prodflow run] recovery error: {e}");
                exit(5);
            }
        }
    }

    let rows = match source.fetch_rows().await {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("[prodflow run] cannot load rows: {e}");
            exit(5);
        }
    };
    if rows.is_empty() {
        println!("sin filas que procesar en {rows_path}");
        return;
    }

    let orchestrator = Orchestrator::new(&config, &client, &ledger, &source, &writer);
    let outcomes = orchestrator.process_batch(workflow, &rows).await;
    let summary = BatchSummary::of(&outcomes);
    println!("batch: {} filas, {} ok, {} omitidas, {} fallidas ({:.1}% éxito)",
             summary.total,
             summary.succeeded,
             summary.skipped,
             summary.failed,
             summary.success_rate());
    if summary.failed > 0 {
        exit(4);
    }
}

fn cmd_stats() {
    let ledger = open_ledger();
    match ledger.statistics() {
        Ok(stats) => {
            println!("tareas totales:     {}", stats.total_tasks);
            println!("  pending:          {}", stats.pending);
            println!("  image_generating: {}", stats.image_generating);
            println!("  video_generating: {}", stats.video_generating);
            println!("  completed:        {}", stats.completed);
            println!("  failed:           {}", stats.failed);
            println!("en curso:           {}", stats.in_progress());
            println!("tasa de completado: {:.1}%", stats.completion_rate());
        }
        Err(e) => {
            eprintln!("[prodflow stats] error: {e}");
            exit(5);
        }
    }
}

fn cmd_cleanup(args: &[String]) {
    let ledger = open_ledger();
    let result = if args.iter().any(|a| a == "--completed") {
        ledger.clear_completed()
    } else if let Some(days) = flag_value(args, "--days").and_then(|v| v.parse::<u32>().ok()) {
        ledger.cleanup_older_than(days)
    } else {
        eprintln!("Uso: prodflow-cli cleanup (--completed | --days <N>)");
        exit(2);
    };
    match result {
        Ok(removed) => println!("{removed} tarea(s) eliminadas"),
        Err(e) => {
            eprintln!("[prodflow cleanup] error: {e}");
            exit(5);
        }
    }
}

fn cmd_export(args: &[String]) {
    let ledger = open_ledger();
    let out = flag_value(args, "--out").unwrap_or("tasks_export.csv");
    match ledger.export_csv(out) {
        Ok(exported) => println!("{exported} tarea(s) exportadas a {out}"),
        Err(e) => {
            eprintln!("[prodflow export] error: {e}");
            exit(5);
        }
    }
}

fn cmd_backup(args: &[String]) {
    let ledger = open_ledger();
    let default = format!("backups/ledger_{}.json", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
    let out = flag_value(args, "--out").map(str::to_string).unwrap_or(default);
    match ledger.backup_to(&out) {
        Ok(()) => println!("backup escrito en {out}"),
        Err(e) => {
            eprintln!("[prodflow backup] error: {e}");
            exit(5);
        }
    }
}

//! Orquestador secuencial del pipeline de generación.
//!
//! Lleva cada fila de origen por el camino crear-entrada -> subir insumos ->
//! submit -> sondeo -> persistir resultado, un workflow por batch. El fallo
//! de una fila marca su tarea como `Failed` y nunca aborta el batch.
use std::time::Duration;

use log::{error, info, warn};
use serde_json::json;
use tokio::time::{sleep, Instant};

use prodflow_domain::{generate_task_id, DomainError, RowData, TaskStatus, WorkflowType};

use crate::artifacts::{self, ArtifactKind};
use crate::client::{submit_with_retry, wait_for_completion, FetchError, NodeField,
                    RemoteJobClient, SubmitRequest, WaitOutcome};
use crate::config::AppConfig;
use crate::errors::CoreError;
use crate::ledger::{NewTask, TaskLedger, TransitionFields};
use crate::source::{RowSource, SheetWriter};

/// Desenlace del procesamiento de una fila.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Success { row_number: u32, task_id: String, output_files: Vec<String>, elapsed: Duration },
    /// La fila no era elegible para el workflow del batch; no se creó tarea.
    Skipped { row_number: u32, reason: String },
    /// `task_id` es `None` sólo si la fila falló antes de poder crear la
    /// entrada en el ledger.
    Failed { row_number: u32, task_id: Option<String>, error: String },
}

impl RowOutcome {
    pub fn row_number(&self) -> u32 {
        match self {
            RowOutcome::Success { row_number, .. }
            | RowOutcome::Skipped { row_number, .. }
            | RowOutcome::Failed { row_number, .. } => *row_number,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RowOutcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RowOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RowOutcome::Failed { .. })
    }
}

/// Resumen agregado de un batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn of(outcomes: &[RowOutcome]) -> Self {
        let mut summary = Self { total: outcomes.len(), ..Self::default() };
        for outcome in outcomes {
            match outcome {
                RowOutcome::Success { .. } => summary.succeeded += 1,
                RowOutcome::Skipped { .. } => summary.skipped += 1,
                RowOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Tasa de éxito sobre las filas realmente procesadas (excluye saltadas).
    pub fn success_rate(&self) -> f64 {
        let attempted = self.succeeded + self.failed;
        if attempted == 0 {
            0.0
        } else {
            self.succeeded as f64 / attempted as f64 * 100.0
        }
    }
}

/// Motor de procesamiento por filas. Genérico sobre sus colaboradores para
/// que los tests inyecten dobles sin tocar la lógica.
pub struct Orchestrator<'a, C, L, R, S>
    where C: RemoteJobClient + ?Sized,
          L: TaskLedger + ?Sized,
          R: RowSource + ?Sized,
          S: SheetWriter + ?Sized
{
    config: &'a AppConfig,
    client: &'a C,
    ledger: &'a L,
    rows: &'a R,
    sheet: &'a S,
}

impl<'a, C, L, R, S> Orchestrator<'a, C, L, R, S>
    where C: RemoteJobClient + ?Sized,
          L: TaskLedger + ?Sized,
          R: RowSource + ?Sized,
          S: SheetWriter + ?Sized
{
    pub fn new(config: &'a AppConfig, client: &'a C, ledger: &'a L, rows: &'a R, sheet: &'a S)
               -> Self {
        Self { config, client, ledger, rows, sheet }
    }

    /// Procesa un lote de filas bajo un workflow. Devuelve un desenlace por
    /// fila, en el mismo orden de entrada.
    pub async fn process_batch(&self, workflow: WorkflowType, rows: &[RowData]) -> Vec<RowOutcome> {
        info!("starting {} batch: {} row(s)", workflow.as_str(), rows.len());
        let mut outcomes = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if let Err(reason) = self.eligible(workflow, row) {
                info!("row {}: skipped ({reason})", row.row_number);
                outcomes.push(RowOutcome::Skipped { row_number: row.row_number,
                                                    reason: reason.to_string() });
                continue;
            }
            info!("processing row {} ({}/{})", row.row_number, i + 1, rows.len());
            let outcome = match workflow {
                WorkflowType::ImageComposition => self.process_image_row(row).await,
                WorkflowType::ImageToVideo => self.process_video_row(row).await,
            };
            match &outcome {
                RowOutcome::Success { task_id, elapsed, .. } => {
                    info!("row {}: completed as {task_id} in {}s",
                          row.row_number,
                          elapsed.as_secs());
                }
                RowOutcome::Failed { error, .. } => {
                    error!("row {}: failed: {error}", row.row_number);
                }
                RowOutcome::Skipped { .. } => {}
            }
            outcomes.push(outcome);
            // pausa entre filas para no saturar la API remota
            let delay = self.config.pipeline.row_delay_secs;
            if delay > 0 && i + 1 < rows.len() {
                sleep(Duration::from_secs(delay)).await;
            }
        }
        let summary = BatchSummary::of(&outcomes);
        info!("batch finished: {} ok, {} skipped, {} failed ({:.1}% success)",
              summary.succeeded,
              summary.skipped,
              summary.failed,
              summary.success_rate());
        outcomes
    }

    /// Elegibilidad de una fila para un workflow. `Err` lleva el motivo de
    /// salto; es la única fuente de desenlaces `Skipped`.
    pub fn eligible(&self, workflow: WorkflowType, row: &RowData) -> Result<(), DomainError> {
        let reject = |reason: &str| Err(DomainError::ValidationError(reason.to_string()));
        match workflow {
            WorkflowType::ImageComposition => {
                if row.image_processed {
                    reject("image phase already marked done at the source")
                } else if !row.product_image.is_present() {
                    reject("missing product image")
                } else if !row.model_image.is_present() {
                    reject("missing model image")
                } else if row.prompt.trim().is_empty() {
                    reject("missing prompt")
                } else {
                    Ok(())
                }
            }
            WorkflowType::ImageToVideo => {
                if !self.config.service.video_workflow_enabled {
                    reject("video workflow disabled")
                } else if row.video_processed {
                    reject("video phase already marked done at the source")
                } else if !row.composite_image.is_present() {
                    reject("missing composite image")
                } else if row.effective_video_prompt().trim().is_empty() {
                    reject("missing video prompt")
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn process_image_row(&self, row: &RowData) -> RowOutcome {
        let started = Instant::now();
        let task_id = generate_task_id(row.row_number, &row.product_name);
        let new = NewTask { task_id: task_id.clone(),
                            row_index: row.row_number,
                            workflow_type: WorkflowType::ImageComposition,
                            product_name: row.product_name.clone(),
                            image_prompt: row.prompt.clone(),
                            video_prompt: row.effective_video_prompt().to_string(),
                            metadata: json!({ "model_name": row.model_name }) };
        if let Err(err) = self.ledger.create(new) {
            return RowOutcome::Failed { row_number: row.row_number,
                                        task_id: Some(task_id),
                                        error: err.to_string() };
        }
        match self.run_image_phase(&task_id, row).await {
            Ok(output_files) => RowOutcome::Success { row_number: row.row_number,
                                                      task_id,
                                                      output_files,
                                                      elapsed: started.elapsed() },
            Err(err) => self.fail_task(row.row_number, task_id, err),
        }
    }

    async fn process_video_row(&self, row: &RowData) -> RowOutcome {
        let started = Instant::now();
        // la fase de video reutiliza la tarea que la fase de imagen dejó en
        // curso para la misma fila, si existe
        let existing = match self.ledger.find_by_row(row.row_number) {
            Ok(task) => task,
            Err(err) => {
                return RowOutcome::Failed { row_number: row.row_number,
                                            task_id: None,
                                            error: err.to_string() };
            }
        };
        let task_id = match existing {
            Some(task) if !task.status.is_terminal() => task.task_id,
            _ => {
                let task_id = generate_task_id(row.row_number, &row.product_name);
                let new = NewTask { task_id: task_id.clone(),
                                    row_index: row.row_number,
                                    workflow_type: WorkflowType::ImageToVideo,
                                    product_name: row.product_name.clone(),
                                    image_prompt: row.prompt.clone(),
                                    video_prompt: row.effective_video_prompt().to_string(),
                                    metadata: json!({ "model_name": row.model_name }) };
                if let Err(err) = self.ledger.create(new) {
                    return RowOutcome::Failed { row_number: row.row_number,
                                                task_id: Some(task_id),
                                                error: err.to_string() };
                }
                task_id
            }
        };
        match self.run_video_phase(&task_id, row).await {
            Ok(output_files) => RowOutcome::Success { row_number: row.row_number,
                                                      task_id,
                                                      output_files,
                                                      elapsed: started.elapsed() },
            Err(err) => self.fail_task(row.row_number, task_id, err),
        }
    }

    /// Fase de imagen: descarga ambos insumos, los sube al servicio, crea el
    /// job y espera su desenlace. Al completar, el artefacto se guarda local
    /// y la tarea encadena a `VideoGenerating` o cierra en `Completed` según
    /// la configuración de la fase de video.
    async fn run_image_phase(&self, task_id: &str, row: &RowData) -> Result<Vec<String>, CoreError> {
        let svc = &self.config.service;
        let product_bytes = self.rows.download_cell_image(&row.product_image).await?;
        let model_bytes = self.rows.download_cell_image(&row.model_image).await?;
        let product_file = self.client.upload_asset(product_bytes, "product.png").await?;
        let model_file = self.client.upload_asset(model_bytes, "model.png").await?;
        // snapshot para reanudación: un submit se puede reconstruir tras un
        // reinicio sin releer el origen
        self.ledger.merge_metadata(task_id, json!({ "product_file": product_file,
                                                    "model_file": model_file }))?;

        let request = SubmitRequest { workflow_id: svc.image_workflow_id.clone(),
                                      fields: vec![NodeField::new(&svc.product_image_node_id,
                                                                  "image",
                                                                  &product_file),
                                                   NodeField::new(&svc.model_image_node_id,
                                                                  "image",
                                                                  &model_file)] };
        let job_id = self.submit(&request).await?;
        self.ledger.set_remote_job_id(task_id, &job_id)?;
        self.ledger.transition(task_id, TaskStatus::ImageGenerating, TransitionFields::default())?;
        info!("task {task_id}: submitted image job {job_id}");

        let artifacts = self.await_job(&job_id).await?;
        self.ledger.set_output_files(task_id, &artifacts, ArtifactKind::Image)?;
        let local = self.save_phase_artifact(&artifacts, ArtifactKind::Image, row).await?;

        if svc.video_workflow_enabled {
            self.ledger.transition(task_id,
                                   TaskStatus::VideoGenerating,
                                   TransitionFields::image(&local))?;
        } else {
            self.ledger
                .transition(task_id, TaskStatus::Completed, TransitionFields::image(&local))?;
        }
        self.write_back_image(row.row_number, &local).await;
        Ok(vec![local])
    }

    /// Fase de video: sube la imagen compuesta, crea el job de video y espera
    /// su desenlace. Al completar, la tarea cierra en `Completed`.
    async fn run_video_phase(&self, task_id: &str, row: &RowData) -> Result<Vec<String>, CoreError> {
        let svc = &self.config.service;
        let composite_bytes = self.rows.download_cell_image(&row.composite_image).await?;
        let composite_file = self.client.upload_asset(composite_bytes, "composite.png").await?;
        self.ledger
            .merge_metadata(task_id, json!({ "composite_file": composite_file }))?;

        let prompt = row.effective_video_prompt();
        let request = SubmitRequest { workflow_id: svc.video_workflow_id.clone(),
                                      fields: vec![NodeField::new(&svc.video_image_node_id,
                                                                  "image",
                                                                  &composite_file),
                                                   NodeField::new(&svc.video_prompt_node_id,
                                                                  "text",
                                                                  prompt)] };
        let job_id = self.submit(&request).await?;
        self.ledger.set_remote_job_id(task_id, &job_id)?;
        self.ledger.transition(task_id, TaskStatus::VideoGenerating, TransitionFields::default())?;
        info!("task {task_id}: submitted video job {job_id}");

        let artifacts = self.await_job(&job_id).await?;
        self.ledger.set_output_files(task_id, &artifacts, ArtifactKind::Video)?;
        let local = self.save_phase_artifact(&artifacts, ArtifactKind::Video, row).await?;
        self.ledger
            .transition(task_id, TaskStatus::Completed, TransitionFields::video(&local))?;
        self.write_back_video(row.row_number).await;
        Ok(vec![local])
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<String, CoreError> {
        let pipeline = &self.config.pipeline;
        let job_id = submit_with_retry(self.client,
                                       request,
                                       pipeline.max_retries,
                                       Duration::from_secs(pipeline.retry_delay_secs)).await?;
        Ok(job_id)
    }

    /// Pausa de asentamiento tras el submit y espera del desenlace. Cualquier
    /// desenlace no exitoso se devuelve como error ya legible.
    async fn await_job(&self, job_id: &str) -> Result<Vec<String>, CoreError> {
        let svc = &self.config.service;
        if svc.settle_delay_secs > 0 {
            sleep(Duration::from_secs(svc.settle_delay_secs)).await;
        }
        match wait_for_completion(self.client, job_id, &svc.poll_options()).await {
            WaitOutcome::Completed { artifacts } => Ok(artifacts),
            other => {
                let text = other.error_text().unwrap_or_else(|| "unknown wait outcome".into());
                Err(CoreError::Remote(text))
            }
        }
    }

    /// Descarga y guarda el artefacto relevante de la fase. Para imagen es el
    /// último de la lista (el servicio reporta los intermedios primero); para
    /// video, el primero. Devuelve la ruta local.
    async fn save_phase_artifact(&self, artifacts: &[String], kind: ArtifactKind, row: &RowData)
                                 -> Result<String, CoreError> {
        let url = match kind {
                      ArtifactKind::Image => artifacts.last(),
                      ArtifactKind::Video => artifacts.first(),
                  }.ok_or(FetchError::NoOutputs)?;
        let bytes = self.client.download_artifact(url).await?;
        let path = artifacts::build_output_path(&self.config.pipeline.output_dir,
                                                kind,
                                                &row.product_name,
                                                &row.model_name);
        artifacts::save_artifact(&path, &bytes)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn fail_task(&self, row_number: u32, task_id: String, err: CoreError) -> RowOutcome {
        let message = err.to_string();
        if let Err(ledger_err) = self.ledger.transition(&task_id,
                                                        TaskStatus::Failed,
                                                        TransitionFields::error(&message))
        {
            error!("task {task_id}: could not record failure: {ledger_err}");
        }
        RowOutcome::Failed { row_number, task_id: Some(task_id), error: message }
    }

    // Los write-backs al origen son best-effort: su fallo se registra pero no
    // cambia el desenlace de la fila.
    async fn write_back_image(&self, row_number: u32, image_path: &str) {
        if let Err(err) = self.sheet.write_image_result(row_number, image_path).await {
            warn!("row {row_number}: could not write image result back: {err}");
        }
        if let Err(err) = self.sheet.update_image_status(row_number, "completed").await {
            warn!("row {row_number}: could not update image status: {err}");
        }
    }

    async fn write_back_video(&self, row_number: u32) {
        if let Err(err) = self.sheet.update_video_status(row_number, "completed").await {
            warn!("row {row_number}: could not update video status: {err}");
        }
    }
}

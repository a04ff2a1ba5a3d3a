//! Reconciliación al arranque de las tareas que dejó una ejecución anterior.
//!
//! Cada tarea no terminal se examina una sola vez y termina en exactamente
//! uno de tres destinos: re-encolada en el servicio (`recovered`), cerrada
//! (`recovered` si completó en remoto, `failed` si no hay forma de avanzarla)
//! o dejada en paz (`skipped`, el job remoto sigue corriendo). Un error al
//! recuperar una tarea nunca interrumpe el barrido.
use std::time::Duration;

use log::{info, warn};

use prodflow_domain::{Task, TaskStatus, WorkflowType};

use crate::artifacts::ArtifactKind;
use crate::client::{submit_with_retry, NodeField, RemoteJobClient, RemoteStatus, SubmitRequest};
use crate::config::AppConfig;
use crate::errors::CoreError;
use crate::ledger::{TaskLedger, TransitionFields};

/// Contadores de un barrido de recuperación para un tipo de workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    /// Tareas no terminales examinadas.
    pub scanned: usize,
    /// Re-encoladas o cerradas con éxito.
    pub recovered: usize,
    /// Marcadas `Failed` por no poder avanzar.
    pub failed: usize,
    /// Dejadas tal cual (el job remoto sigue en curso, o la tarea pertenece a
    /// la fase siguiente).
    pub skipped: usize,
}

impl PhaseCounts {
    fn add(&mut self, other: PhaseCounts) {
        self.scanned += other.scanned;
        self.recovered += other.recovered;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Resumen de la recuperación completa (ambas fases).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    pub image: PhaseCounts,
    pub video: PhaseCounts,
}

impl RecoverySummary {
    pub fn totals(&self) -> PhaseCounts {
        let mut total = self.image;
        total.add(self.video);
        total
    }
}

/// Qué hizo la recuperación con una tarea concreta.
enum Disposition {
    Recovered,
    Failed,
    Skipped,
}

/// Barrido de recuperación sobre el ledger. Se ejecuta antes de procesar
/// filas nuevas para que ningún trabajo quede huérfano tras un reinicio.
pub struct RecoveryManager<'a, C, L>
    where C: RemoteJobClient + ?Sized,
          L: TaskLedger + ?Sized
{
    config: &'a AppConfig,
    client: &'a C,
    ledger: &'a L,
}

impl<'a, C, L> RecoveryManager<'a, C, L>
    where C: RemoteJobClient + ?Sized,
          L: TaskLedger + ?Sized
{
    pub fn new(config: &'a AppConfig, client: &'a C, ledger: &'a L) -> Self {
        Self { config, client, ledger }
    }

    /// Recupera ambas fases. La fase de video sólo se barre si está activa.
    pub async fn run(&self) -> Result<RecoverySummary, CoreError> {
        let image = self.recover_phase(WorkflowType::ImageComposition).await?;
        let video = if self.config.service.video_workflow_enabled {
            self.recover_phase(WorkflowType::ImageToVideo).await?
        } else {
            PhaseCounts::default()
        };
        let totals = RecoverySummary { image, video }.totals();
        info!("recovery finished: {} scanned, {} recovered, {} failed, {} skipped",
              totals.scanned,
              totals.recovered,
              totals.failed,
              totals.skipped);
        Ok(RecoverySummary { image, video })
    }

    /// Barrido de las tareas no terminales de un tipo de workflow.
    pub async fn recover_phase(&self, workflow: WorkflowType) -> Result<PhaseCounts, CoreError> {
        let tasks = self.ledger.list_incomplete_by_type(workflow)?;
        if tasks.is_empty() {
            return Ok(PhaseCounts::default());
        }
        info!("recovery: {} incomplete {} task(s)", tasks.len(), workflow.as_str());
        let mut counts = PhaseCounts { scanned: tasks.len(), ..PhaseCounts::default() };
        for task in tasks {
            let task_id = task.task_id.clone();
            let disposition = match self.recover_task(&task).await {
                Ok(d) => d,
                Err(err) => {
                    // el barrido sigue: la tarea queda Failed con el motivo
                    warn!("recovery: task {task_id} could not be recovered: {err}");
                    self.mark_failed(&task_id, &format!("recovery error: {err}"));
                    Disposition::Failed
                }
            };
            match disposition {
                Disposition::Recovered => counts.recovered += 1,
                Disposition::Failed => counts.failed += 1,
                Disposition::Skipped => counts.skipped += 1,
            }
        }
        Ok(counts)
    }

    async fn recover_task(&self, task: &Task) -> Result<Disposition, CoreError> {
        match task.status {
            // nunca llegó a submit: re-encolar desde el snapshot
            TaskStatus::Pending => self.resubmit(task).await,
            TaskStatus::ImageGenerating => {
                if task.workflow_type != WorkflowType::ImageComposition {
                    warn!("recovery: task {} is {} but typed {}, leaving it alone",
                          task.task_id,
                          task.status.as_str(),
                          task.workflow_type.as_str());
                    return Ok(Disposition::Skipped);
                }
                self.reconcile_in_progress(task).await
            }
            TaskStatus::VideoGenerating => {
                // una tarea de composición encadenada espera su fase de video
                // del procesamiento normal, no de la recuperación
                if task.workflow_type == WorkflowType::ImageComposition {
                    info!("recovery: task {} awaits its video phase, skipping", task.task_id);
                    return Ok(Disposition::Skipped);
                }
                self.reconcile_in_progress(task).await
            }
            TaskStatus::Completed | TaskStatus::Failed => Ok(Disposition::Skipped),
        }
    }

    /// Tarea en curso: interroga al servicio y enruta según el estado remoto.
    async fn reconcile_in_progress(&self, task: &Task) -> Result<Disposition, CoreError> {
        let job_id = match task.remote_job_id.as_deref() {
            Some(id) => id,
            // quedó en curso sin job remoto registrado: el submit nunca se
            // confirmó, re-encolar
            None => return self.resubmit(task).await,
        };
        match self.client.poll_once(job_id).await {
            Ok(RemoteStatus::Success) => self.close_from_remote(task, job_id).await,
            Ok(RemoteStatus::Failed) => {
                self.mark_failed(&task.task_id, "remote job failed while process was down");
                Ok(Disposition::Failed)
            }
            Ok(RemoteStatus::Queued) | Ok(RemoteStatus::Running) => {
                info!("recovery: task {} still running remotely as {job_id}", task.task_id);
                Ok(Disposition::Skipped)
            }
            // estado irreconocible o chequeo fallido: el job puede haberse
            // perdido en el lado remoto, re-encolar
            Ok(RemoteStatus::Unknown(other)) => {
                warn!("recovery: task {} reports unknown remote status {other:?}, resubmitting",
                      task.task_id);
                self.resubmit(task).await
            }
            Err(err) => {
                warn!("recovery: task {} status check failed ({err}), resubmitting", task.task_id);
                self.resubmit(task).await
            }
        }
    }

    /// El job terminó mientras el proceso estaba caído: persistir artefactos
    /// y transicionar hacia adelante.
    async fn close_from_remote(&self, task: &Task, job_id: &str) -> Result<Disposition, CoreError> {
        let artifacts = match self.client.fetch_results(job_id).await {
            Ok(artifacts) if !artifacts.is_empty() => artifacts,
            Ok(_) | Err(_) => {
                self.mark_failed(&task.task_id,
                                 "job completed remotely but produced no retrievable output");
                return Ok(Disposition::Failed);
            }
        };
        // la fase que produjo los artefactos se lee del estado en curso
        let kind = match task.status {
            TaskStatus::ImageGenerating => ArtifactKind::Image,
            _ => ArtifactKind::Video,
        };
        self.ledger.set_output_files(&task.task_id, &artifacts, kind)?;
        let next = match task.workflow_type {
            WorkflowType::ImageComposition if self.config.service.video_workflow_enabled => {
                TaskStatus::VideoGenerating
            }
            _ => TaskStatus::Completed,
        };
        self.ledger.transition(&task.task_id, next, TransitionFields::default())?;
        info!("recovery: task {} completed remotely with {} artifact(s), now {}",
              task.task_id,
              artifacts.len(),
              next.as_str());
        Ok(Disposition::Recovered)
    }

    /// Reconstruye el submit desde el snapshot de metadata y re-encola el
    /// job. Sin snapshot suficiente no hay forma de reconstruirlo.
    async fn resubmit(&self, task: &Task) -> Result<Disposition, CoreError> {
        let request = match self.rebuild_request(task) {
            Some(request) => request,
            None => {
                self.mark_failed(&task.task_id, "insufficient metadata to resubmit");
                return Ok(Disposition::Failed);
            }
        };
        let pipeline = &self.config.pipeline;
        let job_id = submit_with_retry(self.client,
                                       &request,
                                       pipeline.max_retries,
                                       Duration::from_secs(pipeline.retry_delay_secs)).await?;
        self.ledger.set_remote_job_id(&task.task_id, &job_id)?;
        let status = match task.workflow_type {
            WorkflowType::ImageComposition => TaskStatus::ImageGenerating,
            WorkflowType::ImageToVideo => TaskStatus::VideoGenerating,
        };
        self.ledger.transition(&task.task_id, status, TransitionFields::default())?;
        info!("recovery: task {} resubmitted as job {job_id}", task.task_id);
        Ok(Disposition::Recovered)
    }

    fn rebuild_request(&self, task: &Task) -> Option<SubmitRequest> {
        let svc = &self.config.service;
        let meta = |key: &str| {
            task.metadata.get(key).and_then(|v| v.as_str()).map(str::to_string)
        };
        match task.workflow_type {
            WorkflowType::ImageComposition => {
                let product_file = meta("product_file")?;
                let model_file = meta("model_file")?;
                Some(SubmitRequest { workflow_id: svc.image_workflow_id.clone(),
                                     fields: vec![NodeField::new(&svc.product_image_node_id,
                                                                 "image",
                                                                 product_file),
                                                  NodeField::new(&svc.model_image_node_id,
                                                                 "image",
                                                                 model_file)] })
            }
            WorkflowType::ImageToVideo => {
                let composite_file = meta("composite_file")?;
                Some(SubmitRequest { workflow_id: svc.video_workflow_id.clone(),
                                     fields: vec![NodeField::new(&svc.video_image_node_id,
                                                                 "image",
                                                                 composite_file),
                                                  NodeField::new(&svc.video_prompt_node_id,
                                                                 "text",
                                                                 &task.video_prompt)] })
            }
        }
    }

    fn mark_failed(&self, task_id: &str, message: &str) {
        if let Err(err) = self.ledger.transition(task_id,
                                                 TaskStatus::Failed,
                                                 TransitionFields::error(message))
        {
            warn!("recovery: task {task_id} could not be marked failed: {err}");
        }
    }
}

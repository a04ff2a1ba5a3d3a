//! Ledger de tareas: contrato y lógica de mutación compartida.
//!
//! El contrato (`TaskLedger`) aísla el modelo de persistencia: la
//! implementación de referencia reescribe un documento JSON completo en cada
//! mutación (ver `prodflow-persistence`), pero los llamadores sólo ven estas
//! operaciones. `LedgerState` concentra la lógica de mutación (transiciones,
//! contadores, invariantes) para que la implementación en memoria y la
//! durable no puedan divergir.
//!
//! Invariantes:
//! - `task_id` es único dentro del ledger.
//! - Una tarea terminal (`Completed`/`Failed`) no se muta salvo por borrado
//!   explícito; re-aplicar el mismo estado terminal es un no-op permitido.
//! - Cada transición actualiza `updated_at` y los contadores agregados en la
//!   misma operación serializada.
mod memory;
mod state;

pub use memory::InMemoryLedger;
pub use state::{LedgerState, NewTask, TransitionFields};

use prodflow_domain::{Statistics, Task, TaskStatus, WorkflowType};
use thiserror::Error;

use crate::artifacts::ArtifactKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("task already exists: {0}")]
    AlreadyExists(String),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task is terminal: {0}")]
    TerminalTask(String),
    #[error("ledger storage error: {0}")]
    Storage(String),
}

/// Registro durable de tareas. Una única instancia por proceso; el acceso
/// concurrente desde varios procesos no está soportado (escritor único).
pub trait TaskLedger: Send + Sync {
    /// Alta de una tarea en estado `Pending`. Falla con `AlreadyExists` si el
    /// `task_id` ya está presente (detección de submits duplicados).
    fn create(&self, new: NewTask) -> Result<(), LedgerError>;

    /// Transición de estado. Sobrescribe sólo los campos opcionales provistos
    /// (no limpia los ausentes) y mueve los contadores agregados junto con
    /// `updated_at` en la misma operación serializada.
    fn transition(&self, task_id: &str, status: TaskStatus, fields: TransitionFields)
                  -> Result<(), LedgerError>;

    fn set_remote_job_id(&self, task_id: &str, remote_job_id: &str) -> Result<(), LedgerError>;

    /// Guarda la lista de artefactos de la fase más reciente y deriva
    /// `image_path` / `video_path` de `files[0]` según la fase que los
    /// produjo.
    fn set_output_files(&self, task_id: &str, files: &[String], kind: ArtifactKind)
                        -> Result<(), LedgerError>;

    /// Merge superficial sobre `metadata`. El orquestador lo usa para anotar
    /// el snapshot de submit (archivos ya subidos al servicio).
    fn merge_metadata(&self, task_id: &str, patch: serde_json::Value) -> Result<(), LedgerError>;

    fn get(&self, task_id: &str) -> Result<Option<Task>, LedgerError>;

    /// Última tarea creada para una fila (la fase de video reutiliza la tarea
    /// que creó la fase de imagen para la misma fila).
    fn find_by_row(&self, row_index: u32) -> Result<Option<Task>, LedgerError>;

    fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, LedgerError>;

    /// Tareas en {Pending, ImageGenerating, VideoGenerating}.
    fn list_incomplete(&self) -> Result<Vec<Task>, LedgerError>;

    fn list_incomplete_by_type(&self, workflow_type: WorkflowType) -> Result<Vec<Task>, LedgerError>;

    fn delete(&self, task_id: &str) -> Result<(), LedgerError>;

    fn statistics(&self) -> Result<Statistics, LedgerError>;
}

//! Estado del ledger y lógica de mutación.
//!
//! `LedgerState` es lo que persiste la implementación durable (dentro de su
//! documento JSON) y lo que guarda la implementación en memoria detrás de su
//! mutex. Toda regla de transición vive aquí.
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use prodflow_domain::{Statistics, Task, TaskStatus, WorkflowType};

use super::LedgerError;
use crate::artifacts::ArtifactKind;

/// Datos de alta de una tarea. El snapshot de prompts/metadata se copia en el
/// momento de creación para poder reconstruir un submit tras un reinicio sin
/// releer el origen.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_id: String,
    pub row_index: u32,
    pub workflow_type: WorkflowType,
    pub product_name: String,
    pub image_prompt: String,
    pub video_prompt: String,
    pub metadata: serde_json::Value,
}

/// Campos opcionales que una transición puede fijar. Los ausentes no se
/// tocan.
#[derive(Debug, Clone, Default)]
pub struct TransitionFields {
    pub image_path: Option<String>,
    pub video_path: Option<String>,
    pub error_message: Option<String>,
}

impl TransitionFields {
    pub fn error(message: impl Into<String>) -> Self {
        Self { error_message: Some(message.into()), ..Self::default() }
    }

    pub fn image(path: impl Into<String>) -> Self {
        Self { image_path: Some(path.into()), ..Self::default() }
    }

    pub fn video(path: impl Into<String>) -> Self {
        Self { video_path: Some(path.into()), ..Self::default() }
    }
}

/// Mapa ordenado de tareas más contadores agregados. El orden de inserción se
/// conserva para que el documento persistido y los listados sean estables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub tasks: IndexMap<String, Task>,
    #[serde(default)]
    pub statistics: Statistics,
}

impl LedgerState {
    pub fn create(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.tasks.contains_key(&new.task_id) {
            return Err(LedgerError::AlreadyExists(new.task_id));
        }
        let task = Task::new(new.task_id.clone(), new.row_index, new.workflow_type,
                             new.product_name, new.image_prompt, new.video_prompt,
                             new.metadata, now);
        self.tasks.insert(new.task_id, task);
        self.statistics.on_create();
        Ok(())
    }

    pub fn transition(&mut self, task_id: &str, status: TaskStatus, fields: TransitionFields,
                      now: DateTime<Utc>)
                      -> Result<(), LedgerError> {
        let task = self.tasks
                       .get_mut(task_id)
                       .ok_or_else(|| LedgerError::NotFound(task_id.to_string()))?;
        let old = task.status;
        // Re-aplicar el mismo estado terminal es idempotente; cambiar el
        // estado de una tarea terminal no está permitido.
        if old.is_terminal() && status != old {
            return Err(LedgerError::TerminalTask(task_id.to_string()));
        }
        task.status = status;
        task.updated_at = now;
        if let Some(p) = fields.image_path {
            task.image_path = Some(p);
        }
        if let Some(p) = fields.video_path {
            task.video_path = Some(p);
        }
        if let Some(m) = fields.error_message {
            task.error_message = Some(m);
        }
        self.statistics.on_transition(old, status);
        Ok(())
    }

    pub fn set_remote_job_id(&mut self, task_id: &str, remote_job_id: &str, now: DateTime<Utc>)
                             -> Result<(), LedgerError> {
        let task = self.tasks
                       .get_mut(task_id)
                       .ok_or_else(|| LedgerError::NotFound(task_id.to_string()))?;
        if task.status.is_terminal() {
            return Err(LedgerError::TerminalTask(task_id.to_string()));
        }
        task.remote_job_id = Some(remote_job_id.to_string());
        task.updated_at = now;
        Ok(())
    }

    /// Guarda los artefactos remotos y deriva `image_path` o `video_path` de
    /// `files[0]` según la fase que los produjo, no el tipo de workflow: una
    /// tarea de composición encadenada conserva su `image_path` cuando llega
    /// el artefacto de video.
    pub fn set_output_files(&mut self, task_id: &str, files: &[String], kind: ArtifactKind,
                            now: DateTime<Utc>)
                            -> Result<(), LedgerError> {
        let task = self.tasks
                       .get_mut(task_id)
                       .ok_or_else(|| LedgerError::NotFound(task_id.to_string()))?;
        if task.status.is_terminal() {
            return Err(LedgerError::TerminalTask(task_id.to_string()));
        }
        task.output_files = files.to_vec();
        if let Some(first) = files.first() {
            match kind {
                ArtifactKind::Image => task.image_path = Some(first.clone()),
                ArtifactKind::Video => task.video_path = Some(first.clone()),
            }
        }
        task.updated_at = now;
        Ok(())
    }

    /// Fusiona claves nuevas dentro de `metadata` (merge superficial). Se usa
    /// para anotar el snapshot de submit (nombres de archivos ya subidos) que
    /// la recuperación necesita para reconstruir la petición.
    pub fn merge_metadata(&mut self, task_id: &str, patch: serde_json::Value, now: DateTime<Utc>)
                          -> Result<(), LedgerError> {
        let task = self.tasks
                       .get_mut(task_id)
                       .ok_or_else(|| LedgerError::NotFound(task_id.to_string()))?;
        if task.status.is_terminal() {
            return Err(LedgerError::TerminalTask(task_id.to_string()));
        }
        match (task.metadata.as_object_mut(), patch.as_object()) {
            (Some(dst), Some(src)) => {
                for (k, v) in src {
                    dst.insert(k.clone(), v.clone());
                }
            }
            _ => task.metadata = patch,
        }
        task.updated_at = now;
        Ok(())
    }

    pub fn delete(&mut self, task_id: &str) -> Result<(), LedgerError> {
        match self.tasks.shift_remove(task_id) {
            Some(task) => {
                self.statistics.on_delete(task.status);
                Ok(())
            }
            None => Err(LedgerError::NotFound(task_id.to_string())),
        }
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.get(task_id).cloned()
    }

    pub fn find_by_row(&self, row_index: u32) -> Option<Task> {
        self.tasks.values().rev().find(|t| t.row_index == row_index).cloned()
    }

    pub fn list_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.tasks.values().filter(|t| t.status == status).cloned().collect()
    }

    pub fn list_incomplete(&self) -> Vec<Task> {
        self.tasks.values().filter(|t| t.status.is_incomplete()).cloned().collect()
    }

    pub fn list_incomplete_by_type(&self, workflow_type: WorkflowType) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|t| t.status.is_incomplete() && t.workflow_type == workflow_type)
            .cloned()
            .collect()
    }
}

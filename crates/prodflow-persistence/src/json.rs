//! Implementación durable del ledger sobre un documento JSON.
//!
//! Modelo de escritura: el documento completo (tareas + contadores +
//! metadatos) se reescribe en cada mutación, vía archivo temporal y rename
//! para no dejar nunca un documento a medio escribir. El volumen esperado
//! (cientos de tareas) hace innecesario algo más fino, y la reescritura total
//! vuelve autocorregible cualquier guardado fallido anterior.
//!
//! La lógica de transiciones vive en `LedgerState` (compartida con la
//! implementación en memoria); aquí sólo se añade el ciclo cargar-mutar-
//! guardar y las operaciones de mantenimiento.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use prodflow_core::{ArtifactKind, LedgerError, LedgerState, NewTask, TaskLedger,
                    TransitionFields};
use prodflow_domain::{Statistics, Task, TaskStatus, WorkflowType};

use crate::error::PersistenceError;

const DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Metadata {
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    version: String,
}

impl Metadata {
    fn new(now: DateTime<Utc>) -> Self {
        Self { created_at: now, last_updated: now, version: DOCUMENT_VERSION.to_string() }
    }
}

/// Documento persistido: el estado del ledger más metadatos del archivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Document {
    #[serde(flatten)]
    state: LedgerState,
    metadata: Metadata,
}

/// Ledger durable respaldado por un archivo JSON. Escritor único por proceso.
#[derive(Debug)]
pub struct JsonLedger {
    path: PathBuf,
    inner: Mutex<Document>,
}

impl JsonLedger {
    /// Abre (o crea) el ledger en `path`. Un documento existente ilegible es
    /// un error, nunca se sobreescribe en silencio.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let document = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| PersistenceError::Io { path: path.display().to_string(), source: e })?;
            let document: Document = serde_json::from_str(&raw)
                .map_err(|e| PersistenceError::Corrupt { path: path.display().to_string(),
                                                         source: e })?;
            info!("ledger loaded from {} ({} task(s))",
                  path.display(),
                  document.state.tasks.len());
            document
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| {
                                                  PersistenceError::Io { path: parent.display()
                                                                                     .to_string(),
                                                                         source: e }
                                              })?;
                }
            }
            info!("creating new ledger at {}", path.display());
            Document { state: LedgerState::default(), metadata: Metadata::new(Utc::now()) }
        };
        let ledger = Self { path, inner: Mutex::new(document) };
        {
            let mut doc = ledger.lock()?;
            ledger.save(&mut doc)?;
        }
        Ok(ledger)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Document>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Storage("ledger mutex poisoned".into()))
    }

    fn save(&self, doc: &mut Document) -> Result<(), LedgerError> {
        doc.metadata.last_updated = Utc::now();
        let body = serde_json::to_string_pretty(&*doc).map_err(PersistenceError::Serialize)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .map_err(|e| PersistenceError::Io { path: tmp.display().to_string(), source: e })?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| PersistenceError::Io { path: self.path.display().to_string(), source: e })?;
        debug!("ledger persisted to {}", self.path.display());
        Ok(())
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut LedgerState) -> Result<T, LedgerError>)
                 -> Result<T, LedgerError> {
        let mut doc = self.lock()?;
        let out = f(&mut doc.state)?;
        self.save(&mut doc)?;
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&LedgerState) -> T) -> Result<T, LedgerError> {
        let doc = self.lock()?;
        Ok(f(&doc.state))
    }

    /// Borra todas las tareas completadas. Devuelve cuántas se fueron.
    pub fn clear_completed(&self) -> Result<usize, LedgerError> {
        self.mutate(|state| {
                let ids: Vec<String> = state.list_by_status(TaskStatus::Completed)
                                            .into_iter()
                                            .map(|t| t.task_id)
                                            .collect();
                for id in &ids {
                    state.delete(id)?;
                }
                Ok(ids.len())
            })
            .map(|removed| {
                if removed > 0 {
                    info!("cleared {removed} completed task(s)");
                }
                removed
            })
    }

    /// Borra las tareas completadas cuya última actualización es anterior a
    /// `days` días. Devuelve cuántas se fueron.
    pub fn cleanup_older_than(&self, days: u32) -> Result<usize, LedgerError> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        self.mutate(|state| {
                let ids: Vec<String> =
                    state.tasks
                         .values()
                         .filter(|t| t.status == TaskStatus::Completed && t.updated_at < cutoff)
                         .map(|t| t.task_id.clone())
                         .collect();
                for id in &ids {
                    state.delete(id)?;
                }
                Ok(ids.len())
            })
            .map(|removed| {
                info!("cleanup removed {removed} task(s) older than {days} day(s)");
                removed
            })
    }

    /// Copia el documento actual a `dest` tal como está en memoria.
    pub fn backup_to(&self, dest: impl AsRef<Path>) -> Result<(), LedgerError> {
        let dest = dest.as_ref();
        let doc = self.lock()?;
        let body = serde_json::to_string_pretty(&*doc).map_err(PersistenceError::Serialize)?;
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                                              PersistenceError::Io { path: parent.display()
                                                                                 .to_string(),
                                                                     source: e }
                                          })?;
            }
        }
        fs::write(dest, body)
            .map_err(|e| PersistenceError::Io { path: dest.display().to_string(), source: e })?;
        info!("ledger backed up to {}", dest.display());
        Ok(())
    }

    /// Exporta todas las tareas a CSV.
    pub fn export_csv(&self, dest: impl AsRef<Path>) -> Result<usize, LedgerError> {
        let dest = dest.as_ref();
        let doc = self.lock()?;
        let mut out = String::from("task_id,workflow_type,status,row_index,product_name,\
                                    remote_job_id,image_path,video_path,error_message,\
                                    created_at,updated_at\n");
        for task in doc.state.tasks.values() {
            let fields = [task.task_id.as_str(),
                          task.workflow_type.as_str(),
                          task.status.as_str(),
                          &task.row_index.to_string(),
                          task.product_name.as_str(),
                          task.remote_job_id.as_deref().unwrap_or(""),
                          task.image_path.as_deref().unwrap_or(""),
                          task.video_path.as_deref().unwrap_or(""),
                          task.error_message.as_deref().unwrap_or(""),
                          &task.created_at.to_rfc3339(),
                          &task.updated_at.to_rfc3339()];
            let row = fields.map(csv_field);
            out.push_str(&row.join(","));
            out.push('\n');
        }
        fs::write(dest, out)
            .map_err(|e| PersistenceError::Io { path: dest.display().to_string(), source: e })?;
        let exported = doc.state.tasks.len();
        info!("exported {exported} task(s) to {}", dest.display());
        Ok(exported)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl TaskLedger for JsonLedger {
    fn create(&self, new: NewTask) -> Result<(), LedgerError> {
        self.mutate(|s| s.create(new, Utc::now()))
    }

    fn transition(&self, task_id: &str, status: TaskStatus, fields: TransitionFields)
                  -> Result<(), LedgerError> {
        self.mutate(|s| s.transition(task_id, status, fields, Utc::now()))
    }

    fn set_remote_job_id(&self, task_id: &str, remote_job_id: &str) -> Result<(), LedgerError> {
        self.mutate(|s| s.set_remote_job_id(task_id, remote_job_id, Utc::now()))
    }

    fn set_output_files(&self, task_id: &str, files: &[String], kind: ArtifactKind)
                        -> Result<(), LedgerError> {
        self.mutate(|s| s.set_output_files(task_id, files, kind, Utc::now()))
    }

    fn merge_metadata(&self, task_id: &str, patch: serde_json::Value) -> Result<(), LedgerError> {
        self.mutate(|s| s.merge_metadata(task_id, patch, Utc::now()))
    }

    fn get(&self, task_id: &str) -> Result<Option<Task>, LedgerError> {
        self.read(|s| s.get(task_id))
    }

    fn find_by_row(&self, row_index: u32) -> Result<Option<Task>, LedgerError> {
        self.read(|s| s.find_by_row(row_index))
    }

    fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, LedgerError> {
        self.read(|s| s.list_by_status(status))
    }

    fn list_incomplete(&self) -> Result<Vec<Task>, LedgerError> {
        self.read(|s| s.list_incomplete())
    }

    fn list_incomplete_by_type(&self, workflow_type: WorkflowType) -> Result<Vec<Task>, LedgerError> {
        self.read(|s| s.list_incomplete_by_type(workflow_type))
    }

    fn delete(&self, task_id: &str) -> Result<(), LedgerError> {
        self.mutate(|s| s.delete(task_id))
    }

    fn statistics(&self) -> Result<Statistics, LedgerError> {
        self.read(|s| s.statistics.clone())
    }
}

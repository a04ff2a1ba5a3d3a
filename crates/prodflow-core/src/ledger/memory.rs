//! Implementación en memoria del ledger, para tests y para el binario demo.
use std::sync::Mutex;

use chrono::Utc;
use prodflow_domain::{Statistics, Task, TaskStatus, WorkflowType};

use super::{LedgerError, LedgerState, NewTask, TaskLedger, TransitionFields};
use crate::artifacts::ArtifactKind;

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut LedgerState) -> Result<T, LedgerError>)
                     -> Result<T, LedgerError> {
        let mut state = self.inner
                            .lock()
                            .map_err(|_| LedgerError::Storage("ledger mutex poisoned".into()))?;
        f(&mut state)
    }
}

impl TaskLedger for InMemoryLedger {
    fn create(&self, new: NewTask) -> Result<(), LedgerError> {
        self.with_state(|s| s.create(new, Utc::now()))
    }

    fn transition(&self, task_id: &str, status: TaskStatus, fields: TransitionFields)
                  -> Result<(), LedgerError> {
        self.with_state(|s| s.transition(task_id, status, fields, Utc::now()))
    }

    fn set_remote_job_id(&self, task_id: &str, remote_job_id: &str) -> Result<(), LedgerError> {
        self.with_state(|s| s.set_remote_job_id(task_id, remote_job_id, Utc::now()))
    }

    fn set_output_files(&self, task_id: &str, files: &[String], kind: ArtifactKind)
                        -> Result<(), LedgerError> {
        self.with_state(|s| s.set_output_files(task_id, files, kind, Utc::now()))
    }

    fn merge_metadata(&self, task_id: &str, patch: serde_json::Value) -> Result<(), LedgerError> {
        self.with_state(|s| s.merge_metadata(task_id, patch, Utc::now()))
    }

    fn get(&self, task_id: &str) -> Result<Option<Task>, LedgerError> {
        self.with_state(|s| Ok(s.get(task_id)))
    }

    fn find_by_row(&self, row_index: u32) -> Result<Option<Task>, LedgerError> {
        self.with_state(|s| Ok(s.find_by_row(row_index)))
    }

    fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, LedgerError> {
        self.with_state(|s| Ok(s.list_by_status(status)))
    }

    fn list_incomplete(&self) -> Result<Vec<Task>, LedgerError> {
        self.with_state(|s| Ok(s.list_incomplete()))
    }

    fn list_incomplete_by_type(&self, workflow_type: WorkflowType) -> Result<Vec<Task>, LedgerError> {
        self.with_state(|s| Ok(s.list_incomplete_by_type(workflow_type)))
    }

    fn delete(&self, task_id: &str) -> Result<(), LedgerError> {
        self.with_state(|s| s.delete(task_id))
    }

    fn statistics(&self) -> Result<Statistics, LedgerError> {
        self.with_state(|s| Ok(s.statistics.clone()))
    }
}

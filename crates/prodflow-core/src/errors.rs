//! Errores del core de orquestación.
//!
//! Los desenlaces terminales esperados de un job remoto (falló, timeout,
//! resultado irrecuperable) NO son errores: se devuelven como `WaitOutcome`
//! para que el orquestador y la recuperación los conviertan en una transición
//! del ledger. `CoreError` cubre lo demás: fallos de IO, de colaboradores y
//! de las operaciones del ledger.
use thiserror::Error;

use prodflow_domain::DomainError;

use crate::client::{FetchError, PollError, SubmitError};
use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Desenlace no exitoso de la espera de un job, ya convertido a texto.
    #[error("{0}")]
    Remote(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("row source error: {0}")]
    Source(String),
    #[error("sheet writer error: {0}")]
    Sheet(String),
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

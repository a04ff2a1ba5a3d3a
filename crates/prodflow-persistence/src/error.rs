//! Errores de persistencia.
//! Mapea errores de IO / serialización a variantes semánticas y de ahí al
//! error del contrato del ledger.

use prodflow_core::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("corrupt ledger document {path}: {source}")]
    Corrupt { path: String, source: serde_json::Error },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<PersistenceError> for LedgerError {
    fn from(err: PersistenceError) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

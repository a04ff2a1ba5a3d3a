//! prodflow-persistence
//!
//! Implementación durable del ledger de tareas sobre un documento JSON con
//! reescritura completa por mutación, más utilidades de mantenimiento
//! (limpieza, backup, export CSV).
//!
//! Módulos:
//! - `json`: `JsonLedger`, la implementación de `TaskLedger` respaldada por
//!   archivo.
//! - `config`: carga de configuración desde .env (`LEDGER_PATH`).
//! - `error`: mapeo de errores de IO/serialización al contrato del ledger.

pub mod config;
pub mod error;
pub mod json;

pub use config::{init_dotenv, LedgerConfig};
pub use error::PersistenceError;
pub use json::JsonLedger;

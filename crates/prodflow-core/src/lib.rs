//! prodflow-core: núcleo de orquestación y recuperación.
//!
//! Módulos:
//! - `ledger`: contrato del ledger de tareas (`TaskLedger`), la lógica de
//!   mutación compartida (`LedgerState`) y una implementación en memoria.
//! - `client`: contrato del cliente de jobs remotos y el protocolo de sondeo
//!   (`wait_for_completion`) con su política de reintentos.
//! - `orchestrator`: motor secuencial que lleva cada fila de origen por
//!   crear-entrada -> submit -> sondeo -> persistir-resultado.
//! - `recovery`: reconciliación al arranque de las tareas no terminales que
//!   dejó una ejecución anterior.
//! - `config`: configuración explícita construida una vez y pasada por
//!   referencia a todos los componentes.
pub mod artifacts;
pub mod client;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod orchestrator;
pub mod recovery;
pub mod source;

pub use artifacts::ArtifactKind;
pub use client::{submit_with_retry, wait_for_completion, FetchError, NodeField, PollError,
                 PollOptions, RemoteJobClient, RemoteStatus, SubmitError, SubmitRequest,
                 WaitOutcome, MAX_CONSECUTIVE_CHECK_FAILURES};
pub use config::{AppConfig, PipelineConfig, ServiceConfig};
pub use errors::CoreError;
pub use ledger::{InMemoryLedger, LedgerError, LedgerState, NewTask, TaskLedger, TransitionFields};
pub use orchestrator::{BatchSummary, Orchestrator, RowOutcome};
pub use recovery::{PhaseCounts, RecoveryManager, RecoverySummary};
pub use source::{RowSource, SheetWriter};

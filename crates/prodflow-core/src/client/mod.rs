//! Contrato del cliente de jobs remotos.
//!
//! El servicio de generación es una caja negra asíncrona: se le sube material
//! de entrada, se crea un job referenciando un workflow publicado y una lista
//! ordenada de campos de nodo, y se sondea su estado hasta un desenlace
//! terminal. Este módulo define el contrato y los tipos de error; el
//! protocolo de sondeo vive en `poll`.
mod poll;

pub use poll::{submit_with_retry, wait_for_completion, PollOptions, WaitOutcome,
               MAX_CONSECUTIVE_CHECK_FAILURES};

use async_trait::async_trait;
use thiserror::Error;

/// Estado remoto de un job tal como lo reporta el servicio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Queued,
    Running,
    Success,
    Failed,
    /// Cualquier valor no reconocido; se trata como transitorio.
    Unknown(String),
}

/// Un par campo/valor dirigido a un nodo concreto del workflow remoto.
#[derive(Debug, Clone)]
pub struct NodeField {
    pub node_id: String,
    pub field_name: String,
    pub field_value: String,
}

impl NodeField {
    pub fn new(node_id: impl Into<String>, field_name: impl Into<String>,
               field_value: impl Into<String>)
               -> Self {
        Self { node_id: node_id.into(),
               field_name: field_name.into(),
               field_value: field_value.into() }
    }
}

/// Payload de un submit: workflow publicado + campos de nodo en orden.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub workflow_id: String,
    pub fields: Vec<NodeField>,
}

/// Error de submit. "Cola llena" es la única condición reintenable; el resto
/// de errores de API son terminales para ese intento.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("remote queue is full")]
    QueueFull,
    #[error("api error: {0}")]
    Api(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl SubmitError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::QueueFull)
    }
}

/// Fallo transitorio del chequeo de estado (red / API). Se reintenta hasta un
/// tope de fallos consecutivos antes de escalar.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("api error: {0}")]
    Api(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("api error: {0}")]
    Api(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote job produced no output files")]
    NoOutputs,
}

/// Cliente del servicio de generación remoto. Todas las operaciones son
/// llamadas request/response falibles; ninguna bloquea esperando al job.
#[async_trait]
pub trait RemoteJobClient: Send + Sync {
    /// Sube material de entrada y devuelve el nombre de archivo remoto con el
    /// que un submit posterior puede referenciarlo.
    async fn upload_asset(&self, data: Vec<u8>, filename: &str) -> Result<String, SubmitError>;

    /// Crea el job remoto y devuelve su identificador.
    async fn submit(&self, request: &SubmitRequest) -> Result<String, SubmitError>;

    /// Un único chequeo de estado, no bloqueante.
    async fn poll_once(&self, job_id: &str) -> Result<RemoteStatus, PollError>;

    /// Recupera las URLs de artefactos. Sólo válido tras `Success`.
    async fn fetch_results(&self, job_id: &str) -> Result<Vec<String>, FetchError>;

    /// Descarga el contenido de un artefacto.
    async fn download_artifact(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

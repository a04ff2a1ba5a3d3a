use thiserror::Error;

/// Fallos de validación del dominio: entradas de fila que no cumplen lo que
/// el workflow pedido necesita.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    ValidationError(String),
}

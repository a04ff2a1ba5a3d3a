//! prodflow-domain: tipos de dominio del pipeline de generación.
//!
//! Contiene el modelo de tarea (`Task`) con su ciclo de vida, los contadores
//! agregados (`Statistics`) y el modelo de fila de origen (`RowData`). No hay
//! IO aquí; todo es estado serializable que consumen el ledger y el
//! orquestador.
pub mod error;
pub mod row;
pub mod task;

pub use error::DomainError;
pub use row::{CellValue, RowData};
pub use task::{generate_task_id, Statistics, Task, TaskStatus, WorkflowType};

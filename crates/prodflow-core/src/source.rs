//! Interfaces de colaboradores: origen de filas y escritor de resultados.
//!
//! El backend de hoja de cálculo queda fuera del core; el orquestador sólo
//! depende de estos dos contratos. Los adapters concretos viven en
//! `prodflow-adapters`.
use async_trait::async_trait;

use prodflow_domain::{CellValue, RowData};

use crate::errors::CoreError;

/// Origen de filas de trabajo. Además de listar filas, resuelve el contenido
/// binario de una celda de imagen (URL, ruta local o imagen embebida del
/// backend).
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<RowData>, CoreError>;

    async fn download_cell_image(&self, cell: &CellValue) -> Result<Vec<u8>, CoreError>;
}

/// Escritor de resultados hacia el origen (sólo escritura desde el punto de
/// vista del core). Sus fallos se registran pero nunca abortan la fila.
#[async_trait]
pub trait SheetWriter: Send + Sync {
    /// Publica la imagen resultante en la fila de origen.
    async fn write_image_result(&self, row_number: u32, image_path: &str) -> Result<(), CoreError>;

    /// Actualiza el estado legible de la fase de imagen de la fila.
    async fn update_image_status(&self, row_number: u32, status: &str) -> Result<(), CoreError>;

    /// Actualiza el estado legible de la fase de video de la fila.
    async fn update_video_status(&self, row_number: u32, status: &str) -> Result<(), CoreError>;
}

//! Adapters de origen de filas y de escritura de resultados.
//!
//! `JsonRowSource` lee filas de un archivo JSON local y resuelve celdas de
//! imagen por URL o ruta de archivo; es el origen de referencia cuando no hay
//! backend de hoja de cálculo conectado. Los dobles en memoria
//! (`MemoryRowSource`, `MemorySheetWriter`) sirven a los tests y al binario
//! demo.
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use log::info;

use prodflow_core::{CoreError, RowSource, SheetWriter};
use prodflow_domain::{CellValue, RowData};

/// Origen de filas respaldado por un archivo JSON (`Vec<RowData>`).
pub struct JsonRowSource {
    path: PathBuf,
    http: reqwest::Client,
}

impl JsonRowSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), http: reqwest::Client::new() }
    }
}

#[async_trait]
impl RowSource for JsonRowSource {
    async fn fetch_rows(&self) -> Result<Vec<RowData>, CoreError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| CoreError::Source(format!("cannot read {}: {e}", self.path.display())))?;
        let rows: Vec<RowData> = serde_json::from_str(&raw)
            .map_err(|e| CoreError::Source(format!("cannot parse {}: {e}", self.path.display())))?;
        info!("loaded {} row(s) from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    async fn download_cell_image(&self, cell: &CellValue) -> Result<Vec<u8>, CoreError> {
        match cell {
            CellValue::Text(value) if value.starts_with("http://")
                                      || value.starts_with("https://") =>
            {
                let response = self.http
                                   .get(value)
                                   .send()
                                   .await
                                   .map_err(|e| CoreError::Source(e.to_string()))?
                                   .error_for_status()
                                   .map_err(|e| CoreError::Source(e.to_string()))?;
                let bytes = response.bytes().await.map_err(|e| CoreError::Source(e.to_string()))?;
                Ok(bytes.to_vec())
            }
            CellValue::Text(value) if !value.trim().is_empty() => {
                fs::read(value).map_err(|e| CoreError::Source(format!("cannot read {value}: {e}")))
            }
            CellValue::Text(_) => Err(CoreError::Source("empty image cell".into())),
            CellValue::EmbeddedImage { file_token } => {
                // resolver un token embebido requiere el backend de hoja
                Err(CoreError::Source(format!("no backend to resolve embedded image {file_token}")))
            }
        }
    }
}

/// Origen fijo en memoria: filas precargadas y un mismo contenido binario
/// para cualquier celda.
#[derive(Default)]
pub struct MemoryRowSource {
    rows: Vec<RowData>,
    image_bytes: Vec<u8>,
}

impl MemoryRowSource {
    pub fn new(rows: Vec<RowData>) -> Self {
        Self { rows, image_bytes: vec![0u8; 4] }
    }

    pub fn with_image_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.image_bytes = bytes;
        self
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    async fn fetch_rows(&self) -> Result<Vec<RowData>, CoreError> {
        Ok(self.rows.clone())
    }

    async fn download_cell_image(&self, cell: &CellValue) -> Result<Vec<u8>, CoreError> {
        if !cell.is_present() {
            return Err(CoreError::Source("empty image cell".into()));
        }
        Ok(self.image_bytes.clone())
    }
}

/// Registro de una escritura hacia el origen, para inspección en tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetUpdate {
    ImageResult { row_number: u32, image_path: String },
    ImageStatus { row_number: u32, status: String },
    VideoStatus { row_number: u32, status: String },
}

/// Escritor que acumula las actualizaciones en memoria.
#[derive(Default)]
pub struct MemorySheetWriter {
    updates: Mutex<Vec<SheetUpdate>>,
}

impl MemorySheetWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<SheetUpdate> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }

    fn record(&self, update: SheetUpdate) -> Result<(), CoreError> {
        self.updates
            .lock()
            .map_err(|_| CoreError::Sheet("sheet writer mutex poisoned".into()))?
            .push(update);
        Ok(())
    }
}

#[async_trait]
impl SheetWriter for MemorySheetWriter {
    async fn write_image_result(&self, row_number: u32, image_path: &str) -> Result<(), CoreError> {
        self.record(SheetUpdate::ImageResult { row_number, image_path: image_path.to_string() })
    }

    async fn update_image_status(&self, row_number: u32, status: &str) -> Result<(), CoreError> {
        self.record(SheetUpdate::ImageStatus { row_number, status: status.to_string() })
    }

    async fn update_video_status(&self, row_number: u32, status: &str) -> Result<(), CoreError> {
        self.record(SheetUpdate::VideoStatus { row_number, status: status.to_string() })
    }
}

/// Escritor que sólo deja constancia en el log. Útil cuando el origen es un
/// archivo de sólo lectura.
#[derive(Debug, Default)]
pub struct LogSheetWriter;

#[async_trait]
impl SheetWriter for LogSheetWriter {
    async fn write_image_result(&self, row_number: u32, image_path: &str) -> Result<(), CoreError> {
        info!("row {row_number}: image result {image_path}");
        Ok(())
    }

    async fn update_image_status(&self, row_number: u32, status: &str) -> Result<(), CoreError> {
        info!("row {row_number}: image status {status}");
        Ok(())
    }

    async fn update_video_status(&self, row_number: u32, status: &str) -> Result<(), CoreError> {
        info!("row {row_number}: video status {status}");
        Ok(())
    }
}

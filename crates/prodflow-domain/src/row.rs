//! Modelo de fila de origen.
//!
//! El parseo de columnas vive fuera del core (adapter de hoja de cálculo);
//! aquí sólo se modela la fila ya interpretada: celdas de imagen, prompts y
//! flags de "ya procesado" que alimentan el predicado de elegibilidad.
use serde::{Deserialize, Serialize};

/// Valor de una celda de imagen. El backend de hoja puede devolver texto
/// plano (URL o ruta) o una referencia a imagen embebida con token propio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    EmbeddedImage { file_token: String },
    Text(String),
}

impl CellValue {
    /// Celda con contenido utilizable (texto no vacío o token presente).
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Text(s) => !s.trim().is_empty(),
            CellValue::EmbeddedImage { file_token } => !file_token.is_empty(),
        }
    }

    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::empty()
    }
}

/// Una fila del origen, ya mapeada por el adapter correspondiente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowData {
    pub row_number: u32,
    #[serde(default)]
    pub product_image: CellValue,
    #[serde(default)]
    pub model_image: CellValue,
    /// Imagen compuesta producto+modelo (entrada de la fase de video).
    #[serde(default)]
    pub composite_image: CellValue,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub video_prompt: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub model_name: String,
    /// La fase de imagen ya está marcada como hecha en el origen.
    #[serde(default)]
    pub image_processed: bool,
    /// La fase de video ya está marcada como hecha en el origen.
    #[serde(default)]
    pub video_processed: bool,
}

impl RowData {
    /// Prompt efectivo para la fase de video: el específico si existe, si no
    /// el prompt general de la fila.
    pub fn effective_video_prompt(&self) -> &str {
        if self.video_prompt.trim().is_empty() {
            &self.prompt
        } else {
            &self.video_prompt
        }
    }
}

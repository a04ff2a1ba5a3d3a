//! Guardado local de artefactos descargados.
//!
//! Convención de salida: `{output_dir}/{img|video}/{YYYY-MM-DD}/` con nombre
//! `producto_modelo_timestamp.ext` saneado.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Video,
}

impl ArtifactKind {
    fn subdir(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "img",
            ArtifactKind::Video => "video",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Video => "mp4",
        }
    }
}

/// Reduce un nombre a caracteres seguros para el sistema de archivos.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name.chars()
                              .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
                              .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.replace(' ', "_")
    }
}

/// Ruta de salida organizada por fecha para un artefacto nuevo.
pub fn build_output_path(output_dir: &str, kind: ArtifactKind, product_name: &str,
                         model_name: &str)
                         -> PathBuf {
    let now = Utc::now();
    let date_dir = now.format("%Y-%m-%d").to_string();
    let timestamp = now.format("%Y%m%d_%H%M%S").to_string();
    let filename = format!("{}_{}_{}.{}",
                           sanitize_name(product_name),
                           sanitize_name(model_name),
                           timestamp,
                           kind.extension());
    Path::new(output_dir).join(kind.subdir()).join(date_dir).join(filename)
}

/// Escribe el artefacto creando los directorios intermedios.
pub fn save_artifact(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    info!("artifact saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_chars_only() {
        assert_eq!(sanitize_name("Red Chair #12!"), "Red_Chair_12");
        assert_eq!(sanitize_name("  "), "unknown");
        assert_eq!(sanitize_name("a-b_c"), "a-b_c");
    }

    #[test]
    fn output_path_is_date_organized() {
        let p = build_output_path("/tmp/out", ArtifactKind::Video, "prod", "model");
        let s = p.to_string_lossy();
        assert!(s.starts_with("/tmp/out/video/"));
        assert!(s.ends_with(".mp4"));
    }
}

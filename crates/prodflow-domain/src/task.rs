//! Modelo de tarea y estadísticas agregadas del ledger.
//!
//! Rol en el flujo:
//! - Cada fila elegible del origen produce una `Task` con estado `Pending`.
//! - El orquestador la mueve por la máquina de estados
//!   (`Pending -> ImageGenerating -> VideoGenerating -> Completed`, con
//!   `Failed` alcanzable desde cualquier estado no terminal).
//! - `Statistics` mantiene un contador por estado, actualizado de forma
//!   incremental en cada transición (nunca recalculado), para que la lectura
//!   de un dashboard sea O(1).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Estado de una tarea en el ledger.
///
/// Estados terminales: `Completed` y `Failed`. Una tarea terminal no vuelve a
/// mutar salvo por operaciones explícitas de mantenimiento (borrado/export).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    ImageGenerating,
    VideoGenerating,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::ImageGenerating => "image_generating",
            TaskStatus::VideoGenerating => "video_generating",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Estados que el Recovery Manager considera pendientes de reconciliar.
    pub fn is_incomplete(&self) -> bool {
        !self.is_terminal()
    }
}

/// Tipo de workflow al que pertenece una tarea. Determina qué pipeline remoto
/// se invoca y qué campo de resultado (`image_path` / `video_path`) se llena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    ImageComposition,
    ImageToVideo,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::ImageComposition => "image_composition",
            WorkflowType::ImageToVideo => "image_to_video",
        }
    }
}

/// Una unidad de trabajo orquestado: una fila de origen, un tipo de workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub workflow_type: WorkflowType,
    pub status: TaskStatus,
    pub row_index: u32,
    pub product_name: String,
    pub image_prompt: String,
    pub video_prompt: String,
    /// Identificador del job en el servicio remoto; ausente hasta que un
    /// submit tenga éxito. Requerido antes de poder sondear la tarea.
    #[serde(default)]
    pub remote_job_id: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub video_path: Option<String>,
    /// Artefactos devueltos por el servicio remoto en la fase más reciente.
    #[serde(default)]
    pub output_files: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Contexto auxiliar (snapshot de la fila, nombres de archivos subidos)
    /// suficiente para reconstruir un submit tras un reinicio.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Task {
    /// Crea una tarea nueva en estado `Pending` con ambos timestamps en `now`.
    pub fn new(task_id: String,
               row_index: u32,
               workflow_type: WorkflowType,
               product_name: String,
               image_prompt: String,
               video_prompt: String,
               metadata: serde_json::Value,
               now: DateTime<Utc>)
               -> Self {
        Self { task_id,
               workflow_type,
               status: TaskStatus::Pending,
               row_index,
               product_name,
               image_prompt,
               video_prompt,
               remote_job_id: None,
               image_path: None,
               video_path: None,
               output_files: Vec::new(),
               error_message: None,
               created_at: now,
               updated_at: now,
               metadata }
    }
}

/// Contadores agregados del ledger, uno por estado más el total.
///
/// Forma fija (un campo por estado) en lugar de un mapa dinámico: añadir un
/// estado nuevo obliga a tocar los `match` exhaustivos de abajo en tiempo de
/// compilación.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_tasks: u64,
    pub pending: u64,
    pub image_generating: u64,
    pub video_generating: u64,
    pub completed: u64,
    pub failed: u64,
}

impl Statistics {
    fn bucket_mut(&mut self, status: TaskStatus) -> &mut u64 {
        match status {
            TaskStatus::Pending => &mut self.pending,
            TaskStatus::ImageGenerating => &mut self.image_generating,
            TaskStatus::VideoGenerating => &mut self.video_generating,
            TaskStatus::Completed => &mut self.completed,
            TaskStatus::Failed => &mut self.failed,
        }
    }

    /// Alta de una tarea nueva (siempre `Pending`).
    pub fn on_create(&mut self) {
        self.total_tasks += 1;
        self.pending += 1;
    }

    /// Mueve el contador del estado viejo al nuevo. Si son iguales la
    /// operación es un no-op (transición idempotente).
    pub fn on_transition(&mut self, old: TaskStatus, new: TaskStatus) {
        if old == new {
            return;
        }
        let from = self.bucket_mut(old);
        *from = from.saturating_sub(1);
        *self.bucket_mut(new) += 1;
    }

    /// Baja de una tarea con el estado indicado.
    pub fn on_delete(&mut self, status: TaskStatus) {
        self.total_tasks = self.total_tasks.saturating_sub(1);
        let bucket = self.bucket_mut(status);
        *bucket = bucket.saturating_sub(1);
    }

    /// Tareas con una fase remota en curso.
    pub fn in_progress(&self) -> u64 {
        self.image_generating + self.video_generating
    }

    /// Porcentaje de tareas completadas sobre el total (0.0 si no hay tareas).
    pub fn completion_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total_tasks as f64) * 100.0
        }
    }
}

/// Genera un identificador de tarea legible y único:
/// `task_{fila}_{nombre saneado}_{timestamp}_{uuid corto}`.
///
/// El nombre de producto se reduce a alfanuméricos y se trunca a 10
/// caracteres. El sufijo uuid evita colisiones cuando dos tareas de la misma
/// fila se crean dentro del mismo segundo.
pub fn generate_task_id(row_index: u32, product_name: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    let short = &suffix[..8];
    let clean: String = product_name.chars().filter(|c| c.is_alphanumeric()).take(10).collect();
    if clean.is_empty() {
        format!("task_{row_index}_{timestamp}_{short}")
    } else {
        format!("task_{row_index}_{clean}_{timestamp}_{short}")
    }
}

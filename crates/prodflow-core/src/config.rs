//! Configuración explícita de la aplicación.
//!
//! Se construye una sola vez (`AppConfig::from_env`) y se pasa por referencia
//! a ledger, cliente, orquestador y recuperación. No hay singleton mutable;
//! el único estado global es la carga perezosa de `.env`.
use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::client::PollOptions;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

/// Parámetros del servicio de generación remoto.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: String,
    /// Workflow publicado de composición de imagen.
    pub image_workflow_id: String,
    pub product_image_node_id: String,
    pub model_image_node_id: String,
    /// Fase de video encendida/apagada. Apagada, la fase de imagen es
    /// terminal y la tarea pasa directo a `Completed`.
    pub video_workflow_enabled: bool,
    pub video_workflow_id: String,
    pub video_image_node_id: String,
    pub video_prompt_node_id: String,
    /// Espera entre chequeos de estado de un job en curso.
    pub poll_interval_secs: u64,
    /// Espera entre reintentos cuando el chequeo mismo falla.
    pub retry_interval_secs: u64,
    /// Presupuesto total de espera por job.
    pub max_wait_secs: u64,
    /// Pausa tras un submit exitoso antes del primer chequeo: el servicio
    /// tarda un momento en registrar el job.
    pub settle_delay_secs: u64,
}

impl ServiceConfig {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions { max_wait: Duration::from_secs(self.max_wait_secs),
                      poll_interval: Duration::from_secs(self.poll_interval_secs),
                      retry_interval: Duration::from_secs(self.retry_interval_secs) }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8188".into(),
               api_key: String::new(),
               image_workflow_id: String::new(),
               product_image_node_id: "156".into(),
               model_image_node_id: "145".into(),
               video_workflow_enabled: true,
               video_workflow_id: String::new(),
               video_image_node_id: "293".into(),
               video_prompt_node_id: "368".into(),
               poll_interval_secs: 30,
               retry_interval_secs: 10,
               max_wait_secs: 1800,
               settle_delay_secs: 5 }
    }
}

/// Parámetros del pipeline local.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Reintentos de submit ante "cola llena".
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    /// Pausa entre filas de un batch para no saturar la API.
    pub row_delay_secs: u64,
    pub output_dir: String,
    pub temp_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_retries: 3,
               retry_delay_secs: 5,
               row_delay_secs: 2,
               output_dir: "./output".into(),
               temp_dir: "./temp".into() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (y `.env` si
    /// existe). `SERVICE_API_KEY` e `IMAGE_WORKFLOW_ID` son obligatorias; el
    /// resto tiene defaults razonables.
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let defaults = ServiceConfig::default();
        let service = ServiceConfig {
            base_url: env::var("SERVICE_BASE_URL").unwrap_or(defaults.base_url),
            api_key: env::var("SERVICE_API_KEY").expect("SERVICE_API_KEY not set"),
            image_workflow_id: env::var("IMAGE_WORKFLOW_ID").expect("IMAGE_WORKFLOW_ID not set"),
            product_image_node_id: env::var("PRODUCT_IMAGE_NODE_ID")
                .unwrap_or(defaults.product_image_node_id),
            model_image_node_id: env::var("MODEL_IMAGE_NODE_ID")
                .unwrap_or(defaults.model_image_node_id),
            video_workflow_enabled: env::var("VIDEO_WORKFLOW_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.video_workflow_enabled),
            video_workflow_id: env::var("VIDEO_WORKFLOW_ID").unwrap_or(defaults.video_workflow_id),
            video_image_node_id: env::var("VIDEO_IMAGE_NODE_ID")
                .unwrap_or(defaults.video_image_node_id),
            video_prompt_node_id: env::var("VIDEO_PROMPT_NODE_ID")
                .unwrap_or(defaults.video_prompt_node_id),
            poll_interval_secs: env_u64("POLL_INTERVAL_SECS", defaults.poll_interval_secs),
            retry_interval_secs: env_u64("RETRY_INTERVAL_SECS", defaults.retry_interval_secs),
            max_wait_secs: env_u64("MAX_WAIT_SECS", defaults.max_wait_secs),
            settle_delay_secs: env_u64("SETTLE_DELAY_SECS", defaults.settle_delay_secs),
        };
        let pd = PipelineConfig::default();
        let pipeline = PipelineConfig {
            max_retries: env_u64("MAX_RETRIES", pd.max_retries as u64) as u32,
            retry_delay_secs: env_u64("RETRY_DELAY_SECS", pd.retry_delay_secs),
            row_delay_secs: env_u64("ROW_DELAY_SECS", pd.row_delay_secs),
            output_dir: env::var("OUTPUT_DIR").unwrap_or(pd.output_dir),
            temp_dir: env::var("TEMP_DIR").unwrap_or(pd.temp_dir),
        };
        Self { service, pipeline }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

//! Carga de configuración de persistencia desde variables de entorno.
//! Usa convención `LEDGER_PATH` con default local.

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub path: PathBuf,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let path = env::var("LEDGER_PATH").unwrap_or_else(|_| "data/ledger.json".to_string());
        Self { path: PathBuf::from(path) }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

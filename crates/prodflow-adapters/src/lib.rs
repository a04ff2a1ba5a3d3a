//! prodflow-adapters: implementaciones concretas de los contratos del core.
//!
//! Este crate provee:
//! - `HttpJobClient`: cliente real del servicio de generación remoto.
//! - `JsonRowSource` / `LogSheetWriter`: origen de filas basado en archivo.
//! - Dobles en memoria (`MockJobClient`, `MemoryRowSource`,
//!   `MemorySheetWriter`) para tests y para el binario demo.
//!
//! El core sólo conoce los traits `RemoteJobClient`, `RowSource` y
//! `SheetWriter`; aquí viven el formato de cable y el transporte HTTP.

pub mod http;
pub mod mock;
pub mod sheet;
pub mod wire;

pub use http::HttpJobClient;
pub use mock::MockJobClient;
pub use sheet::{JsonRowSource, LogSheetWriter, MemoryRowSource, MemorySheetWriter, SheetUpdate};

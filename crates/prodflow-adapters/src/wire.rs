//! Formato de cable de la API del servicio de generación.
//!
//! Toda respuesta llega envuelta en `{ code, msg|message, data }` con
//! `code == 0` como éxito. El payload `data` es poco disciplinado: el estado
//! puede venir como string plano o como objeto, y la lista de salidas como
//! arreglo de objetos, arreglo de strings u objeto suelto. Los parsers de
//! este módulo absorben esas variantes.
use serde::Deserialize;
use serde_json::Value;

use prodflow_core::RemoteStatus;

/// Código con el que el servicio rechaza un submit por cola llena.
pub const CODE_QUEUE_FULL: i64 = 421;

/// Sobre genérico de respuesta de la API.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl ApiEnvelope {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Texto de error del sobre; el servicio usa `msg` o `message` según el
    /// endpoint.
    pub fn error_text(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("api error code {}", self.code))
    }
}

/// Interpreta el `data` del endpoint de estado. Acepta string plano u objeto
/// con clave `taskStatus` o `status`; cualquier otra forma queda `Unknown`.
pub fn parse_status(data: &Value) -> RemoteStatus {
    let text = match data {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("taskStatus")
                                 .or_else(|| map.get("status"))
                                 .and_then(Value::as_str),
        _ => None,
    };
    match text {
        Some(s) => status_from_str(s),
        None => RemoteStatus::Unknown(data.to_string()),
    }
}

fn status_from_str(s: &str) -> RemoteStatus {
    match s.to_ascii_uppercase().as_str() {
        "QUEUED" => RemoteStatus::Queued,
        "RUNNING" => RemoteStatus::Running,
        "SUCCESS" => RemoteStatus::Success,
        "FAILED" => RemoteStatus::Failed,
        _ => RemoteStatus::Unknown(s.to_string()),
    }
}

/// Extrae las URLs de artefactos del `data` del endpoint de salidas. Acepta
/// arreglo de objetos (`fileUrl` o `url`), arreglo de strings u objeto suelto.
pub fn parse_outputs(data: &Value) -> Vec<String> {
    match data {
        Value::Array(items) => items.iter().filter_map(output_url).collect(),
        Value::Object(_) => output_url(data).into_iter().collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn output_url(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map.get("fileUrl")
                                 .or_else(|| map.get("url"))
                                 .and_then(Value::as_str)
                                 .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_deserializes_both_message_keys() {
        let e: ApiEnvelope = serde_json::from_value(json!({ "code": 421, "msg": "queue full" }))
            .unwrap();
        assert!(!e.is_ok());
        assert_eq!(e.code, CODE_QUEUE_FULL);
        assert_eq!(e.error_text(), "queue full");

        let e: ApiEnvelope = serde_json::from_value(json!({ "code": 500, "message": "boom" }))
            .unwrap();
        assert_eq!(e.error_text(), "boom");

        let e: ApiEnvelope = serde_json::from_value(json!({ "code": 7 })).unwrap();
        assert_eq!(e.error_text(), "api error code 7");
    }

    #[test]
    fn status_accepts_string_and_object_shapes() {
        assert_eq!(parse_status(&json!("SUCCESS")), RemoteStatus::Success);
        assert_eq!(parse_status(&json!("running")), RemoteStatus::Running);
        assert_eq!(parse_status(&json!({ "taskStatus": "QUEUED" })), RemoteStatus::Queued);
        assert_eq!(parse_status(&json!({ "status": "FAILED" })), RemoteStatus::Failed);
        assert_eq!(parse_status(&json!("WEIRD")),
                   RemoteStatus::Unknown("WEIRD".to_string()));
        assert!(matches!(parse_status(&json!(42)), RemoteStatus::Unknown(_)));
    }

    #[test]
    fn outputs_accepts_every_observed_shape() {
        let urls = parse_outputs(&json!([{ "fileUrl": "https://x/a.png" },
                                         { "url": "https://x/b.png" }]));
        assert_eq!(urls, vec!["https://x/a.png", "https://x/b.png"]);

        let urls = parse_outputs(&json!(["https://x/c.png"]));
        assert_eq!(urls, vec!["https://x/c.png"]);

        let urls = parse_outputs(&json!({ "fileUrl": "https://x/d.png" }));
        assert_eq!(urls, vec!["https://x/d.png"]);

        assert!(parse_outputs(&json!(null)).is_empty());
        assert!(parse_outputs(&json!([{ "other": 1 }])).is_empty());
    }
}

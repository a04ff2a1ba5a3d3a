//! Cliente HTTP del servicio de generación remoto.
//!
//! Cuatro endpoints POST bajo `/task/openapi/` (upload, create, status,
//! outputs) más la descarga GET directa de artefactos. La autenticación va
//! como campo `apiKey` dentro de cada payload, no como header.
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

use prodflow_core::{FetchError, PollError, RemoteJobClient, RemoteStatus, ServiceConfig,
                    SubmitError, SubmitRequest};

use crate::wire::{self, ApiEnvelope, CODE_QUEUE_FULL};

pub struct HttpJobClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpJobClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(),
               base_url: base_url.into(),
               api_key: api_key.into() }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/task/openapi/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<ApiEnvelope, reqwest::Error> {
        debug!("POST {}", self.endpoint(path));
        self.http
            .post(self.endpoint(path))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ApiEnvelope>()
            .await
    }
}

#[async_trait]
impl RemoteJobClient for HttpJobClient {
    async fn upload_asset(&self, data: Vec<u8>, filename: &str) -> Result<String, SubmitError> {
        let part = Part::bytes(data).file_name(filename.to_string());
        let form = Form::new().text("apiKey", self.api_key.clone())
                              .text("fileType", "image")
                              .part("file", part);
        let envelope: ApiEnvelope = self.http
                                        .post(self.endpoint("upload"))
                                        .multipart(form)
                                        .send()
                                        .await
                                        .map_err(|e| SubmitError::Transport(e.to_string()))?
                                        .error_for_status()
                                        .map_err(|e| SubmitError::Transport(e.to_string()))?
                                        .json()
                                        .await
                                        .map_err(|e| SubmitError::Transport(e.to_string()))?;
        if !envelope.is_ok() {
            return Err(SubmitError::Api(envelope.error_text()));
        }
        envelope.data
                .get("fileName")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| SubmitError::Api("upload response carried no fileName".into()))
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<String, SubmitError> {
        let node_info: Vec<Value> =
            request.fields
                   .iter()
                   .map(|f| {
                       json!({ "nodeId": f.node_id,
                               "fieldName": f.field_name,
                               "fieldValue": f.field_value })
                   })
                   .collect();
        let body = json!({ "apiKey": self.api_key,
                           "workflowId": request.workflow_id,
                           "nodeInfoList": node_info });
        let envelope = self.post_json("create", body)
                           .await
                           .map_err(|e| SubmitError::Transport(e.to_string()))?;
        if envelope.code == CODE_QUEUE_FULL {
            return Err(SubmitError::QueueFull);
        }
        if !envelope.is_ok() {
            return Err(SubmitError::Api(envelope.error_text()));
        }
        envelope.data
                .get("taskId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| SubmitError::Api("create response carried no taskId".into()))
    }

    async fn poll_once(&self, job_id: &str) -> Result<RemoteStatus, PollError> {
        let body = json!({ "apiKey": self.api_key, "taskId": job_id });
        let envelope = self.post_json("status", body)
                           .await
                           .map_err(|e| PollError::Transport(e.to_string()))?;
        if !envelope.is_ok() {
            return Err(PollError::Api(envelope.error_text()));
        }
        Ok(wire::parse_status(&envelope.data))
    }

    async fn fetch_results(&self, job_id: &str) -> Result<Vec<String>, FetchError> {
        let body = json!({ "apiKey": self.api_key, "taskId": job_id });
        let envelope = self.post_json("outputs", body)
                           .await
                           .map_err(|e| FetchError::Transport(e.to_string()))?;
        if !envelope.is_ok() {
            return Err(FetchError::Api(envelope.error_text()));
        }
        let urls = wire::parse_outputs(&envelope.data);
        if urls.is_empty() {
            return Err(FetchError::NoOutputs);
        }
        Ok(urls)
    }

    async fn download_artifact(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http
                           .get(url)
                           .send()
                           .await
                           .map_err(|e| FetchError::Transport(e.to_string()))?
                           .error_for_status()
                           .map_err(|e| FetchError::Api(e.to_string()))?;
        let bytes = response.bytes().await.map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

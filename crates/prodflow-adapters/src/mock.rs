//! Doble de prueba del cliente de jobs remotos.
//!
//! Las respuestas se programan por operación en colas FIFO; agotada la cola,
//! la operación responde con un valor por defecto exitoso. Así un test sólo
//! programa los pasos que le interesan.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use prodflow_core::{FetchError, PollError, RemoteJobClient, RemoteStatus, SubmitError,
                    SubmitRequest};

#[derive(Default)]
struct Inner {
    upload_results: VecDeque<Result<String, SubmitError>>,
    submit_results: VecDeque<Result<String, SubmitError>>,
    poll_results: VecDeque<Result<RemoteStatus, PollError>>,
    fetch_results: VecDeque<Result<Vec<String>, FetchError>>,
    download_results: VecDeque<Result<Vec<u8>, FetchError>>,
    submitted: Vec<SubmitRequest>,
    uploads: u32,
    polls: u32,
}

#[derive(Default)]
pub struct MockJobClient {
    inner: Mutex<Inner>,
}

impl MockJobClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_upload(&self, result: Result<String, SubmitError>) {
        self.lock().upload_results.push_back(result);
    }

    pub fn enqueue_submit(&self, result: Result<String, SubmitError>) {
        self.lock().submit_results.push_back(result);
    }

    pub fn enqueue_poll(&self, result: Result<RemoteStatus, PollError>) {
        self.lock().poll_results.push_back(result);
    }

    pub fn enqueue_fetch(&self, result: Result<Vec<String>, FetchError>) {
        self.lock().fetch_results.push_back(result);
    }

    pub fn enqueue_download(&self, result: Result<Vec<u8>, FetchError>) {
        self.lock().download_results.push_back(result);
    }

    /// Submits observados, en orden.
    pub fn submitted_requests(&self) -> Vec<SubmitRequest> {
        self.lock().submitted.clone()
    }

    pub fn poll_count(&self) -> u32 {
        self.lock().polls
    }

    pub fn upload_count(&self) -> u32 {
        self.lock().uploads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock client state poisoned")
    }
}

#[async_trait]
impl RemoteJobClient for MockJobClient {
    async fn upload_asset(&self, _data: Vec<u8>, _filename: &str) -> Result<String, SubmitError> {
        let mut inner = self.lock();
        inner.uploads += 1;
        let n = inner.uploads;
        inner.upload_results.pop_front().unwrap_or_else(|| Ok(format!("upload_{n}.png")))
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<String, SubmitError> {
        let mut inner = self.lock();
        inner.submitted.push(request.clone());
        let n = inner.submitted.len();
        inner.submit_results.pop_front().unwrap_or_else(|| Ok(format!("job-{n}")))
    }

    async fn poll_once(&self, _job_id: &str) -> Result<RemoteStatus, PollError> {
        let mut inner = self.lock();
        inner.polls += 1;
        inner.poll_results.pop_front().unwrap_or(Ok(RemoteStatus::Success))
    }

    async fn fetch_results(&self, _job_id: &str) -> Result<Vec<String>, FetchError> {
        self.lock()
            .fetch_results
            .pop_front()
            .unwrap_or_else(|| Ok(vec!["https://files.example/artifact.png".to_string()]))
    }

    async fn download_artifact(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        self.lock().download_results.pop_front().unwrap_or_else(|| Ok(vec![0xFF, 0xD8, 0xFF]))
    }
}

//! Protocolo de sondeo y espera de un job remoto.
//!
//! Dos duraciones de espera distintas, a propósito:
//! - `retry_interval` (corto, intentos acotados): el chequeo de estado en sí
//!   está fallando; reintentar rápido y fallar pronto.
//! - `poll_interval` (largo, sin tope propio): el job legítimamente sigue
//!   corriendo; la única cota es `max_wait` global.
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::{sleep, Instant};

use super::{PollError, RemoteJobClient, RemoteStatus, SubmitError, SubmitRequest};

/// Tope de fallos consecutivos del chequeo de estado antes de escalar.
pub const MAX_CONSECUTIVE_CHECK_FAILURES: u32 = 3;

#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Presupuesto total de espera para el job.
    pub max_wait: Duration,
    /// Espera entre chequeos cuando el job sigue en cola/ejecución.
    pub poll_interval: Duration,
    /// Espera entre reintentos cuando el chequeo mismo falla. Más corta que
    /// `poll_interval`.
    pub retry_interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self { max_wait: Duration::from_secs(1800),
               poll_interval: Duration::from_secs(30),
               retry_interval: Duration::from_secs(10) }
    }
}

/// Desenlace de la espera. Son valores, no errores: el llamador los enruta a
/// una transición del ledger.
#[derive(Debug)]
pub enum WaitOutcome {
    /// El job terminó y sus artefactos se recuperaron.
    Completed { artifacts: Vec<String> },
    /// El job falló en el lado remoto.
    Failed { error: String },
    /// El job terminó en remoto pero el resultado no pudo recuperarse. Se
    /// distingue de `Failed`: "corrió pero perdimos la salida" no es "no
    /// corrió".
    ResultsUnavailable { error: String },
    /// Se agotó el presupuesto `max_wait`.
    Timeout { waited: Duration },
    /// El chequeo de estado falló `MAX_CONSECUTIVE_CHECK_FAILURES` veces
    /// seguidas.
    ConsecutiveCheckFailure { error: String },
}

impl WaitOutcome {
    /// Mensaje legible para `error_message` del ledger en desenlaces no
    /// exitosos.
    pub fn error_text(&self) -> Option<String> {
        match self {
            WaitOutcome::Completed { .. } => None,
            WaitOutcome::Failed { error } => Some(format!("remote job failed: {error}")),
            WaitOutcome::ResultsUnavailable { error } => {
                Some(format!("job completed remotely but produced no retrievable output: {error}"))
            }
            WaitOutcome::Timeout { waited } => {
                Some(format!("timed out waiting for job completion after {}s", waited.as_secs()))
            }
            WaitOutcome::ConsecutiveCheckFailure { error } => {
                Some(format!("status check failed {MAX_CONSECUTIVE_CHECK_FAILURES} times in a row: {error}"))
            }
        }
    }
}

/// Espera a que un job remoto llegue a un desenlace terminal.
///
/// Bucle: con el presupuesto agotado devuelve `Timeout`; un chequeo fallido
/// incrementa el contador de fallos consecutivos (tope 3, reintento corto sin
/// resetear el tiempo transcurrido); un chequeo exitoso resetea el contador y
/// ramifica por estado remoto. `Unknown` se trata como transitorio y no
/// cuenta como fallo.
pub async fn wait_for_completion<C>(client: &C, job_id: &str, opts: &PollOptions) -> WaitOutcome
    where C: RemoteJobClient + ?Sized
{
    let started = Instant::now();
    let mut consecutive_failures: u32 = 0;

    loop {
        let elapsed = started.elapsed();
        if elapsed > opts.max_wait {
            warn!("job {job_id}: wait budget exhausted after {}s", elapsed.as_secs());
            return WaitOutcome::Timeout { waited: elapsed };
        }

        match client.poll_once(job_id).await {
            Err(err) => {
                consecutive_failures += 1;
                warn!("job {job_id}: status check failed ({consecutive_failures}/{MAX_CONSECUTIVE_CHECK_FAILURES}): {err}");
                if consecutive_failures >= MAX_CONSECUTIVE_CHECK_FAILURES {
                    return WaitOutcome::ConsecutiveCheckFailure { error: err.to_string() };
                }
                sleep(opts.retry_interval).await;
            }
            Ok(status) => {
                consecutive_failures = 0;
                debug!("job {job_id}: remote status {status:?} after {}s", elapsed.as_secs());
                match status {
                    RemoteStatus::Success => {
                        return match client.fetch_results(job_id).await {
                            Ok(artifacts) => {
                                info!("job {job_id}: completed with {} artifact(s)", artifacts.len());
                                WaitOutcome::Completed { artifacts }
                            }
                            Err(err) => WaitOutcome::ResultsUnavailable { error: err.to_string() },
                        };
                    }
                    RemoteStatus::Failed => {
                        return WaitOutcome::Failed { error: "job failed on the remote side".into() };
                    }
                    RemoteStatus::Queued | RemoteStatus::Running => {
                        sleep(opts.poll_interval).await;
                    }
                    RemoteStatus::Unknown(other) => {
                        warn!("job {job_id}: unknown remote status {other:?}, still waiting");
                        sleep(opts.poll_interval).await;
                    }
                }
            }
        }
    }
}

/// Submit con reintento acotado para la condición "cola llena". Cualquier
/// otro error de submit es terminal para el intento.
pub async fn submit_with_retry<C>(client: &C, request: &SubmitRequest, max_retries: u32,
                                  retry_delay: Duration)
                                  -> Result<String, SubmitError>
    where C: RemoteJobClient + ?Sized
{
    let mut attempt: u32 = 0;
    loop {
        match client.submit(request).await {
            Ok(job_id) => return Ok(job_id),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!("submit rejected ({err}), retry {attempt}/{max_retries} in {}s",
                      retry_delay.as_secs());
                sleep(retry_delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

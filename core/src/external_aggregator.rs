//! External scoring on a worker thread, bounded by the registry timeout.
//!
//! `start` hands the engine run to a worker and returns immediately so the
//! caller can run internal scoring meanwhile; `wait` joins with a deadline.
//!
//! Outcomes of `wait`:
//!   - worker finished:     its ScoringResult (possibly carrying a system-error flag)
//!   - deadline passed:     a result with the system-error flag, not an Err
//!   - worker panicked:     Err(WorkerFailed), an irrecoverable fault
//!
//! A worker that misses the deadline is left to finish on its own; its
//! result is dropped.

use crate::{
    config::ScreeningConfig,
    error::{ScreenError, ScreenResult},
    external_engine::{CheckOptions, ExternalRuleEngine},
    identifiers::Identifiers,
    registry::RegistrySource,
    scoring::ScoringResult,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type WorkerOutcome = Result<ScoringResult, String>;

pub struct ExternalAggregator {
    registry: Arc<dyn RegistrySource>,
    engine: Arc<ExternalRuleEngine>,
    timeout: Duration,
}

/// An external screening in flight.
pub struct PendingScreening {
    rx: Receiver<WorkerOutcome>,
    engine: Arc<ExternalRuleEngine>,
    started: Instant,
    timeout: Duration,
    label: String,
}

impl ExternalAggregator {
    pub fn new(registry: Arc<dyn RegistrySource>, engine: ExternalRuleEngine, timeout: Duration) -> Self {
        Self { registry, engine: Arc::new(engine), timeout }
    }

    pub fn from_config(cfg: &ScreeningConfig, registry: Arc<dyn RegistrySource>) -> Self {
        Self::new(
            registry,
            ExternalRuleEngine::from_config(cfg),
            Duration::from_millis(cfg.registry.timeout_ms),
        )
    }

    pub fn start(&self, identifiers: Identifiers, options: CheckOptions) -> ScreenResult<PendingScreening> {
        let (tx, rx) = mpsc::channel::<WorkerOutcome>();
        let registry = Arc::clone(&self.registry);
        let engine = Arc::clone(&self.engine);
        let label = identifiers.masked();
        let started = Instant::now();

        thread::Builder::new()
            .name("external-screening".into())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    engine.perform_check(registry.as_ref(), &identifiers, &options)
                }))
                .map_err(|payload| panic_message(payload.as_ref()));
                let _ = tx.send(outcome);
            })
            .map_err(|e| ScreenError::WorkerFailed(format!("cannot spawn screening worker: {e}")))?;

        Ok(PendingScreening {
            rx,
            engine: Arc::clone(&self.engine),
            started,
            timeout: self.timeout,
            label,
        })
    }

    /// Start and wait in one call.
    pub fn screen(&self, identifiers: Identifiers, options: CheckOptions) -> ScreenResult<ScoringResult> {
        self.start(identifiers, options)?.wait()
    }
}

impl PendingScreening {
    pub fn wait(self) -> ScreenResult<ScoringResult> {
        let remaining = self.timeout.saturating_sub(self.started.elapsed());
        match self.rx.recv_timeout(remaining) {
            Ok(Ok(result)) => {
                log::info!(
                    "external {}: score={} level={} flags={} elapsed={}ms",
                    self.label,
                    result.total_score,
                    result.risk_level,
                    result.flags.len(),
                    result.elapsed_ms
                );
                Ok(result)
            }
            Ok(Err(msg)) => {
                log::error!("external screening worker for {} panicked: {msg}", self.label);
                Err(ScreenError::WorkerFailed(msg))
            }
            Err(RecvTimeoutError::Timeout) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                log::warn!("external screening for {} timed out after {timeout_ms}ms", self.label);
                Ok(self
                    .engine
                    .fault_result(&ScreenError::RegistryTimeout { timeout_ms }, self.started))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ScreenError::WorkerFailed(
                "external screening worker exited without a result".into(),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

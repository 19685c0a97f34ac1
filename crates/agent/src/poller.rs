//! Drift-compensated polling loop.
//!
//! Each tick ingests the sensor data file, evaluates changed samples against
//! the alarm policy, forwards transitions to the notification sink and, if a
//! configuration change is pending, runs one regeneration pass. The loop then
//! sleeps for whatever is left of the period; a tick that overruns the period
//! is followed immediately by the next one, with no catch-up burst.
//!
//! The poller owns the [`SensorStore`] and [`ThresholdPolicy`]. Reads and
//! writes from the protocol layer reach them through a [`PollerHandle`] and
//! are served between ticks, on the poller's own task.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use envmon_core::alarm::thresholds::ThresholdPolicy;
use envmon_core::alert::{AlarmEvent, NotificationSink};
use envmon_core::error::CoreError;
use envmon_core::line_format;
use envmon_core::registry::ObjectRegistry;
use envmon_core::sensor::SensorStore;
use envmon_core::types::SensorValue;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::regenerator::{ConfigRegenerator, RegenerationOutcome};
use crate::signal::ConfigChangeSignal;

/// Capacity of the object request queue.
const REQUEST_QUEUE_CAPACITY: usize = 32;

/// How long to wait before the next tick, given how long this one took.
///
/// Never negative: an overrun yields zero.
pub fn sleep_after(elapsed: Duration, period: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Summary of one tick, used for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Data lines accepted by ingestion.
    pub ingested: usize,
    /// Samples that changed a stored value.
    pub changed: usize,
    /// Alarm transitions emitted.
    pub transitions: usize,
    /// Whether a regeneration pass ran.
    pub regenerated: bool,
    pub elapsed: Duration,
}

/// A read or write arriving from the protocol layer.
#[derive(Debug)]
pub enum ObjectRequest {
    Read {
        name: String,
        reply: oneshot::Sender<Result<SensorValue, CoreError>>,
    },
    Write {
        name: String,
        value: SensorValue,
        reply: oneshot::Sender<Result<(), CoreError>>,
    },
}

/// Cloneable handle for reading and writing objects owned by a running poller.
#[derive(Debug, Clone)]
pub struct PollerHandle {
    requests: mpsc::Sender<ObjectRequest>,
}

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("poller is no longer running")]
    Stopped,
    #[error(transparent)]
    Object(#[from] CoreError),
}

impl PollerHandle {
    pub async fn read(&self, name: &str) -> Result<SensorValue, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(ObjectRequest::Read {
                name: name.to_string(),
                reply,
            })
            .await
            .map_err(|_| HandleError::Stopped)?;
        Ok(rx.await.map_err(|_| HandleError::Stopped)??)
    }

    pub async fn write(&self, name: &str, value: SensorValue) -> Result<(), HandleError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(ObjectRequest::Write {
                name: name.to_string(),
                value,
                reply,
            })
            .await
            .map_err(|_| HandleError::Stopped)?;
        Ok(rx.await.map_err(|_| HandleError::Stopped)??)
    }
}

pub struct Poller {
    data_file: PathBuf,
    period: Duration,
    registry: ObjectRegistry,
    store: SensorStore,
    policy: ThresholdPolicy,
    sink: Arc<dyn NotificationSink>,
    signal: ConfigChangeSignal,
    regenerator: ConfigRegenerator,
    requests: mpsc::Receiver<ObjectRequest>,
}

impl Poller {
    /// Build a poller for every sensor in `registry`, plus the handle used
    /// to reach its objects while it runs.
    pub fn new(
        data_file: impl Into<PathBuf>,
        period: Duration,
        registry: ObjectRegistry,
        policy: ThresholdPolicy,
        sink: Arc<dyn NotificationSink>,
        signal: ConfigChangeSignal,
        regenerator: ConfigRegenerator,
    ) -> (Self, PollerHandle) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let store = registry.sensor_store();
        let poller = Self {
            data_file: data_file.into(),
            period,
            registry,
            store,
            policy,
            sink,
            signal,
            regenerator,
            requests: rx,
        };
        (poller, PollerHandle { requests: tx })
    }

    pub fn store(&self) -> &SensorStore {
        &self.store
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    /// Apply a protocol-layer write directly (used when no loop is running).
    pub fn write_object(&mut self, name: &str, value: SensorValue) -> Result<(), CoreError> {
        self.registry.write(name, value, &mut self.policy)
    }

    pub fn read_object(&self, name: &str) -> Result<SensorValue, CoreError> {
        self.registry.read(name, &self.store, &self.policy)
    }

    /// Run ticks until `cancel` fires. Cancellation is only observed between
    /// ticks; a started tick always completes.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            period_ms = self.period.as_millis() as u64,
            data_file = %self.data_file.display(),
            "Poller started",
        );

        while !cancel.is_cancelled() {
            let report = self.tick().await;
            tracing::debug!(?report, "Tick complete");

            let pause = sleep_after(report.elapsed, self.period);
            if pause.is_zero() {
                tracing::debug!(
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Tick overran its period, starting next tick immediately",
                );
            }

            if !self.idle_until(Instant::now() + pause, &cancel).await {
                break;
            }
        }

        tracing::info!("Poller stopped");
    }

    /// Serve object requests until `deadline`. Returns `false` on cancellation.
    async fn idle_until(&mut self, deadline: Instant, cancel: &CancellationToken) -> bool {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            let request = tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = &mut sleep => return true,
                Some(request) = self.requests.recv() => request,
            };
            self.handle_request(request);
        }
    }

    fn handle_request(&mut self, request: ObjectRequest) {
        match request {
            ObjectRequest::Read { name, reply } => {
                let _ = reply.send(self.read_object(&name));
            }
            ObjectRequest::Write { name, value, reply } => {
                let _ = reply.send(self.write_object(&name, value));
            }
        }
    }

    /// Execute one tick: ingest, evaluate, notify, then regenerate if pending.
    pub async fn tick(&mut self) -> TickReport {
        let start = Instant::now();
        let mut report = TickReport::default();

        self.ingest(&mut report);

        if self.signal.take() {
            report.regenerated = true;
            match self.regenerator.apply().await {
                Ok(RegenerationOutcome::Applied {
                    rendered_lines,
                    restart,
                }) => {
                    tracing::info!(
                        rendered_lines,
                        service = %restart.service_name,
                        restart_ms = restart.duration_ms,
                        "Configuration regenerated and service restarted",
                    );
                }
                Ok(outcome) => {
                    tracing::debug!(?outcome, "Regeneration pass finished without changes");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Configuration regeneration failed");
                }
            }
        }

        report.elapsed = start.elapsed();
        report
    }

    /// Read the data file and push every changed sample through the policy.
    fn ingest(&mut self, report: &mut TickReport) {
        let store = &mut self.store;
        let policy = &mut self.policy;
        let sink = &self.sink;
        let mut changed = 0;
        let mut transitions = 0;

        let result = line_format::parse_file(&self.data_file, |entry| {
            let value: SensorValue = entry.value.parse().map_err(|_| CoreError::MalformedLine {
                line: entry.line,
                reason: format!("'{}' is not an integer", entry.value),
            })?;

            if !store.update(entry.key, value)? {
                return Ok(());
            }
            changed += 1;

            if let Some(transition) = policy.evaluate(entry.key, value) {
                let event = AlarmEvent::from_transition(&transition, value, policy.thresholds());
                sink.emit(&event);
                transitions += 1;
            }
            Ok(())
        });

        match result {
            Ok(stats) => report.ingested = stats.accepted,
            Err(e) => tracing::error!(error = %e, "Sensor ingestion skipped"),
        }
        report.changed = changed;
        report.transitions = transitions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeps_for_remainder_of_period() {
        assert_eq!(
            sleep_after(Duration::from_millis(200), Duration::from_secs(1)),
            Duration::from_millis(800)
        );
    }

    #[test]
    fn overrun_yields_zero_sleep() {
        assert_eq!(
            sleep_after(Duration::from_millis(1500), Duration::from_secs(1)),
            Duration::ZERO
        );
        assert_eq!(
            sleep_after(Duration::from_secs(1), Duration::from_secs(1)),
            Duration::ZERO
        );
    }
}

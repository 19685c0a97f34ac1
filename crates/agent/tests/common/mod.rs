#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use envmon_agent::poller::{Poller, PollerHandle};
use envmon_agent::regenerator::ConfigRegenerator;
use envmon_agent::restart::{RestartResult, ServiceRestarter};
use envmon_agent::signal::ConfigChangeSignal;
use envmon_core::alarm::thresholds::{ThresholdPair, ThresholdPolicy};
use envmon_core::alert::{AlarmEvent, NotificationSink};
use envmon_core::registry::ObjectRegistry;

/// Sink that keeps every emitted event for later inspection.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AlarmEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AlarmEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn emit(&self, event: &AlarmEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Restarter that counts invocations instead of running `systemctl`.
pub struct RecordingRestarter {
    calls: AtomicUsize,
    succeed: AtomicBool,
    delay: Duration,
}

impl RecordingRestarter {
    pub fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            succeed: AtomicBool::new(true),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: AtomicBool::new(false),
            ..Self::succeeding()
        }
    }

    /// A restarter that takes `delay` to complete.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::succeeding()
        }
    }

    /// Make later restarts succeed or fail.
    pub fn set_succeed(&self, succeed: bool) {
        self.succeed.store(succeed, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceRestarter for RecordingRestarter {
    async fn restart(&self) -> RestartResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let succeed = self.succeed.load(Ordering::SeqCst);
        RestartResult {
            service_name: "snmpd".to_string(),
            success: succeed,
            message: if succeed {
                "Service 'snmpd' restarted successfully".to_string()
            } else {
                "Service 'snmpd' restart failed (exit 5): Unit snmpd.service not found.".to_string()
            },
            duration_ms: self.delay.as_millis() as u64,
        }
    }
}

/// Scratch directory with the agent's three files.
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn data_file(&self) -> PathBuf {
        self.dir.path().join("sensors.dat")
    }

    pub fn change_file(&self) -> PathBuf {
        self.dir.path().join("changes.dat")
    }

    pub fn target(&self) -> PathBuf {
        self.dir.path().join("snmpd.conf")
    }

    pub fn write_data(&self, contents: &str) {
        write(&self.data_file(), contents);
    }

    pub fn write_changes(&self, contents: &str) {
        write(&self.change_file(), contents);
    }

    pub fn regenerator(&self, restarter: Arc<RecordingRestarter>) -> ConfigRegenerator {
        ConfigRegenerator::new(self.change_file(), self.target(), restarter)
    }

    /// Poller with thresholds `(28, 30)` and a 1 second period.
    pub fn poller(
        &self,
        sink: Arc<RecordingSink>,
        signal: ConfigChangeSignal,
        restarter: Arc<RecordingRestarter>,
    ) -> (Poller, PollerHandle) {
        self.poller_with_period(sink, signal, restarter, Duration::from_secs(1))
    }

    pub fn poller_with_period(
        &self,
        sink: Arc<RecordingSink>,
        signal: ConfigChangeSignal,
        restarter: Arc<RecordingRestarter>,
        period: Duration,
    ) -> (Poller, PollerHandle) {
        Poller::new(
            self.data_file(),
            period,
            ObjectRegistry::standard(),
            ThresholdPolicy::new(ThresholdPair::new(28, 30).unwrap()),
            sink,
            signal,
            self.regenerator(restarter),
        )
    }
}

pub fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("write fixture file");
}

//! [`NotificationSink`] implementations.
//!
//! - [`TracingSink`] logs every alarm event.
//! - [`BroadcastSink`] fans events out over a `tokio::sync::broadcast`
//!   channel; the management protocol layer subscribes to it to send traps.
//! - [`FanoutSink`] forwards each event to several sinks in order.

use std::sync::Arc;

use envmon_core::alert::{AlarmEvent, AlarmKind, NotificationSink};
use tokio::sync::broadcast;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 64;

/// Logs alarm events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn emit(&self, event: &AlarmEvent) {
        match event.kind {
            AlarmKind::RaiseAlarm => tracing::warn!(
                sensor = %event.subject_id,
                value = event.value,
                threshold = event.threshold,
                state = ?event.current_state,
                "High temperature alarm raised",
            ),
            AlarmKind::ClearAlarm => tracing::info!(
                sensor = %event.subject_id,
                value = event.value,
                threshold = event.threshold,
                state = ?event.current_state,
                "High temperature alarm cleared",
            ),
        }
    }
}

/// Publishes alarm events to any number of subscribers.
///
/// When the buffer is full the oldest events are dropped and slow receivers
/// observe `RecvError::Lagged`. With no subscribers events are discarded.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<AlarmEvent>,
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn emit(&self, event: &AlarmEvent) {
        // A send error only means there are no receivers right now.
        let _ = self.sender.send(event.clone());
    }
}

/// Forwards every event to each inner sink, in insertion order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanoutSink {
    fn emit(&self, event: &AlarmEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

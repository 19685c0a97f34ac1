//! Alarm notification types and the sink boundary.

use chrono::Utc;
use serde::Serialize;

use crate::alarm::thresholds::{AlarmState, AlarmTransition, ThresholdPair};
use crate::types::{SensorValue, Timestamp};

/// Whether an alarm was raised or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    RaiseAlarm,
    ClearAlarm,
}

/// One alarm state transition, as delivered to a [`NotificationSink`].
#[derive(Debug, Clone, Serialize)]
pub struct AlarmEvent {
    pub kind: AlarmKind,
    /// Sensor whose sample triggered the transition.
    pub subject_id: String,
    /// State of the sensor after the transition.
    pub current_state: AlarmState,
    /// The sample that caused the transition.
    pub value: SensorValue,
    /// The bound that was crossed (`high` for raises, `low` for clears).
    pub threshold: SensorValue,
    pub timestamp: Timestamp,
}

impl AlarmEvent {
    /// Build the event for `transition`, recording the bound that was crossed.
    pub fn from_transition(
        transition: &AlarmTransition,
        value: SensorValue,
        thresholds: ThresholdPair,
    ) -> Self {
        let (kind, threshold) = match transition {
            AlarmTransition::RaiseAlarm(_) => (AlarmKind::RaiseAlarm, thresholds.high()),
            AlarmTransition::ClearAlarm(_) => (AlarmKind::ClearAlarm, thresholds.low()),
        };
        Self {
            kind,
            subject_id: transition.subject_id().to_string(),
            current_state: transition.new_state(),
            value,
            threshold,
            timestamp: Utc::now(),
        }
    }
}

/// Receives alarm events. Called synchronously from the poller tick that
/// produced the transition, once per transition.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, event: &AlarmEvent);
}

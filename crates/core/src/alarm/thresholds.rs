//! Hysteresis threshold evaluation for sensor samples.
//!
//! Pure logic: no I/O and no locking. The poller owns the policy and is the
//! only caller of [`ThresholdPolicy::evaluate`].

use std::collections::HashMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::threshold_validation::validate_threshold_order;
use crate::types::SensorValue;

/// Alarm state of a single monitored sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    #[default]
    Inactive,
    Active,
}

/// A state change produced by [`ThresholdPolicy::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmTransition {
    /// The sensor went above `high` while inactive.
    RaiseAlarm(String),
    /// The sensor went below `low` while active.
    ClearAlarm(String),
}

impl AlarmTransition {
    pub fn subject_id(&self) -> &str {
        match self {
            Self::RaiseAlarm(id) | Self::ClearAlarm(id) => id,
        }
    }

    /// The state the sensor is in after this transition.
    pub fn new_state(&self) -> AlarmState {
        match self {
            Self::RaiseAlarm(_) => AlarmState::Active,
            Self::ClearAlarm(_) => AlarmState::Inactive,
        }
    }
}

/// Clear/raise threshold pair. `low < high` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdPair {
    low: SensorValue,
    high: SensorValue,
}

impl ThresholdPair {
    pub fn new(low: SensorValue, high: SensorValue) -> Result<Self, CoreError> {
        validate_threshold_order(low, high)?;
        Ok(Self { low, high })
    }

    pub fn low(&self) -> SensorValue {
        self.low
    }

    pub fn high(&self) -> SensorValue {
        self.high
    }
}

/// Holds the threshold pair and the per-sensor alarm state.
///
/// All sensors share one threshold pair; each sensor has its own
/// [`AlarmState`] so one hot unit cannot mask or clear another.
#[derive(Debug)]
pub struct ThresholdPolicy {
    thresholds: ThresholdPair,
    states: HashMap<String, AlarmState>,
}

impl ThresholdPolicy {
    pub fn new(thresholds: ThresholdPair) -> Self {
        Self {
            thresholds,
            states: HashMap::new(),
        }
    }

    pub fn thresholds(&self) -> ThresholdPair {
        self.thresholds
    }

    /// Replace both bounds, or neither.
    pub fn set_thresholds(&mut self, low: SensorValue, high: SensorValue) -> Result<(), CoreError> {
        let pair = ThresholdPair::new(low, high)?;
        tracing::info!(
            old_low = self.thresholds.low,
            old_high = self.thresholds.high,
            low,
            high,
            "Alarm thresholds updated",
        );
        self.thresholds = pair;
        Ok(())
    }

    /// Replace only the raise threshold, keeping the current clear threshold.
    pub fn set_high(&mut self, high: SensorValue) -> Result<(), CoreError> {
        self.set_thresholds(self.thresholds.low, high)
    }

    /// Replace only the clear threshold, keeping the current raise threshold.
    pub fn set_low(&mut self, low: SensorValue) -> Result<(), CoreError> {
        self.set_thresholds(low, self.thresholds.high)
    }

    /// Current alarm state for `sensor_id` (`Inactive` if never evaluated).
    pub fn state(&self, sensor_id: &str) -> AlarmState {
        self.states.get(sensor_id).copied().unwrap_or_default()
    }

    /// Evaluate a new sample and apply any resulting transition.
    ///
    /// Both comparisons are strict: a sample equal to `high` never raises and
    /// a sample equal to `low` never clears.
    pub fn evaluate(&mut self, sensor_id: &str, value: SensorValue) -> Option<AlarmTransition> {
        let current = self.state(sensor_id);

        let transition = match current {
            AlarmState::Inactive if value > self.thresholds.high => {
                AlarmTransition::RaiseAlarm(sensor_id.to_string())
            }
            AlarmState::Active if value < self.thresholds.low => {
                AlarmTransition::ClearAlarm(sensor_id.to_string())
            }
            _ => return None,
        };

        self.states
            .insert(sensor_id.to_string(), transition.new_state());
        Some(transition)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

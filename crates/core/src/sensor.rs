//! In-memory sensor value store.
//!
//! The set of sensors is fixed at construction time. Values are only written
//! by the poller's ingestion step, so the store needs no internal locking.

use chrono::Utc;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{SensorValue, Timestamp};

/// Current reading of one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sensor {
    pub name: String,
    pub value: SensorValue,
    /// `None` until the first ingested sample.
    pub last_updated: Option<Timestamp>,
}

/// Maps sensor name to current value. Registration order is preserved.
#[derive(Debug, Default)]
pub struct SensorStore {
    sensors: Vec<Sensor>,
}

impl SensorStore {
    /// Create a store for a fixed set of sensors, all starting at zero.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sensors = names
            .into_iter()
            .map(|name| Sensor {
                name: name.into(),
                value: 0,
                last_updated: None,
            })
            .collect();
        Self { sensors }
    }

    /// Store a sample. Returns `true` if the value differs from the previous one.
    ///
    /// The timestamp is refreshed on every sample, changed or not.
    pub fn update(&mut self, name: &str, value: SensorValue) -> Result<bool, CoreError> {
        let sensor = self
            .sensors
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| CoreError::UnknownSensor(name.to_string()))?;

        sensor.last_updated = Some(Utc::now());
        if sensor.value == value {
            return Ok(false);
        }

        tracing::info!(sensor = %name, old_value = sensor.value, new_value = value, "Sensor value changed");
        sensor.value = value;
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Result<SensorValue, CoreError> {
        self.sensor(name).map(|s| s.value)
    }

    pub fn sensor(&self, name: &str) -> Result<&Sensor, CoreError> {
        self.sensors
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CoreError::UnknownSensor(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sensors.iter().any(|s| s.name == name)
    }

    /// All sensors in registration order.
    pub fn snapshot(&self) -> Vec<Sensor> {
        self.sensors.clone()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn store() -> SensorStore {
        SensorStore::new(["ac1Temp", "ac2Temp", "ac3Temp"])
    }

    #[test]
    fn update_reports_change() {
        let mut s = store();
        assert!(s.update("ac1Temp", 31).unwrap());
        assert_eq!(s.get("ac1Temp").unwrap(), 31);
    }

    #[test]
    fn same_value_is_not_a_change() {
        let mut s = store();
        s.update("ac1Temp", 31).unwrap();
        assert!(!s.update("ac1Temp", 31).unwrap());
    }

    #[test]
    fn initial_zero_sample_is_not_a_change() {
        let mut s = store();
        assert!(!s.update("ac2Temp", 0).unwrap());
        assert!(s.sensor("ac2Temp").unwrap().last_updated.is_some());
    }

    #[test]
    fn unknown_sensor_is_rejected() {
        let mut s = store();
        assert_matches!(s.get("ac9Temp"), Err(CoreError::UnknownSensor(name)) if name == "ac9Temp");
        assert_matches!(s.update("ac9Temp", 1), Err(CoreError::UnknownSensor(_)));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let mut s = store();
        s.update("ac3Temp", 19).unwrap();
        let names: Vec<_> = s.snapshot().into_iter().map(|x| x.name).collect();
        assert_eq!(names, ["ac1Temp", "ac2Temp", "ac3Temp"]);
        assert!(s.sensor("ac1Temp").unwrap().last_updated.is_none());
    }
}

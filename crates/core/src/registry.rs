//! Table of objects the agent exposes to the management protocol layer.
//!
//! Each entry maps a name to its object identifier, access mode and kind.
//! Reads and writes arriving from the protocol layer go through
//! [`ObjectRegistry::read`] and [`ObjectRegistry::write`], which dispatch on
//! the entry's kind instead of per-object handler functions.

use serde::Serialize;

use crate::alarm::thresholds::ThresholdPolicy;
use crate::error::CoreError;
use crate::object_names::{
    DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD, OBJECT_HI_TEMP_ALARM, OBJECT_LO_TEMP_ALARM,
    SENSOR_AC1_TEMP, SENSOR_AC2_TEMP, SENSOR_AC3_TEMP,
};
use crate::sensor::SensorStore;
use crate::types::SensorValue;

/// Protocol-level access mode of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// What an object's value is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// A sampled value held in the [`SensorStore`].
    Sensor,
    /// The raise bound of the [`ThresholdPolicy`].
    HighThreshold,
    /// The clear bound of the [`ThresholdPolicy`].
    LowThreshold,
}

/// One row of the object table.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSpec {
    pub name: &'static str,
    pub oid: &'static [u32],
    pub access: Access,
    pub kind: ObjectKind,
    /// Value reported before the first sample or write.
    pub default_value: SensorValue,
    pub description: &'static str,
}

impl ObjectSpec {
    /// Dotted representation of the object identifier, e.g. `1.3.6.1.3.9999.1.0`.
    pub fn oid_string(&self) -> String {
        self.oid
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

const STANDARD_OBJECTS: &[ObjectSpec] = &[
    ObjectSpec {
        name: SENSOR_AC1_TEMP,
        oid: &[1, 3, 6, 1, 3, 9999, 1, 0],
        access: Access::ReadOnly,
        kind: ObjectKind::Sensor,
        default_value: 0,
        description: "Temperature of A/C unit #1 (degrees Celsius)",
    },
    ObjectSpec {
        name: SENSOR_AC2_TEMP,
        oid: &[1, 3, 6, 1, 3, 9999, 2, 0],
        access: Access::ReadOnly,
        kind: ObjectKind::Sensor,
        default_value: 0,
        description: "Temperature of A/C unit #2 (degrees Celsius)",
    },
    ObjectSpec {
        name: SENSOR_AC3_TEMP,
        oid: &[1, 3, 6, 1, 3, 9999, 3, 0],
        access: Access::ReadOnly,
        kind: ObjectKind::Sensor,
        default_value: 0,
        description: "Temperature of A/C unit #3 (degrees Celsius)",
    },
    ObjectSpec {
        name: OBJECT_HI_TEMP_ALARM,
        oid: &[1, 3, 6, 1, 3, 9999, 4, 0],
        access: Access::ReadWrite,
        kind: ObjectKind::HighThreshold,
        default_value: DEFAULT_HIGH_THRESHOLD,
        description: "Temperature above which a high temperature alarm is raised",
    },
    ObjectSpec {
        name: OBJECT_LO_TEMP_ALARM,
        oid: &[1, 3, 6, 1, 3, 9999, 5, 0],
        access: Access::ReadWrite,
        kind: ObjectKind::LowThreshold,
        default_value: DEFAULT_LOW_THRESHOLD,
        description: "Temperature below which an active high temperature alarm clears",
    },
];

/// The fixed set of exposed objects.
#[derive(Debug, Clone)]
pub struct ObjectRegistry {
    objects: Vec<ObjectSpec>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ObjectRegistry {
    /// The built-in A/C temperature table.
    pub fn standard() -> Self {
        Self {
            objects: STANDARD_OBJECTS.to_vec(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectSpec> {
        self.objects.iter()
    }

    pub fn by_name(&self, name: &str) -> Option<&ObjectSpec> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Look up by dotted identifier. A leading `.` is accepted.
    pub fn by_oid(&self, oid: &str) -> Option<&ObjectSpec> {
        let oid = oid.strip_prefix('.').unwrap_or(oid);
        self.objects.iter().find(|o| o.oid_string() == oid)
    }

    /// Names of all sampled sensors, in table order.
    pub fn sensor_names(&self) -> Vec<&'static str> {
        self.objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Sensor)
            .map(|o| o.name)
            .collect()
    }

    /// A store seeded with every sensor in the table.
    pub fn sensor_store(&self) -> SensorStore {
        SensorStore::new(self.sensor_names())
    }

    /// Current value of `name`.
    pub fn read(
        &self,
        name: &str,
        store: &SensorStore,
        policy: &ThresholdPolicy,
    ) -> Result<SensorValue, CoreError> {
        let spec = self
            .by_name(name)
            .ok_or_else(|| CoreError::UnknownSensor(name.to_string()))?;

        match spec.kind {
            ObjectKind::Sensor => store.get(name),
            ObjectKind::HighThreshold => Ok(policy.thresholds().high()),
            ObjectKind::LowThreshold => Ok(policy.thresholds().low()),
        }
    }

    /// Apply a write request from the protocol layer.
    ///
    /// Threshold writes are all-or-nothing: a value that would break
    /// `low < high` leaves both bounds untouched.
    pub fn write(
        &self,
        name: &str,
        value: SensorValue,
        policy: &mut ThresholdPolicy,
    ) -> Result<(), CoreError> {
        let spec = self
            .by_name(name)
            .ok_or_else(|| CoreError::UnknownSensor(name.to_string()))?;

        if spec.access == Access::ReadOnly {
            tracing::warn!(object = %name, value, "Rejected write to read-only object");
            return Err(CoreError::ReadOnly(name.to_string()));
        }

        let result = match spec.kind {
            ObjectKind::HighThreshold => policy.set_high(value),
            ObjectKind::LowThreshold => policy.set_low(value),
            ObjectKind::Sensor => Err(CoreError::ReadOnly(name.to_string())),
        };

        if let Err(e) = &result {
            tracing::warn!(object = %name, value, error = %e, "Rejected threshold write");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::alarm::thresholds::ThresholdPair;

    fn policy() -> ThresholdPolicy {
        ThresholdPolicy::new(ThresholdPair::new(28, 30).unwrap())
    }

    #[test]
    fn standard_table_has_three_sensors() {
        let reg = ObjectRegistry::standard();
        assert_eq!(reg.sensor_names(), ["ac1Temp", "ac2Temp", "ac3Temp"]);
        assert_eq!(reg.sensor_store().len(), 3);
    }

    #[test]
    fn oids_are_unique_and_under_enterprise_arc() {
        let reg = ObjectRegistry::standard();
        let oids: Vec<_> = reg.iter().map(ObjectSpec::oid_string).collect();
        for oid in &oids {
            assert!(oid.starts_with(crate::object_names::ENTERPRISE_ARC));
            assert_eq!(oids.iter().filter(|o| *o == oid).count(), 1);
        }
    }

    #[test]
    fn lookup_by_oid() {
        let reg = ObjectRegistry::standard();
        assert_eq!(reg.by_oid("1.3.6.1.3.9999.4.0").unwrap().name, "hiTempAlarm");
        assert_eq!(reg.by_oid(".1.3.6.1.3.9999.2.0").unwrap().name, "ac2Temp");
        assert!(reg.by_oid("1.3.6.1.3.9999.9.0").is_none());
    }

    #[test]
    fn read_dispatches_by_kind() {
        let reg = ObjectRegistry::standard();
        let mut store = reg.sensor_store();
        store.update("ac2Temp", 24).unwrap();
        let p = policy();

        assert_eq!(reg.read("ac2Temp", &store, &p).unwrap(), 24);
        assert_eq!(reg.read("hiTempAlarm", &store, &p).unwrap(), 30);
        assert_eq!(reg.read("loTempAlarm", &store, &p).unwrap(), 28);
        assert_matches!(reg.read("bogus", &store, &p), Err(CoreError::UnknownSensor(_)));
    }

    #[test]
    fn sensors_are_read_only() {
        let reg = ObjectRegistry::standard();
        let mut p = policy();
        assert_matches!(reg.write("ac1Temp", 5, &mut p), Err(CoreError::ReadOnly(_)));
    }

    #[test]
    fn threshold_write_updates_policy() {
        let reg = ObjectRegistry::standard();
        let mut p = policy();
        reg.write("hiTempAlarm", 35, &mut p).unwrap();
        reg.write("loTempAlarm", 32, &mut p).unwrap();
        assert_eq!(p.thresholds(), ThresholdPair::new(32, 35).unwrap());
    }

    #[test]
    fn threshold_write_violating_order_is_rejected() {
        let reg = ObjectRegistry::standard();
        let mut p = policy();
        assert_matches!(
            reg.write("hiTempAlarm", 20, &mut p),
            Err(CoreError::InvalidThresholds { low: 28, high: 20 })
        );
        assert_eq!(p.thresholds(), ThresholdPair::new(28, 30).unwrap());
    }
}

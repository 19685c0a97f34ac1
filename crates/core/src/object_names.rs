//! Well-known object names, identifiers and change-request tags.
//!
//! These are the canonical names used in the sensor data file, the object
//! table ([`crate::registry`]) and the change-request file consumed by the
//! configuration regenerator.

/// Enterprise arc under which every agent object is registered.
pub const ENTERPRISE_ARC: &str = "1.3.6.1.3.9999";

/// A/C unit #1 temperature sensor (degrees Celsius).
pub const SENSOR_AC1_TEMP: &str = "ac1Temp";

/// A/C unit #2 temperature sensor (degrees Celsius).
pub const SENSOR_AC2_TEMP: &str = "ac2Temp";

/// A/C unit #3 temperature sensor (degrees Celsius).
pub const SENSOR_AC3_TEMP: &str = "ac3Temp";

/// Temperature above which a high-temperature alarm is raised.
pub const OBJECT_HI_TEMP_ALARM: &str = "hiTempAlarm";

/// Temperature below which an active high-temperature alarm is cleared.
pub const OBJECT_LO_TEMP_ALARM: &str = "loTempAlarm";

/// Default raise threshold (`hiTempAlarm` DEFVAL).
pub const DEFAULT_HIGH_THRESHOLD: i64 = 30;

/// Default clear threshold.
pub const DEFAULT_LOW_THRESHOLD: i64 = 28;

// ---------------------------------------------------------------------------
// Change-request tags
// ---------------------------------------------------------------------------

pub const TAG_AGENT_ADDRESS: &str = "agentAddress";
pub const TAG_RO_COMMUNITY: &str = "roCommunity";
pub const TAG_RW_COMMUNITY: &str = "rwCommunity";
pub const TAG_TRAP_SINK: &str = "trapSink";
pub const TAG_SYS_CONTACT: &str = "sysContact";
pub const TAG_SYS_LOCATION: &str = "sysLocation";

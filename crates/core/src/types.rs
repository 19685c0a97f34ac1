/// Sensor readings and thresholds are plain signed integers (degrees Celsius
/// for the built-in table).
pub type SensorValue = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

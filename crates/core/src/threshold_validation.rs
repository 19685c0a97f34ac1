//! Shared threshold validation helpers.
//!
//! Used by [`crate::alarm::thresholds::ThresholdPair`] and by the object
//! table when a threshold object is written.

use crate::error::CoreError;
use crate::types::SensorValue;

/// Validate that a clear threshold sits strictly below its raise threshold.
///
/// Returns `CoreError::InvalidThresholds` carrying both values otherwise.
pub fn validate_threshold_order(low: SensorValue, high: SensorValue) -> Result<(), CoreError> {
    if low >= high {
        return Err(CoreError::InvalidThresholds { low, high });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_strictly_ordered_pair() {
        assert!(validate_threshold_order(28, 30).is_ok());
        assert!(validate_threshold_order(-5, -4).is_ok());
        assert!(validate_threshold_order(i64::MIN, i64::MAX).is_ok());
    }

    #[test]
    fn rejects_equal_bounds() {
        assert!(validate_threshold_order(30, 30).is_err());
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(validate_threshold_order(10, 5).is_err());
    }
}

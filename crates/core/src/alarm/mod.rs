//! Alarm domain logic.
//!
//! Contains the hysteresis threshold policy and its transition types. All
//! logic in this module is pure (no I/O) so it can be tested in isolation.

pub mod thresholds;

//! `envmon-core`: pure domain logic for the environmental monitoring agent.
//!
//! Sensor storage, the hysteresis alarm policy, the object table exposed to
//! the management protocol layer and the shared line parser. Nothing in this
//! crate spawns tasks or touches the network.

pub mod alarm;
pub mod alert;
pub mod error;
pub mod line_format;
pub mod object_names;
pub mod registry;
pub mod sensor;
pub mod threshold_validation;
pub mod types;

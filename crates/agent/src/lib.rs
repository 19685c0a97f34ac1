//! `envmon-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod notify;
pub mod poller;
pub mod regenerator;
pub mod restart;
pub mod signal;

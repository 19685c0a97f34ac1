//! Dependent-service restart.
//!
//! After a new configuration has been written the regenerator restarts the
//! service that reads it. [`SystemctlRestarter`] runs
//! `systemctl restart <unit>` under a timeout and reports the outcome as a
//! [`RestartResult`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

/// Outcome of one restart attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RestartResult {
    pub service_name: String,
    pub success: bool,
    pub message: String,
    pub duration_ms: u64,
}

/// Restarts the service that consumes the rendered configuration.
#[async_trait]
pub trait ServiceRestarter: Send + Sync {
    async fn restart(&self) -> RestartResult;
}

/// Allowed unit name characters: alphanumeric, hyphen, underscore, dot.
/// Prevents argument injection through the configured unit name.
fn is_safe_service_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Restarts a systemd unit with `systemctl restart`.
#[derive(Debug, Clone)]
pub struct SystemctlRestarter {
    service_name: String,
    timeout: Duration,
}

impl SystemctlRestarter {
    pub fn new(service_name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            service_name: service_name.into(),
            timeout,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn result(&self, success: bool, message: String, start: Instant) -> RestartResult {
        RestartResult {
            service_name: self.service_name.clone(),
            success,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[async_trait]
impl ServiceRestarter for SystemctlRestarter {
    /// If the command does not complete within the configured timeout it is
    /// killed and reported as failed.
    async fn restart(&self) -> RestartResult {
        let start = Instant::now();

        if !is_safe_service_name(&self.service_name) {
            return self.result(false, "Invalid service name".to_string(), start);
        }

        tracing::info!(service = %self.service_name, "Executing service restart");

        let result = tokio::time::timeout(
            self.timeout,
            Command::new("systemctl")
                .args(["restart", self.service_name.as_str()])
                .kill_on_drop(true)
                .output(),
        )
        .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) => {
                let success = output.status.success();
                let stderr = String::from_utf8_lossy(&output.stderr);
                let message = if success {
                    format!("Service '{}' restarted successfully", self.service_name)
                } else {
                    format!(
                        "Service '{}' restart failed (exit {}): {}",
                        self.service_name,
                        output.status.code().unwrap_or(-1),
                        stderr.trim(),
                    )
                };

                if success {
                    tracing::info!(service = %self.service_name, elapsed_ms, "Restart succeeded");
                } else {
                    tracing::error!(service = %self.service_name, elapsed_ms, stderr = %stderr.trim(), "Restart failed");
                }

                self.result(success, message, start)
            }
            Ok(Err(e)) => {
                tracing::error!(service = %self.service_name, error = %e, "Restart execution error");
                self.result(false, format!("Failed to execute systemctl: {e}"), start)
            }
            Err(_) => {
                tracing::error!(service = %self.service_name, "Restart timed out");
                let message = format!(
                    "Restart of '{}' timed out after {}s",
                    self.service_name,
                    self.timeout.as_secs(),
                );
                self.result(false, message, start)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_service_names() {
        assert!(is_safe_service_name("snmpd"));
        assert!(is_safe_service_name("snmpd.service"));
        assert!(is_safe_service_name("net-snmp_agent"));
    }

    #[test]
    fn unsafe_service_names() {
        assert!(!is_safe_service_name(""));
        assert!(!is_safe_service_name("snmpd; rm -rf /"));
        assert!(!is_safe_service_name("$(evil)"));
        assert!(!is_safe_service_name("snmp d"));
        assert!(!is_safe_service_name("--force"));
        assert!(!is_safe_service_name(&"a".repeat(200)));
    }

    #[tokio::test]
    async fn invalid_name_fails_without_running_anything() {
        let restarter = SystemctlRestarter::new("--now snmpd", Duration::from_secs(1));
        let result = restarter.restart().await;
        assert!(!result.success);
        assert_eq!(result.message, "Invalid service name");
        assert_eq!(result.service_name, "--now snmpd");
    }
}

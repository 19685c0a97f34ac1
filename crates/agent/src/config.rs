//! Agent configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use envmon_core::object_names::{DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD};
use envmon_core::types::SensorValue;

const DEFAULT_DATA_FILE: &str = "/var/lib/envmon/sensors.dat";
const DEFAULT_CHANGE_FILE: &str = "/var/lib/envmon/changes.dat";
const DEFAULT_TARGET_CONFIG: &str = "/etc/snmp/snmpd.conf";
const DEFAULT_RESTART_SERVICE: &str = "snmpd";
const DEFAULT_POLL_PERIOD_MS: u64 = 1000;
const DEFAULT_RESTART_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Agent configuration.
///
/// All fields have defaults matching a stock net-snmp subagent install.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Sensor ingestion source (`name,value` lines).
    pub data_file: PathBuf,
    /// Change-request source (`tag,value` lines).
    pub change_file: PathBuf,
    /// Where the rendered service configuration is written.
    pub target_config: PathBuf,
    /// systemd unit restarted after the rendered configuration changes.
    pub restart_service: String,
    pub restart_timeout: Duration,
    /// Target period between tick starts.
    pub poll_period: Duration,
    pub alarm_low: SensorValue,
    pub alarm_high: SensorValue,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_file: DEFAULT_DATA_FILE.into(),
            change_file: DEFAULT_CHANGE_FILE.into(),
            target_config: DEFAULT_TARGET_CONFIG.into(),
            restart_service: DEFAULT_RESTART_SERVICE.into(),
            restart_timeout: Duration::from_secs(DEFAULT_RESTART_TIMEOUT_SECS),
            poll_period: Duration::from_millis(DEFAULT_POLL_PERIOD_MS),
            alarm_low: DEFAULT_LOW_THRESHOLD,
            alarm_high: DEFAULT_HIGH_THRESHOLD,
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                        |
    /// |-------------------------------|--------------------------------|
    /// | `ENVMON_DATA_FILE`            | `/var/lib/envmon/sensors.dat`  |
    /// | `ENVMON_CHANGE_FILE`          | `/var/lib/envmon/changes.dat`  |
    /// | `ENVMON_TARGET_CONFIG`        | `/etc/snmp/snmpd.conf`         |
    /// | `ENVMON_RESTART_SERVICE`      | `snmpd`                        |
    /// | `ENVMON_RESTART_TIMEOUT_SECS` | `60`                           |
    /// | `ENVMON_POLL_PERIOD_MS`       | `1000`                         |
    /// | `ENVMON_ALARM_LOW`            | `28`                           |
    /// | `ENVMON_ALARM_HIGH`           | `30`                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let path = |var: &str, default: PathBuf| lookup(var).map(PathBuf::from).unwrap_or(default);

        let poll_period_ms = parse_nonzero(&lookup, "ENVMON_POLL_PERIOD_MS")?
            .unwrap_or(DEFAULT_POLL_PERIOD_MS);
        let restart_timeout_secs = parse_nonzero(&lookup, "ENVMON_RESTART_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_RESTART_TIMEOUT_SECS);

        Ok(Self {
            data_file: path("ENVMON_DATA_FILE", defaults.data_file),
            change_file: path("ENVMON_CHANGE_FILE", defaults.change_file),
            target_config: path("ENVMON_TARGET_CONFIG", defaults.target_config),
            restart_service: lookup("ENVMON_RESTART_SERVICE").unwrap_or(defaults.restart_service),
            restart_timeout: Duration::from_secs(restart_timeout_secs),
            poll_period: Duration::from_millis(poll_period_ms),
            alarm_low: parse_var(&lookup, "ENVMON_ALARM_LOW", "integer")?
                .unwrap_or(defaults.alarm_low),
            alarm_high: parse_var(&lookup, "ENVMON_ALARM_HIGH", "integer")?
                .unwrap_or(defaults.alarm_high),
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var,
                expected,
                value,
            }),
    }
}

/// Like [`parse_var`] for durations, where zero would spin the poll loop or
/// time out every restart.
fn parse_nonzero<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const EXPECTED: &str = "positive integer";
    match parse_var::<F, u64>(lookup, var, EXPECTED)? {
        Some(0) => Err(ConfigError::Invalid {
            var,
            expected: EXPECTED,
            value: "0".to_string(),
        }),
        other => Ok(other),
    }
}

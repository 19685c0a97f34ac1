use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid thresholds: low ({low}) must be below high ({high})")]
    InvalidThresholds { low: i64, high: i64 },

    #[error("Unknown sensor: {0}")]
    UnknownSensor(String),

    #[error("Object is read-only: {0}")]
    ReadOnly(String),

    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("Failed to render {path}: {reason}")]
    RenderFailure { path: PathBuf, reason: String },

    #[error("Restart failed: {0}")]
    RestartFailure(String),
}

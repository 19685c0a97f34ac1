//! Regeneration of the dependent service's configuration file.
//!
//! A pass reads the change-request file (`tag,value` lines), renders every
//! recognized tag through its fixed template, writes the document with a
//! single atomic rename and restarts the service. Passes with no recognized
//! tag, or whose output matches what is already on disk, touch nothing.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use envmon_core::error::CoreError;
use envmon_core::line_format::{self, Entry};
use envmon_core::object_names::{
    TAG_AGENT_ADDRESS, TAG_RO_COMMUNITY, TAG_RW_COMMUNITY, TAG_SYS_CONTACT, TAG_SYS_LOCATION,
    TAG_TRAP_SINK,
};
use tempfile::NamedTempFile;

use crate::restart::{RestartResult, ServiceRestarter};

/// First line of every rendered document.
pub const HEADER_LINE: &str = "# Autogenerated by envmon-agent. Local edits will be overwritten.";

/// Directive that must always be present: run the service as an AgentX master.
pub const MANDATORY_DIRECTIVE: &str = "master agentx";

/// Mode given to a target that does not exist yet; the service and other
/// readers need to see it.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Change-request tag to rendered directive keyword.
const TEMPLATES: &[(&str, &str)] = &[
    (TAG_AGENT_ADDRESS, "agentAddress"),
    (TAG_RO_COMMUNITY, "rocommunity"),
    (TAG_RW_COMMUNITY, "rwcommunity"),
    (TAG_TRAP_SINK, "trap2sink"),
    (TAG_SYS_CONTACT, "sysContact"),
    (TAG_SYS_LOCATION, "sysLocation"),
];

/// Render one change-request entry, or explain why it was rejected.
fn render_entry(entry: Entry<'_>) -> Result<String, CoreError> {
    let keyword = TEMPLATES
        .iter()
        .find(|(tag, _)| *tag == entry.key)
        .map(|(_, keyword)| *keyword)
        .ok_or_else(|| CoreError::MalformedLine {
            line: entry.line,
            reason: format!("unrecognized tag '{}'", entry.key),
        })?;

    if entry.value.is_empty() {
        return Err(CoreError::MalformedLine {
            line: entry.line,
            reason: format!("empty value for tag '{}'", entry.key),
        });
    }

    Ok(format!("{keyword} {}", entry.value))
}

/// A fully rendered configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    contents: String,
    /// Number of recognized tag lines, excluding header and directive.
    rendered_lines: usize,
}

impl RenderedConfig {
    fn from_lines(lines: Vec<String>) -> Self {
        let mut contents = String::new();
        contents.push_str(HEADER_LINE);
        contents.push('\n');
        contents.push_str(MANDATORY_DIRECTIVE);
        contents.push('\n');
        for line in &lines {
            contents.push_str(line);
            contents.push('\n');
        }
        Self {
            contents,
            rendered_lines: lines.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.contents
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.contents.as_bytes()
    }

    pub fn rendered_lines(&self) -> usize {
        self.rendered_lines
    }
}

/// Render the change-request file at `path`.
///
/// Returns `Ok(None)` when the file holds no recognized tag.
pub fn render_file(path: &Path) -> Result<Option<RenderedConfig>, CoreError> {
    let mut lines = Vec::new();
    let stats = line_format::parse_file(path, |entry| {
        lines.push(render_entry(entry)?);
        Ok(())
    })?;

    tracing::debug!(
        path = %path.display(),
        rendered = stats.accepted,
        skipped = stats.skipped,
        "Change requests parsed",
    );

    if lines.is_empty() {
        return Ok(None);
    }
    Ok(Some(RenderedConfig::from_lines(lines)))
}

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial one.
///
/// The temporary file is created next to the target so the final rename
/// stays on one filesystem. Permissions of an existing target are kept; a
/// new target is created world-readable.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), CoreError> {
    let render_failure = |reason: String| CoreError::RenderFailure {
        path: path.to_path_buf(),
        reason,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| render_failure(format!("create temp file in {}: {e}", dir.display())))?;

    let permissions = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    };
    if let Some(permissions) = permissions {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| render_failure(format!("set permissions: {e}")))?;
    }

    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| render_failure(format!("write temp file: {e}")))?;

    tmp.persist(path)
        .map_err(|e| render_failure(format!("rename into place: {}", e.error)))?;
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

/// What a successful regeneration pass did.
#[derive(Debug, Clone)]
pub enum RegenerationOutcome {
    /// No recognized tag in the change requests; nothing was written.
    NoRecognizedTags,
    /// The rendered document matches the current file and no restart is
    /// owed; nothing was written.
    Unchanged,
    /// The document was written (or was already current after a failed
    /// restart) and the service restarted.
    Applied {
        rendered_lines: usize,
        restart: RestartResult,
    },
}

/// Rebuilds and applies the service configuration from change requests.
#[derive(Clone)]
pub struct ConfigRegenerator {
    change_file: PathBuf,
    target: PathBuf,
    restarter: Arc<dyn ServiceRestarter>,
    /// Set while the file on disk has not been picked up by a successful restart.
    restart_owed: Arc<AtomicBool>,
}

impl ConfigRegenerator {
    pub fn new(
        change_file: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        restarter: Arc<dyn ServiceRestarter>,
    ) -> Self {
        Self {
            change_file: change_file.into(),
            target: target.into(),
            restarter,
            restart_owed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Run one regeneration pass.
    ///
    /// # Errors
    ///
    /// - [`CoreError::SourceUnavailable`] if the change-request file cannot be read.
    /// - [`CoreError::RenderFailure`] if the target cannot be replaced.
    /// - [`CoreError::RestartFailure`] if the service restart fails; the new
    ///   file stays in place and the next pass restarts again even if the
    ///   rendered output is unchanged.
    pub async fn apply(&self) -> Result<RegenerationOutcome, CoreError> {
        let Some(rendered) = render_file(&self.change_file)? else {
            tracing::info!(
                path = %self.change_file.display(),
                "No recognized change requests, leaving configuration untouched",
            );
            return Ok(RegenerationOutcome::NoRecognizedTags);
        };

        let unchanged =
            fs::read(&self.target).is_ok_and(|current| current == rendered.as_bytes());
        let restart_owed = self.restart_owed.load(Ordering::Acquire);

        if unchanged && !restart_owed {
            tracing::info!(
                target = %self.target.display(),
                "Rendered configuration unchanged, skipping write and restart",
            );
            return Ok(RegenerationOutcome::Unchanged);
        }

        if unchanged {
            tracing::info!(
                target = %self.target.display(),
                "Configuration already current, retrying the restart that failed previously",
            );
        } else {
            write_atomically(&self.target, rendered.as_bytes())?;
            tracing::info!(
                target = %self.target.display(),
                lines = rendered.rendered_lines(),
                "Configuration written",
            );
        }

        let restart = self.restarter.restart().await;
        self.restart_owed.store(!restart.success, Ordering::Release);
        if !restart.success {
            return Err(CoreError::RestartFailure(restart.message));
        }

        Ok(RegenerationOutcome::Applied {
            rendered_lines: rendered.rendered_lines(),
            restart,
        })
    }
}

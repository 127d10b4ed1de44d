//! LRC export.
//!
//! Each row becomes `[MM:SS.CC]text`, rows joined by `\n` with no trailing
//! newline. Rows without a timestamp are written as `[00:00.00]`, which reads
//! the same as a row genuinely stamped at zero.

use crate::error::{CoreError, Result};
use crate::session::{LyricLine, LyricSession};
use crate::time::format_optional;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Render rows as LRC text.
///
/// # Errors
///
/// Returns [`CoreError::EmptySession`] when there are no rows.
pub fn render(lines: &[LyricLine]) -> Result<String> {
    if lines.is_empty() {
        return Err(CoreError::EmptySession);
    }

    Ok(lines
        .iter()
        .map(|line| format!("[{}]{}", format_optional(line.timestamp), line.text))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Render a session as LRC text.
///
/// # Errors
///
/// Returns [`CoreError::EmptySession`] when the session has no rows.
pub fn export(session: &LyricSession) -> Result<String> {
    render(session.lines())
}

/// Write a session to `path` as UTF-8 LRC, replacing any existing file.
///
/// # Errors
///
/// Returns [`CoreError::EmptySession`] when there is nothing to write and
/// [`CoreError::Io`] when the file cannot be written.
pub fn write_lrc(session: &LyricSession, path: &Path) -> Result<()> {
    let text = export(session)?;
    fs::write(path, text)?;
    info!("Exported {} lines to {}", session.len(), path.display());
    Ok(())
}

/// Write a session to `path`, or to its default export path when `None`.
/// Returns the path written.
///
/// # Errors
///
/// See [`write_lrc`].
pub fn write_lrc_or_default(session: &LyricSession, path: Option<&Path>) -> Result<PathBuf> {
    let path = path.map_or_else(|| session.default_export_path(), Path::to_path_buf);
    write_lrc(session, &path)?;
    Ok(path)
}

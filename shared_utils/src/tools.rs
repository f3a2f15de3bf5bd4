//! External tool lookup.

use crate::errors::{Result, VidShrinkError};
use crate::logging::execute_external_command;
use std::path::PathBuf;

/// Resolve `tool` on PATH (or as given, if it contains a separator) and
/// check that `tool -version` runs.
pub fn require_tool(tool: &str) -> Result<PathBuf> {
    let path = which::which(tool).map_err(|e| VidShrinkError::ToolNotFound {
        tool: tool.to_string(),
        detail: e.to_string(),
    })?;

    let version_check = execute_external_command(&path, &["-version"]).map_err(|e| {
        VidShrinkError::ToolNotFound {
            tool: tool.to_string(),
            detail: format!("{:#}", e),
        }
    })?;

    if !version_check.success() {
        return Err(VidShrinkError::ToolNotFound {
            tool: tool.to_string(),
            detail: format!("`{} -version` exited with {:?}", tool, version_check.exit_code),
        });
    }

    if let Some(first) = version_check.stdout.lines().next() {
        tracing::info!(tool, version = first, path = %path.display(), "Found external tool");
    }
    Ok(path)
}

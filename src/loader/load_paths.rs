//! Declared load path discovery.
//!
//! A project can declare extra locale paths (engines, gems) beyond
//! `config/locales/`; asking the project itself via `bin/rails runner` is
//! the only reliable way to see them. The command is external and may be
//! unavailable — callers fall back to glob discovery on any error here.

use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;
use tokio::process::Command;

/// Errors from querying the project's declared load paths.
#[derive(Error, Debug)]
pub enum LoadPathsError {
    /// The runner could not be spawned (typically: not a full project
    /// checkout, or no `bin/rails` binstub).
    #[error("failed to run `bin/rails runner`: {0}")]
    Spawn(#[from] std::io::Error),

    /// The runner exited unsuccessfully.
    #[error("`bin/rails runner` exited with {status}: {stderr}")]
    CommandFailed {
        /// Process exit status.
        status: std::process::ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The runner produced no usable locale paths.
    #[error("`bin/rails runner` reported no locale load paths")]
    Empty,
}

/// Asks the project for its `I18n.load_path` and keeps the YAML entries.
///
/// # Errors
/// See [`LoadPathsError`]; every variant is recoverable by falling back to
/// glob discovery.
pub async fn declared_load_paths(unit_root: &Path) -> Result<Vec<PathBuf>, LoadPathsError> {
    let output = Command::new("bin/rails")
        .args(["runner", "puts I18n.load_path"])
        .current_dir(unit_root)
        .output()
        .await?;

    if !output.status.success() {
        return Err(LoadPathsError::CommandFailed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let paths: Vec<PathBuf> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with(".yml") || line.ends_with(".yaml"))
        .map(PathBuf::from)
        .collect();

    if paths.is_empty() {
        return Err(LoadPathsError::Empty);
    }

    tracing::debug!(unit = %unit_root.display(), count = paths.len(), "Declared load paths resolved");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn missing_runner_is_a_recoverable_error() {
        let temp_dir = TempDir::new().ok();
        let Some(temp_dir) = temp_dir else {
            return;
        };

        // An empty directory has no `bin/rails`; the caller is expected to
        // fall back to glob discovery on this error.
        let result = declared_load_paths(temp_dir.path()).await;

        assert!(result.is_err());
    }
}

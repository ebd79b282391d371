//! Zip archiving for generated sheets.
//!
//! Uses the external `zip` tool, which is standard on Linux and macOS.
//! Archiving is a convenience step; callers treat failures as warnings
//! rather than aborting the run.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

/// Errors from archive creation.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The `zip` tool is not installed or not runnable.
    #[error("'zip' command not available: {0}. Please install it using your package manager.")]
    ToolMissing(String),

    /// `zip` exited unsuccessfully.
    #[error("zip failed: {0}")]
    CommandFailed(String),

    /// The directory to archive does not exist.
    #[error("directory does not exist: {0}")]
    InvalidPath(PathBuf),

    /// Could not create the archive's parent directory.
    #[error("failed to create directory {path}: {source}")]
    CreateDirFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Check that the `zip` tool is available.
pub fn check_zip_available() -> Result<(), ArchiveError> {
    match Command::new("zip").arg("-v").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ArchiveError::ToolMissing(
            "command failed; please check the installation".to_string(),
        )),
        Err(e) => Err(ArchiveError::ToolMissing(e.to_string())),
    }
}

/// Archive every file in `sheets_dir` into `zip_path` (flat, no directory
/// prefix inside the archive).
///
/// # Errors
///
/// Returns [`ArchiveError`] when the source directory is missing, the tool
/// is unavailable, or `zip` exits unsuccessfully.
pub fn archive_sheets(sheets_dir: &Path, zip_path: &Path) -> Result<(), ArchiveError> {
    if !sheets_dir.is_dir() {
        return Err(ArchiveError::InvalidPath(sheets_dir.to_path_buf()));
    }

    if let Some(parent) = zip_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let output = Command::new("zip")
        .arg("-r")
        .arg("-j")
        .arg(zip_path)
        .arg(sheets_dir)
        .output()
        .map_err(|e| ArchiveError::ToolMissing(e.to_string()))?;

    if !output.status.success() {
        return Err(ArchiveError::CommandFailed(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }

    info!(archive = %zip_path.display(), "sheets archived");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_source_dir_rejected() {
        let dir = tempdir().unwrap();
        let result = archive_sheets(
            &dir.path().join("nope"),
            &dir.path().join("out/sheets.zip"),
        );
        assert!(matches!(result, Err(ArchiveError::InvalidPath(_))));
    }
}

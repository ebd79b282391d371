//! CLI error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration problem (bad values, missing credentials).
    #[error(transparent)]
    Config(#[from] spriteforge::config::ConfigError),

    /// Pipeline failure.
    #[error(transparent)]
    Pipeline(#[from] spriteforge::PipelineError),

    /// Upload client could not be created.
    #[error(transparent)]
    Upload(#[from] spriteforge::uploader::UploadError),

    /// Manifest writing failed.
    #[error(transparent)]
    Aggregate(#[from] spriteforge::aggregator::AggregateError),

    /// Interactive prompt failure.
    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No sheets found in the given directory.
    #[error("no sheet images found in {0}")]
    NoSheets(PathBuf),

    /// An upload identity is required but none was given or derivable.
    #[error("no upload identity: pass --target and --id, or set GROUP_ID/USER_ID")]
    NoUploadTarget,
}

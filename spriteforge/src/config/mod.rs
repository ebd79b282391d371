//! Run configuration and credentials.
//!
//! All configuration is resolved once at startup into immutable values that
//! are threaded explicitly through the pipeline. Nothing reads the process
//! environment after [`Credentials::from_env`] and
//! [`UploadTarget::from_env`] return, which keeps every component testable
//! with fabricated configs.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable holding the Open Cloud API key.
pub const API_KEY_VAR: &str = "API_KEY";

/// Environment variable holding the optional session cookie used by the
/// asset-delivery resolve call.
pub const COOKIE_VAR: &str = "ROBLOSECURITY";

/// Environment variable holding a default group id.
pub const GROUP_ID_VAR: &str = "GROUP_ID";

/// Environment variable holding a default user id.
pub const USER_ID_VAR: &str = "USER_ID";

/// Configuration errors. All of these are fatal to the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    /// A numeric setting was zero or otherwise out of range.
    #[error("invalid value for {setting}: {reason}")]
    InvalidValue {
        /// Name of the offending setting.
        setting: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Who owns the uploaded assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// Upload on behalf of a group.
    Group(String),
    /// Upload on behalf of a user account.
    User(String),
}

impl UploadTarget {
    /// Resolve a default target from the environment.
    ///
    /// Mirrors the original tool's behavior: exactly one of `GROUP_ID` /
    /// `USER_ID` set picks that identity; both or neither means the caller
    /// must choose explicitly.
    pub fn from_env() -> Option<Self> {
        let group = non_empty_env(GROUP_ID_VAR);
        let user = non_empty_env(USER_ID_VAR);
        match (group, user) {
            (Some(g), None) => Some(UploadTarget::Group(g)),
            (None, Some(u)) => Some(UploadTarget::User(u)),
            _ => None,
        }
    }

    /// The numeric/string creator id.
    pub fn id(&self) -> &str {
        match self {
            UploadTarget::Group(id) | UploadTarget::User(id) => id,
        }
    }

    /// JSON key used in the asset creation context.
    pub fn creator_key(&self) -> &'static str {
        match self {
            UploadTarget::Group(_) => "groupId",
            UploadTarget::User(_) => "userId",
        }
    }
}

/// Static credentials attached to every remote request.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Open Cloud API key, sent as `x-api-key`.
    pub api_key: String,
    /// Optional session cookie for the asset-delivery resolve call.
    pub cookie: Option<String>,
}

impl Credentials {
    /// Load credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] when `API_KEY` is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = non_empty_env(API_KEY_VAR).ok_or(ConfigError::MissingEnv(API_KEY_VAR))?;
        Ok(Self {
            api_key,
            cookie: non_empty_env(COOKIE_VAR),
        })
    }
}

/// Frame sampling rate for extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameRate {
    /// Sample at a fixed rate in frames per second.
    Fixed(f64),
    /// Probe the source video and use its native rate.
    Source,
}

/// Which videos in the input directory to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSelection {
    /// Process every recognized video file.
    All,
    /// Process only the named file.
    Only(String),
}

/// Immutable per-run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory scanned for input videos.
    pub input_dir: PathBuf,
    /// Root directory for per-video result directories.
    pub results_root: PathBuf,
    /// Frame edge length in pixels.
    pub frame_size: u32,
    /// Sheet edge length in pixels.
    pub max_sheet_size: u32,
    /// Worker threads handed to the frame extractor.
    pub threads: usize,
    /// Frame sampling rate.
    pub frame_rate: FrameRate,
    /// Video selection filter.
    pub videos: VideoSelection,
    /// Whether to zip the generated sheets.
    pub zip_sheets: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input_videos"),
            results_root: PathBuf::from("sprite_results"),
            frame_size: 1024,
            max_sheet_size: 4096,
            threads: default_threads(),
            frame_rate: FrameRate::Fixed(30.0),
            videos: VideoSelection::All,
            zip_sheets: false,
        }
    }
}

impl RunConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for zero sizes, a frame larger
    /// than the sheet, a non-positive frame rate, or zero threads.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size == 0 {
            return Err(ConfigError::InvalidValue {
                setting: "frame_size",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_sheet_size < self.frame_size {
            return Err(ConfigError::InvalidValue {
                setting: "max_sheet_size",
                reason: format!(
                    "must be at least frame_size ({} < {})",
                    self.max_sheet_size, self.frame_size
                ),
            });
        }
        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                setting: "threads",
                reason: "must be positive".to_string(),
            });
        }
        if let FrameRate::Fixed(rate) = self.frame_rate {
            if !(rate > 0.0) {
                return Err(ConfigError::InvalidValue {
                    setting: "frame_rate",
                    reason: format!("must be positive, got {}", rate),
                });
            }
        }
        Ok(())
    }
}

/// Host parallelism, falling back to 1 when it cannot be determined.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

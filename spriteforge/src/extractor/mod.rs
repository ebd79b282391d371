//! Frame extraction via external `ffmpeg`/`ffprobe`.
//!
//! Video decoding is an external collaborator, consumed at its process
//! boundary: `ffmpeg` samples a video into an ordered sequence of
//! fixed-size RGBA PNG frames, `ffprobe` reports a source's native frame
//! rate. The [`FrameExtractor`] trait keeps the pipeline testable without
//! either tool installed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the extraction boundary.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required external tool is not installed or not runnable.
    #[error("'{tool}' not available: {message}")]
    ToolMissing {
        /// Tool binary name.
        tool: &'static str,
        /// What went wrong invoking it.
        message: String,
    },

    /// The tool ran but exited unsuccessfully.
    #[error("'{tool}' failed: {stderr}")]
    CommandFailed {
        /// Tool binary name.
        tool: &'static str,
        /// Captured standard error.
        stderr: String,
    },

    /// Filesystem failure around the frames directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `ffprobe` output could not be interpreted.
    #[error("failed to probe frame rate: {0}")]
    Probe(String),
}

/// Extraction parameters for one video.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    /// Frame edge length in pixels (frames are square).
    pub frame_size: u32,
    /// Sampling rate in frames per second.
    pub frame_rate: f64,
    /// Worker threads handed to the encoder.
    pub threads: usize,
}

/// Produces an ordered sequence of fixed-size frames from a video.
pub trait FrameExtractor: Send + Sync {
    /// Extract frames into `frames_dir`, returning their paths in order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the directory cannot be prepared, the
    /// decoder fails, or the produced frames cannot be enumerated.
    fn extract(
        &self,
        video: &Path,
        frames_dir: &Path,
        spec: &FrameSpec,
    ) -> Result<Vec<PathBuf>, ExtractError>;
}

/// `ffmpeg`-backed extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegExtractor;

impl FfmpegExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract(
        &self,
        video: &Path,
        frames_dir: &Path,
        spec: &FrameSpec,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        fs::create_dir_all(frames_dir).map_err(|e| ExtractError::Io {
            path: frames_dir.to_path_buf(),
            source: e,
        })?;

        let filter = format!(
            "fps={},scale={}:{}",
            spec.frame_rate, spec.frame_size, spec.frame_size
        );
        let pattern = frames_dir.join("frame-%05d.png");

        info!(video = %video.display(), filter = %filter, "extracting frames");
        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(video)
            .args(["-vf", &filter])
            .args(["-c:v", "png"])
            .args(["-pix_fmt", "rgba"])
            .args(["-threads", &spec.threads.to_string()])
            .args(["-compression_level", "5"])
            .arg("-y")
            .arg(&pattern)
            .output()
            .map_err(|e| ExtractError::ToolMissing {
                tool: "ffmpeg",
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ExtractError::CommandFailed {
                tool: "ffmpeg",
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let frames = list_frames(frames_dir)?;
        debug!(frames = frames.len(), "extraction complete");
        Ok(frames)
    }
}

/// Enumerate extracted frames in sampling order.
///
/// Frame files are zero-padded (`frame-00001.png`), so lexicographic order
/// equals extraction order.
pub fn list_frames(frames_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let entries = fs::read_dir(frames_dir).map_err(|e| ExtractError::Io {
        path: frames_dir.to_path_buf(),
        source: e,
    })?;

    let mut frames: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("frame-") && n.ends_with(".png"))
                .unwrap_or(false)
        })
        .collect();

    frames.sort();
    Ok(frames)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    r_frame_rate: Option<String>,
}

/// Probe a video's native frame rate via `ffprobe`.
///
/// # Errors
///
/// Returns [`ExtractError`] when `ffprobe` is missing, fails, or reports no
/// usable video stream.
pub fn probe_frame_rate(video: &Path) -> Result<f64, ExtractError> {
    let output = Command::new("ffprobe")
        .args(["-v", "error"])
        .args(["-select_streams", "v:0"])
        .args(["-print_format", "json"])
        .args(["-show_streams"])
        .arg(video)
        .output()
        .map_err(|e| ExtractError::ToolMissing {
            tool: "ffprobe",
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ExtractError::CommandFailed {
            tool: "ffprobe",
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| ExtractError::Probe(format!("malformed ffprobe output: {}", e)))?;

    let rate = probe
        .streams
        .first()
        .and_then(|s| s.r_frame_rate.as_deref())
        .ok_or_else(|| ExtractError::Probe("no video stream with a frame rate".to_string()))?;

    parse_frame_rate(rate)
}

/// Parse ffprobe's rational frame rate (`"30000/1001"` or `"25"`).
fn parse_frame_rate(raw: &str) -> Result<f64, ExtractError> {
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num
                .trim()
                .parse()
                .map_err(|_| ExtractError::Probe(format!("bad frame rate: {}", raw)))?;
            let den: f64 = den
                .trim()
                .parse()
                .map_err(|_| ExtractError::Probe(format!("bad frame rate: {}", raw)))?;
            if den == 0.0 {
                return Err(ExtractError::Probe(format!("zero denominator: {}", raw)));
            }
            num / den
        }
        None => raw
            .trim()
            .parse()
            .map_err(|_| ExtractError::Probe(format!("bad frame rate: {}", raw)))?,
    };

    if value > 0.0 {
        Ok(value)
    } else {
        Err(ExtractError::Probe(format!("non-positive frame rate: {}", raw)))
    }
}

/// Check that the external tools are available.
///
/// # Errors
///
/// Returns [`ExtractError::ToolMissing`] naming the first missing tool.
pub fn check_required_tools() -> Result<(), ExtractError> {
    for tool in ["ffmpeg", "ffprobe"] {
        let result = Command::new(tool).arg("-version").output();
        match result {
            Ok(output) if output.status.success() => {}
            Ok(_) => {
                return Err(ExtractError::ToolMissing {
                    tool,
                    message: "command failed; please check the installation".to_string(),
                })
            }
            Err(e) => {
                return Err(ExtractError::ToolMissing {
                    tool,
                    message: format!("{}; install it with your package manager", e),
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_rational_frame_rate() {
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("25/1").unwrap(), 25.0);
        assert_eq!(parse_frame_rate("24").unwrap(), 24.0);
    }

    #[test]
    fn test_parse_frame_rate_rejects_garbage() {
        assert!(parse_frame_rate("abc").is_err());
        assert!(parse_frame_rate("30/0").is_err());
        assert!(parse_frame_rate("0/1").is_err());
        assert!(parse_frame_rate("-25").is_err());
    }

    #[test]
    fn test_list_frames_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["frame-00002.png", "frame-00001.png", "frame-00010.png"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        // non-frame files are ignored
        fs::write(dir.path().join("cover.png"), b"x").unwrap();
        fs::write(dir.path().join("frame-00003.jpg"), b"x").unwrap();

        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<String> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["frame-00001.png", "frame-00002.png", "frame-00010.png"]
        );
    }

    #[test]
    fn test_list_frames_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(list_frames(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_probe_output_parsing() {
        let json = r#"{"streams":[{"r_frame_rate":"30000/1001","codec_type":"video"}]}"#;
        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(probe.streams[0].r_frame_rate.as_deref(), Some("30000/1001"));
    }
}

//! Per-video orchestration: extract, pack, archive, upload, aggregate.
//!
//! The pipeline drives one video at a time through the frame extractor and
//! the sheet packer (sequential, to bound peak memory), then hands the
//! finished sheets to the uploader, which fans out concurrently. Errors
//! local to one frame or one sheet never abort the video; errors local to
//! one video never abort its siblings. Only configuration-level problems
//! (missing input directory, nothing to process) fail the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::aggregator::{self, AggregateError};
use crate::archive;
use crate::config::{ConfigError, FrameRate, RunConfig, UploadTarget, VideoSelection};
use crate::extractor::{probe_frame_rate, ExtractError, FrameExtractor, FrameSpec};
use crate::packer::{PackError, SheetPacker};
use crate::sheet::{Sheet, SheetLayout};
use crate::uploader::Uploader;

/// Video file extensions the pipeline recognizes.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "flv", "wmv"];

/// File name of the generated asset manifest.
pub const MANIFEST_FILE_NAME: &str = "AssetIds.luau";

/// Errors that abort a video or the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration rejected up front.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input directory does not exist.
    #[error("input directory does not exist: {0}")]
    InputDirMissing(PathBuf),

    /// No recognized video files were found.
    #[error("no video files found in {0}")]
    NoVideos(PathBuf),

    /// The named video file is missing.
    #[error("video file does not exist: {0}")]
    VideoMissing(PathBuf),

    /// Frame extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Sheet packing failed.
    #[error(transparent)]
    Pack(#[from] PackError),

    /// Manifest writing failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Filesystem failure while preparing run directories.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A blocking worker task failed to join.
    #[error("worker task failed: {0}")]
    Internal(String),
}

/// Result of processing one video.
#[derive(Debug)]
pub struct VideoReport {
    /// The video file name.
    pub video: String,
    /// Run directory holding frames, sheets and generated artifacts.
    pub output_dir: PathBuf,
    /// Frames extracted from the video.
    pub frames_extracted: usize,
    /// Frames skipped during packing (decode failures).
    pub frames_skipped: usize,
    /// Finished sheets in index order.
    pub sheets: Vec<Sheet>,
    /// Sheets uploaded successfully.
    pub uploads_succeeded: usize,
    /// Sheets whose upload failed permanently.
    pub uploads_failed: usize,
    /// Path of the generated manifest, when uploading was enabled.
    pub manifest: Option<PathBuf>,
}

/// Structured summary of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Per-video reports for videos that completed.
    pub reports: Vec<VideoReport>,
    /// Videos that failed and were skipped.
    pub videos_failed: usize,
}

impl RunSummary {
    /// Total frames extracted across all videos.
    pub fn frames_extracted(&self) -> usize {
        self.reports.iter().map(|r| r.frames_extracted).sum()
    }

    /// Total frames skipped across all videos.
    pub fn frames_skipped(&self) -> usize {
        self.reports.iter().map(|r| r.frames_skipped).sum()
    }

    /// Total sheets written across all videos.
    pub fn sheets_written(&self) -> usize {
        self.reports.iter().map(|r| r.sheets.len()).sum()
    }

    /// Total successful uploads across all videos.
    pub fn uploads_succeeded(&self) -> usize {
        self.reports.iter().map(|r| r.uploads_succeeded).sum()
    }

    /// Total permanently failed uploads across all videos.
    pub fn uploads_failed(&self) -> usize {
        self.reports.iter().map(|r| r.uploads_failed).sum()
    }
}

/// Drives videos through extraction, packing, upload and aggregation.
pub struct VideoPipeline {
    config: RunConfig,
    extractor: Arc<dyn FrameExtractor>,
    uploader: Option<(Uploader, UploadTarget)>,
}

impl VideoPipeline {
    /// Create a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the configuration is invalid.
    pub fn new(
        config: RunConfig,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            extractor,
            uploader: None,
        })
    }

    /// Enable uploading of finished sheets.
    pub fn with_uploader(mut self, uploader: Uploader, target: UploadTarget) -> Self {
        self.uploader = Some((uploader, target));
        self
    }

    /// The pipeline's configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Process every selected video in the input directory.
    ///
    /// Per-video failures are logged and skipped; the summary reports them.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only for run-level problems: invalid
    /// configuration, a missing input directory, or no matching videos.
    pub async fn process_all(&self) -> Result<RunSummary, PipelineError> {
        if !self.config.input_dir.is_dir() {
            return Err(PipelineError::InputDirMissing(self.config.input_dir.clone()));
        }

        let videos = self.select_videos()?;
        info!(count = videos.len(), "videos to process");

        let mut summary = RunSummary::default();
        for video in videos {
            match self.process_video(&video).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!(video = %video, error = %e, "video failed, continuing with siblings");
                    summary.videos_failed += 1;
                }
            }
        }

        info!(
            processed = summary.reports.len(),
            failed = summary.videos_failed,
            frames = summary.frames_extracted(),
            frames_skipped = summary.frames_skipped(),
            sheets = summary.sheets_written(),
            uploaded = summary.uploads_succeeded(),
            uploads_failed = summary.uploads_failed(),
            "run complete"
        );
        Ok(summary)
    }

    /// Process a single video file from the input directory.
    pub async fn process_video(&self, video_file: &str) -> Result<VideoReport, PipelineError> {
        let video_path = self.config.input_dir.join(video_file);
        if !video_path.is_file() {
            return Err(PipelineError::VideoMissing(video_path));
        }

        let run_dir = self.run_dir_for(video_file);
        let frames_dir = run_dir.join("frames");
        let sheets_dir = run_dir.join("sheets");
        fs::create_dir_all(&run_dir).map_err(|e| PipelineError::Io {
            path: run_dir.clone(),
            source: e,
        })?;
        info!(video = %video_file, output = %run_dir.display(), "processing video");

        let frame_rate = match self.config.frame_rate {
            FrameRate::Fixed(rate) => rate,
            FrameRate::Source => {
                let rate = probe_frame_rate(&video_path)?;
                info!(video = %video_file, rate, "using source frame rate");
                rate
            }
        };

        let spec = FrameSpec {
            frame_size: self.config.frame_size,
            frame_rate,
            threads: self.config.threads,
        };

        // Extraction and packing are CPU/subprocess bound; keep them off the
        // async workers.
        let extractor = Arc::clone(&self.extractor);
        let frames = tokio::task::spawn_blocking({
            let video_path = video_path.clone();
            let frames_dir = frames_dir.clone();
            move || extractor.extract(&video_path, &frames_dir, &spec)
        })
        .await
        .map_err(|e| PipelineError::Internal(e.to_string()))??;
        info!(video = %video_file, frames = frames.len(), "frames extracted");

        let layout = SheetLayout::new(self.config.frame_size, self.config.max_sheet_size)?;
        let packed = tokio::task::spawn_blocking({
            let sheets_dir = sheets_dir.clone();
            move || SheetPacker::new(layout).pack(&frames, &sheets_dir)
        })
        .await
        .map_err(|e| PipelineError::Internal(e.to_string()))??;

        if self.config.zip_sheets && !packed.sheets.is_empty() {
            let zip_path = run_dir.join("zip").join("sprite-sheets.zip");
            if let Err(e) = archive::archive_sheets(&sheets_dir, &zip_path) {
                warn!(video = %video_file, error = %e, "archiving failed, continuing");
            }
        }

        let mut report = VideoReport {
            video: video_file.to_string(),
            output_dir: run_dir.clone(),
            frames_extracted: packed.frames_packed + packed.frames_skipped,
            frames_skipped: packed.frames_skipped,
            sheets: packed.sheets,
            uploads_succeeded: 0,
            uploads_failed: 0,
            manifest: None,
        };

        if let Some((uploader, target)) = &self.uploader {
            if report.sheets.is_empty() {
                warn!(video = %video_file, "no sheets to upload");
            } else {
                let mut batch = uploader.upload_all(report.sheets.clone(), target).await;
                aggregator::sort_records(&mut batch.records);

                let manifest_path = run_dir.join("assets").join(MANIFEST_FILE_NAME);
                aggregator::write_manifest(&batch.records, &manifest_path)?;

                report.uploads_succeeded = batch.records.len();
                report.uploads_failed = batch.failed;
                report.manifest = Some(manifest_path);
            }
        }

        Ok(report)
    }

    /// Select video files according to the configured filter.
    fn select_videos(&self) -> Result<Vec<String>, PipelineError> {
        let entries = fs::read_dir(&self.config.input_dir).map_err(|e| PipelineError::Io {
            path: self.config.input_dir.clone(),
            source: e,
        })?;

        let mut videos: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_video_file(name))
            .collect();
        videos.sort();

        if let VideoSelection::Only(name) = &self.config.videos {
            videos.retain(|v| v == name);
        }

        if videos.is_empty() {
            return Err(PipelineError::NoVideos(self.config.input_dir.clone()));
        }
        Ok(videos)
    }

    /// Run directory for a video: `<results_root>/<basename>-<timestamp>`.
    fn run_dir_for(&self, video_file: &str) -> PathBuf {
        let basename = Path::new(video_file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| video_file.to_string());
        let timestamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        self.config.results_root.join(format!("{}-{}", basename, timestamp))
    }
}

/// Whether a file name has a recognized video extension.
pub fn is_video_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.iter().any(|&v| v == ext)
        })
        .unwrap_or(false)
}

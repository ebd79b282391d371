//! `convert` command: videos to sprite sheets, with optional upload.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use dialoguer::{Confirm, Input};
use tracing::info;

use spriteforge::{
    config::default_threads, FfmpegExtractor, FrameRate, RunConfig, VideoPipeline, VideoSelection,
};

use super::common::{build_uploader, resolve_target, TargetKind};
use crate::error::CliError;

/// Arguments for the `convert` command.
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Directory containing input videos
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Root directory for generated results
    #[arg(long, default_value = "sprite_results")]
    pub results_root: PathBuf,

    /// Frame edge length in pixels
    #[arg(long)]
    pub frame_size: Option<u32>,

    /// Sheet edge length in pixels
    #[arg(long)]
    pub max_sheet_size: Option<u32>,

    /// Worker threads for frame extraction
    #[arg(long)]
    pub threads: Option<usize>,

    /// Fixed frame sampling rate in fps
    #[arg(long, conflicts_with = "source_frame_rate")]
    pub frame_rate: Option<f64>,

    /// Use each video's native frame rate instead of a fixed one
    #[arg(long)]
    pub source_frame_rate: bool,

    /// Process only this video file (default: all)
    #[arg(long)]
    pub video: Option<String>,

    /// Zip the generated sheets
    #[arg(long)]
    pub zip: bool,

    /// Upload the generated sheets
    #[arg(long)]
    pub upload: bool,

    /// Creator kind for uploads
    #[arg(long, value_enum)]
    pub target: Option<TargetKind>,

    /// Creator id for uploads
    #[arg(long)]
    pub id: Option<String>,

    /// Never prompt; missing options use their defaults
    #[arg(long)]
    pub non_interactive: bool,
}

/// Run the `convert` command.
pub async fn run(args: ConvertArgs) -> Result<(), CliError> {
    let interactive = !args.non_interactive;
    let config = build_config(&args, interactive)?;

    let mut pipeline = VideoPipeline::new(config, Arc::new(FfmpegExtractor::new()))?;

    let upload = if args.upload {
        true
    } else if interactive {
        Confirm::new()
            .with_prompt("Upload the generated sheets?")
            .default(false)
            .interact()?
    } else {
        false
    };

    if upload {
        let target = resolve_target(args.target, args.id.clone(), interactive)?;
        pipeline = pipeline.with_uploader(build_uploader()?, target);
    }

    let summary = pipeline.process_all().await?;

    println!();
    println!("Run summary:");
    println!("  Videos processed: {}", summary.reports.len());
    println!("  Videos failed:    {}", summary.videos_failed);
    println!("  Frames extracted: {}", summary.frames_extracted());
    println!("  Frames skipped:   {}", summary.frames_skipped());
    println!("  Sheets written:   {}", summary.sheets_written());
    if upload {
        println!("  Uploads ok:       {}", summary.uploads_succeeded());
        println!("  Uploads failed:   {}", summary.uploads_failed());
    }
    for report in &summary.reports {
        println!("  {} -> {}", report.video, report.output_dir.display());
        if let Some(manifest) = &report.manifest {
            println!("    manifest: {}", manifest.display());
        }
    }

    Ok(())
}

fn build_config(args: &ConvertArgs, interactive: bool) -> Result<RunConfig, CliError> {
    let defaults = RunConfig::default();

    let input_dir = match &args.input_dir {
        Some(dir) => dir.clone(),
        None if interactive => PathBuf::from(
            Input::<String>::new()
                .with_prompt("Input directory containing videos")
                .default("input_videos".to_string())
                .interact_text()?,
        ),
        None => defaults.input_dir.clone(),
    };

    let frame_size = match args.frame_size {
        Some(size) => size,
        None if interactive => Input::<u32>::new()
            .with_prompt("Frame size (px)")
            .default(defaults.frame_size)
            .interact_text()?,
        None => defaults.frame_size,
    };

    let max_sheet_size = match args.max_sheet_size {
        Some(size) => size,
        None if interactive => Input::<u32>::new()
            .with_prompt("Max sheet size (px)")
            .default(defaults.max_sheet_size)
            .interact_text()?,
        None => defaults.max_sheet_size,
    };

    let frame_rate = if args.source_frame_rate {
        FrameRate::Source
    } else {
        match args.frame_rate {
            Some(rate) => FrameRate::Fixed(rate),
            None if interactive => {
                if Confirm::new()
                    .with_prompt("Use each video's native frame rate?")
                    .default(false)
                    .interact()?
                {
                    FrameRate::Source
                } else {
                    FrameRate::Fixed(
                        Input::<f64>::new()
                            .with_prompt("Frame rate (fps)")
                            .default(30.0)
                            .interact_text()?,
                    )
                }
            }
            None => defaults.frame_rate,
        }
    };

    let config = RunConfig {
        input_dir,
        results_root: args.results_root.clone(),
        frame_size,
        max_sheet_size,
        threads: args.threads.unwrap_or_else(default_threads),
        frame_rate,
        videos: match &args.video {
            Some(name) => VideoSelection::Only(name.clone()),
            None => VideoSelection::All,
        },
        zip_sheets: args.zip,
    };

    config.validate()?;
    info!(?config, "resolved configuration");
    Ok(config)
}

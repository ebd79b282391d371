//! Spriteforge - video to sprite-sheet conversion with asset upload
//!
//! This library converts videos into tiled sprite-sheet PNGs and optionally
//! uploads each sheet to the Roblox Open Cloud assets API, recording the
//! resulting references in a generated Luau data file.
//!
//! # Pipeline
//!
//! ```text
//! video ──► extractor ──► frames ──► packer ──► sheets ──► uploader ──► records
//!           (ffmpeg)                 (image)               (submit/poll/resolve)
//!                                                              │
//!                                              aggregator ◄────┘
//!                                              (ordered AssetIds.luau)
//! ```
//!
//! Extraction and packing run sequentially per video to bound memory;
//! uploads for distinct sheets fan out concurrently and the aggregator
//! restores canonical sheet order from each record's explicit index.

pub mod aggregator;
pub mod archive;
pub mod config;
pub mod extractor;
pub mod packer;
pub mod pipeline;
pub mod sheet;
pub mod uploader;

pub use aggregator::{sheet_index_from_name, sort_records, write_manifest, AssetRecord};
pub use config::{Credentials, FrameRate, RunConfig, UploadTarget, VideoSelection};
pub use extractor::{FfmpegExtractor, FrameExtractor, FrameSpec};
pub use packer::{PackOutput, SheetPacker};
pub use pipeline::{PipelineError, RunSummary, VideoPipeline, VideoReport};
pub use sheet::{Placement, Sheet, SheetLayout};
pub use uploader::{AssetApi, RetryPolicy, RobloxApi, Uploader};

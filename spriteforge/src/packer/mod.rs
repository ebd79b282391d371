//! Sheet packer: tiles ordered frame sequences onto sprite-sheet canvases.
//!
//! Frames are consumed in extraction order and partitioned into consecutive
//! batches of `frames_per_sheet`. Each batch decodes its frames in a rayon
//! fan-out, then blits them one at a time onto a single transparent canvas.
//! The `image` crate makes no guarantee about concurrent writes to disjoint
//! regions of one buffer, so placement within a batch is serialized; the
//! decode work dominates anyway. A sheet is fully encoded to disk before the
//! next batch's I/O begins, bounding peak memory to one canvas plus one
//! batch of decoded frames.

use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops, RgbaImage};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sheet::{Sheet, SheetLayout};

/// Errors produced while packing sheets.
#[derive(Debug, Error)]
pub enum PackError {
    /// Frame/sheet dimensions do not form a valid grid.
    #[error("invalid dimensions: frame {frame_size}px does not fit sheet {sheet_size}px")]
    InvalidDimensions {
        /// Requested frame edge length.
        frame_size: u32,
        /// Requested sheet edge length.
        sheet_size: u32,
    },

    /// Could not create the sheets directory.
    #[error("failed to create directory {path}: {source}")]
    CreateDirFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Could not encode or write a finished sheet.
    #[error("failed to write sheet {path}: {source}")]
    WriteFailed {
        /// Sheet file that could not be written.
        path: PathBuf,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },
}

/// Result of packing one frame sequence.
#[derive(Debug)]
pub struct PackOutput {
    /// Finished sheets in index order.
    pub sheets: Vec<Sheet>,
    /// Frames successfully composited.
    pub frames_packed: usize,
    /// Frames skipped because they failed to decode.
    pub frames_skipped: usize,
}

/// Tiles ordered frames onto fixed-size sheets.
#[derive(Debug, Clone, Copy)]
pub struct SheetPacker {
    layout: SheetLayout,
}

impl SheetPacker {
    /// Create a packer for the given layout.
    pub fn new(layout: SheetLayout) -> Self {
        Self { layout }
    }

    /// The grid geometry this packer uses.
    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    /// Pack `frames` (in order) into sheets written under `sheets_dir`.
    ///
    /// A frame that fails to decode is skipped with a warning and leaves a
    /// transparent gap at its grid cell; the rest of the batch still
    /// composites. An empty frame sequence yields zero sheets.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] if the sheets directory cannot be created or a
    /// finished sheet cannot be written. Per-frame decode failures are not
    /// errors.
    pub fn pack(&self, frames: &[PathBuf], sheets_dir: &Path) -> Result<PackOutput, PackError> {
        if frames.is_empty() {
            return Ok(PackOutput {
                sheets: Vec::new(),
                frames_packed: 0,
                frames_skipped: 0,
            });
        }

        fs::create_dir_all(sheets_dir).map_err(|e| PackError::CreateDirFailed {
            path: sheets_dir.to_path_buf(),
            source: e,
        })?;

        let per_sheet = self.layout.frames_per_sheet();
        let mut sheets = Vec::with_capacity(self.layout.sheet_count(frames.len()));
        let mut frames_packed = 0;
        let mut frames_skipped = 0;

        for (sheet_index, batch) in frames.chunks(per_sheet).enumerate() {
            // Decode fan-out; placement order within a batch is commutative
            // because no two cells overlap.
            let decoded: Vec<(usize, Option<RgbaImage>)> = batch
                .par_iter()
                .enumerate()
                .map(|(cell, path)| match image::open(path) {
                    Ok(img) => (cell, Some(img.to_rgba8())),
                    Err(e) => {
                        warn!(frame = %path.display(), error = %e, "skipping frame that failed to decode");
                        (cell, None)
                    }
                })
                .collect();

            let mut canvas = RgbaImage::new(self.layout.sheet_size(), self.layout.sheet_size());
            for (cell, frame) in decoded {
                match frame {
                    Some(frame) => {
                        let (x, y) = self.layout.position(cell);
                        imageops::replace(&mut canvas, &frame, i64::from(x), i64::from(y));
                        frames_packed += 1;
                    }
                    None => frames_skipped += 1,
                }
            }

            let file_name = Sheet::file_name_for(sheet_index);
            let path = sheets_dir.join(&file_name);
            canvas.save(&path).map_err(|e| PackError::WriteFailed {
                path: path.clone(),
                source: e,
            })?;
            debug!(sheet = %path.display(), frames = batch.len(), "sheet written");

            sheets.push(Sheet {
                index: sheet_index,
                path,
                file_name,
            });
        }

        info!(
            sheets = sheets.len(),
            packed = frames_packed,
            skipped = frames_skipped,
            "packing complete"
        );

        Ok(PackOutput {
            sheets,
            frames_packed,
            frames_skipped,
        })
    }
}

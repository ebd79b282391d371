//! Sprite-sheet geometry.
//!
//! A sheet is a fixed-size square canvas tiling fixed-size square frames in
//! row-major order starting at the top-left. [`SheetLayout`] owns all the
//! arithmetic that maps a global frame index to a sheet number and a pixel
//! offset within that sheet, so the packer and its tests share one source of
//! truth for placement.

use std::path::PathBuf;

use crate::packer::PackError;

/// Grid geometry for tiling frames onto sheets.
///
/// Construction validates the dimensions; all later arithmetic is
/// infallible. When `frame_size` does not evenly divide `sheet_size` the
/// wasted margin on the right/bottom edge is simply never addressed: cell
/// origins beyond `sheet_size - frame_size` cannot be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    frame_size: u32,
    sheet_size: u32,
    frames_per_row: u32,
}

impl SheetLayout {
    /// Create a layout for `frame_size` frames on `sheet_size` canvases.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::InvalidDimensions`] if either size is zero or
    /// the frame does not fit on the sheet.
    pub fn new(frame_size: u32, sheet_size: u32) -> Result<Self, PackError> {
        if frame_size == 0 || sheet_size == 0 || frame_size > sheet_size {
            return Err(PackError::InvalidDimensions {
                frame_size,
                sheet_size,
            });
        }

        Ok(Self {
            frame_size,
            sheet_size,
            frames_per_row: sheet_size / frame_size,
        })
    }

    /// Frame edge length in pixels.
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    /// Sheet edge length in pixels.
    pub fn sheet_size(&self) -> u32 {
        self.sheet_size
    }

    /// Number of frames along one row (and one column) of a sheet.
    pub fn frames_per_row(&self) -> u32 {
        self.frames_per_row
    }

    /// Maximum number of frames a single sheet can hold.
    ///
    /// Computed in `usize` so extreme `sheet_size / frame_size` ratios do
    /// not overflow the `u32` row count squared.
    pub fn frames_per_sheet(&self) -> usize {
        let per_row = self.frames_per_row as usize;
        per_row * per_row
    }

    /// Number of sheets needed for `n_frames` frames.
    pub fn sheet_count(&self, n_frames: usize) -> usize {
        n_frames.div_ceil(self.frames_per_sheet())
    }

    /// Pixel origin of cell `idx` within a sheet.
    ///
    /// `idx` must be less than [`frames_per_sheet`](Self::frames_per_sheet).
    pub fn position(&self, idx: usize) -> (u32, u32) {
        debug_assert!(idx < self.frames_per_sheet());
        // Row and column each fit in u32 (both are < frames_per_row), but
        // idx itself may not, so the division happens in usize.
        let per_row = self.frames_per_row as usize;
        (
            (idx % per_row) as u32 * self.frame_size,
            (idx / per_row) as u32 * self.frame_size,
        )
    }

    /// Locate a global frame index in the sheet sequence.
    pub fn locate(&self, global_idx: usize) -> Placement {
        let per_sheet = self.frames_per_sheet();
        let cell = global_idx % per_sheet;
        let (x, y) = self.position(cell);
        Placement {
            sheet: global_idx / per_sheet,
            cell,
            x,
            y,
        }
    }
}

/// Where a single frame lands in the sheet sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Zero-based sheet index.
    pub sheet: usize,
    /// Cell index within the sheet (row-major).
    pub cell: usize,
    /// Pixel x offset of the cell origin.
    pub x: u32,
    /// Pixel y offset of the cell origin.
    pub y: u32,
}

/// One finalized sprite sheet on disk.
///
/// The zero-based `index` is assigned at creation and carried through upload
/// and aggregation. Ordering of the final manifest always comes from this
/// field, never re-derived from the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    /// Zero-based position in the pack order.
    pub index: usize,
    /// Full path to the written PNG.
    pub path: PathBuf,
    /// File name component, e.g. `sprite-sheet-3.png`.
    pub file_name: String,
}

impl Sheet {
    /// File name used for sheet `index`.
    pub fn file_name_for(index: usize) -> String {
        format!("sprite-sheet-{}.png", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_layout_rejects_zero_sizes() {
        assert!(SheetLayout::new(0, 4096).is_err());
        assert!(SheetLayout::new(1024, 0).is_err());
    }

    #[test]
    fn test_layout_rejects_frame_larger_than_sheet() {
        assert!(SheetLayout::new(4096, 1024).is_err());
    }

    #[test]
    fn test_default_geometry() {
        let layout = SheetLayout::new(1024, 4096).unwrap();
        assert_eq!(layout.frames_per_row(), 4);
        assert_eq!(layout.frames_per_sheet(), 16);
    }

    #[test]
    fn test_uneven_division_truncates_margin() {
        // 4096 / 1000 = 4 per row, 96px margin never addressed
        let layout = SheetLayout::new(1000, 4096).unwrap();
        assert_eq!(layout.frames_per_row(), 4);
        let (x, y) = layout.position(15);
        assert!(x + layout.frame_size() <= layout.sheet_size());
        assert!(y + layout.frame_size() <= layout.sheet_size());
    }

    #[test]
    fn test_sheet_count() {
        let layout = SheetLayout::new(2, 4).unwrap();
        assert_eq!(layout.frames_per_sheet(), 4);
        assert_eq!(layout.sheet_count(0), 0);
        assert_eq!(layout.sheet_count(1), 1);
        assert_eq!(layout.sheet_count(4), 1);
        assert_eq!(layout.sheet_count(5), 2);
        assert_eq!(layout.sheet_count(8), 2);
        assert_eq!(layout.sheet_count(9), 3);
    }

    #[test]
    fn test_positions_on_2x2_grid() {
        // frameSize=2, maxSheetSize=4 => 2 per row, 4 per sheet
        let layout = SheetLayout::new(2, 4).unwrap();
        assert_eq!(layout.position(0), (0, 0));
        assert_eq!(layout.position(1), (2, 0));
        assert_eq!(layout.position(2), (0, 2));
        assert_eq!(layout.position(3), (2, 2));
    }

    #[test]
    fn test_locate_six_frames_over_two_sheets() {
        let layout = SheetLayout::new(2, 4).unwrap();
        let placements: Vec<Placement> = (0..6).map(|i| layout.locate(i)).collect();

        assert_eq!(placements[0].sheet, 0);
        assert_eq!((placements[0].x, placements[0].y), (0, 0));
        assert_eq!((placements[3].x, placements[3].y), (2, 2));
        assert_eq!(placements[4].sheet, 1);
        assert_eq!((placements[4].x, placements[4].y), (0, 0));
        assert_eq!(placements[5].sheet, 1);
        assert_eq!((placements[5].x, placements[5].y), (2, 0));
    }

    #[test]
    fn test_extreme_ratio_does_not_overflow() {
        // 100_000 frames per row squares past u32::MAX
        let layout = SheetLayout::new(1, 100_000).unwrap();
        assert_eq!(layout.frames_per_sheet(), 10_000_000_000);
        let (x, y) = layout.position(layout.frames_per_sheet() - 1);
        assert_eq!((x, y), (99_999, 99_999));
        assert_eq!(layout.sheet_count(10_000_000_001), 2);
    }

    #[test]
    fn test_sheet_file_name() {
        assert_eq!(Sheet::file_name_for(0), "sprite-sheet-0.png");
        assert_eq!(Sheet::file_name_for(12), "sprite-sheet-12.png");
    }

    proptest! {
        #[test]
        fn prop_placement_stays_on_canvas(
            frame_size in 1u32..=512,
            factor in 1u32..=8,
            global_idx in 0usize..10_000,
        ) {
            let sheet_size = frame_size * factor;
            let layout = SheetLayout::new(frame_size, sheet_size).unwrap();
            let p = layout.locate(global_idx);
            prop_assert!(p.x + frame_size <= sheet_size);
            prop_assert!(p.y + frame_size <= sheet_size);
            prop_assert_eq!(p.sheet, global_idx / layout.frames_per_sheet());
        }

        #[test]
        fn prop_last_sheet_holds_remainder(
            frames in 0usize..500,
            per_row in 1u32..=6,
        ) {
            let layout = SheetLayout::new(2, 2 * per_row).unwrap();
            let count = layout.sheet_count(frames);
            let per_sheet = layout.frames_per_sheet();
            if frames == 0 {
                prop_assert_eq!(count, 0);
            } else {
                prop_assert_eq!(count, (frames + per_sheet - 1) / per_sheet);
                // all but the last sheet are full
                let last = frames - (count - 1) * per_sheet;
                prop_assert!(last >= 1 && last <= per_sheet);
            }
        }
    }
}

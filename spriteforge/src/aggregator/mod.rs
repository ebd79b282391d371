//! Result aggregation: ordering completed uploads and writing the manifest.
//!
//! Upload completion order is not submission order, so each record carries
//! the sheet's explicit zero-based index from creation onward and the final
//! ordering is restored from that field alone. The generated artifact is a
//! Luau table literal with 1-based keys; sheets whose upload permanently
//! failed are simply absent from it (the run summary reports the counts).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::info;

/// Errors while writing the generated manifest.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Could not create the output directory or write the file.
    #[error("failed to write manifest {path}: {source}")]
    WriteFailed {
        /// Manifest path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Index used for records whose file name carries no digits.
///
/// Such records sort after every indexed sheet, stable among themselves by
/// encounter order.
pub const UNINDEXED: usize = usize::MAX;

/// A completed upload: the originating sheet plus its remote reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Zero-based sheet index carried from creation.
    pub sheet_index: usize,
    /// Originating sheet file name, kept for logging.
    pub file_name: String,
    /// Resolved content URL, or `rbxassetid://<id>` when resolution failed.
    pub asset_ref: String,
}

/// Sort records into canonical sheet order.
///
/// Ascending by explicit sheet index; the sort is stable, so records with
/// equal indexes (including [`UNINDEXED`] ones) keep encounter order.
pub fn sort_records(records: &mut [AssetRecord]) {
    records.sort_by_key(|r| r.sheet_index);
}

/// Derive a sheet index from the first run of digits in a file name.
///
/// Used only when ingesting pre-existing sheet files whose index was never
/// recorded, e.g. `sprite-sheet-10.png` -> `Some(10)`. Returns `None` for
/// names without digits.
pub fn sheet_index_from_name(name: &str) -> Option<usize> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+").expect("digit regex is valid"));
    re.find(name).and_then(|m| m.as_str().parse().ok())
}

/// Write the ordered manifest as a Luau table literal.
///
/// Records must already be sorted. Output shape:
///
/// ```text
/// return {
///     [1] = "http://...",
///     [2] = "rbxassetid://123",
/// }
/// ```
///
/// # Errors
///
/// Returns [`AggregateError::WriteFailed`] on any I/O failure.
pub fn write_manifest(records: &[AssetRecord], path: &Path) -> Result<(), AggregateError> {
    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
        writeln!(out, "return {{")?;
        for (i, record) in records.iter().enumerate() {
            writeln!(out, "\t[{}] = \"{}\",", i + 1, record.asset_ref)?;
        }
        writeln!(out, "}}")?;
        out.flush()
    };

    write(path).map_err(|e| AggregateError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(manifest = %path.display(), entries = records.len(), "manifest written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(index: usize, name: &str, asset_ref: &str) -> AssetRecord {
        AssetRecord {
            sheet_index: index,
            file_name: name.to_string(),
            asset_ref: asset_ref.to_string(),
        }
    }

    #[test]
    fn test_sort_restores_numeric_order() {
        // Completion order 10, 2, 1 must become 1, 2, 10 (numeric, not lexical).
        let mut records = vec![
            record(10, "sprite-sheet-10.png", "a"),
            record(2, "sprite-sheet-2.png", "b"),
            record(1, "sprite-sheet-1.png", "c"),
        ];
        sort_records(&mut records);

        let names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["sprite-sheet-1.png", "sprite-sheet-2.png", "sprite-sheet-10.png"]
        );
    }

    #[test]
    fn test_sort_is_stable_for_unindexed_records() {
        let mut records = vec![
            record(UNINDEXED, "cover.png", "a"),
            record(0, "sprite-sheet-0.png", "b"),
            record(UNINDEXED, "back.png", "c"),
        ];
        sort_records(&mut records);

        assert_eq!(records[0].file_name, "sprite-sheet-0.png");
        // unindexed records sort last, keeping encounter order
        assert_eq!(records[1].file_name, "cover.png");
        assert_eq!(records[2].file_name, "back.png");
    }

    #[test]
    fn test_index_from_name() {
        assert_eq!(sheet_index_from_name("sprite-sheet-3.png"), Some(3));
        assert_eq!(sheet_index_from_name("sprite-sheet-10.png"), Some(10));
        assert_eq!(sheet_index_from_name("frame-00001.png"), Some(1));
        assert_eq!(sheet_index_from_name("cover.png"), None);
    }

    #[test]
    fn test_manifest_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("assets").join("AssetIds.luau");

        let records = vec![
            record(0, "sprite-sheet-0.png", "http://one"),
            record(1, "sprite-sheet-1.png", "rbxassetid://2"),
        ];
        write_manifest(&records, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "return {\n\t[1] = \"http://one\",\n\t[2] = \"rbxassetid://2\",\n}\n"
        );
    }

    #[test]
    fn test_failed_sheets_leave_no_gap_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AssetIds.luau");

        // sheet 1 failed permanently and is absent; keys stay contiguous
        let records = vec![
            record(0, "sprite-sheet-0.png", "a"),
            record(2, "sprite-sheet-2.png", "b"),
        ];
        write_manifest(&records, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[1] = \"a\""));
        assert!(content.contains("[2] = \"b\""));
        assert!(!content.contains("[3]"));
    }

    #[test]
    fn test_empty_manifest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AssetIds.luau");
        write_manifest(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "return {\n}\n");
    }
}

//! `upload` command: upload an existing directory of sheet PNGs.
//!
//! Sheets here were not produced in this process, so their order is derived
//! once from the first run of digits in each file name; names without
//! digits sort last in encounter order.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use spriteforge::aggregator::{self, UNINDEXED};
use spriteforge::sheet::Sheet;

use super::common::{build_uploader, resolve_target, TargetKind};
use crate::error::CliError;

/// Directory the upload-only manifest is written to.
const UPLOADED_SPRITES_DIR: &str = "uploaded_sprites";

/// Arguments for the `upload` command.
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Directory containing sheet PNGs to upload
    #[arg(long, default_value = "input_sheets")]
    pub sheets_dir: PathBuf,

    /// Creator kind for uploads
    #[arg(long, value_enum)]
    pub target: Option<TargetKind>,

    /// Creator id for uploads
    #[arg(long)]
    pub id: Option<String>,

    /// Never prompt; identity must come from flags or environment
    #[arg(long)]
    pub non_interactive: bool,
}

/// Run the `upload` command.
pub async fn run(args: UploadArgs) -> Result<(), CliError> {
    let sheets = collect_sheets(&args.sheets_dir)?;
    if sheets.is_empty() {
        return Err(CliError::NoSheets(args.sheets_dir));
    }

    let target = resolve_target(args.target, args.id.clone(), !args.non_interactive)?;
    let uploader = build_uploader()?;

    let mut batch = uploader.upload_all(sheets, &target).await;
    aggregator::sort_records(&mut batch.records);

    let timestamp = chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let manifest = PathBuf::from(UPLOADED_SPRITES_DIR).join(format!("AssetIds-{}.luau", timestamp));
    aggregator::write_manifest(&batch.records, &manifest)?;

    println!("Uploaded {} sheet(s), {} failed", batch.records.len(), batch.failed);
    println!("Manifest: {}", manifest.display());
    Ok(())
}

/// Enumerate sheet PNGs with indexes derived from their file names.
fn collect_sheets(dir: &Path) -> Result<Vec<Sheet>, CliError> {
    let entries = fs::read_dir(dir).map_err(|e| CliError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.to_ascii_lowercase().ends_with(".png"))
        .collect();
    names.sort();

    Ok(names
        .into_iter()
        .map(|file_name| Sheet {
            index: aggregator::sheet_index_from_name(&file_name).unwrap_or(UNINDEXED),
            path: dir.join(&file_name),
            file_name,
        })
        .collect())
}

//! End-to-end pipeline test with fake extraction and a scripted asset API.
//!
//! Exercises the full flow: frames -> sheets -> concurrent uploads with a
//! permanently failing sheet -> ordered manifest.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use spriteforge::extractor::{ExtractError, FrameExtractor, FrameSpec};
use spriteforge::uploader::{
    AssetApi, AssetId, BoxFuture, OperationStatus, OperationSuccess, RetryPolicy, SubmitRequest,
    UploadError, Uploader,
};
use spriteforge::{FrameRate, RunConfig, UploadTarget, VideoPipeline, VideoSelection};

struct SyntheticExtractor {
    frames: usize,
}

impl FrameExtractor for SyntheticExtractor {
    fn extract(
        &self,
        _video: &Path,
        frames_dir: &Path,
        spec: &FrameSpec,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        fs::create_dir_all(frames_dir).map_err(|e| ExtractError::Io {
            path: frames_dir.to_path_buf(),
            source: e,
        })?;
        let mut paths = Vec::new();
        for i in 0..self.frames {
            let path = frames_dir.join(format!("frame-{:05}.png", i + 1));
            RgbaImage::from_pixel(spec.frame_size, spec.frame_size, Rgba([i as u8, 1, 2, 255]))
                .save(&path)
                .unwrap();
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Completes every operation except the one for `sprite-sheet-1.png`, which
/// reports a terminal moderation error.
struct ModeratedApi;

impl AssetApi for ModeratedApi {
    fn submit_asset<'a>(
        &'a self,
        request: &'a SubmitRequest,
    ) -> BoxFuture<'a, Result<String, UploadError>> {
        Box::pin(async move { Ok(format!("operations/{}", request.file_name)) })
    }

    fn get_operation<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<OperationStatus, UploadError>> {
        Box::pin(async move {
            if path.contains("sprite-sheet-1.png") {
                return Ok(OperationStatus {
                    done: true,
                    response: None,
                    error: Some(spriteforge::uploader::OperationFailure {
                        message: "moderated".to_string(),
                    }),
                });
            }
            Ok(OperationStatus {
                done: true,
                response: Some(OperationSuccess {
                    asset_id: AssetId::Text(
                        path.trim_start_matches("operations/sprite-sheet-")
                            .trim_end_matches(".png")
                            .to_string(),
                    ),
                }),
                error: None,
            })
        })
    }

    fn get_asset_descriptor<'a>(
        &'a self,
        asset_id: &'a str,
    ) -> BoxFuture<'a, Result<String, UploadError>> {
        let xml = format!(
            "<roblox><Item><Properties><Content name=\"Texture\">\
             <url>http://www.roblox.com/asset/?id={}</url>\
             </Content></Properties></Item></roblox>",
            asset_id
        );
        Box::pin(async move { Ok(xml) })
    }
}

#[tokio::test]
async fn failed_sheet_is_omitted_and_order_is_preserved() {
    let input = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    fs::write(input.path().join("clip.mp4"), b"").unwrap();

    let config = RunConfig {
        input_dir: input.path().to_path_buf(),
        results_root: results.path().to_path_buf(),
        frame_size: 2,
        max_sheet_size: 4,
        threads: 1,
        frame_rate: FrameRate::Fixed(30.0),
        videos: VideoSelection::All,
        zip_sheets: false,
    };

    let fast = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    };
    let uploader = Uploader::new(Arc::new(ModeratedApi)).with_policies(fast, fast);

    // 10 frames on 2x2 grids -> 3 sheets; sheet 1 fails moderation.
    let pipeline = VideoPipeline::new(config, Arc::new(SyntheticExtractor { frames: 10 }))
        .unwrap()
        .with_uploader(uploader, UploadTarget::Group("77".into()));

    let summary = pipeline.process_all().await.unwrap();
    assert_eq!(summary.reports.len(), 1);

    let report = &summary.reports[0];
    assert_eq!(report.sheets.len(), 3);
    assert_eq!(report.uploads_succeeded, 2);
    assert_eq!(report.uploads_failed, 1);

    let manifest = fs::read_to_string(report.manifest.as_ref().unwrap()).unwrap();
    // sheet 0 then sheet 2, resolved to content URLs, no gap marker for sheet 1
    assert_eq!(
        manifest,
        "return {\n\t[1] = \"http://www.roblox.com/asset/?id=0\",\n\t[2] = \"http://www.roblox.com/asset/?id=2\",\n}\n"
    );
}

//! Asset uploader: submit, poll, resolve.
//!
//! Each sheet goes through a two-phase asynchronous protocol against the
//! remote asset API: a multipart submit that yields an opaque operation
//! path, then a poll loop on that path until the remote reports completion.
//! Both phases retry independently with exponential backoff. A completed
//! operation's asset id is then resolved to a direct content URL; resolve
//! failures degrade to the raw id instead of failing the sheet.
//!
//! Distinct sheets upload concurrently; one sheet's permanent failure never
//! aborts its siblings.

mod api;
mod backoff;
mod resolve;

pub use api::{
    AssetApi, AssetId, BoxFuture, OperationFailure, OperationStatus, OperationSuccess, RobloxApi,
    SubmitRequest, ASSETS_BASE_URL, DELIVERY_BASE_URL,
};
pub use backoff::{retry_with_backoff, RetryPolicy};
pub use resolve::extract_content_url;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::aggregator::AssetRecord;
use crate::config::UploadTarget;
use crate::sheet::Sheet;

/// Errors produced by the upload protocol.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Could not read the sheet file before submission.
    #[error("failed to read sheet {path}: {source}")]
    ReadSheet {
        /// Sheet file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Transport-level failure (connect, timeout, malformed body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success HTTP status.
    #[error("remote returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for log context.
        body: String,
    },

    /// The operation has not completed yet. Retriable, distinct in logs
    /// from transport errors.
    #[error("operation not done yet")]
    NotDone,

    /// The remote reported a terminal error payload for the operation.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// The operation completed without an asset id or error payload.
    #[error("operation completed but carried no asset id")]
    MissingAssetId,
}

/// Outcome of uploading a batch of sheets.
#[derive(Debug, Default)]
pub struct UploadBatch {
    /// Records for sheets that uploaded successfully, in completion order.
    pub records: Vec<AssetRecord>,
    /// Number of sheets that failed permanently.
    pub failed: usize,
}

/// Uploads sheets through a shared [`AssetApi`].
#[derive(Clone)]
pub struct Uploader {
    api: Arc<dyn AssetApi>,
    submit_policy: RetryPolicy,
    poll_policy: RetryPolicy,
}

impl Uploader {
    /// Create an uploader with the default submit and poll policies.
    pub fn new(api: Arc<dyn AssetApi>) -> Self {
        Self {
            api,
            submit_policy: RetryPolicy::submit(),
            poll_policy: RetryPolicy::poll(),
        }
    }

    /// Override the retry policies. Used by tests and tuning.
    pub fn with_policies(mut self, submit: RetryPolicy, poll: RetryPolicy) -> Self {
        self.submit_policy = submit;
        self.poll_policy = poll;
        self
    }

    /// Upload a single sheet and resolve its asset reference.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError`] when the sheet cannot be read, the submit or
    /// poll retry budget is exhausted, or the remote reports a terminal
    /// error for the operation. Resolve failures are not errors.
    pub async fn upload_sheet(
        &self,
        sheet: &Sheet,
        target: &UploadTarget,
    ) -> Result<AssetRecord, UploadError> {
        let bytes = tokio::fs::read(&sheet.path)
            .await
            .map_err(|e| UploadError::ReadSheet {
                path: sheet.path.clone(),
                source: e,
            })?;

        let request = SubmitRequest {
            display_name: sheet.file_name.clone(),
            file_name: sheet.file_name.clone(),
            creator_key: target.creator_key(),
            creator_id: target.id().to_string(),
            bytes,
        };

        let operation_path =
            retry_with_backoff(&self.submit_policy, "submit asset", || {
                self.api.submit_asset(&request)
            })
            .await?;
        info!(sheet = %sheet.file_name, path = %operation_path, "asset submitted");

        let status = retry_with_backoff(&self.poll_policy, "poll operation", || {
            let api = Arc::clone(&self.api);
            let path = operation_path.clone();
            async move {
                let status = api.get_operation(&path).await?;
                if !status.done {
                    return Err(UploadError::NotDone);
                }
                Ok(status)
            }
        })
        .await?;

        if let Some(failure) = status.error {
            return Err(UploadError::OperationFailed(failure.message));
        }
        let asset_id = status
            .response
            .map(|r| r.asset_id.to_string())
            .ok_or(UploadError::MissingAssetId)?;
        info!(sheet = %sheet.file_name, asset_id = %asset_id, "asset created");

        Ok(AssetRecord {
            sheet_index: sheet.index,
            file_name: sheet.file_name.clone(),
            asset_ref: self.resolve_reference(&asset_id).await,
        })
    }

    /// Resolve an asset id to its direct content URL.
    ///
    /// Falls back to `rbxassetid://<id>` on any descriptor or extraction
    /// failure. Graceful degradation, never an error.
    async fn resolve_reference(&self, asset_id: &str) -> String {
        let fallback = format!("rbxassetid://{}", asset_id);

        match self.api.get_asset_descriptor(asset_id).await {
            Ok(xml) => match extract_content_url(&xml) {
                Some(url) => url,
                None => {
                    warn!(asset_id, "descriptor carried no content url, keeping raw id");
                    fallback
                }
            },
            Err(e) => {
                warn!(asset_id, error = %e, "descriptor fetch failed, keeping raw id");
                fallback
            }
        }
    }

    /// Upload every sheet concurrently.
    ///
    /// One tokio task per sheet; results are collected from task outputs so
    /// there is no shared mutable list to race on. A permanently failed
    /// sheet is logged with its file name and omitted from the records.
    pub async fn upload_all(&self, sheets: Vec<Sheet>, target: &UploadTarget) -> UploadBatch {
        let total = sheets.len();
        let mut tasks = JoinSet::new();

        for sheet in sheets {
            let uploader = self.clone();
            let target = target.clone();
            tasks.spawn(async move {
                let file_name = sheet.file_name.clone();
                let result = uploader.upload_sheet(&sheet, &target).await;
                (file_name, result)
            });
        }

        let mut batch = UploadBatch::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(record))) => {
                    info!(
                        sheet = %record.file_name,
                        completed = batch.records.len() + 1,
                        total,
                        "sheet uploaded"
                    );
                    batch.records.push(record);
                }
                Ok((file_name, Err(e))) => {
                    error!(sheet = %file_name, error = %e, "sheet upload failed permanently");
                    batch.failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "upload task panicked");
                    batch.failed += 1;
                }
            }
        }

        batch
    }
}

//! Remote asset API abstraction and its Roblox Open Cloud implementation.
//!
//! The network seam is a trait so the upload orchestration can be exercised
//! against scripted fakes in tests. The trait uses `Pin<Box<dyn Future>>`
//! returns to stay dyn-compatible (`Arc<dyn AssetApi>` is shared across
//! concurrent upload tasks).

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::Credentials;

use super::UploadError;

/// Production endpoint for asset submission and operation polling.
pub const ASSETS_BASE_URL: &str = "https://apis.roblox.com/assets/v1";

/// Production endpoint for asset descriptor lookup.
pub const DELIVERY_BASE_URL: &str = "https://assetdelivery.roblox.com/v1";

/// Request timeout for all API calls.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything needed to submit one sheet as an asset.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Display name and description, derived from the sheet file name.
    pub display_name: String,
    /// File name sent with the multipart image part.
    pub file_name: String,
    /// Creator reference key: `groupId` or `userId`.
    pub creator_key: &'static str,
    /// Creator id value.
    pub creator_id: String,
    /// Raw PNG bytes of the sheet.
    pub bytes: Vec<u8>,
}

/// Status of an asynchronous upload operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    /// Whether the remote has finished processing.
    #[serde(default)]
    pub done: bool,
    /// Present when the operation completed successfully.
    #[serde(default)]
    pub response: Option<OperationSuccess>,
    /// Present when the operation completed with a terminal error.
    #[serde(default)]
    pub error: Option<OperationFailure>,
}

/// Successful operation payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSuccess {
    /// The created asset's identifier.
    pub asset_id: AssetId,
}

/// Terminal error payload from a completed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationFailure {
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
}

/// Asset identifier, numeric or string depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssetId {
    /// Numeric id as returned by the operations endpoint.
    Number(u64),
    /// String form.
    Text(String),
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetId::Number(n) => write!(f, "{}", n),
            AssetId::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    path: String,
}

/// Remote asset API consumed by the uploader.
///
/// All implementations must be `Send + Sync`; one instance is shared across
/// every in-flight upload task.
pub trait AssetApi: Send + Sync {
    /// Submit an asset. Success yields an opaque operation path, not yet a
    /// final identifier.
    fn submit_asset<'a>(&'a self, request: &'a SubmitRequest)
        -> BoxFuture<'a, Result<String, UploadError>>;

    /// Fetch the status of a previously submitted operation.
    fn get_operation<'a>(&'a self, path: &'a str)
        -> BoxFuture<'a, Result<OperationStatus, UploadError>>;

    /// Fetch the XML descriptor for a finished asset.
    fn get_asset_descriptor<'a>(&'a self, asset_id: &'a str)
        -> BoxFuture<'a, Result<String, UploadError>>;
}

/// Roblox Open Cloud implementation of [`AssetApi`].
#[derive(Debug, Clone)]
pub struct RobloxApi {
    client: reqwest::Client,
    credentials: Credentials,
    assets_base: String,
    delivery_base: String,
}

impl RobloxApi {
    /// Create a client against the production endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Transport`] if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self, UploadError> {
        Self::with_base_urls(credentials, ASSETS_BASE_URL, DELIVERY_BASE_URL)
    }

    /// Create a client against custom endpoints. Used by tests.
    pub fn with_base_urls(
        credentials: Credentials,
        assets_base: &str,
        delivery_base: &str,
    ) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| UploadError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
            assets_base: assets_base.trim_end_matches('/').to_string(),
            delivery_base: delivery_base.trim_end_matches('/').to_string(),
        })
    }

    fn metadata_json(request: &SubmitRequest) -> String {
        let mut creator = Map::new();
        creator.insert(
            request.creator_key.to_string(),
            Value::String(request.creator_id.clone()),
        );

        json!({
            "assetType": "Decal",
            "displayName": request.display_name,
            "description": request.display_name,
            "creationContext": { "creator": Value::Object(creator) },
        })
        .to_string()
    }
}

impl AssetApi for RobloxApi {
    fn submit_asset<'a>(
        &'a self,
        request: &'a SubmitRequest,
    ) -> BoxFuture<'a, Result<String, UploadError>> {
        Box::pin(async move {
            let file_part = reqwest::multipart::Part::bytes(request.bytes.clone())
                .file_name(request.file_name.clone())
                .mime_str("image/png")
                .map_err(|e| UploadError::Transport(format!("invalid mime type: {}", e)))?;

            let form = reqwest::multipart::Form::new()
                .text("request", Self::metadata_json(request))
                .part("fileContent", file_part);

            let response = self
                .client
                .post(format!("{}/assets", self.assets_base))
                .header("x-api-key", &self.credentials.api_key)
                .multipart(form)
                .send()
                .await
                .map_err(|e| UploadError::Transport(format!("submit request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(UploadError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let submit: SubmitResponse = response
                .json()
                .await
                .map_err(|e| UploadError::Transport(format!("malformed submit response: {}", e)))?;

            Ok(submit.path)
        })
    }

    fn get_operation<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<OperationStatus, UploadError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(format!("{}/{}", self.assets_base, path))
                .header("x-api-key", &self.credentials.api_key)
                .send()
                .await
                .map_err(|e| UploadError::Transport(format!("operation request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(UploadError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            response.json().await.map_err(|e| {
                UploadError::Transport(format!("malformed operation response: {}", e))
            })
        })
    }

    fn get_asset_descriptor<'a>(
        &'a self,
        asset_id: &'a str,
    ) -> BoxFuture<'a, Result<String, UploadError>> {
        Box::pin(async move {
            let mut request = self
                .client
                .get(format!("{}/asset/", self.delivery_base))
                .query(&[("id", asset_id)]);

            // The delivery endpoint may require a session credential in
            // addition to the API key.
            if let Some(cookie) = &self.credentials.cookie {
                request = request.header("Cookie", format!(".ROBLOSECURITY={}", cookie));
            }

            let response = request
                .send()
                .await
                .map_err(|e| UploadError::Transport(format!("descriptor request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(UploadError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            response
                .text()
                .await
                .map_err(|e| UploadError::Transport(format!("failed to read descriptor: {}", e)))
        })
    }
}

//! Dropbox remote client
//!
//! Dropbox API v2 with a long-lived access token. One `DropboxClient` owns its
//! own HTTP client so pool slots never share connection state.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Response};
use sbx_core::{
    ByteStream, SbxError, SbxResult, StorageCapabilities, StorageConfig, StoragePath,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::pool::ClientPool;
use crate::remote::{ListFolderPage, RemoteClient, RemoteMetadata};
use crate::storage::ChunkStorage;

const DROPBOX_API_URL: &str = "https://api.dropboxapi.com/2";
const DROPBOX_CONTENT_URL: &str = "https://content.dropboxapi.com/2";

/// Chunk storage backed by Dropbox
pub type DropboxStorage = ChunkStorage<DropboxClient>;

/// Dropbox client configuration
#[derive(Debug, Clone)]
pub struct DropboxConfig {
    pub access_token: String,
    pub api_url: String,
    pub content_url: String,
}

impl DropboxConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_url: DROPBOX_API_URL.to_string(),
            content_url: DROPBOX_CONTENT_URL.to_string(),
        }
    }

    /// Point the client at other endpoints, e.g. a local test server
    pub fn with_endpoints(mut self, api_url: impl Into<String>, content_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.content_url = content_url.into();
        self
    }
}

/// Open a Dropbox chunk storage with one client per configured thread.
pub async fn open_dropbox_storage(
    access_token: &str,
    config: &StorageConfig,
) -> SbxResult<DropboxStorage> {
    if access_token.is_empty() {
        return Err(SbxError::AuthRequired("Dropbox access token is empty".into()));
    }
    config.validate()?;

    let clients = ClientPool::from_fn(config.threads, |_| {
        DropboxClient::new(DropboxConfig::new(access_token))
    })?;
    ChunkStorage::create(clients, config).await
}

/// Dropbox API client
#[derive(Debug, Clone)]
pub struct DropboxClient {
    config: DropboxConfig,
    http: Client,
}

impl DropboxClient {
    pub fn new(config: DropboxConfig) -> Self {
        Self { config, http: Client::new() }
    }

    /// Make authenticated API request
    async fn api_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: impl Serialize,
    ) -> SbxResult<T> {
        let url = format!("{}/{}", self.config.api_url, endpoint);
        debug!(endpoint, "Dropbox API request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SbxError::Network(e.to_string()))?;

        check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| SbxError::Serialization(e.to_string()))
    }
}

/// Dropbox roots are addressed by the empty string
fn to_dropbox_path(path: &str) -> String {
    let path = StoragePath::new(path);
    if path.is_root() {
        String::new()
    } else {
        path.to_path_string()
    }
}

/// JSON for the `Dropbox-API-Arg` header, which must be pure ASCII.
fn header_safe_json(value: &impl Serialize) -> SbxResult<String> {
    let json = serde_json::to_string(value).map_err(|e| SbxError::Serialization(e.to_string()))?;
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(escaped)
}

async fn check_response(response: Response) -> SbxResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status.as_u16(), retry_after, &body))
}

/// Error body returned by Dropbox endpoints
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_summary: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// Follow the nested `.tag` chain of a structured Dropbox error,
/// e.g. `path_lookup` → `not_found`.
fn error_tags(error: &Value) -> Vec<&str> {
    let mut tags = Vec::new();
    let mut current = Some(error);
    while let Some(Value::Object(map)) = current {
        match map.get(".tag").and_then(Value::as_str) {
            Some(tag) => {
                tags.push(tag);
                current = map.get(tag);
            }
            None => break,
        }
    }
    tags
}

/// Map a failed Dropbox response to a typed error.
fn classify_error(status: u16, retry_after: Option<u64>, body: &str) -> SbxError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let summary = parsed
        .error_summary
        .clone()
        .unwrap_or_else(|| body.trim().to_string());
    let tags = parsed.error.as_ref().map(error_tags).unwrap_or_default();

    if status == 401 {
        return SbxError::AuthFailed(summary);
    }
    if status == 429 || tags.iter().any(|t| t.starts_with("too_many_")) {
        return SbxError::RateLimited { retry_after_secs: retry_after };
    }
    if tags.contains(&"not_found") {
        return SbxError::NotFound(summary);
    }
    if tags.contains(&"conflict") {
        return SbxError::Conflict(summary);
    }

    SbxError::ProviderApi {
        provider: "dropbox".into(),
        message: format!("{}: {}", status, summary),
    }
}

/// Dropbox file metadata response
#[derive(Debug, Deserialize)]
struct DropboxMetadata {
    #[serde(rename = ".tag")]
    tag: String,
    name: String,
    #[serde(default)]
    size: Option<u64>,
}

impl DropboxMetadata {
    fn into_remote(self) -> RemoteMetadata {
        if self.tag == "folder" {
            RemoteMetadata::folder(self.name)
        } else {
            RemoteMetadata::file(self.name, self.size.unwrap_or(0))
        }
    }
}

/// `files/upload` argument. Uploads replace existing files and never rename.
#[derive(Debug, Serialize)]
struct UploadArg {
    path: String,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

impl UploadArg {
    fn overwrite(path: &str) -> Self {
        Self {
            path: to_dropbox_path(path),
            mode: "overwrite",
            autorename: false,
            mute: true,
        }
    }
}

/// List folder response
#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<DropboxMetadata>,
    cursor: String,
    has_more: bool,
}

impl ListFolderResponse {
    fn into_page(self) -> ListFolderPage {
        ListFolderPage {
            entries: self.entries.into_iter().map(DropboxMetadata::into_remote).collect(),
            cursor: self.cursor,
            has_more: self.has_more,
        }
    }
}

#[async_trait]
impl RemoteClient for DropboxClient {
    fn provider(&self) -> &'static str {
        "dropbox"
    }

    fn display_name(&self) -> &'static str {
        "Dropbox"
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::dropbox()
    }

    async fn list_folder(&self, path: &str) -> SbxResult<ListFolderPage> {
        #[derive(Serialize)]
        struct ListFolderArg {
            path: String,
            recursive: bool,
            include_media_info: bool,
            include_deleted: bool,
        }

        let result: ListFolderResponse = self
            .api_request(
                "files/list_folder",
                ListFolderArg {
                    path: to_dropbox_path(path),
                    recursive: false,
                    include_media_info: false,
                    include_deleted: false,
                },
            )
            .await?;

        Ok(result.into_page())
    }

    async fn list_folder_continue(&self, cursor: &str) -> SbxResult<ListFolderPage> {
        #[derive(Serialize)]
        struct ListFolderContinueArg<'a> {
            cursor: &'a str,
        }

        let result: ListFolderResponse = self
            .api_request("files/list_folder/continue", ListFolderContinueArg { cursor })
            .await?;

        Ok(result.into_page())
    }

    async fn get_metadata(&self, path: &str) -> SbxResult<RemoteMetadata> {
        let dropbox_path = to_dropbox_path(path);

        if dropbox_path.is_empty() {
            // Root folder
            return Ok(RemoteMetadata::folder(""));
        }

        #[derive(Serialize)]
        struct GetMetadataArg {
            path: String,
            include_media_info: bool,
        }

        let result: DropboxMetadata = self
            .api_request(
                "files/get_metadata",
                GetMetadataArg { path: dropbox_path, include_media_info: false },
            )
            .await?;

        Ok(result.into_remote())
    }

    async fn create_folder(&self, path: &str) -> SbxResult<()> {
        #[derive(Serialize)]
        struct CreateFolderArg {
            path: String,
            autorename: bool,
        }

        let _: Value = self
            .api_request(
                "files/create_folder_v2",
                CreateFolderArg { path: to_dropbox_path(path), autorename: false },
            )
            .await?;

        Ok(())
    }

    async fn delete(&self, path: &str) -> SbxResult<()> {
        #[derive(Serialize)]
        struct DeleteArg {
            path: String,
        }

        let _: Value = self
            .api_request("files/delete_v2", DeleteArg { path: to_dropbox_path(path) })
            .await?;

        Ok(())
    }

    async fn move_entry(&self, from: &str, to: &str) -> SbxResult<()> {
        #[derive(Serialize)]
        struct MoveArg {
            from_path: String,
            to_path: String,
            autorename: bool,
        }

        let _: Value = self
            .api_request(
                "files/move_v2",
                MoveArg {
                    from_path: to_dropbox_path(from),
                    to_path: to_dropbox_path(to),
                    autorename: false,
                },
            )
            .await?;

        Ok(())
    }

    async fn upload(&self, path: &str, body: ByteStream, size: u64) -> SbxResult<()> {
        let arg = header_safe_json(&UploadArg::overwrite(path))?;

        let response = self
            .http
            .post(format!("{}/files/upload", self.config.content_url))
            .bearer_auth(&self.config.access_token)
            .header("Dropbox-API-Arg", arg)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| SbxError::Network(e.to_string()))?;

        check_response(response).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> SbxResult<ByteStream> {
        #[derive(Serialize)]
        struct DownloadArg {
            path: String,
        }

        let arg = header_safe_json(&DownloadArg { path: to_dropbox_path(path) })?;

        let response = self
            .http
            .post(format!("{}/files/download", self.config.content_url))
            .bearer_auth(&self.config.access_token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await
            .map_err(|e| SbxError::Network(e.to_string()))?;

        let stream = check_response(response)
            .await?
            .bytes_stream()
            .map(|block| block.map_err(|e| SbxError::Network(e.to_string())));

        Ok(Box::pin(stream))
    }
}

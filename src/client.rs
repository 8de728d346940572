//! Google Drive API client: single-page listing and format export.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::DRIVE_API_BASE;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, FileListResponse, FileRecord};

/// Fields requested from files.list.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

/// Source of file metadata.
#[async_trait]
pub trait Lister: Send + Sync {
    /// Fetch one page of at most `max_count` records. Never paginates.
    async fn list(&self, max_count: i32) -> Result<Vec<FileRecord>>;
}

/// Server-side conversion of a file into a downloadable format.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>>;
}

/// Client for the Drive v3 REST API, authorized with a bearer token.
pub struct DriveClient {
    base_url: String,
    access_token: String,
    http: Client,
}

impl DriveClient {
    /// Create a client against the public Drive API.
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(access_token, DRIVE_API_BASE)
    }

    /// Create a client against another API root, e.g. a local mock server.
    pub fn with_base_url(access_token: String, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turn a non-success response into an `ApiError`, preferring Google's JSON
/// error body when there is one.
async fn api_error(response: Response) -> DriveError {
    let status = response.status();
    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        };
    }
    DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    }
}

#[async_trait]
impl Lister for DriveClient {
    async fn list(&self, max_count: i32) -> Result<Vec<FileRecord>> {
        let page_size = max_count.to_string();
        let response = self
            .http
            .get(format!("{}/files", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&[("pageSize", page_size.as_str()), ("fields", LIST_FIELDS)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let list_response: FileListResponse = response.json().await?;
        if list_response.next_page_token.is_some() {
            debug!("more files available, not fetching further pages");
        }
        debug!(count = list_response.files.len(), "listed files");

        Ok(list_response.files)
    }
}

#[async_trait]
impl Exporter for DriveClient {
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(format!("{}/files/{}/export", self.base_url, file_id))
            .bearer_auth(&self.access_token)
            .query(&[("mimeType", mime_type)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let bytes = response.bytes().await?;
        debug!(file_id, mime_type, len = bytes.len(), "exported file");

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    // Tests are in tests/client_test.rs
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::attachment::ServerFile;
use super::drain::UploadTask;

/// Transport for sending one task's payload to the server
///
/// A failed call marks the task `Failed`; the drain never retries it
/// within the pass and never lets one failure abort the pool.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, task: &UploadTask) -> Result<ServerFile>;
}

/// HTTP uploader against the entry-files endpoint
///
/// `PUT {base}/entries/{entry_id}/files/{file_id}` with the raw payload
/// bytes; the response body is the confirmed file record.
pub struct HttpUploader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUploader {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, task: &UploadTask) -> Result<ServerFile> {
        let url = format!(
            "{}/entries/{}/files/{}",
            self.base_url, task.entry_id, task.file_id
        );

        debug!("PUT {} ({} bytes)", url, task.payload.bytes.len());

        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, &task.payload.content_type)
            .body(task.payload.bytes.clone())
            .send()
            .await
            .with_context(|| format!("Failed to reach upload endpoint: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Server rejected '{}' with status {}", task.name, status);
        }

        let file = response
            .json::<ServerFile>()
            .await
            .context("Upload response was not a valid file record")?;

        Ok(file)
    }
}

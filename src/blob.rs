use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};

use crate::db::ChunkKind;
use crate::error::{AppError, Result};
use crate::Config;

/// Key under which one chunk's raw content lives on the static file server.
///
/// Renders as `"{document_id}/{chunk_id}.{ext}"` with `.txt` for text chunks
/// and `.jpg` for image chunks. The format is shared with external consumers
/// and must stay bit-exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkKey {
    pub document_id: i32,
    pub chunk_id: i32,
    pub kind: ChunkKind,
}

impl ChunkKey {
    pub fn new(document_id: i32, chunk_id: i32, kind: ChunkKind) -> Self {
        Self {
            document_id,
            chunk_id,
            kind,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.chunk_id, self.kind.extension())
    }

    pub fn content_type(&self) -> &'static str {
        match self.kind {
            ChunkKind::Text => "text/plain",
            ChunkKind::Image => "image/jpeg",
        }
    }
}

impl Display for ChunkKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}/{}.{}",
            self.document_id,
            self.chunk_id,
            self.kind.extension()
        )
    }
}

/// Byte storage for chunk content, addressed by [`ChunkKey`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the stored bytes. A missing key is `AppError::NotFound` with the
    /// detail `"Chunk file not found"`.
    async fn get(&self, key: ChunkKey) -> Result<Vec<u8>>;

    async fn put(&self, key: ChunkKey, bytes: Vec<u8>) -> Result<()>;

    /// Delete the stored bytes. A missing key is `AppError::NotFound`; callers
    /// deleting a whole document treat that as normal.
    async fn delete(&self, key: ChunkKey) -> Result<()>;
}

/// Client for the key-value static file server (GET/POST/DELETE by path).
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
}

impl HttpBlobStore {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.static_files_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, key: ChunkKey) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: ChunkKey) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.url(key))
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::not_found("Chunk file not found"));
        }
        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "GET {key} returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn put(&self, key: ChunkKey, bytes: Vec<u8>) -> Result<()> {
        let part = Part::bytes(bytes)
            .file_name(key.file_name())
            .mime_str(key.content_type())
            .map_err(|e| AppError::Storage(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "POST {key} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete(&self, key: ChunkKey) -> Result<()> {
        let response = self
            .client
            .delete(self.url(key))
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!("No blob at {key}")));
        }
        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "DELETE {key} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

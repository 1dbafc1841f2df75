use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::media::to_data_url;
use crate::Config;

/// Upload kinds the OCR provider accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Image => "image/jpeg",
        }
    }
}

/// One image embedded in an OCR page. `base64` is a full data URL, ready to
/// stand in for the markdown placeholder that references it.
#[derive(Debug, Clone, Deserialize)]
pub struct PageImage {
    pub id: String,
    #[serde(rename = "image_base64")]
    pub base64: String,
}

/// One recognized page: markdown text plus the images it references via
/// `![img-N.jpeg](img-N.jpeg)` placeholders, indexable by `N`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub markdown: String,
    #[serde(default)]
    pub images: Vec<PageImage>,
}

/// Ordered pages recognized from one uploaded file.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrOutput {
    pub pages: Vec<Page>,
}

#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn ocr(&self, file: &[u8], kind: FileKind) -> Result<OcrOutput>;
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum OcrDocument {
    #[serde(rename = "document_url")]
    DocumentUrl { document_url: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: String },
}

#[derive(Serialize)]
struct OcrRequest {
    model: String,
    document: OcrDocument,
    include_image_base64: bool,
}

/// Mistral OCR client.
pub struct MistralOcr {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl MistralOcr {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::provider("mistral", e))?;
        Ok(Self {
            client,
            url: config.mistral_url.clone(),
            api_key: config.mistral_api_key.clone(),
            model: config.mistral_ocr_model.clone(),
        })
    }
}

#[async_trait]
impl OcrProvider for MistralOcr {
    async fn ocr(&self, file: &[u8], kind: FileKind) -> Result<OcrOutput> {
        let document = match kind {
            FileKind::Pdf => OcrDocument::DocumentUrl {
                document_url: to_data_url(file, kind.mime()),
            },
            FileKind::Image => OcrDocument::ImageUrl {
                image_url: to_data_url(file, kind.mime()),
            },
        };
        let request = OcrRequest {
            model: self.model.clone(),
            document,
            include_image_base64: true,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::provider("mistral", e))?;

        if response.status() != 200 {
            return Err(AppError::provider(
                "mistral",
                format!(
                    "status {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            ));
        }

        response
            .json::<OcrOutput>()
            .await
            .map_err(|e| AppError::provider("mistral", e))
    }
}

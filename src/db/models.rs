use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::media::IMAGE_DATA_URL_PREFIX;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i32,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// What a chunk holds. Derived from the splitter output, never user-chosen:
/// a payload carrying the image data-URL prefix is an image, all else is text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Text,
    Image,
}

impl ChunkKind {
    pub fn classify(content: &str) -> Self {
        if content.starts_with(IMAGE_DATA_URL_PREFIX) {
            Self::Image
        } else {
            Self::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(AppError::invalid_input(format!(
                "Unknown chunk type: {other}"
            ))),
        }
    }

    /// File extension used for the chunk's blob key.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Image => "jpg",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    pub document_id: i32,
    pub completed: bool,
}

/// The closed set of synthesis voices the TTS provider supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceName {
    AfBella,
    AfNicole,
    AfHeart,
    AfNova,
}

impl VoiceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AfBella => "af_bella",
            Self::AfNicole => "af_nicole",
            Self::AfHeart => "af_heart",
            Self::AfNova => "af_nova",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "af_bella" => Ok(Self::AfBella),
            "af_nicole" => Ok(Self::AfNicole),
            "af_heart" => Ok(Self::AfHeart),
            "af_nova" => Ok(Self::AfNova),
            other => Err(AppError::invalid_input(format!("Unknown voice: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: i32,
    pub name: String,
    pub prompt_description: String,
    pub voice_name: Option<VoiceName>,
}

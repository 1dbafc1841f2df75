use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod openrouter;

pub use openrouter::OpenRouterChat;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One part of a multimodal message body.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

/// Message body: either a bare string or a list of multimodal parts, matching
/// the OpenAI-style wire format.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content: MessageContent::Text(content),
        }
    }

    pub fn system(content: String) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: String) -> Self {
        Self::new(Role::User, content)
    }

    /// System message pairing a caption with an inline image data URL.
    pub fn system_with_image(caption: String, image_url: String) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: caption },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url },
                },
            ]),
        }
    }
}

/// The chat models a caller may pick.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatModel {
    #[serde(rename = "google/gemini-2.5-pro-preview")]
    GeminiPro,
    #[serde(rename = "google/gemini-2.5-flash-preview-05-20")]
    GeminiFlash,
}

impl ChatModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeminiPro => "google/gemini-2.5-pro-preview",
            Self::GeminiFlash => "google/gemini-2.5-flash-preview-05-20",
        }
    }
}

/// LLM chat completion provider.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], model: ChatModel) -> Result<String>;
}

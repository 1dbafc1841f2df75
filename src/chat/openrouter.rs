use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatModel, ChatProvider};
use crate::error::{AppError, Result};
use crate::Config;

/// OpenRouter chat completion client.
pub struct OpenRouterChat {
    client: Client,
    url: String,
    api_key: String,
}

impl OpenRouterChat {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::provider("openrouter", e))?;
        Ok(Self {
            client,
            url: config.openrouter_url.clone(),
            api_key: config.openrouter_api_key.clone(),
        })
    }

    pub(crate) async fn complete_raw(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String> {
        let request = CompletionRequest {
            messages,
            model,
            top_p: 0.95,
            temperature: 0.9,
        };
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::provider("openrouter", e))?;

        if response.status() != 200 {
            return Err(AppError::provider(
                "openrouter",
                format!(
                    "status {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            ));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::provider("openrouter", e))?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::provider("openrouter", "empty choices in response"))?;
        Ok(choice.message.content)
    }
}

#[async_trait]
impl ChatProvider for OpenRouterChat {
    async fn complete(&self, messages: &[ChatMessage], model: ChatModel) -> Result<String> {
        self.complete_raw(messages, model.as_str()).await
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
    top_p: f64,
    temperature: f64,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blob::{BlobStore, ChunkKey};
use crate::chat::{ChatMessage, ChatModel, ChatProvider, Role};
use crate::db::{Character, ChunkKind, DocumentStore};
use crate::error::{AppError, Result};
use crate::media::to_data_url;
use crate::speech::SpeechProvider;

/// One prior turn of the conversation, as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryMessage {
    pub role: HistoryRole,
    pub content: String,
}

/// History turns may only be user or assistant; system turns are always built
/// server-side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub document_id: i32,
    pub chunk_id: i32,
    pub character_id: i32,
    /// JSON-encoded list of [`HistoryMessage`], validated eagerly.
    pub messages_history: String,
    pub new_message_text: Option<String>,
    pub new_message_speech: Option<Vec<u8>>,
    pub model: ChatModel,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub text: String,
    /// mp3 audio as a data URL, present iff the character has a voice.
    pub speech: Option<String>,
    /// The user text the model actually saw: the transcription when speech was
    /// supplied, otherwise the caller's text.
    pub input_user_text: Option<String>,
}

/// Parse and validate the caller-supplied history. Rejects non-JSON payloads
/// and aggregates all malformed entries into one error.
pub fn parse_history(raw: &str) -> Result<Vec<HistoryMessage>> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|_| AppError::invalid_input("Invalid JSON format for messages_history"))?;
    let entries = value
        .as_array()
        .ok_or_else(|| AppError::invalid_input("Invalid message format in messages_history"))?;

    let mut messages = Vec::with_capacity(entries.len());
    let mut bad_entries = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<HistoryMessage>(entry.clone()) {
            Ok(message) => messages.push(message),
            Err(_) => bad_entries.push(index.to_string()),
        }
    }
    if !bad_entries.is_empty() {
        return Err(AppError::invalid_input(format!(
            "Invalid message format in messages_history (entries {})",
            bad_entries.join(", ")
        )));
    }
    Ok(messages)
}

/// Assembles a model-ready conversation around one chunk and one character,
/// invokes the LLM and, for voiced characters, the TTS provider.
pub struct ChatOrchestrator {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    chat: Arc<dyn ChatProvider>,
    speech: Arc<dyn SpeechProvider>,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        chat: Arc<dyn ChatProvider>,
        speech: Arc<dyn SpeechProvider>,
    ) -> Self {
        Self {
            store,
            blobs,
            chat,
            speech,
        }
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let character = self
            .store
            .get_character(request.character_id)
            .await?
            .ok_or_else(|| AppError::not_found("Character not found"))?;
        self.store
            .get_document(request.document_id)
            .await?
            .ok_or_else(|| AppError::not_found("Document not found"))?;
        let chunk = self
            .store
            .get_chunk(request.chunk_id)
            .await?
            .filter(|chunk| chunk.document_id == request.document_id)
            .ok_or_else(|| AppError::not_found("Chunk not found"))?;

        let history = parse_history(&request.messages_history)?;

        let key = ChunkKey::new(request.document_id, chunk.id, chunk.kind);
        let blob = self.blobs.get(key).await?;
        let chunk_content = match chunk.kind {
            ChunkKind::Text => String::from_utf8(blob)
                .map_err(|e| AppError::Storage(format!("chunk {key} is not UTF-8: {e}")))?,
            ChunkKind::Image => to_data_url(&blob, "image/jpeg"),
        };

        // When speech is supplied its transcription is the authoritative user
        // text, not whatever text the caller sent alongside.
        let input_user_text = match &request.new_message_speech {
            Some(audio) => Some(self.speech.transcribe(audio).await?),
            None => request.new_message_text.clone(),
        };

        let messages = build_messages(
            &character,
            chunk.kind,
            &chunk_content,
            &history,
            input_user_text.as_deref(),
        );
        let text = self.chat.complete(&messages, request.model).await?;

        let speech = match character.voice_name {
            Some(voice) => {
                let audio = self.speech.synthesize(&text, voice).await?;
                Some(to_data_url(&audio, "audio/mp3"))
            }
            None => None,
        };

        Ok(ChatResponse {
            text,
            speech,
            input_user_text,
        })
    }
}

fn build_messages(
    character: &Character,
    kind: ChunkKind,
    chunk_content: &str,
    history: &[HistoryMessage],
    input_user_text: Option<&str>,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(format!(
        "This is your character's description: {}\n\n\
         Answer from the character's perspective only. Also return text without \
         formatting. Your response will be converted to character's voice.",
        character.prompt_description
    ))];

    match kind {
        ChunkKind::Text => messages.push(ChatMessage::system(format!(
            "You are discussing the following text content: {chunk_content}"
        ))),
        ChunkKind::Image => messages.push(ChatMessage::system_with_image(
            "You are discussing the following image:".to_string(),
            chunk_content.to_string(),
        )),
    }

    for message in history {
        let role = match message.role {
            HistoryRole::User => Role::User,
            HistoryRole::Assistant => Role::Assistant,
        };
        messages.push(ChatMessage::new(role, message.content.clone()));
    }

    if let Some(text) = input_user_text {
        if !text.is_empty() {
            messages.push(ChatMessage::user(text.to_string()));
        }
    }

    messages
}

//! In-memory fakes for the injected service traits. Test-only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::blob::{BlobStore, ChunkKey};
use crate::chat::{ChatMessage, ChatModel, ChatProvider};
use crate::chunking::ChunkSplitter;
use crate::db::{Character, Chunk, ChunkKind, Document, DocumentStore, VoiceName};
use crate::error::{AppError, Result};
use crate::ocr::{FileKind, OcrOutput, OcrProvider, Page};
use crate::speech::SpeechProvider;

#[derive(Default)]
struct MemoryTables {
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
    characters: Vec<Character>,
    next_document_id: i32,
    next_chunk_id: i32,
    next_character_id: i32,
}

/// In-memory [`DocumentStore`] with autoincrement ids, like the real schema.
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(MemoryTables::default()),
        }
    }

    pub fn is_empty(&self) -> bool {
        let tables = self.tables.lock().unwrap();
        tables.documents.is_empty() && tables.chunks.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document_with_chunks(
        &self,
        name: &str,
        kinds: &[ChunkKind],
    ) -> Result<(Document, Vec<Chunk>)> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_document_id += 1;
        let document = Document {
            id: tables.next_document_id,
            name: name.to_string(),
            created_at: chrono::Utc::now(),
        };
        tables.documents.push(document.clone());

        let mut chunks = Vec::with_capacity(kinds.len());
        for kind in kinds {
            tables.next_chunk_id += 1;
            let chunk = Chunk {
                id: tables.next_chunk_id,
                kind: *kind,
                document_id: document.id,
                completed: false,
            };
            tables.chunks.push(chunk.clone());
            chunks.push(chunk);
        }
        Ok((document, chunks))
    }

    async fn get_document(&self, id: i32) -> Result<Option<Document>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self.tables.lock().unwrap().documents.clone())
    }

    async fn delete_document(&self, id: i32) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.chunks.retain(|c| c.document_id != id);
        tables.documents.retain(|d| d.id != id);
        Ok(())
    }

    async fn get_chunk(&self, id: i32) -> Result<Option<Chunk>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.chunks.iter().find(|c| c.id == id).cloned())
    }

    async fn chunks_for_document(&self, document_id: i32) -> Result<Vec<Chunk>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn set_chunk_completed(
        &self,
        document_id: i32,
        chunk_id: i32,
        completed: bool,
    ) -> Result<Chunk> {
        let mut tables = self.tables.lock().unwrap();
        let chunk = tables
            .chunks
            .iter_mut()
            .find(|c| c.id == chunk_id && c.document_id == document_id)
            .ok_or_else(|| AppError::not_found("Chunk not found"))?;
        chunk.completed = completed;
        Ok(chunk.clone())
    }

    async fn create_character(
        &self,
        name: &str,
        prompt_description: &str,
        voice_name: Option<VoiceName>,
    ) -> Result<Character> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_character_id += 1;
        let character = Character {
            id: tables.next_character_id,
            name: name.to_string(),
            prompt_description: prompt_description.to_string(),
            voice_name,
        };
        tables.characters.push(character.clone());
        Ok(character)
    }

    async fn get_character(&self, id: i32) -> Result<Option<Character>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.characters.iter().find(|c| c.id == id).cloned())
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        Ok(self.tables.lock().unwrap().characters.clone())
    }

    async fn delete_character(&self, id: i32) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.characters.len();
        tables.characters.retain(|c| c.id != id);
        if tables.characters.len() == before {
            return Err(AppError::not_found("Character not found"));
        }
        Ok(())
    }
}

/// In-memory [`BlobStore`], optionally scripted to fail puts or deletes.
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_put_after: Option<usize>,
    puts: AtomicUsize,
    fail_deletes: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            fail_put_after: None,
            puts: AtomicUsize::new(0),
            fail_deletes: false,
        }
    }

    /// Accept the first `successes` puts, then fail every later one.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_put_after: Some(successes),
            ..Self::new()
        }
    }

    /// Every delete fails with a non-NotFound storage error.
    pub fn with_failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::new()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: ChunkKey) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(&key.to_string())
            .cloned()
            .ok_or_else(|| AppError::not_found("Chunk file not found"))
    }

    async fn put(&self, key: ChunkKey, bytes: Vec<u8>) -> Result<()> {
        let done = self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_put_after {
            if done >= limit {
                return Err(AppError::Storage(format!("scripted put failure at {key}")));
            }
        }
        self.blobs.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: ChunkKey) -> Result<()> {
        if self.fail_deletes {
            return Err(AppError::Storage("scripted delete failure".to_string()));
        }
        self.blobs
            .lock()
            .unwrap()
            .remove(&key.to_string())
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("No blob at {key}")))
    }
}

/// OCR fake: maps input file bytes to a fixed [`OcrOutput`], so concurrent
/// calls stay deterministic regardless of completion order.
pub struct ScriptedOcr {
    outputs: HashMap<Vec<u8>, OcrOutput>,
    fail: bool,
}

impl ScriptedOcr {
    pub fn new(outputs: Vec<(Vec<u8>, OcrOutput)>) -> Self {
        Self {
            outputs: outputs.into_iter().collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            outputs: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl OcrProvider for ScriptedOcr {
    async fn ocr(&self, file: &[u8], _kind: FileKind) -> Result<OcrOutput> {
        if self.fail {
            return Err(AppError::provider("mistral", "scripted OCR failure"));
        }
        self.outputs
            .get(file)
            .cloned()
            .ok_or_else(|| AppError::provider("mistral", "no scripted output for file"))
    }
}

/// Splitter fake keyed by page markdown.
pub struct ScriptedSplitter {
    chunks: HashMap<String, Vec<String>>,
}

impl ScriptedSplitter {
    pub fn new(pages: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            chunks: pages
                .into_iter()
                .map(|(markdown, chunks)| {
                    (
                        markdown.to_string(),
                        chunks.into_iter().map(str::to_string).collect(),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ChunkSplitter for ScriptedSplitter {
    async fn split_page(&self, page: &Page) -> Result<Vec<String>> {
        self.chunks
            .get(&page.markdown)
            .cloned()
            .ok_or_else(|| AppError::provider("splitter", "no scripted chunks for page"))
    }
}

/// Chat fake returning a fixed reply and recording every call.
pub struct ScriptedChat {
    reply: String,
    calls: Mutex<Vec<(Vec<ChatMessage>, ChatModel)>>,
}

impl ScriptedChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<ChatMessage>, ChatModel)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn complete(&self, messages: &[ChatMessage], model: ChatModel) -> Result<String> {
        self.calls.lock().unwrap().push((messages.to_vec(), model));
        Ok(self.reply.clone())
    }
}

/// Speech fake with fixed synthesis bytes and transcription text.
pub struct ScriptedSpeech {
    audio: Vec<u8>,
    transcript: String,
    synthesized: Mutex<Vec<(String, VoiceName)>>,
}

impl ScriptedSpeech {
    pub fn new(audio: &[u8], transcript: &str) -> Self {
        Self {
            audio: audio.to_vec(),
            transcript: transcript.to_string(),
            synthesized: Mutex::new(Vec::new()),
        }
    }

    pub fn synthesized(&self) -> Vec<(String, VoiceName)> {
        self.synthesized.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechProvider for ScriptedSpeech {
    async fn synthesize(&self, text: &str, voice: VoiceName) -> Result<Vec<u8>> {
        self.synthesized
            .lock()
            .unwrap()
            .push((text.to_string(), voice));
        Ok(self.audio.clone())
    }

    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Ok(self.transcript.clone())
    }
}

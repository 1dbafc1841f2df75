use async_trait::async_trait;
use deadpool_postgres::{Manager, Pool};
use tokio_postgres::Config as PgConfig;

use crate::error::Result;
use crate::Config;

pub mod models;
pub mod postgres;

pub use models::{Character, Chunk, ChunkKind, Document, VoiceName};
pub use postgres::PostgresStore;

pub async fn create_pool(config: &Config) -> Result<Pool> {
    let mut cfg = PgConfig::new();
    cfg.host(&config.db_host);
    cfg.user(&config.db_user);
    cfg.password(&config.db_password);
    cfg.dbname(&config.db_name);

    let mgr = Manager::new(cfg, tokio_postgres::NoTls);
    let pool = Pool::builder(mgr)
        .max_size(16)
        .build()
        .map_err(|e| crate::error::AppError::Storage(e.to_string()))?;
    Ok(pool)
}

/// Relational persistence for documents, chunks and characters.
///
/// Injected as a trait object so tests can substitute an in-memory store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert the document row and one chunk row per item, in input order,
    /// inside a single transaction. Chunk ids are assigned in insertion order,
    /// which is the display order.
    async fn create_document_with_chunks(
        &self,
        name: &str,
        kinds: &[ChunkKind],
    ) -> Result<(Document, Vec<Chunk>)>;

    async fn get_document(&self, id: i32) -> Result<Option<Document>>;
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Delete all chunk rows and then the document row. Blob cleanup is the
    /// caller's concern.
    async fn delete_document(&self, id: i32) -> Result<()>;

    async fn get_chunk(&self, id: i32) -> Result<Option<Chunk>>;
    async fn chunks_for_document(&self, document_id: i32) -> Result<Vec<Chunk>>;

    /// Set the `completed` flag. Fails NotFound when the chunk does not exist
    /// or belongs to a different document; a foreign chunk is indistinguishable
    /// from a missing one.
    async fn set_chunk_completed(
        &self,
        document_id: i32,
        chunk_id: i32,
        completed: bool,
    ) -> Result<Chunk>;

    async fn create_character(
        &self,
        name: &str,
        prompt_description: &str,
        voice_name: Option<VoiceName>,
    ) -> Result<Character>;
    async fn get_character(&self, id: i32) -> Result<Option<Character>>;
    async fn list_characters(&self) -> Result<Vec<Character>>;
    async fn delete_character(&self, id: i32) -> Result<()>;
}

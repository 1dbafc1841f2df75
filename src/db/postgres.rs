use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use super::models::{Character, Chunk, ChunkKind, Document, VoiceName};
use super::DocumentStore;
use crate::error::{AppError, Result};

/// Postgres-backed implementation of [`DocumentStore`].
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the tables when they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS document (
                    id SERIAL PRIMARY KEY,
                    name TEXT NOT NULL,
                    created_at TIMESTAMP NOT NULL DEFAULT now()
                );
                CREATE TABLE IF NOT EXISTS chunk (
                    id SERIAL PRIMARY KEY,
                    type TEXT NOT NULL,
                    document_id INTEGER NOT NULL REFERENCES document(id),
                    completed BOOLEAN NOT NULL DEFAULT FALSE
                );
                CREATE TABLE IF NOT EXISTS \"character\" (
                    id SERIAL PRIMARY KEY,
                    name TEXT NOT NULL,
                    prompt_description TEXT NOT NULL,
                    voice_name TEXT
                );",
            )
            .await?;
        Ok(())
    }
}

fn document_from_row(row: &Row) -> Result<Document> {
    Ok(Document {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row
            .try_get::<_, chrono::NaiveDateTime>("created_at")?
            .and_utc(),
    })
}

fn chunk_from_row(row: &Row) -> Result<Chunk> {
    Ok(Chunk {
        id: row.get("id"),
        kind: ChunkKind::from_str(row.get("type"))?,
        document_id: row.get("document_id"),
        completed: row.get("completed"),
    })
}

fn character_from_row(row: &Row) -> Result<Character> {
    let voice_name = row
        .get::<_, Option<String>>("voice_name")
        .map(|v| VoiceName::from_str(&v))
        .transpose()?;
    Ok(Character {
        id: row.get("id"),
        name: row.get("name"),
        prompt_description: row.get("prompt_description"),
        voice_name,
    })
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn create_document_with_chunks(
        &self,
        name: &str,
        kinds: &[ChunkKind],
    ) -> Result<(Document, Vec<Chunk>)> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let stmt = tx
            .prepare("INSERT INTO document (name) VALUES ($1) RETURNING *")
            .await?;
        let row = tx.query_one(&stmt, &[&name]).await?;
        let document = document_from_row(&row)?;

        let stmt = tx
            .prepare(
                "INSERT INTO chunk (type, document_id, completed)
                 VALUES ($1, $2, FALSE) RETURNING *",
            )
            .await?;
        let mut chunks = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let row = tx.query_one(&stmt, &[&kind.as_str(), &document.id]).await?;
            chunks.push(chunk_from_row(&row)?);
        }

        tx.commit().await?;
        Ok((document, chunks))
    }

    async fn get_document(&self, id: i32) -> Result<Option<Document>> {
        let client = self.pool.get().await?;
        let stmt = client.prepare("SELECT * FROM document WHERE id = $1").await?;
        match client.query_opt(&stmt, &[&id]).await? {
            Some(row) => Ok(Some(document_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let client = self.pool.get().await?;
        let stmt = client.prepare("SELECT * FROM document ORDER BY id").await?;
        let rows = client.query(&stmt, &[]).await?;
        rows.iter().map(document_from_row).collect()
    }

    async fn delete_document(&self, id: i32) -> Result<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare("DELETE FROM chunk WHERE document_id = $1")
            .await?;
        tx.execute(&stmt, &[&id]).await?;
        let stmt = tx.prepare("DELETE FROM document WHERE id = $1").await?;
        tx.execute(&stmt, &[&id]).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_chunk(&self, id: i32) -> Result<Option<Chunk>> {
        let client = self.pool.get().await?;
        let stmt = client.prepare("SELECT * FROM chunk WHERE id = $1").await?;
        match client.query_opt(&stmt, &[&id]).await? {
            Some(row) => Ok(Some(chunk_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn chunks_for_document(&self, document_id: i32) -> Result<Vec<Chunk>> {
        let client = self.pool.get().await?;
        let stmt = client
            .prepare("SELECT * FROM chunk WHERE document_id = $1 ORDER BY id")
            .await?;
        let rows = client.query(&stmt, &[&document_id]).await?;
        rows.iter().map(chunk_from_row).collect()
    }

    async fn set_chunk_completed(
        &self,
        document_id: i32,
        chunk_id: i32,
        completed: bool,
    ) -> Result<Chunk> {
        let client = self.pool.get().await?;
        let stmt = client
            .prepare(
                "UPDATE chunk SET completed = $1
                 WHERE id = $2 AND document_id = $3 RETURNING *",
            )
            .await?;
        match client
            .query_opt(&stmt, &[&completed, &chunk_id, &document_id])
            .await?
        {
            Some(row) => chunk_from_row(&row),
            None => Err(AppError::not_found("Chunk not found")),
        }
    }

    async fn create_character(
        &self,
        name: &str,
        prompt_description: &str,
        voice_name: Option<VoiceName>,
    ) -> Result<Character> {
        let client = self.pool.get().await?;
        let stmt = client
            .prepare(
                "INSERT INTO \"character\" (name, prompt_description, voice_name)
                 VALUES ($1, $2, $3) RETURNING *",
            )
            .await?;
        let voice = voice_name.map(|v| v.as_str());
        let row = client
            .query_one(&stmt, &[&name, &prompt_description, &voice])
            .await?;
        character_from_row(&row)
    }

    async fn get_character(&self, id: i32) -> Result<Option<Character>> {
        let client = self.pool.get().await?;
        let stmt = client
            .prepare("SELECT * FROM \"character\" WHERE id = $1")
            .await?;
        match client.query_opt(&stmt, &[&id]).await? {
            Some(row) => Ok(Some(character_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_characters(&self) -> Result<Vec<Character>> {
        let client = self.pool.get().await?;
        let stmt = client
            .prepare("SELECT * FROM \"character\" ORDER BY id")
            .await?;
        let rows = client.query(&stmt, &[]).await?;
        rows.iter().map(character_from_row).collect()
    }

    async fn delete_character(&self, id: i32) -> Result<()> {
        let client = self.pool.get().await?;
        let stmt = client
            .prepare("DELETE FROM \"character\" WHERE id = $1")
            .await?;
        let deleted = client.execute(&stmt, &[&id]).await?;
        if deleted == 0 {
            return Err(AppError::not_found("Character not found"));
        }
        Ok(())
    }
}

use std::sync::Arc;

use futures::future::try_join_all;
use log::{info, warn};

use crate::blob::{BlobStore, ChunkKey};
use crate::chunking::{split_document, ChunkSplitter};
use crate::db::{Chunk, ChunkKind, Document, DocumentStore};
use crate::error::{AppError, Result};
use crate::media::decode_data_url;
use crate::ocr::{FileKind, OcrProvider};

/// One uploaded file as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Classify an upload by declared content type, falling back to the filename
/// extension. Anything that is neither a PDF nor a JPEG/PNG image is rejected.
fn detect_kind(file: &UploadedFile) -> Result<FileKind> {
    let content_type = file.content_type.as_deref().unwrap_or("");
    let filename = file.filename.to_lowercase();

    if content_type.starts_with("application/pdf") || filename.ends_with(".pdf") {
        return Ok(FileKind::Pdf);
    }
    if content_type.starts_with("image/")
        || [".jpg", ".jpeg", ".png"]
            .iter()
            .any(|ext| filename.ends_with(ext))
    {
        return Ok(FileKind::Image);
    }
    Err(AppError::invalid_input(format!(
        "Unsupported file type: {}",
        file.filename
    )))
}

/// Orchestrates document ingestion and the document/chunk lifecycle:
/// validation, concurrent OCR, concurrent chunk-splitting, row persistence and
/// blob persistence, with cleanup when a blob write fails midway.
pub struct IngestionPipeline {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    ocr: Arc<dyn OcrProvider>,
    splitter: Arc<dyn ChunkSplitter>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        ocr: Arc<dyn OcrProvider>,
        splitter: Arc<dyn ChunkSplitter>,
    ) -> Self {
        Self {
            store,
            blobs,
            ocr,
            splitter,
        }
    }

    /// Ingest the uploaded files into a new document.
    ///
    /// Chunk ids are assigned in file-then-page-then-chunk order, which is the
    /// display order. No document survives a failed ingestion: provider
    /// failures abort before any row is written, and a blob-write failure
    /// removes the rows and blobs written so far before surfacing the error.
    pub async fn create_document(&self, files: &[UploadedFile], name: &str) -> Result<Document> {
        if files.is_empty() {
            return Err(AppError::invalid_input("No files provided"));
        }
        let kinds = files.iter().map(detect_kind).collect::<Result<Vec<_>>>()?;

        // OCR every file concurrently; try_join_all keeps result i paired with
        // file i regardless of completion order, and fails fast.
        let ocr_outputs = try_join_all(
            files
                .iter()
                .zip(&kinds)
                .map(|(file, kind)| self.ocr.ocr(&file.bytes, *kind)),
        )
        .await?;

        let per_file_chunks = try_join_all(
            ocr_outputs
                .iter()
                .map(|output| split_document(self.splitter.as_ref(), output)),
        )
        .await?;

        let contents: Vec<String> = per_file_chunks.into_iter().flatten().collect();
        let chunk_kinds: Vec<ChunkKind> = contents
            .iter()
            .map(|content| ChunkKind::classify(content))
            .collect();

        let (document, chunks) = self
            .store
            .create_document_with_chunks(name, &chunk_kinds)
            .await?;
        info!(
            "document {} created with {} chunks, storing blobs",
            document.id,
            chunks.len()
        );

        if let Err(err) = self.store_chunk_blobs(document.id, &chunks, &contents).await {
            self.rollback_document(document.id, &chunks).await;
            return Err(err);
        }

        Ok(document)
    }

    async fn store_chunk_blobs(
        &self,
        document_id: i32,
        chunks: &[Chunk],
        contents: &[String],
    ) -> Result<()> {
        for (chunk, content) in chunks.iter().zip(contents) {
            let key = ChunkKey::new(document_id, chunk.id, chunk.kind);
            let bytes = match chunk.kind {
                ChunkKind::Image => decode_data_url(content)?,
                ChunkKind::Text => content.clone().into_bytes(),
            };
            self.blobs.put(key, bytes).await?;
        }
        Ok(())
    }

    /// Remove the rows and any blobs written for a document whose ingestion
    /// failed partway. Cleanup is best-effort: the error that triggered it is
    /// what the caller sees.
    async fn rollback_document(&self, document_id: i32, chunks: &[Chunk]) {
        for chunk in chunks {
            let key = ChunkKey::new(document_id, chunk.id, chunk.kind);
            match self.blobs.delete(key).await {
                Ok(()) | Err(AppError::NotFound(_)) => {}
                Err(err) => warn!("rollback: failed to delete blob {key}: {err}"),
            }
        }
        if let Err(err) = self.store.delete_document(document_id).await {
            warn!("rollback: failed to delete rows for document {document_id}: {err}");
        }
    }

    pub async fn get_document(&self, id: i32) -> Result<(Document, Vec<Chunk>)> {
        let document = self
            .store
            .get_document(id)
            .await?
            .ok_or_else(|| AppError::not_found("Document not found"))?;
        let chunks = self.store.chunks_for_document(id).await?;
        Ok((document, chunks))
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        self.store.list_documents().await
    }

    /// Delete a document, its chunks and their blobs.
    ///
    /// Blob deletion is best-effort: a missing blob is normal (it may never
    /// have been written) and any other blob-store error is logged and
    /// skipped, so the rows always go away.
    pub async fn delete_document(&self, id: i32) -> Result<()> {
        self.store
            .get_document(id)
            .await?
            .ok_or_else(|| AppError::not_found("Document not found"))?;

        let chunks = self.store.chunks_for_document(id).await?;
        for chunk in &chunks {
            let key = ChunkKey::new(id, chunk.id, chunk.kind);
            match self.blobs.delete(key).await {
                Ok(()) | Err(AppError::NotFound(_)) => {}
                Err(err) => warn!("ignoring blob delete failure for {key}: {err}"),
            }
        }

        self.store.delete_document(id).await
    }

    /// Flip a chunk's `completed` flag. The chunk must belong to the given
    /// document; a chunk of another document reads as missing.
    pub async fn update_chunk(
        &self,
        document_id: i32,
        chunk_id: i32,
        completed: bool,
    ) -> Result<Chunk> {
        self.store
            .get_document(document_id)
            .await?
            .ok_or_else(|| AppError::not_found("Document not found"))?;
        self.store
            .set_chunk_completed(document_id, chunk_id, completed)
            .await
    }
}

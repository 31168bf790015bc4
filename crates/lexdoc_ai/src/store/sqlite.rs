use std::path::Path;

use lexdoc_core::db;
use lexdoc_core::domain::Chunk;
use lexdoc_core::error::AppError;
use lexdoc_core::repo;
use parking_lot::Mutex;
use rusqlite::Connection;

use super::{
    score_chunks, validate_chunk_set, EmbeddingStore, SearchResult, VectorQuery,
    FALLBACK_SIMILARITY,
};

/// Chunks in the `document_chunks` table; vectors are JSON arrays compared in-process.
pub struct SqliteEmbeddingStore {
    conn: Mutex<Connection>,
}

impl SqliteEmbeddingStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        Ok(Self {
            conn: Mutex::new(db::open_and_migrate(path)?),
        })
    }

    pub fn in_memory() -> Result<Self, AppError> {
        Self::from_connection(db::open_in_memory()?)
    }

    pub fn from_connection(mut conn: Connection) -> Result<Self, AppError> {
        db::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` against the underlying connection (artifact cache, diagnostics).
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let conn = self.conn.lock();
        f(&*conn)
    }
}

impl std::fmt::Debug for SqliteEmbeddingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEmbeddingStore").finish_non_exhaustive()
    }
}

impl EmbeddingStore for SqliteEmbeddingStore {
    fn replace_chunks(&self, document_id: &str, chunks: Vec<Chunk>) -> Result<(), AppError> {
        validate_chunk_set(document_id, &chunks)?;
        let mut conn = self.conn.lock();
        repo::replace_document_chunks(&mut conn, document_id, &chunks)
    }

    fn delete_chunks(&self, document_id: &str) -> Result<usize, AppError> {
        let conn = self.conn.lock();
        repo::delete_document_chunks(&conn, document_id)
    }

    fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>, AppError> {
        let conn = self.conn.lock();
        repo::list_document_chunks(&conn, document_id)
    }

    fn vector_search(&self, query: &VectorQuery<'_>) -> Result<Vec<SearchResult>, AppError> {
        let chunks = {
            let conn = self.conn.lock();
            repo::list_chunks(&conn, query.document_ids).map_err(|e| {
                AppError::new("AI_RETRIEVAL_FAILED", "Failed to load stored vectors")
                    .with_details(e.to_string())
            })?
        };
        score_chunks(chunks.iter(), query)
    }

    fn text_search(
        &self,
        needle: &str,
        document_ids: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        let rows = {
            let conn = self.conn.lock();
            repo::search_chunk_text(&conn, needle, document_ids, limit)?
        };
        Ok(rows
            .into_iter()
            .map(|r| SearchResult {
                document_id: r.document_id,
                chunk_index: r.chunk_index,
                content: r.content,
                similarity: FALLBACK_SIMILARITY,
                metadata: r.metadata,
            })
            .collect())
    }
}

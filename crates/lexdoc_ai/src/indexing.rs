//! Write path: chunk a document, embed every chunk, replace the stored set.

use std::sync::Arc;

use lexdoc_core::domain::{Chunk, ChunkMetadata, DocumentContent};
use lexdoc_core::error::AppError;
use lexdoc_core::normalize::sha256_hex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chunking::chunk_with_config;
use crate::config::{ChunkingConfig, IndexingConfig};
use crate::embeddings::EmbeddingService;
use crate::store::EmbeddingStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexReport {
    pub document_id: String,
    /// Chunks produced by the chunker.
    pub chunks_total: u32,
    pub chunks_indexed: u32,
    pub chunks_skipped: u32,
    pub model: Option<String>,
    pub dims: Option<u32>,
}

pub struct Indexer {
    store: Arc<dyn EmbeddingStore>,
    embedder: EmbeddingService,
    chunking: ChunkingConfig,
    pool: rayon::ThreadPool,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn EmbeddingStore>,
        embedder: EmbeddingService,
        chunking: ChunkingConfig,
        indexing: &IndexingConfig,
    ) -> Result<Self, AppError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(indexing.embed_concurrency.max(1))
            .thread_name(|i| format!("lexdoc-embed-{i}"))
            .build()
            .map_err(|e| {
                AppError::new("AI_INDEX_FAILED", "Failed to start embedding worker pool")
                    .with_details(e.to_string())
            })?;
        Ok(Self {
            store,
            embedder,
            chunking,
            pool,
        })
    }

    /// Chunk, embed and store `content`, replacing any previous chunks.
    ///
    /// A chunk whose embedding fails is logged and skipped; the survivors are
    /// renumbered from 0. When not a single chunk could be embedded the stored
    /// set is left untouched and the last embedding error is returned.
    pub fn index_document(&self, content: &DocumentContent) -> Result<IndexReport, AppError> {
        let document_id = content.document_id.as_str();
        if content.is_blank() {
            return Err(AppError::new(
                "AI_INDEX_NO_CONTENT",
                "Document has no text content to index",
            )
            .with_details(format!("document_id={document_id}")));
        }
        if !self.embedder.is_configured() {
            return Err(AppError::new(
                "AI_EMBEDDING_UNCONFIGURED",
                "No embedding provider is configured",
            )
            .with_details(format!("document_id={document_id}")));
        }

        let pieces = chunk_with_config(&content.raw_text, &self.chunking);
        if pieces.is_empty() {
            return Err(AppError::new(
                "AI_INDEX_NO_CONTENT",
                "Document has no sentences to index",
            )
            .with_details(format!("document_id={document_id}")));
        }
        let chunks_total = pieces.len() as u32;
        tracing::debug!(document_id, chunks = chunks_total, "embedding document chunks");

        // Indexed collect keeps chunker order regardless of completion order.
        let embedded: Vec<_> = self.pool.install(|| {
            pieces
                .par_iter()
                .enumerate()
                .map(|(ordinal, text)| (ordinal, self.embedder.embed(text)))
                .collect()
        });

        let mut chunks: Vec<Chunk> = Vec::with_capacity(pieces.len());
        let mut model: Option<String> = None;
        let mut dims: Option<usize> = None;
        let mut last_error: Option<AppError> = None;

        for (ordinal, result) in embedded {
            let emb = match result {
                Ok(emb) => emb,
                Err(e) => {
                    tracing::warn!(document_id, chunk_index = ordinal, error = %e, "skipping chunk: embedding failed");
                    last_error = Some(e);
                    continue;
                }
            };
            if let Some(d) = dims {
                if emb.vector.len() != d {
                    tracing::warn!(
                        document_id,
                        chunk_index = ordinal,
                        expected = d,
                        got = emb.vector.len(),
                        "skipping chunk: embedding dims changed mid-document"
                    );
                    continue;
                }
            }
            dims.get_or_insert(emb.vector.len());
            model.get_or_insert_with(|| emb.model.clone());

            let text = &pieces[ordinal];
            chunks.push(Chunk {
                document_id: document_id.to_string(),
                chunk_index: chunks.len() as u32,
                text: text.clone(),
                embedding: emb.vector,
                metadata: ChunkMetadata {
                    char_count: text.chars().count() as u32,
                    text_sha256: sha256_hex(text.as_bytes()),
                    embedding_model: Some(emb.model),
                    source_ordinal: Some(ordinal as u32),
                },
            });
        }

        if chunks.is_empty() {
            if let Some(e) = last_error {
                return Err(AppError::new(
                    "AI_EMBEDDING_FAILED",
                    "No chunk of the document could be embedded",
                )
                .with_details(format!("document_id={document_id}; last_error={e}"))
                .with_retryable(true));
            }
        }

        let chunks_indexed = chunks.len() as u32;
        self.store.replace_chunks(document_id, chunks)?;

        let report = IndexReport {
            document_id: document_id.to_string(),
            chunks_total,
            chunks_indexed,
            chunks_skipped: chunks_total - chunks_indexed,
            model,
            dims: dims.map(|d| d as u32),
        };
        if report.chunks_skipped > 0 {
            tracing::warn!(
                document_id,
                skipped = report.chunks_skipped,
                indexed = report.chunks_indexed,
                "document indexed partially"
            );
        } else {
            tracing::info!(document_id, indexed = report.chunks_indexed, "document indexed");
        }
        Ok(report)
    }

    /// Drop every stored chunk of a deleted document.
    pub fn remove_document(&self, document_id: &str) -> Result<usize, AppError> {
        let n = self.store.delete_chunks(document_id)?;
        tracing::info!(document_id, removed = n, "document chunks removed");
        Ok(n)
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("embedder", &self.embedder)
            .field("chunking", &self.chunking)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{Embedder, Embedding, EmbeddingUsage};
    use crate::store::InMemoryEmbeddingStore;

    struct LengthEmbedder;

    impl Embedder for LengthEmbedder {
        fn embed(&self, input: &str) -> Result<Embedding, AppError> {
            Ok(Embedding {
                vector: vec![input.len() as f32, 1.0],
                model: "len".to_string(),
                usage: EmbeddingUsage::default(),
            })
        }
    }

    fn indexer(store: Arc<InMemoryEmbeddingStore>, embedder: EmbeddingService) -> Indexer {
        Indexer::new(
            store,
            embedder,
            ChunkingConfig {
                chunk_size: 20,
                overlap: 5,
            },
            &IndexingConfig {
                embed_concurrency: 2,
            },
        )
        .expect("indexer")
    }

    #[test]
    fn blank_content_is_a_hard_error() {
        let store = Arc::new(InMemoryEmbeddingStore::new());
        let idx = indexer(store, EmbeddingService::new(Arc::new(LengthEmbedder), 100));
        let err = idx
            .index_document(&DocumentContent::new("d1", "  \n "))
            .unwrap_err();
        assert_eq!(err.code, "AI_INDEX_NO_CONTENT");
    }

    #[test]
    fn unconfigured_embedder_leaves_store_untouched() {
        let store = Arc::new(InMemoryEmbeddingStore::new());
        let idx = indexer(store.clone(), EmbeddingService::unconfigured());
        let err = idx
            .index_document(&DocumentContent::new("d1", "The cat sat."))
            .unwrap_err();
        assert_eq!(err.code, "AI_EMBEDDING_UNCONFIGURED");
        assert_eq!(store.document_count(), 0);
    }

    #[test]
    fn records_metadata_per_chunk() {
        let store = Arc::new(InMemoryEmbeddingStore::new());
        let idx = indexer(store.clone(), EmbeddingService::new(Arc::new(LengthEmbedder), 100));
        let report = idx
            .index_document(&DocumentContent::new(
                "d1",
                "The cat sat. The dog ran. The bird flew.",
            ))
            .expect("index");
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_indexed, 3);
        assert_eq!(report.model.as_deref(), Some("len"));
        assert_eq!(report.dims, Some(2));

        let chunks = store.get_chunks("d1").expect("chunks");
        assert_eq!(chunks[0].text, "The cat sat.");
        assert_eq!(chunks[0].metadata.char_count, 12);
        assert_eq!(chunks[0].metadata.source_ordinal, Some(0));
        assert_eq!(chunks[0].metadata.text_sha256, sha256_hex(b"The cat sat."));
    }
}

//! Persistence for embedded chunks and the similarity query contract.
//!
//! Backends implement the raw operations; [`EmbeddingStore::similarity_search`]
//! layers the ranking rules and the substring fallback on top so every
//! backend behaves the same way.

use std::cmp::Ordering;

use lexdoc_core::domain::{Chunk, ChunkMetadata};
use lexdoc_core::error::AppError;
use serde::{Deserialize, Serialize};

mod memory;
pub mod similarity;
mod sqlite;

pub use memory::InMemoryEmbeddingStore;
pub use sqlite::SqliteEmbeddingStore;

/// Similarity reported for every substring-fallback match.
pub const FALLBACK_SIMILARITY: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub document_id: String,
    pub chunk_index: u32,
    pub content: String,
    /// In `[0, 1]`.
    pub similarity: f32,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Vector,
    TextFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOutcome {
    pub mode: SearchMode,
    pub results: Vec<SearchResult>,
}

/// Nearest-neighbour query handed to a backend.
#[derive(Debug, Clone, Copy)]
pub struct VectorQuery<'a> {
    pub vector: &'a [f32],
    /// When set, only chunks embedded by this model are compared.
    pub model: Option<&'a str>,
    /// Caller-filtered readable documents; `None` searches everything.
    pub document_ids: Option<&'a [String]>,
    pub limit: usize,
    pub threshold: f32,
}

/// Full similarity request: the vector (if one could be computed) plus the
/// original text for the substring fallback.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityQuery<'a> {
    pub text: &'a str,
    pub vector: Option<&'a [f32]>,
    pub model: Option<&'a str>,
    pub document_ids: Option<&'a [String]>,
    pub limit: usize,
    pub threshold: f32,
}

pub trait EmbeddingStore: Send + Sync {
    /// Drop every chunk of `document_id`, then store `chunks`; all or nothing.
    fn replace_chunks(&self, document_id: &str, chunks: Vec<Chunk>) -> Result<(), AppError>;

    fn delete_chunks(&self, document_id: &str) -> Result<usize, AppError>;

    /// Chunks of one document ordered by `chunk_index`.
    fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>, AppError>;

    /// Vector comparison. An error means the vector path is unavailable.
    fn vector_search(&self, query: &VectorQuery<'_>) -> Result<Vec<SearchResult>, AppError>;

    /// Case-insensitive substring match over stored chunk text.
    fn text_search(
        &self,
        needle: &str,
        document_ids: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, AppError>;

    /// Ranked similarity search with substring fallback.
    ///
    /// Vector results below `threshold` are dropped. When no vector is
    /// available or the vector path errors, every substring match is returned
    /// with similarity [`FALLBACK_SIMILARITY`], regardless of `threshold`.
    fn similarity_search(&self, query: &SimilarityQuery<'_>) -> Result<SearchOutcome, AppError> {
        if query.limit == 0 {
            return Ok(SearchOutcome {
                mode: SearchMode::Vector,
                results: Vec::new(),
            });
        }

        if let Some(vector) = query.vector {
            let vq = VectorQuery {
                vector,
                model: query.model,
                document_ids: query.document_ids,
                limit: query.limit,
                threshold: query.threshold,
            };
            match self.vector_search(&vq) {
                Ok(results) => {
                    return Ok(SearchOutcome {
                        mode: SearchMode::Vector,
                        results: rank_results(results, query.threshold, query.limit),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "vector search unavailable; falling back to text search");
                }
            }
        }

        let mut results = self.text_search(query.text, query.document_ids, query.limit)?;
        for r in results.iter_mut() {
            r.similarity = FALLBACK_SIMILARITY;
        }
        results.sort_by(|a, b| {
            a.chunk_index
                .cmp(&b.chunk_index)
                .then(a.document_id.cmp(&b.document_id))
        });
        results.truncate(query.limit);
        Ok(SearchOutcome {
            mode: SearchMode::TextFallback,
            results,
        })
    }
}

/// Keep results at or above `threshold`, best first, ties by chunk index, at most `limit`.
pub fn rank_results(mut results: Vec<SearchResult>, threshold: f32, limit: usize) -> Vec<SearchResult> {
    results.retain(|r| r.similarity >= threshold);
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then(a.chunk_index.cmp(&b.chunk_index))
            .then(a.document_id.cmp(&b.document_id))
    });
    results.truncate(limit);
    results
}

/// Score `chunks` against the query vector. Shared by the in-process backends.
pub(crate) fn score_chunks<'c>(
    chunks: impl IntoIterator<Item = &'c Chunk>,
    query: &VectorQuery<'_>,
) -> Result<Vec<SearchResult>, AppError> {
    let qnorm = similarity::l2_norm(query.vector);
    if qnorm == 0.0 || qnorm.is_nan() {
        return Err(AppError::new(
            "AI_RETRIEVAL_FAILED",
            "Query embedding norm is zero",
        ));
    }
    let dims = query.vector.len();

    let mut out = Vec::new();
    for c in chunks {
        if let Some(ids) = query.document_ids {
            if !ids.iter().any(|id| id == &c.document_id) {
                continue;
            }
        }
        if let (Some(want), Some(have)) = (query.model, c.metadata.embedding_model.as_deref()) {
            if want != have {
                continue;
            }
        }
        if c.embedding.len() != dims {
            return Err(AppError::new(
                "AI_RETRIEVAL_FAILED",
                "Stored vector dims do not match query dims",
            )
            .with_details(format!(
                "document_id={}; chunk_index={}; expected={dims}; got={}",
                c.document_id,
                c.chunk_index,
                c.embedding.len()
            )));
        }
        let vnorm = similarity::l2_norm(&c.embedding);
        if vnorm == 0.0 {
            continue;
        }
        out.push(SearchResult {
            document_id: c.document_id.clone(),
            chunk_index: c.chunk_index,
            content: c.text.clone(),
            similarity: similarity::unit_similarity(query.vector, &c.embedding, qnorm, vnorm),
            metadata: c.metadata.clone(),
        });
    }
    Ok(out)
}

/// Reject chunk sets that would break the per-document index invariant.
pub(crate) fn validate_chunk_set(document_id: &str, chunks: &[Chunk]) -> Result<(), AppError> {
    let mut indexes: Vec<u32> = Vec::with_capacity(chunks.len());
    for c in chunks {
        if c.document_id != document_id {
            return Err(AppError::new(
                "AI_INDEX_INVALID",
                "Chunk belongs to a different document",
            )
            .with_details(format!(
                "expected={document_id}; got={}",
                c.document_id
            )));
        }
        indexes.push(c.chunk_index);
    }
    indexes.sort_unstable();
    for (expected, got) in indexes.iter().enumerate() {
        if *got as usize != expected {
            return Err(AppError::new(
                "AI_INDEX_INVALID",
                "Chunk indexes must be unique and contiguous from 0",
            )
            .with_details(format!(
                "document_id={document_id}; expected={expected}; got={got}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn text_matches(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(doc: &str, idx: u32, sim: f32) -> SearchResult {
        SearchResult {
            document_id: doc.to_string(),
            chunk_index: idx,
            content: String::new(),
            similarity: sim,
            metadata: ChunkMetadata::default(),
        }
    }

    #[test]
    fn rank_orders_by_similarity_then_chunk_index() {
        let ranked = rank_results(
            vec![
                result("d", 3, 0.8),
                result("d", 1, 0.9),
                result("d", 0, 0.8),
                result("d", 2, 0.6),
            ],
            0.7,
            10,
        );
        let order: Vec<u32> = ranked.iter().map(|r| r.chunk_index).collect();
        assert_eq!(order, vec![1, 0, 3]);
    }

    #[test]
    fn rank_keeps_exact_threshold_and_truncates() {
        let ranked = rank_results(
            vec![result("d", 0, 0.7), result("d", 1, 0.7), result("d", 2, 0.69)],
            0.7,
            1,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].chunk_index, 0);
    }

    #[test]
    fn chunk_sets_must_be_contiguous() {
        let mk = |idx| Chunk {
            document_id: "d".to_string(),
            chunk_index: idx,
            text: String::new(),
            embedding: vec![],
            metadata: ChunkMetadata::default(),
        };
        assert!(validate_chunk_set("d", &[mk(1), mk(0)]).is_ok());
        assert!(validate_chunk_set("d", &[]).is_ok());
        assert_eq!(
            validate_chunk_set("d", &[mk(0), mk(2)]).unwrap_err().code,
            "AI_INDEX_INVALID"
        );
        assert!(validate_chunk_set("d", &[mk(0), mk(0)]).is_err());
        assert!(validate_chunk_set("other", &[mk(0)]).is_err());
    }
}

use std::collections::BTreeMap;

use lexdoc_core::domain::Chunk;
use lexdoc_core::error::AppError;
use parking_lot::RwLock;

use super::{
    score_chunks, text_matches, validate_chunk_set, EmbeddingStore, SearchResult, VectorQuery,
    FALLBACK_SIMILARITY,
};

/// Process-local store; used by tests and callers that keep their own persistence.
#[derive(Debug, Default)]
pub struct InMemoryEmbeddingStore {
    docs: RwLock<BTreeMap<String, Vec<Chunk>>>,
}

impl InMemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.docs.read().len()
    }
}

impl EmbeddingStore for InMemoryEmbeddingStore {
    fn replace_chunks(&self, document_id: &str, mut chunks: Vec<Chunk>) -> Result<(), AppError> {
        validate_chunk_set(document_id, &chunks)?;
        chunks.sort_by_key(|c| c.chunk_index);
        let mut docs = self.docs.write();
        if chunks.is_empty() {
            docs.remove(document_id);
        } else {
            docs.insert(document_id.to_string(), chunks);
        }
        Ok(())
    }

    fn delete_chunks(&self, document_id: &str) -> Result<usize, AppError> {
        Ok(self
            .docs
            .write()
            .remove(document_id)
            .map(|v| v.len())
            .unwrap_or(0))
    }

    fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>, AppError> {
        Ok(self
            .docs
            .read()
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }

    fn vector_search(&self, query: &VectorQuery<'_>) -> Result<Vec<SearchResult>, AppError> {
        let docs = self.docs.read();
        score_chunks(docs.values().flatten(), query)
    }

    fn text_search(
        &self,
        needle: &str,
        document_ids: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        let needle = needle.to_lowercase();
        let docs = self.docs.read();
        let mut out: Vec<SearchResult> = docs
            .iter()
            .filter(|(id, _)| document_ids.map_or(true, |ids| ids.iter().any(|x| x == *id)))
            .flat_map(|(_, chunks)| chunks.iter())
            .filter(|c| text_matches(&c.text, &needle))
            .map(|c| SearchResult {
                document_id: c.document_id.clone(),
                chunk_index: c.chunk_index,
                content: c.text.clone(),
                similarity: FALLBACK_SIMILARITY,
                metadata: c.metadata.clone(),
            })
            .collect();
        out.sort_by(|a, b| {
            a.chunk_index
                .cmp(&b.chunk_index)
                .then(a.document_id.cmp(&b.document_id))
        });
        out.truncate(limit);
        Ok(out)
    }
}

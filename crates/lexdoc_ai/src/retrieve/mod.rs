use std::sync::Arc;

use lexdoc_core::error::AppError;

use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingService;
use crate::store::{EmbeddingStore, SearchOutcome, SimilarityQuery};

/// Query text in, ranked chunks out.
///
/// One embedding call per query; ranking and the substring fallback live in
/// the store.
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn EmbeddingStore>,
    embedder: EmbeddingService,
    cfg: RetrievalConfig,
}

impl SearchEngine {
    pub fn new(
        store: Arc<dyn EmbeddingStore>,
        embedder: EmbeddingService,
        cfg: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            cfg,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.cfg
    }

    /// Search with the configured default limit and threshold.
    pub fn search_with_defaults(
        &self,
        query: &str,
        document_ids: Option<&[String]>,
    ) -> Result<SearchOutcome, AppError> {
        self.search(
            query,
            document_ids,
            self.cfg.default_limit,
            self.cfg.default_threshold,
        )
    }

    /// `document_ids` must already be restricted to what the caller may read.
    ///
    /// When the query cannot be embedded the store answers from its substring
    /// fallback instead of failing.
    pub fn search(
        &self,
        query: &str,
        document_ids: Option<&[String]>,
        limit: usize,
        threshold: f32,
    ) -> Result<SearchOutcome, AppError> {
        let q = query.trim();
        if q.is_empty() {
            return Err(AppError::new("AI_QUERY_INVALID", "Query must not be empty"));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(
                AppError::new("AI_QUERY_INVALID", "Threshold must be within [0, 1]")
                    .with_details(format!("threshold={threshold}")),
            );
        }

        let embedding = match self.embedder.embed(q) {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed; using text search");
                None
            }
        };

        let outcome = self.store.similarity_search(&SimilarityQuery {
            text: q,
            vector: embedding.as_ref().map(|e| e.vector.as_slice()),
            model: embedding.as_ref().map(|e| e.model.as_str()),
            document_ids,
            limit,
            threshold,
        })?;
        tracing::debug!(
            mode = ?outcome.mode,
            results = outcome.results.len(),
            limit,
            threshold,
            "similarity search finished"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("embedder", &self.embedder)
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

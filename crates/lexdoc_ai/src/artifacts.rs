//! Cached analysis and comparison results, keyed by document (pair) and
//! invalidated by content hash.

use std::sync::Arc;

use lexdoc_core::domain::DocumentContent;
use lexdoc_core::error::AppError;
use lexdoc_core::normalize::{canonical_rfc3339_utc, sha256_hex};
use lexdoc_core::repo::{self, StoredArtifact};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::analyze::{analyze_document, AnalysisResult};
use crate::compare::{compare_documents, ComparisonResult};
use crate::llm::GenerationChain;
use crate::store::SqliteEmbeddingStore;

pub const KIND_ANALYSIS: &str = "analysis";
pub const KIND_COMPARISON: &str = "comparison";

pub fn comparison_key(doc1_id: &str, doc2_id: &str) -> String {
    format!("{doc1_id}::{doc2_id}")
}

pub struct ArtifactCache {
    db: Arc<SqliteEmbeddingStore>,
    chain: GenerationChain,
    max_input_chars: usize,
}

impl ArtifactCache {
    pub fn new(db: Arc<SqliteEmbeddingStore>, chain: GenerationChain, max_input_chars: usize) -> Self {
        Self {
            db,
            chain,
            max_input_chars,
        }
    }

    /// Cached analysis of `document`; recomputed when the text changed or `force` is set.
    pub fn analysis(
        &self,
        document: &DocumentContent,
        now: &str,
        force: bool,
    ) -> Result<AnalysisResult, AppError> {
        let hash = sha256_hex(document.raw_text.as_bytes());
        self.cached(KIND_ANALYSIS, &document.document_id, &hash, now, force, || {
            analyze_document(&self.chain, document, self.max_input_chars)
        })
    }

    /// Cached comparison of the ordered pair (`doc1`, `doc2`).
    pub fn comparison(
        &self,
        doc1: &DocumentContent,
        doc2: &DocumentContent,
        now: &str,
        force: bool,
    ) -> Result<ComparisonResult, AppError> {
        let key = comparison_key(&doc1.document_id, &doc2.document_id);
        let hash = sha256_hex(
            format!(
                "{}:{}",
                sha256_hex(doc1.raw_text.as_bytes()),
                sha256_hex(doc2.raw_text.as_bytes())
            )
            .as_bytes(),
        );
        self.cached(KIND_COMPARISON, &key, &hash, now, force, || {
            Ok(compare_documents(
                &self.chain,
                &doc1.raw_text,
                &doc2.raw_text,
                self.max_input_chars / 2,
            ))
        })
    }

    pub fn forget_analysis(&self, document_id: &str) -> Result<bool, AppError> {
        self.db
            .with_connection(|conn| repo::delete_artifact(conn, KIND_ANALYSIS, document_id))
    }

    pub fn forget_comparison(&self, doc1_id: &str, doc2_id: &str) -> Result<bool, AppError> {
        let key = comparison_key(doc1_id, doc2_id);
        self.db
            .with_connection(|conn| repo::delete_artifact(conn, KIND_COMPARISON, &key))
    }

    fn cached<T: Serialize + DeserializeOwned>(
        &self,
        kind: &str,
        key: &str,
        content_sha256: &str,
        now: &str,
        force: bool,
        compute: impl FnOnce() -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let computed_at = canonical_rfc3339_utc(now)?;

        if !force {
            let hit = self
                .db
                .with_connection(|conn| repo::get_artifact(conn, kind, key))?;
            if let Some(stored) = hit.filter(|a| a.content_sha256 == content_sha256) {
                match serde_json::from_str::<T>(&stored.payload) {
                    Ok(v) => {
                        tracing::debug!(kind, key, "artifact cache hit");
                        return Ok(v);
                    }
                    Err(e) => {
                        tracing::warn!(kind, key, error = %e, "cached artifact unreadable; recomputing");
                    }
                }
            }
        }

        let value = compute()?;
        let payload = serde_json::to_string(&value).map_err(|e| {
            AppError::new("AI_ARTIFACT_ENCODE_FAILED", "Failed to encode artifact")
                .with_details(format!("kind={kind}; key={key}; err={e}"))
        })?;
        let artifact = StoredArtifact {
            kind: kind.to_string(),
            key: key.to_string(),
            content_sha256: content_sha256.to_string(),
            payload,
            computed_at,
        };
        self.db
            .with_connection(|conn| repo::put_artifact(conn, &artifact))?;
        tracing::debug!(kind, key, "artifact recomputed");
        Ok(value)
    }
}

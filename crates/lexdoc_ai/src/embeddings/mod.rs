use std::sync::Arc;

use lexdoc_core::error::AppError;
use lexdoc_core::normalize::truncate_chars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
    pub usage: EmbeddingUsage,
}

/// A provider able to turn text into a fixed-length vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, input: &str) -> Result<Embedding, AppError>;
}

/// The embedder handed to indexing and search.
///
/// Wraps at most one provider; there is no fallback between embedding
/// providers because vectors from different models are not comparable.
#[derive(Clone)]
pub struct EmbeddingService {
    provider: Option<Arc<dyn Embedder>>,
    max_input_chars: usize,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn Embedder>, max_input_chars: usize) -> Self {
        Self {
            provider: Some(provider),
            max_input_chars,
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            max_input_chars: 0,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Embed `input`, silently cut to the provider's character budget.
    pub fn embed(&self, input: &str) -> Result<Embedding, AppError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            AppError::new(
                "AI_EMBEDDING_UNCONFIGURED",
                "No embedding provider is configured",
            )
        })?;
        let text = truncate_chars(input, self.max_input_chars);
        let out = provider.embed(text)?;
        if out.vector.is_empty() {
            return Err(AppError::new(
                "AI_EMBEDDING_FAILED",
                "Embedding provider returned an empty vector",
            )
            .with_details(format!("model={}", out.model)));
        }
        Ok(out)
    }
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("configured", &self.provider.is_some())
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

/// Rough token estimate for providers that do not report usage.
pub(crate) fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    chars.div_ceil(4).min(u32::MAX as usize) as u32
}

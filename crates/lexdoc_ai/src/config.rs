//! Runtime configuration for the RAG pipeline.
//!
//! Sources are layered: built-in defaults, then an optional TOML file, then
//! `LEXDOC_`-prefixed environment variables where `__` separates nesting
//! levels (`LEXDOC_RETRIEVAL__DEFAULT_LIMIT=20`).

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use lexdoc_core::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Target chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Character overlap; converted to `overlap / 10` seed words.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_threshold")]
    pub default_threshold: f32,
    /// Chunks pulled into a chat answer's context.
    #[serde(default = "default_context_chunks")]
    pub context_chunks: usize,
    #[serde(default = "default_threshold")]
    pub context_threshold: f32,
    /// Upper bound on the context handed to the model, in characters.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_limit() -> usize {
    10
}

fn default_threshold() -> f32 {
    0.7
}

fn default_context_chunks() -> usize {
    5
}

fn default_max_context_chars() -> usize {
    16_000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_threshold: default_threshold(),
            context_chunks: default_context_chunks(),
            context_threshold: default_threshold(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexingConfig {
    /// Embedding calls in flight while indexing one document.
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,
}

fn default_embed_concurrency() -> usize {
    5
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            embed_concurrency: default_embed_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// The single provider used for embeddings; there is no embedding fallback.
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_max_input_chars() -> usize {
    8000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvidersConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub openai: Option<OpenAiSettings>,
    #[serde(default)]
    pub gemini: Option<GeminiSettings>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            openai: None,
            gemini: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenAiSettings {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_openai_embedding_model")]
    pub embedding_model: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeminiSettings {
    pub api_key: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_gemini_embedding_model")]
    pub embedding_model: String,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_chat_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_embedding_model() -> String {
    "text-embedding-004".to_string()
}

impl RagConfig {
    /// Load defaults, then `path` if it exists, then `LEXDOC_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut fig = Figment::new().merge(Serialized::defaults(RagConfig::default()));
        if let Some(p) = path {
            fig = fig.merge(Toml::file(p));
        }
        fig.merge(Env::prefixed("LEXDOC_").split("__"))
            .extract::<RagConfig>()
            .map_err(|e| {
                AppError::new("CONFIG_INVALID", "Failed to load RAG configuration")
                    .with_details(e.to_string())
            })
            .and_then(|cfg| {
                cfg.validate()?;
                Ok(cfg)
            })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunking.chunk_size == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "chunking.chunk_size must be greater than zero",
            ));
        }
        if self.indexing.embed_concurrency == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "indexing.embed_concurrency must be greater than zero",
            ));
        }
        for (name, v) in [
            ("retrieval.default_threshold", self.retrieval.default_threshold),
            ("retrieval.context_threshold", self.retrieval.context_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(AppError::new(
                    "CONFIG_INVALID",
                    "Similarity thresholds must be within [0, 1]",
                )
                .with_details(format!("{name}={v}")));
            }
        }
        if self.providers.timeout_secs == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "providers.timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RagConfig::default();
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.overlap, 200);
        assert_eq!(cfg.retrieval.default_limit, 10);
        assert_eq!(cfg.retrieval.context_chunks, 5);
        assert_eq!(cfg.indexing.embed_concurrency, 5);
        assert_eq!(cfg.embedding.max_input_chars, 8000);
        assert_eq!(cfg.providers.timeout_secs, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "lexdoc.toml",
                r#"
                [chunking]
                chunk_size = 400

                [providers.openai]
                api_key = "sk-file"
                "#,
            )?;
            jail.set_env("LEXDOC_RETRIEVAL__DEFAULT_LIMIT", "3");
            jail.set_env("LEXDOC_EMBEDDING__PROVIDER", "gemini");

            let cfg = RagConfig::load(Some(Path::new("lexdoc.toml"))).expect("load");
            assert_eq!(cfg.chunking.chunk_size, 400);
            assert_eq!(cfg.chunking.overlap, 200);
            assert_eq!(cfg.retrieval.default_limit, 3);
            assert_eq!(cfg.embedding.provider, ProviderKind::Gemini);
            let openai = cfg.providers.openai.expect("openai block");
            assert_eq!(openai.api_key, "sk-file");
            assert_eq!(openai.base_url, "https://api.openai.com/v1");
            Ok(())
        });
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut cfg = RagConfig::default();
        cfg.retrieval.default_threshold = 1.5;
        assert_eq!(cfg.validate().unwrap_err().code, "CONFIG_INVALID");
    }
}

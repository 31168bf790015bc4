//! HTTP clients for the hosted model providers and the builders that turn
//! [`RagConfig`] into injected provider handles.

use std::sync::Arc;
use std::time::Duration;

use lexdoc_core::error::AppError;
use serde::de::DeserializeOwned;

use crate::config::{ProviderKind, RagConfig};
use crate::embeddings::{Embedder, EmbeddingService};
use crate::llm::{GenerationChain, GenerativeProvider};

mod gemini;
mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Build the embedding service for the configured embedding provider.
///
/// A missing provider block yields an unconfigured service; the failure
/// surfaces as `AI_EMBEDDING_UNCONFIGURED` on first use.
pub fn build_embedding_service(cfg: &RagConfig) -> Result<EmbeddingService, AppError> {
    let timeout = Duration::from_secs(cfg.providers.timeout_secs);
    let provider: Option<Arc<dyn Embedder>> = match cfg.embedding.provider {
        ProviderKind::OpenAi => match cfg.providers.openai.as_ref() {
            Some(s) => Some(Arc::new(OpenAiProvider::new(s.clone(), timeout)?) as Arc<dyn Embedder>),
            None => None,
        },
        ProviderKind::Gemini => match cfg.providers.gemini.as_ref() {
            Some(s) => Some(Arc::new(GeminiProvider::new(s.clone(), timeout)?) as Arc<dyn Embedder>),
            None => None,
        },
    };
    Ok(match provider {
        Some(p) => EmbeddingService::new(p, cfg.embedding.max_input_chars),
        None => {
            tracing::warn!(provider = ?cfg.embedding.provider, "embedding provider not configured");
            EmbeddingService::unconfigured()
        }
    })
}

/// Gemini first, then OpenAI, skipping whichever is not configured.
pub fn build_generation_chain(cfg: &RagConfig) -> Result<GenerationChain, AppError> {
    let timeout = Duration::from_secs(cfg.providers.timeout_secs);
    let mut providers: Vec<Arc<dyn GenerativeProvider>> = Vec::new();
    if let Some(s) = cfg.providers.gemini.as_ref() {
        providers.push(Arc::new(GeminiProvider::new(s.clone(), timeout)?));
    }
    if let Some(s) = cfg.providers.openai.as_ref() {
        providers.push(Arc::new(OpenAiProvider::new(s.clone(), timeout)?));
    }
    if providers.is_empty() {
        tracing::warn!("no generative provider configured; answers will degrade");
    }
    Ok(GenerationChain::new(providers))
}

fn validate_endpoint(provider: &str, api_key: &str, base_url: &str) -> Result<String, AppError> {
    if api_key.trim().is_empty() {
        return Err(AppError::new("CONFIG_INVALID", "Provider API key is required")
            .with_details(format!("provider={provider}")));
    }
    let base = base_url.trim().trim_end_matches('/').to_string();
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        return Err(
            AppError::new("CONFIG_INVALID", "Provider base URL must be http(s)")
                .with_details(format!("provider={provider}; base_url={base}")),
        );
    }
    Ok(base)
}

/// Send `body` and decode a JSON reply; every failure maps to `code`.
fn send_json<T: DeserializeOwned>(
    req: ureq::Request,
    body: serde_json::Value,
    provider: &str,
    code: &str,
) -> Result<T, AppError> {
    match req.send_json(body) {
        Ok(r) => r.into_json::<T>().map_err(|e| {
            AppError::new(code, "Failed to decode provider response")
                .with_details(format!("provider={provider}; err={e}"))
        }),
        Err(ureq::Error::Status(status, r)) => {
            let body = r
                .into_string()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            Err(AppError::new(code, "Provider request failed")
                .with_details(format!(
                    "provider={provider}; status={status}; body={}",
                    lexdoc_core::normalize::truncate_chars(&body, 500)
                ))
                .with_retryable(status == 429 || status >= 500))
        }
        Err(e) => Err(AppError::new(code, "Failed to reach provider")
            .with_details(format!("provider={provider}; err={e}"))
            .with_retryable(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeminiSettings, OpenAiSettings};

    fn openai() -> OpenAiSettings {
        OpenAiSettings {
            api_key: "sk-test".to_string(),
            base_url: "https://api.openai.com/v1/".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }

    fn gemini() -> GeminiSettings {
        GeminiSettings {
            api_key: "g-test".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            chat_model: "gemini-1.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
        }
    }

    #[test]
    fn chain_orders_gemini_before_openai() {
        let mut cfg = RagConfig::default();
        cfg.providers.openai = Some(openai());
        cfg.providers.gemini = Some(gemini());
        let chain = build_generation_chain(&cfg).expect("chain");
        assert_eq!(format!("{chain:?}"), r#"["gemini", "openai"]"#);
    }

    #[test]
    fn missing_providers_degrade_instead_of_failing() {
        let cfg = RagConfig::default();
        assert!(build_generation_chain(&cfg).unwrap().is_empty());
        assert!(!build_embedding_service(&cfg).unwrap().is_configured());
    }

    #[test]
    fn embedding_uses_only_the_selected_provider() {
        let mut cfg = RagConfig::default();
        cfg.providers.gemini = Some(gemini());
        // Default embedding provider is OpenAI, which is absent here.
        assert!(!build_embedding_service(&cfg).unwrap().is_configured());
        cfg.embedding.provider = ProviderKind::Gemini;
        assert!(build_embedding_service(&cfg).unwrap().is_configured());
    }

    #[test]
    fn rejects_blank_key_and_non_http_base() {
        let mut s = openai();
        s.api_key = " ".to_string();
        assert!(OpenAiProvider::new(s, Duration::from_secs(1)).is_err());

        let mut s = openai();
        s.base_url = "ftp://example.com".to_string();
        assert!(OpenAiProvider::new(s, Duration::from_secs(1)).is_err());
    }
}

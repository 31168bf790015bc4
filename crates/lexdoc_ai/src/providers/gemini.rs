use std::time::Duration;

use lexdoc_core::error::AppError;
use serde::Deserialize;
use serde_json::json;

use super::{send_json, validate_endpoint};
use crate::config::GeminiSettings;
use crate::embeddings::{estimate_tokens, Embedder, Embedding, EmbeddingUsage};
use crate::llm::GenerativeProvider;

/// Client for the Gemini `generateContent` / `embedContent` REST endpoints.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(settings: GeminiSettings, timeout: Duration) -> Result<Self, AppError> {
        let base_url = validate_endpoint("gemini", &settings.api_key, &settings.base_url)?;
        Ok(Self {
            base_url,
            api_key: settings.api_key.trim().to_string(),
            chat_model: settings.chat_model,
            embedding_model: settings.embedding_model,
            timeout,
        })
    }

    fn post(&self, model: &str, method: &str) -> ureq::Request {
        // Key goes in a header: ureq transport errors echo the request URL.
        ureq::post(&format!(
            "{}/v1beta/models/{model}:{method}",
            self.base_url
        ))
        .timeout(self.timeout)
        .set("x-goog-api-key", &self.api_key)
    }
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl Embedder for GeminiProvider {
    fn embed(&self, input: &str) -> Result<Embedding, AppError> {
        let body = json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": input }] },
        });
        let resp: EmbedContentResponse = send_json(
            self.post(&self.embedding_model, "embedContent"),
            body,
            "gemini",
            "AI_EMBEDDING_FAILED",
        )?;
        let tokens = estimate_tokens(input);
        Ok(Embedding {
            vector: resp.embedding.values,
            model: self.embedding_model.clone(),
            usage: EmbeddingUsage {
                prompt_tokens: tokens,
                total_tokens: tokens,
            },
        })
    }
}

impl GenerativeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.2 },
        });
        let resp: GenerateContentResponse = send_json(
            self.post(&self.chat_model, "generateContent"),
            body,
            "gemini",
            "AI_PROVIDER_FAILED",
        )?;
        let text = candidate_text(resp);
        if text.trim().is_empty() {
            return Err(
                AppError::new("AI_PROVIDER_FAILED", "Gemini returned no candidate text")
                    .with_details("provider=gemini"),
            );
        }
        Ok(text)
    }
}

fn candidate_text(resp: GenerateContentResponse) -> String {
    resp.candidates
        .into_iter()
        .find_map(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_candidate_parts() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"world"}]},
            "finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":3}}"#;
        let v: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(candidate_text(v), "Hello world");
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let raw = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let v: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(candidate_text(v), "");
    }

    #[test]
    fn transport_errors_do_not_carry_the_api_key() {
        let provider = GeminiProvider::new(
            GeminiSettings {
                api_key: "SECRETKEY123".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
                chat_model: "c".to_string(),
                embedding_model: "e".to_string(),
            },
            Duration::from_secs(2),
        )
        .expect("provider");

        let err = provider.complete("hi").unwrap_err();
        assert_eq!(err.code, "AI_PROVIDER_FAILED");
        assert!(!err.to_string().contains("SECRETKEY123"), "{err}");

        let err = provider.embed("hi").unwrap_err();
        assert_eq!(err.code, "AI_EMBEDDING_FAILED");
        assert!(!err.to_string().contains("SECRETKEY123"), "{err}");
    }

    #[test]
    fn decodes_embedding_values() {
        let raw = r#"{"embedding":{"values":[0.5,-0.5]}}"#;
        let v: EmbedContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(v.embedding.values, vec![0.5, -0.5]);
    }
}

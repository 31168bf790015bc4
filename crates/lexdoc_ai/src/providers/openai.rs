use std::time::Duration;

use lexdoc_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::{send_json, validate_endpoint};
use crate::config::OpenAiSettings;
use crate::embeddings::{Embedder, Embedding, EmbeddingUsage};
use crate::llm::GenerativeProvider;

/// OpenAI-compatible client for `/embeddings` and `/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(settings: OpenAiSettings, timeout: Duration) -> Result<Self, AppError> {
        let base_url = validate_endpoint("openai", &settings.api_key, &settings.base_url)?;
        Ok(Self {
            base_url,
            api_key: settings.api_key.trim().to_string(),
            chat_model: settings.chat_model,
            embedding_model: settings.embedding_model,
            timeout,
        })
    }

    fn post(&self, path: &str) -> ureq::Request {
        ureq::post(&format!("{}{path}", self.base_url))
            .timeout(self.timeout)
            .set("Authorization", &format!("Bearer {}", self.api_key))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<UsageBlock>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct UsageBlock {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

const SYSTEM_PROMPT: &str =
    "You are a careful legal document assistant. Follow the output format requested by the user exactly.";

impl Embedder for OpenAiProvider {
    fn embed(&self, input: &str) -> Result<Embedding, AppError> {
        let body = serde_json::to_value(EmbeddingsRequest {
            model: &self.embedding_model,
            input,
        })
        .map_err(|e| {
            AppError::new("AI_EMBEDDING_FAILED", "Failed to encode embeddings request")
                .with_details(e.to_string())
        })?;
        let resp: EmbeddingsResponse =
            send_json(self.post("/embeddings"), body, "openai", "AI_EMBEDDING_FAILED")?;

        let vector = resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                AppError::new("AI_EMBEDDING_FAILED", "Embeddings response had no data")
                    .with_details("provider=openai")
            })?;
        let usage = resp
            .usage
            .map(|u| EmbeddingUsage {
                prompt_tokens: u.prompt_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();
        Ok(Embedding {
            vector,
            model: resp.model.unwrap_or_else(|| self.embedding_model.clone()),
            usage,
        })
    }
}

impl GenerativeProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let body = serde_json::to_value(ChatRequest {
            model: &self.chat_model,
            temperature: 0.2,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        })
        .map_err(|e| {
            AppError::new("AI_PROVIDER_FAILED", "Failed to encode chat request")
                .with_details(e.to_string())
        })?;
        let resp: ChatResponse = send_json(
            self.post("/chat/completions"),
            body,
            "openai",
            "AI_PROVIDER_FAILED",
        )?;
        resp.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| {
                AppError::new("AI_PROVIDER_FAILED", "Chat response had no content")
                    .with_details("provider=openai")
            })
    }
}

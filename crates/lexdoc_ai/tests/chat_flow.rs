use std::collections::BTreeMap;
use std::sync::Arc;

use lexdoc_ai::answer::{Answerer, DocumentContentProvider, APOLOGY_ANSWER, NO_CONTENT_ANSWER};
use lexdoc_ai::chat::ChatService;
use lexdoc_ai::config::{ChunkingConfig, IndexingConfig, RetrievalConfig};
use lexdoc_ai::embeddings::{Embedder, Embedding, EmbeddingService, EmbeddingUsage};
use lexdoc_ai::indexing::Indexer;
use lexdoc_ai::llm::{GenerationChain, GenerativeProvider};
use lexdoc_ai::retrieve::SearchEngine;
use lexdoc_ai::store::InMemoryEmbeddingStore;
use lexdoc_core::domain::{ChatRole, ChatSession, DocumentContent};
use lexdoc_core::error::AppError;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

const DOC: &str = "The cat sat. The dog ran. The bird flew.";

struct BirdEmbedder;

impl Embedder for BirdEmbedder {
    fn embed(&self, input: &str) -> Result<Embedding, AppError> {
        let bird = if input.to_lowercase().contains("bird") { 1.0 } else { 0.0 };
        let sentence = if input.contains('.') { 1.0 } else { 0.0 };
        Ok(Embedding {
            vector: vec![bird, sentence],
            model: "bird".to_string(),
            usage: EmbeddingUsage::default(),
        })
    }
}

struct Documents(BTreeMap<String, DocumentContent>);

impl DocumentContentProvider for Documents {
    fn content(&self, document_id: &str) -> Result<Option<DocumentContent>, AppError> {
        Ok(self.0.get(document_id).cloned())
    }
}

/// Records every prompt; replies with `reply` or fails when it is `None`.
struct RecordingProvider {
    reply: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingProvider {
    fn new(reply: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

impl GenerativeProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn complete(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().push(prompt.to_string());
        self.reply
            .map(str::to_string)
            .ok_or_else(|| AppError::new("AI_PROVIDER_FAILED", "provider timed out").with_retryable(true))
    }
}

fn service(provider: Arc<RecordingProvider>) -> ChatService {
    let store = Arc::new(InMemoryEmbeddingStore::new());
    let embedder = EmbeddingService::new(Arc::new(BirdEmbedder), 8000);
    Indexer::new(
        store.clone(),
        embedder.clone(),
        ChunkingConfig {
            chunk_size: 20,
            overlap: 5,
        },
        &IndexingConfig::default(),
    )
    .expect("indexer")
    .index_document(&DocumentContent::new("doc-1", DOC))
    .expect("index");

    let mut docs = BTreeMap::new();
    docs.insert("doc-1".to_string(), DocumentContent::new("doc-1", DOC));

    let engine = SearchEngine::new(store, embedder, RetrievalConfig::default());
    ChatService::new(Answerer::new(
        engine,
        GenerationChain::new(vec![provider]),
        Arc::new(Documents(docs)),
    ))
}

fn session(document_ids: &[&str]) -> ChatSession {
    ChatSession::new(
        "s1",
        "u1",
        document_ids.iter().map(|s| s.to_string()).collect(),
        "2026-03-01T10:00:00Z",
    )
    .expect("session")
}

#[test]
fn answer_cites_retrieved_chunks_with_one_based_labels() {
    let provider = RecordingProvider::new(Some("The bird flew away."));
    let chat = service(provider.clone());
    let mut s = session(&["doc-1"]);

    let answer = chat
        .send_message(&mut s, "bird", "2026-03-01T10:05:00Z")
        .expect("send");
    assert_eq!(answer.content, "The bird flew away.");
    assert!(!answer.degraded);
    assert_eq!(answer.citations.len(), 1);
    assert_eq!(answer.citations[0].chunk_index, 2);
    assert_eq!(answer.citations[0].source, "Chunk 3");
    assert_eq!(answer.citations[0].text, "The bird flew....");
    assert!((answer.confidence - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);

    let prompts = provider.prompts.lock();
    assert!(prompts[0].contains("The bird flew."));
    assert!(!prompts[0].contains("The cat sat."));
    assert!(prompts[0].contains("not contained in the context"));

    let roles: Vec<ChatRole> = s.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
    assert_eq!(s.updated_at, "2026-03-01T10:05:00Z");
    assert_eq!(s.created_at, "2026-03-01T10:00:00Z");
    assert_eq!(s.messages[1].citations, answer.citations);
}

#[test]
fn unmatched_question_uses_full_document_text() {
    let provider = RecordingProvider::new(Some("The documents do not say."));
    let chat = service(provider.clone());
    let mut s = session(&["doc-1"]);

    let answer = chat
        .send_message(&mut s, "zebra", "2026-03-01T10:05:00Z")
        .expect("send");
    assert_eq!(answer.confidence, 0.5);
    assert!(answer.citations.is_empty());
    assert!(provider.prompts.lock()[0].contains(DOC));
}

#[test]
fn provider_failure_returns_apology_and_still_records_reply() {
    let chat = service(RecordingProvider::new(None));
    let mut s = session(&["doc-1"]);

    let answer = chat
        .send_message(&mut s, "bird", "2026-03-01T10:05:00Z")
        .expect("send never fails on provider errors");
    assert_eq!(answer.content, APOLOGY_ANSWER);
    assert_eq!(answer.confidence, 0.1);
    assert!(answer.degraded);
    assert_eq!(s.messages.len(), 2);
    assert_eq!(s.messages[1].confidence, Some(0.1));
}

#[test]
fn session_without_documents_gets_no_content_answer() {
    let provider = RecordingProvider::new(Some("unused"));
    let chat = service(provider.clone());
    let mut s = session(&[]);

    let answer = chat
        .send_message(&mut s, "bird", "2026-03-01T10:05:00Z")
        .expect("send");
    assert_eq!(answer.content, NO_CONTENT_ANSWER);
    assert!(answer.degraded);
    assert!(provider.prompts.lock().is_empty());
}

#[test]
fn blank_message_is_rejected_without_touching_session() {
    let chat = service(RecordingProvider::new(Some("unused")));
    let mut s = session(&["doc-1"]);

    let err = chat
        .send_message(&mut s, "   ", "2026-03-01T10:05:00Z")
        .unwrap_err();
    assert_eq!(err.code, "CHAT_MESSAGE_INVALID");
    assert!(s.messages.is_empty());
    assert_eq!(s.updated_at, "2026-03-01T10:00:00Z");
}

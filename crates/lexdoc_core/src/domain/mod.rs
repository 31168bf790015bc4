use serde::{Deserialize, Serialize};

mod chat;

pub use chat::{ChatMessage, ChatRole, ChatSession};

/// Raw extracted text for one document, as handed over by the document layer.
///
/// The core never extracts text from binaries; whatever produced `raw_text` is
/// outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentContent {
    pub document_id: String,
    pub raw_text: String,
}

impl DocumentContent {
    pub fn new(document_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            raw_text: raw_text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.raw_text.trim().is_empty()
    }
}

/// Per-chunk metadata persisted alongside the vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub char_count: u32,
    #[serde(default)]
    pub text_sha256: String,
    /// Model that produced the vector. Vectors from different models are never compared.
    #[serde(default)]
    pub embedding_model: Option<String>,
    /// Position in the chunker output before skipped chunks were dropped.
    #[serde(default)]
    pub source_ordinal: Option<u32>,
}

/// One embedded segment of a document.
///
/// `chunk_index` is 0-based and contiguous per `document_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Display citation attached to an answer.
///
/// `chunk_index` is 0-based while `source` reads "Chunk N" with N 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub document_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub confidence: f32,
    pub source: String,
}

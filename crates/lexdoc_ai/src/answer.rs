//! Read path: assemble a bounded context and ask the generation chain.

use std::sync::Arc;

use lexdoc_core::domain::{Citation, DocumentContent};
use lexdoc_core::error::AppError;
use lexdoc_core::normalize::truncate_chars;
use serde::{Deserialize, Serialize};

use crate::llm::GenerationChain;
use crate::prompts::question_answer_prompt;
use crate::retrieve::SearchEngine;
use crate::store::SearchResult;

pub const CITATION_SNIPPET_CHARS: usize = 200;
pub const FULL_DOCUMENT_CONFIDENCE: f32 = 0.5;
pub const APOLOGY_CONFIDENCE: f32 = 0.1;

pub const APOLOGY_ANSWER: &str =
    "I'm sorry, I couldn't generate an answer right now. Please try again in a moment.";
pub const NO_CONTENT_ANSWER: &str =
    "I couldn't find any readable content in the selected documents to answer that question.";

/// Supplies extracted document text; the core never reads files itself.
pub trait DocumentContentProvider: Send + Sync {
    fn content(&self, document_id: &str) -> Result<Option<DocumentContent>, AppError>;
}

/// What the model gets to read.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerContext {
    /// Top chunks from similarity search.
    Retrieved(Vec<SearchResult>),
    /// Nothing qualified; the documents' full text, already bounded.
    FullDocument(String),
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    pub content: String,
    pub confidence: f32,
    pub citations: Vec<Citation>,
    /// Set when the answer is a canned fallback rather than model output.
    pub degraded: bool,
}

/// Citation for one retrieved chunk. The label is 1-based, `chunk_index` is not.
pub fn citation_for_result(r: &SearchResult) -> Citation {
    let mut text = truncate_chars(&r.content, CITATION_SNIPPET_CHARS).to_string();
    text.push_str("...");
    Citation {
        document_id: r.document_id.clone(),
        chunk_index: r.chunk_index,
        text,
        confidence: r.similarity,
        source: format!("Chunk {}", r.chunk_index + 1),
    }
}

pub struct Answerer {
    engine: SearchEngine,
    chain: GenerationChain,
    documents: Arc<dyn DocumentContentProvider>,
}

impl Answerer {
    pub fn new(
        engine: SearchEngine,
        chain: GenerationChain,
        documents: Arc<dyn DocumentContentProvider>,
    ) -> Self {
        Self {
            engine,
            chain,
            documents,
        }
    }

    /// Retrieve context for `question` within `document_ids` and answer it.
    pub fn answer(&self, question: &str, document_ids: &[String]) -> ChatAnswer {
        let context = self.build_context(question, document_ids);
        self.answer_question(question, &context)
    }

    /// Top chunks when any clear the context threshold, else the full text.
    pub fn build_context(&self, question: &str, document_ids: &[String]) -> AnswerContext {
        let cfg = self.engine.config();
        match self.engine.search(
            question,
            Some(document_ids),
            cfg.context_chunks,
            cfg.context_threshold,
        ) {
            Ok(outcome) if !outcome.results.is_empty() => {
                return AnswerContext::Retrieved(outcome.results);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "context retrieval failed; using full document text");
            }
        }

        let full = self.full_document_text(document_ids, cfg.max_context_chars);
        if full.trim().is_empty() {
            AnswerContext::Empty
        } else {
            AnswerContext::FullDocument(full)
        }
    }

    /// Never fails: provider errors turn into a low-confidence apology.
    pub fn answer_question(&self, question: &str, context: &AnswerContext) -> ChatAnswer {
        let max_chars = self.engine.config().max_context_chars;
        let (context_text, citations, confidence) = match context {
            AnswerContext::Retrieved(results) => {
                let citations: Vec<Citation> = results.iter().map(citation_for_result).collect();
                let confidence = mean_similarity(results);
                (join_chunks(results, max_chars), citations, confidence)
            }
            AnswerContext::FullDocument(text) => (
                truncate_chars(text, max_chars).to_string(),
                Vec::new(),
                FULL_DOCUMENT_CONFIDENCE,
            ),
            AnswerContext::Empty => {
                return ChatAnswer {
                    content: NO_CONTENT_ANSWER.to_string(),
                    confidence: APOLOGY_CONFIDENCE,
                    citations: Vec::new(),
                    degraded: true,
                };
            }
        };

        match self
            .chain
            .complete(&question_answer_prompt(question, &context_text))
        {
            Ok(c) => ChatAnswer {
                content: c.text.trim().to_string(),
                confidence,
                citations,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "answer generation failed; returning apology");
                ChatAnswer {
                    content: APOLOGY_ANSWER.to_string(),
                    confidence: APOLOGY_CONFIDENCE,
                    citations: Vec::new(),
                    degraded: true,
                }
            }
        }
    }

    fn full_document_text(&self, document_ids: &[String], max_chars: usize) -> String {
        let mut out = String::new();
        for id in document_ids {
            let doc = match self.documents.content(id) {
                Ok(Some(doc)) => doc,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(document_id = %id, error = %e, "document content unavailable");
                    continue;
                }
            };
            if doc.is_blank() {
                continue;
            }
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(doc.raw_text.trim());
            if out.chars().count() >= max_chars {
                break;
            }
        }
        truncate_chars(&out, max_chars).to_string()
    }
}

fn join_chunks(results: &[SearchResult], max_chars: usize) -> String {
    let joined = results
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&joined, max_chars).to_string()
}

fn mean_similarity(results: &[SearchResult]) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.similarity).sum::<f32>() / results.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdoc_core::domain::ChunkMetadata;

    fn result(idx: u32, content: &str, sim: f32) -> SearchResult {
        SearchResult {
            document_id: "d1".to_string(),
            chunk_index: idx,
            content: content.to_string(),
            similarity: sim,
            metadata: ChunkMetadata::default(),
        }
    }

    #[test]
    fn citation_label_is_one_based() {
        let c = citation_for_result(&result(0, "Rent is due monthly.", 0.82));
        assert_eq!(c.source, "Chunk 1");
        assert_eq!(c.chunk_index, 0);
        assert_eq!(c.text, "Rent is due monthly....");
        assert_eq!(c.confidence, 0.82);
    }

    #[test]
    fn citation_text_is_capped() {
        let c = citation_for_result(&result(4, &"x".repeat(500), 0.9));
        assert_eq!(c.text.chars().count(), CITATION_SNIPPET_CHARS + 3);
        assert_eq!(c.source, "Chunk 5");
    }

    #[test]
    fn mean_similarity_of_results() {
        let rs = vec![result(0, "a", 0.8), result(1, "b", 0.9)];
        assert!((mean_similarity(&rs) - 0.85).abs() < 1e-6);
        assert_eq!(mean_similarity(&[]), 0.0);
    }
}

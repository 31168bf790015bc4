use lexdoc_core::domain::DocumentContent;
use lexdoc_core::error::AppError;
use lexdoc_core::normalize::truncate_chars;
use serde::{Deserialize, Serialize};

use crate::llm::GenerationChain;
use crate::prompts::analysis_prompt;
use crate::response::{parse_structured, ParsedResponse};

pub const UNSTRUCTURED_SUMMARY_CHARS: usize = 500;
pub const UNSTRUCTURED_CONFIDENCE: f32 = 0.4;
/// Used when the model returns structured output without a confidence.
pub const STRUCTURED_DEFAULT_CONFIDENCE: f32 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub key_points: Vec<String>,
    pub parties: Vec<String>,
    pub key_dates: Vec<String>,
    pub obligations: Vec<String>,
    pub risks: Vec<String>,
    pub confidence: f32,
    /// False when the model output could not be decoded and `summary` is raw text.
    pub structured: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelAnalysis {
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    parties: Vec<String>,
    #[serde(default)]
    key_dates: Vec<String>,
    #[serde(default)]
    obligations: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Summarize one document.
///
/// Unlike chat and comparison, generation failures propagate: there is no
/// meaningful analysis without a model.
pub fn analyze_document(
    chain: &GenerationChain,
    document: &DocumentContent,
    max_input_chars: usize,
) -> Result<AnalysisResult, AppError> {
    if document.is_blank() {
        return Err(AppError::new(
            "AI_ANALYSIS_NO_CONTENT",
            "Document has no text content to analyze",
        )
        .with_details(format!("document_id={}", document.document_id)));
    }

    let text = truncate_chars(document.raw_text.trim(), max_input_chars);
    let completion = chain.complete(&analysis_prompt(text))?;

    Ok(match parse_structured::<ModelAnalysis>(&completion.text) {
        ParsedResponse::Structured(m) => AnalysisResult {
            summary: m.summary,
            key_points: m.key_points,
            parties: m.parties,
            key_dates: m.key_dates,
            obligations: m.obligations,
            risks: m.risks,
            confidence: m
                .confidence
                .filter(|c| c.is_finite())
                .map(|c| c.clamp(0.0, 1.0))
                .unwrap_or(STRUCTURED_DEFAULT_CONFIDENCE),
            structured: true,
        },
        ParsedResponse::Unstructured(raw) => {
            tracing::warn!(
                document_id = %document.document_id,
                provider = %completion.provider,
                "analysis output was not structured; keeping raw summary"
            );
            unstructured_analysis(&raw)
        }
    })
}

fn unstructured_analysis(raw: &str) -> AnalysisResult {
    AnalysisResult {
        summary: truncate_chars(raw, UNSTRUCTURED_SUMMARY_CHARS).to_string(),
        key_points: Vec::new(),
        parties: Vec::new(),
        key_dates: Vec::new(),
        obligations: Vec::new(),
        risks: Vec::new(),
        confidence: UNSTRUCTURED_CONFIDENCE,
        structured: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_document_is_rejected_before_generation() {
        let err = analyze_document(
            &GenerationChain::empty(),
            &DocumentContent::new("d1", "   "),
            1000,
        )
        .unwrap_err();
        assert_eq!(err.code, "AI_ANALYSIS_NO_CONTENT");
    }

    #[test]
    fn missing_providers_surface_generation_error() {
        let err = analyze_document(
            &GenerationChain::empty(),
            &DocumentContent::new("d1", "Lease between A and B."),
            1000,
        )
        .unwrap_err();
        assert_eq!(err.class(), lexdoc_core::error::ErrorClass::Generation);
    }

    #[test]
    fn unstructured_summary_is_capped() {
        let a = unstructured_analysis(&"y".repeat(900));
        assert_eq!(a.summary.chars().count(), UNSTRUCTURED_SUMMARY_CHARS);
        assert_eq!(a.confidence, UNSTRUCTURED_CONFIDENCE);
        assert!(!a.structured);
    }
}

//! Pairwise document comparison.
//!
//! A lexical baseline is always computed first so a comparison is returned
//! even when every generative provider is down. Model output may replace the
//! score, differences and common clauses; statistics always stay lexical.

use std::collections::BTreeSet;

use lexdoc_core::normalize::truncate_chars;
use serde::{Deserialize, Serialize};

use crate::llm::GenerationChain;
use crate::prompts::comparison_prompt;
use crate::response::{parse_structured, ParsedResponse};

/// Unique words sampled into the baseline vocabulary difference.
const VOCABULARY_SAMPLE: usize = 10;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    #[serde(default)]
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub significance: Significance,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerDocument {
    pub doc1: usize,
    pub doc2: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonStatistics {
    pub total_words: PerDocument,
    pub unique_words: PerDocument,
    pub common_words: usize,
    /// Absolute difference of the two texts' lengths in characters.
    pub length_difference: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonSource {
    Ai,
    Lexical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub similarity_score: f32,
    pub differences: Vec<Difference>,
    pub common_clauses: Vec<String>,
    pub statistics: ComparisonStatistics,
    pub source: ComparisonSource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelComparison {
    #[serde(default)]
    similarity_score: Option<f32>,
    #[serde(default)]
    differences: Vec<Difference>,
    #[serde(default)]
    common_clauses: Vec<String>,
}

/// Deterministic comparison over lowercased whitespace tokens.
pub fn lexical_comparison(doc1: &str, doc2: &str) -> ComparisonResult {
    let words1 = tokens(doc1);
    let words2 = tokens(doc2);
    let set1: BTreeSet<&str> = words1.iter().map(String::as_str).collect();
    let set2: BTreeSet<&str> = words2.iter().map(String::as_str).collect();
    let common = set1.intersection(&set2).count();
    let denom = set1.len().max(set2.len()).max(1);

    let only1: Vec<&str> = set1
        .difference(&set2)
        .take(VOCABULARY_SAMPLE)
        .copied()
        .collect();
    let only2: Vec<&str> = set2
        .difference(&set1)
        .take(VOCABULARY_SAMPLE)
        .copied()
        .collect();
    let mut differences = Vec::new();
    if !only1.is_empty() || !only2.is_empty() {
        differences.push(Difference {
            category: "Vocabulary".to_string(),
            description: format!(
                "Only in document 1: [{}]; only in document 2: [{}]",
                only1.join(", "),
                only2.join(", ")
            ),
            significance: Significance::Low,
        });
    }

    ComparisonResult {
        similarity_score: common as f32 / denom as f32,
        differences,
        common_clauses: Vec::new(),
        statistics: ComparisonStatistics {
            total_words: PerDocument {
                doc1: words1.len(),
                doc2: words2.len(),
            },
            unique_words: PerDocument {
                doc1: set1.len(),
                doc2: set2.len(),
            },
            common_words: common,
            length_difference: doc1.chars().count().abs_diff(doc2.chars().count()),
        },
        source: ComparisonSource::Lexical,
    }
}

/// Compare two document texts. Never fails.
///
/// Each text is cut to `max_chars_per_doc` before it reaches the model.
pub fn compare_documents(
    chain: &GenerationChain,
    doc1: &str,
    doc2: &str,
    max_chars_per_doc: usize,
) -> ComparisonResult {
    let baseline = lexical_comparison(doc1, doc2);
    if chain.is_empty() {
        return baseline;
    }

    let prompt = comparison_prompt(
        truncate_chars(doc1, max_chars_per_doc),
        truncate_chars(doc2, max_chars_per_doc),
    );
    let completion = match chain.complete(&prompt) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "comparison generation failed; returning lexical result");
            return baseline;
        }
    };

    match parse_structured::<ModelComparison>(&completion.text) {
        ParsedResponse::Structured(m) => ComparisonResult {
            similarity_score: m
                .similarity_score
                .filter(|s| s.is_finite())
                .map(|s| s.clamp(0.0, 1.0))
                .unwrap_or(baseline.similarity_score),
            differences: m.differences,
            common_clauses: m.common_clauses,
            statistics: baseline.statistics,
            source: ComparisonSource::Ai,
        },
        ParsedResponse::Unstructured(_) => {
            tracing::warn!(
                provider = %completion.provider,
                "comparison output was not structured; returning lexical result"
            );
            baseline
        }
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn overlap_is_common_over_larger_set() {
        let r = lexical_comparison("a b c", "a b d");
        assert!((r.similarity_score - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(r.statistics.common_words, 2);
        assert_eq!(r.statistics.total_words, PerDocument { doc1: 3, doc2: 3 });
        assert_eq!(r.differences.len(), 1);
        assert_eq!(r.source, ComparisonSource::Lexical);
    }

    #[test]
    fn case_is_folded_and_duplicates_collapse() {
        let r = lexical_comparison("The the THE cat", "the Cat");
        assert_eq!(r.statistics.total_words, PerDocument { doc1: 4, doc2: 2 });
        assert_eq!(r.statistics.unique_words, PerDocument { doc1: 2, doc2: 2 });
        assert_eq!(r.similarity_score, 1.0);
        assert!(r.differences.is_empty());
    }

    #[test]
    fn empty_inputs_are_well_formed() {
        let r = lexical_comparison("", "");
        assert_eq!(r.similarity_score, 0.0);
        assert_eq!(r.statistics, ComparisonStatistics::default());

        let r = lexical_comparison("", "four chars");
        assert_eq!(r.statistics.length_difference, 10);
        assert_eq!(r.statistics.total_words.doc2, 2);
    }

    #[test]
    fn empty_chain_returns_baseline() {
        let r = compare_documents(&GenerationChain::empty(), "a b c", "a b d", 100);
        assert_eq!(r, lexical_comparison("a b c", "a b d"));
    }
}

use serde::de::DeserializeOwned;

/// Model output decoded against an expected shape, or kept as raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse<T> {
    Structured(T),
    Unstructured(String),
}

impl<T> ParsedResponse<T> {
    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedResponse::Structured(_))
    }
}

/// Decode `raw` as a JSON object of type `T`.
///
/// Models wrap JSON in prose or Markdown fences; the outermost `{...}` span is
/// tried. Anything that fails to deserialize comes back as `Unstructured`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> ParsedResponse<T> {
    let trimmed = strip_code_fence(raw.trim());
    if let Ok(v) = serde_json::from_str::<T>(trimmed) {
        return ParsedResponse::Structured(v);
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return ParsedResponse::Structured(v);
            }
        }
    }
    ParsedResponse::Unstructured(raw.trim().to_string())
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

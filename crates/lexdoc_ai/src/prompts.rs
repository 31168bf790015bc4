pub fn question_answer_prompt(question: &str, context: &str) -> String {
    // The "not in the documents" instruction is the only guard against
    // invented answers; keep it.
    format!(
        r#"You are a legal document assistant answering a question about the user's documents.

Rules (non-negotiable):
1) Use ONLY the document context provided below. Do not use outside knowledge.
2) If the answer is not contained in the context, say clearly that the documents do not contain the answer. Do not guess.
3) Quote or paraphrase the relevant passage when it supports the answer.
4) Do not give legal advice beyond what the documents state.

Document context:
{context}

Question:
{question}

Output:
- Plain prose, concise.
"#
    )
}

pub fn comparison_prompt(doc1: &str, doc2: &str) -> String {
    format!(
        r#"You are comparing two legal documents.

Rules (non-negotiable):
1) Base every statement ONLY on the two documents below.
2) Report substantive differences (terms, parties, amounts, dates, obligations), not formatting.
3) List clauses that appear in both documents with the same meaning.

Document 1:
{doc1}

Document 2:
{doc2}

Output:
Return a single JSON object and nothing else:
{{
  "similarityScore": <number between 0 and 1>,
  "differences": [
    {{"category": "<short label>", "description": "<what differs>", "significance": "low" | "medium" | "high"}}
  ],
  "commonClauses": ["<clause summary>"]
}}
"#
    )
}

pub fn analysis_prompt(text: &str) -> String {
    format!(
        r#"You are analyzing a legal document.

Rules (non-negotiable):
1) Use ONLY the document text below. Do not invent parties, dates or obligations.
2) If a field cannot be determined from the text, return an empty list for it.

Document:
{text}

Output:
Return a single JSON object and nothing else:
{{
  "summary": "<2-4 sentence summary>",
  "keyPoints": ["<point>"],
  "parties": ["<party>"],
  "keyDates": ["<date and what happens on it>"],
  "obligations": ["<who must do what>"],
  "risks": ["<risk>"],
  "confidence": <number between 0 and 1>
}}
"#
    )
}

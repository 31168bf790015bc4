use lexdoc_core::normalize::normalize_text;

use crate::config::ChunkingConfig;

/// Split `text` into sentence-aligned chunks of roughly `chunk_size` characters.
///
/// Sentences end at runs of `.`, `!` or `?`. Sentences are joined with `". "`
/// until the next one would push the buffer past `chunk_size`; the buffer is
/// then emitted with a trailing period. The following buffer starts with the
/// last `overlap / 10` words of the emitted one, then the sentence that did
/// not fit. A single sentence longer than `chunk_size` becomes its own chunk
/// untouched.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let normalized = normalize_text(text);
    let overlap_words = overlap / 10;

    let mut out = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for sentence in split_sentences(&normalized) {
        let sentence_chars = sentence.chars().count();
        if buf_chars > 0 && buf_chars + sentence_chars > chunk_size {
            let seed = tail_words(&buf, overlap_words);
            out.push(finish_chunk(&buf));

            buf.clear();
            if !seed.is_empty() {
                buf.push_str(&seed);
                buf.push(' ');
            }
            buf.push_str(sentence);
        } else {
            if buf_chars > 0 {
                buf.push_str(". ");
            }
            buf.push_str(sentence);
        }
        buf_chars = buf.chars().count();
    }

    if !buf.trim().is_empty() {
        out.push(finish_chunk(&buf));
    }
    out
}

pub fn chunk_with_config(text: &str, cfg: &ChunkingConfig) -> Vec<String> {
    chunk_text(text, cfg.chunk_size, cfg.overlap)
}

fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn finish_chunk(buf: &str) -> String {
    let mut chunk = buf.trim().to_string();
    chunk.push('.');
    chunk
}

fn tail_words(buf: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let words: Vec<&str> = buf.split_whitespace().collect();
    let start = words.len().saturating_sub(n);
    words[start..].join(" ")
}

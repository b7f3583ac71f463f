//! Sentence-aware splitting of long document text.

use serde::{Deserialize, Serialize};

const SENTENCE_ENDINGS: &[char] = &['。', '；', ';', '.', '!', '?', '？'];

/// A piece of a document small enough for one model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// 0-based position among all chunks of the document.
    pub index: usize,
    /// 1-based page the chunk was cut from.
    pub page: usize,
    /// Chunk text.
    pub text: String,
}

/// Splits `text` into chunks of at most `max_chars` characters.
///
/// Sentences end after `。；;.!?？` or at a newline. Sentences are trimmed and
/// packed greedily; a single sentence longer than `max_chars` is cut hard.
/// A `max_chars` of zero is treated as one.
#[must_use]
pub fn split_by_chars(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences(text) {
        let sentence = sentence.trim();
        let len = sentence.chars().count();
        if len == 0 {
            continue;
        }

        if current_len + len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if len > max_chars {
            let chars: Vec<char> = sentence.chars().collect();
            let mut pieces = chars.chunks(max_chars).map(|c| c.iter().collect::<String>());
            let mut last = None;
            for piece in pieces.by_ref() {
                if let Some(full) = last.replace(piece) {
                    chunks.push(full);
                }
            }
            if let Some(tail) = last {
                current_len = tail.chars().count();
                current = tail;
            }
            continue;
        }

        current.push_str(sentence);
        current_len += len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(|c: char| c == '\n' || SENTENCE_ENDINGS.contains(&c))
}

/// Chunks each page separately so every chunk keeps its page number.
#[must_use]
pub fn chunk_pages(pages: &[String], max_chars: usize) -> Vec<TextChunk> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| {
            split_by_chars(page, max_chars)
                .into_iter()
                .map(move |text| (i + 1, text))
        })
        .enumerate()
        .map(|(index, (page, text))| TextChunk { index, page, text })
        .collect()
}

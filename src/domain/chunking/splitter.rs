use super::error::ChunkingError;

/// Chunks above this size are suspicious; the synthesis server may truncate them
const LONG_CHUNK_WARN_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub total_chunks: usize,
    pub total_length: usize,
    pub average_chunk_length: usize,
}

/// Split text into sentence-aligned chunks of at most `max_chars_per_chunk`
/// characters.
///
/// Sentences are packed greedily. The cap is soft: a single sentence longer
/// than the cap becomes a chunk of its own instead of being cut.
pub fn split_text_into_chunks(
    text: &str,
    max_chars_per_chunk: usize,
) -> Result<Vec<String>, ChunkingError> {
    if text.trim().is_empty() {
        return Err(ChunkingError::EmptyInput);
    }

    let max_chars = max_chars_per_chunk.max(1);
    let sentences = split_into_sentences(text);
    tracing::debug!(sentence_count = sentences.len(), "Text split into sentences");

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in sentences {
        let sentence_len = sentence.chars().count();

        if current_len > 0 && current_len + 1 + sentence_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += sentence_len;
    }

    if current_len > 0 {
        chunks.push(current);
    }

    validate_chunks(&chunks)?;

    tracing::info!(
        chunk_count = chunks.len(),
        max_chars_per_chunk = max_chars,
        "Split text into chunks"
    );

    Ok(chunks)
}

/// Reject empty chunk lists and blank chunks; warn about very long ones
pub fn validate_chunks(chunks: &[String]) -> Result<(), ChunkingError> {
    if chunks.is_empty() {
        return Err(ChunkingError::EmptyInput);
    }

    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.trim().is_empty() {
            return Err(ChunkingError::InvalidChunk { index });
        }

        let length = chunk.chars().count();
        if length > LONG_CHUNK_WARN_CHARS {
            tracing::warn!(
                chunk_index = index,
                chunk_length = length,
                "Chunk is very long, synthesis may truncate it"
            );
        }
    }

    Ok(())
}

pub fn chunk_metadata(chunks: &[String]) -> ChunkMetadata {
    let total_length: usize = chunks.iter().map(|c| c.chars().count()).sum();
    let average_chunk_length = if chunks.is_empty() {
        0
    } else {
        (total_length as f64 / chunks.len() as f64).round() as usize
    };

    ChunkMetadata {
        total_chunks: chunks.len(),
        total_length,
        average_chunk_length,
    }
}

/// Latin and Arabic sentence terminators (the Arabic question mark and comma included)
fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '؟' | '،')
}

/// Break text into trimmed sentence-like units.
///
/// A run of terminal punctuation closes a sentence when it is followed by
/// whitespace or the end of the text, so "3.14" stays intact. A newline
/// always closes a sentence and is not part of it.
fn split_into_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let boundary = if c == '\n' {
            Some((idx, idx + c.len_utf8()))
        } else if is_terminal(c) {
            match chars.peek() {
                Some(&(_, next)) if is_terminal(next) || !next.is_whitespace() => None,
                _ => Some((idx + c.len_utf8(), idx + c.len_utf8())),
            }
        } else {
            None
        };

        if let Some((end, next_start)) = boundary {
            push_trimmed(&mut sentences, &text[start..end]);
            start = next_start;
        }
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, part: &'a str) {
    let trimmed = part.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}

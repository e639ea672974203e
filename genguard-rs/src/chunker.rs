//! Text chunking for speech synthesis
//!
//! Long text is split into chunks of at most [`DEFAULT_MAX_CHUNK_SIZE`]
//! characters along sentence boundaries. A sentence ends after `.`, `!` or
//! `?` followed by whitespace; sentences are never split, so a single
//! sentence longer than the limit becomes its own oversized chunk.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Default maximum characters per chunk
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4000;

/// A contiguous run of sentences
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position in the original text, starting at 0
    pub index: usize,

    pub text: String,

    /// Length of `text` in characters
    pub char_count: usize,
}

impl Chunk {
    fn new(index: usize, text: String) -> Self {
        let char_count = text.chars().count();
        Self { index, text, char_count }
    }

    /// Whether this chunk is a single sentence longer than `max_chunk_size`
    pub fn is_oversized(&self, max_chunk_size: usize) -> bool {
        self.char_count > max_chunk_size
    }
}

/// Split `text` into trimmed, non-empty sentences
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }

        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                push_trimmed(&mut sentences, &text[start..next_idx]);
                start = next_idx;
            }
        }
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, sentence: &'a str) {
    let sentence = sentence.trim();
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}

/// Split `text` into chunks of at most `max_chunk_size` characters
///
/// Text that already fits is returned unchanged as a single chunk. Otherwise
/// sentences are packed greedily, joined by a single space.
pub fn chunk(text: &str, max_chunk_size: usize) -> Vec<Chunk> {
    if text.chars().count() <= max_chunk_size {
        return vec![Chunk::new(0, text.to_string())];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();

        if !current.is_empty() && current_len + 1 + len > max_chunk_size {
            chunks.push(Chunk::new(chunks.len(), std::mem::take(&mut current)));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += len;
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(chunks.len(), current));
    }

    chunks
}

static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("link pattern is valid"));
static ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("annotation pattern is valid"));
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]*").expect("heading pattern is valid"));
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-+*][ \t]+").expect("bullet pattern is valid"));
static STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\*\*|__)(.+?)(\*\*|__)").expect("strong pattern is valid"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("spaces pattern is valid"));

/// Strip markdown emphasis, headings, list markers and bracketed annotations
///
/// Link text is kept while the target is dropped.
pub fn clean_for_speech(text: &str) -> String {
    let text = LINK.replace_all(text, "$1");
    let text = ANNOTATION.replace_all(&text, "");
    let text = HEADING.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    let text = STRONG.replace_all(&text, "$2");
    let text = text.replace('*', "");
    let text = SPACES.replace_all(&text, " ");

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk("  Hello there. General Kenobi!  ", 100);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "  Hello there. General Kenobi!  ");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_sentence_split() {
        let sentences = split_sentences("One. Two!  Three?\nFour... Five v1.2 stays.");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?", "Four...", "Five v1.2 stays."]);
    }

    #[test]
    fn test_clean_for_speech() {
        let cleaned = clean_for_speech("## Title\n**Bold** and *soft* text [1] with a [link](http://x.y).\n- item");
        assert_eq!(cleaned, "Title\nBold and soft text with a link.\nitem");
    }
}

//! Tests for text chunking

#[cfg(test)]
mod tests {
    use crate::chunker::{chunk, split_sentences, DEFAULT_MAX_CHUNK_SIZE};

    /// A sentence of exactly 100 characters, ending with a period
    fn sentence(n: usize) -> String {
        let head = format!("Sentence {:03} ", n);
        format!("{}{}.", head, "x".repeat(99 - head.len()))
    }

    fn long_text(sentences: usize) -> String {
        (0..sentences).map(sentence).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_long_text_packs_into_three_chunks() {
        let text = long_text(100);
        let chunks = chunk(&text, DEFAULT_MAX_CHUNK_SIZE);

        assert_eq!(chunks.len(), 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert!(c.char_count <= DEFAULT_MAX_CHUNK_SIZE);
            assert_eq!(c.char_count, c.text.chars().count());
        }

        // 39 sentences plus 38 joining spaces fit; a 40th would not
        assert_eq!(chunks[0].char_count, 39 * 100 + 38);
    }

    #[test]
    fn test_chunks_rejoin_to_original_sentences() {
        let text = long_text(100);
        let chunks = chunk(&text, DEFAULT_MAX_CHUNK_SIZE);

        let rejoined = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(rejoined, split_sentences(&text).join(" "));
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_text_at_limit_is_single_chunk() {
        let text = "a".repeat(DEFAULT_MAX_CHUNK_SIZE);
        let chunks = chunk(&text, DEFAULT_MAX_CHUNK_SIZE);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_text_one_past_limit_splits() {
        let closing = format!("Closing line {}.", "y".repeat(48));
        let text = format!("{} {}", long_text(39), closing);
        assert_eq!(text.chars().count(), DEFAULT_MAX_CHUNK_SIZE + 1);

        let chunks = chunk(&text, DEFAULT_MAX_CHUNK_SIZE);

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.char_count <= DEFAULT_MAX_CHUNK_SIZE));
        assert_eq!(chunks[0].char_count, 39 * 100 + 38);
        assert_eq!(chunks[1].text, closing);
    }

    #[test]
    fn test_oversized_sentence_is_its_own_chunk() {
        let giant = format!("{}.", "y".repeat(149));
        let text = format!("Short one. {} Short two.", giant);

        let chunks = chunk(&text, 100);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        assert_eq!(texts, vec!["Short one.", giant.as_str(), "Short two."]);
        assert!(chunks[1].is_oversized(100));
        assert!(!chunks[0].is_oversized(100));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "Ünïcödé wörds hère. Ånd möre tëxt hère.";
        let chunks = chunk(text, 25);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Ünïcödé wörds hère.");
        assert_eq!(chunks[0].char_count, 19);
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk("", DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.is_empty());
        assert!(split_sentences("   ").is_empty());
    }
}

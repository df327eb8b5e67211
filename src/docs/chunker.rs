//! Paragraph-aware chunking with character overlap.
//!
//! Paragraphs are never split: the size limit is a soft target checked only
//! between paragraphs, so one oversized paragraph becomes one oversized chunk.

use std::sync::LazyLock;

use regex::Regex;

use super::types::Chunk;
use crate::config::ChunkingConfig;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph regex"));

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chunk_size: usize,
    overlap: usize,
}

impl From<ChunkingConfig> for Chunker {
    fn from(config: ChunkingConfig) -> Self {
        Self::new(config.max_chunk_size, config.overlap)
    }
}

impl Chunker {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        Self {
            max_chunk_size,
            overlap,
        }
    }

    /// Split `text` into ordered chunks. Sizes are counted in characters.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let mut closed: Vec<(String, usize)> = Vec::new();
        let mut buffer = String::new();
        let mut buffer_chars = 0usize;
        let mut seeded = 0usize;

        for paragraph in PARAGRAPH_BREAK.split(text) {
            let paragraph_chars = paragraph.chars().count();

            if buffer_chars + paragraph_chars > self.max_chunk_size && !buffer.is_empty() {
                let seed = tail_chars(&buffer, buffer_chars, self.overlap).to_string();
                let seed_chars = buffer_chars.min(self.overlap);
                closed.push((std::mem::replace(&mut buffer, seed), seeded));
                buffer_chars = seed_chars;
                seeded = seed_chars;
            }

            if !buffer.is_empty() && !buffer.ends_with('\n') {
                buffer.push_str("\n\n");
                buffer_chars += 2;
            }
            buffer.push_str(paragraph);
            buffer_chars += paragraph_chars;
        }

        if !buffer.is_empty() {
            closed.push((buffer, seeded));
        }

        let total = closed.len();
        closed
            .into_iter()
            .enumerate()
            .map(|(index, (text, overlap))| Chunk {
                text,
                index,
                total,
                overlap,
            })
            .collect()
    }
}

/// Last `n` characters of `s`, or all of it when shorter.
fn tail_chars(s: &str, char_len: usize, n: usize) -> &str {
    if char_len <= n {
        return s;
    }
    let start = s
        .char_indices()
        .nth(char_len - n)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
        Chunker::new(max_chunk_size, overlap)
            .chunk(text)
            .into_iter()
            .map(|c| c.text)
            .collect()
    }

    fn rejoin(chunks: &[Chunk]) -> String {
        let mut out = String::new();
        for chunk in chunks {
            out.push_str(chunk.fresh_text());
        }
        out
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_text("", 100, 20).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = Chunker::new(1000, 200).chunk("One.\n\nTwo.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "One.\n\nTwo.");
        assert_eq!(chunks[0].total, 1);
        assert_eq!(chunks[0].overlap, 0);
    }

    #[test]
    fn test_oversized_paragraph_kept_whole() {
        let long = "x".repeat(500);
        let chunks = chunk_text(&long, 100, 10);
        assert_eq!(chunks, vec![long]);
    }

    #[test]
    fn test_overlap_seeds_next_chunk() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = Chunker::new(40, 5).chunk(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "a".repeat(30));
        assert_eq!(chunks[1].overlap, 5);
        assert_eq!(chunks[1].text, format!("aaaaa\n\n{}", "b".repeat(30)));
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[1].total, 2);
    }

    #[test]
    fn test_short_buffer_is_carried_whole() {
        let text = "abc\n\nlonger paragraph here";
        let chunks = Chunker::new(10, 50).chunk(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].overlap, 3);
        assert_eq!(chunks[1].text, "abc\n\nlonger paragraph here");
    }

    #[test]
    fn test_rejoin_recovers_paragraphs() {
        let paragraphs: Vec<String> = (0..12)
            .map(|i| format!("Paragraph {} says something about ad budgets.", i))
            .collect();
        let text = paragraphs.join("\n\n");
        let chunks = Chunker::new(120, 25).chunk(&text);
        assert!(chunks.len() > 1);
        assert_eq!(rejoin(&chunks), text);
    }

    #[test]
    fn test_blank_lines_with_whitespace_split() {
        let chunks = chunk_text("first\n   \nsecond", 5, 0);
        assert_eq!(chunks, vec!["first".to_string(), "second".to_string()]);
    }
}

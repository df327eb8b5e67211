use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content-addressed record ID (blake3 hex hash).
pub type RecordId = String;

/// A contiguous span of a source document prepared for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub total: usize,
    /// Characters at the front of `text` repeated from the previous chunk.
    pub overlap: usize,
}

impl Chunk {
    /// The part of the chunk not already covered by its predecessor.
    pub fn fresh_text(&self) -> &str {
        let start = self
            .text
            .char_indices()
            .nth(self.overlap)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        &self.text[start..]
    }
}

/// Metadata stored alongside each chunk's vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    /// File name the chunk came from.
    pub source: String,
    /// First `# ` heading of the document, falling back to the file name.
    pub title: String,
    pub file_path: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub ingested_at: i64,
}

/// A retrieved chunk with its similarity score. Lives only for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextDocument {
    pub text: String,
    /// Stored metadata minus the text key.
    pub metadata: Map<String, Value>,
    pub score: f32,
}

impl ContextDocument {
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
    }
}

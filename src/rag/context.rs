use serde_json::Value;

use crate::docs::types::ContextDocument;
use crate::gateway::{IndexMatch, TEXT_KEY};

/// Split the reserved text key out of a raw match.
pub fn to_context_document(hit: IndexMatch) -> ContextDocument {
    let mut metadata = hit.metadata;
    let text = match metadata.remove(TEXT_KEY) {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    ContextDocument {
        text,
        metadata,
        score: hit.score,
    }
}

/// Render documents as numbered blocks, in the order given.
/// An empty slice yields an empty string.
pub fn format_context(documents: &[ContextDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("Document {} from {}:\n{}\n", i + 1, doc.source(), doc.text))
        .collect::<Vec<_>>()
        .join("\n")
}

//! Capability interfaces for the external collaborators.
//!
//! The retrieval and generation code only ever talks to these traits, so the
//! HTTP client and the on-disk index can be swapped for fakes in tests.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key that carries the chunk text inside a stored record.
pub const TEXT_KEY: &str = "text";

/// Exact-match metadata filter: every key must be present with an equal value.
pub type MetadataFilter = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One vector plus its metadata, as written to the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: Map<String, Value>,
}

/// A raw similarity hit. `metadata` still includes the reserved text key.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// With `json_object` set the backend is asked to reply with a JSON object.
    async fn complete(&self, messages: &[Message], json_object: bool) -> Result<String>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<bool>;

    /// Up to `top_k` matches ordered by descending cosine similarity.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexMatch>>;

    /// Remove every record. Succeeds on an already-empty index.
    async fn delete_all(&self) -> Result<bool>;
}

/// True when every filter entry is present in `metadata` with an equal value.
pub fn matches_filter(metadata: &Map<String, Value>, filter: Option<&MetadataFilter>) -> bool {
    filter.map_or(true, |f| {
        f.iter().all(|(key, expected)| metadata.get(key) == Some(expected))
    })
}

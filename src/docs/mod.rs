pub mod chunker;
pub mod ingest;
pub mod types;

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::gateway::{matches_filter, IndexMatch, MetadataFilter, VectorIndex, VectorRecord};

// Substore prefix (no trailing slash, cnidarium convention)
const INDEX_PREFIX: &str = "index";

fn namespace_prefix(namespace: &str) -> String {
    format!("{}/{}/", INDEX_PREFIX, namespace)
}
fn record_key(namespace: &str, id: &str) -> String {
    format!("{}/{}/{}", INDEX_PREFIX, namespace, id)
}

/// Embedded vector index: records live as JSON in cnidarium and queries are
/// a brute-force cosine scan over one namespace.
pub struct LocalIndex {
    storage: Storage,
    namespace: String,
}

impl LocalIndex {
    pub async fn open(data_dir: &Path, namespace: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let storage = Storage::load(data_dir.to_path_buf(), vec![INDEX_PREFIX.to_string()])
            .await
            .context("Failed to init cnidarium storage")?;
        info!(?data_dir, namespace, "vector index opened");
        Ok(Self {
            storage,
            namespace: namespace.to_string(),
        })
    }

    async fn scan(&self) -> Result<Vec<(String, VectorRecord)>> {
        let snapshot = self.storage.latest_snapshot();
        read_records(snapshot.prefix_raw(&namespace_prefix(&self.namespace))).await
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.scan().await?.len())
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<bool> {
        if records.is_empty() {
            return Ok(true);
        }
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        let count = records.len();
        for record in &records {
            delta.put_raw(
                record_key(&self.namespace, &record.id),
                serde_json::to_vec(record).context("serialize VectorRecord")?,
            );
        }
        self.storage.commit(delta).await?;
        debug!(count, namespace = %self.namespace, "records upserted");
        Ok(true)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexMatch>> {
        let mut matches: Vec<IndexMatch> = self
            .scan()
            .await?
            .into_iter()
            .filter(|(key, record)| {
                if record.vector.len() != vector.len() {
                    warn!(key = %key, "Skipping record with mismatched dimension");
                    return false;
                }
                matches_filter(&record.metadata, filter)
            })
            .map(|(_, record)| IndexMatch {
                score: cosine_similarity(vector, &record.vector),
                id: record.id,
                metadata: record.metadata,
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_all(&self) -> Result<bool> {
        let keys: Vec<String> = self.scan().await?.into_iter().map(|(key, _)| key).collect();
        if keys.is_empty() {
            info!(namespace = %self.namespace, "Index namespace already empty");
            return Ok(true);
        }
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        for key in &keys {
            delta.delete(key.clone());
        }
        self.storage.commit(delta).await?;
        info!(count = keys.len(), namespace = %self.namespace, "Deleted all index records");
        Ok(true)
    }
}

/// Decode a prefix stream. Records that fail to deserialize are skipped; a
/// storage read error aborts the scan.
async fn read_records<S>(mut stream: S) -> Result<Vec<(String, VectorRecord)>>
where
    S: Stream<Item = Result<(String, Vec<u8>)>> + Unpin,
{
    let mut records = Vec::new();
    while let Some(entry) = stream.next().await {
        let (key, value) = entry.context("Failed to read index stream")?;
        match serde_json::from_slice::<VectorRecord>(&value) {
            Ok(record) => records.push((key, record)),
            Err(e) => warn!(key = %key, "Skipping unreadable index record: {}", e),
        }
    }
    Ok(records)
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

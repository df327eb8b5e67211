use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::chunker::Chunker;
use super::types::{RecordId, RecordMeta};
use crate::gateway::{EmbeddingGateway, VectorIndex, VectorRecord, TEXT_KEY};

static TITLE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("title regex"));

/// Everything one ingestion run needs.
pub struct Ingestor<'a> {
    pub embedder: &'a dyn EmbeddingGateway,
    pub index: &'a dyn VectorIndex,
    pub chunker: Chunker,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub files: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
}

impl Ingestor<'_> {
    /// Chunk, embed and store one file. Returns `(stored, failed)` chunk
    /// counts; a chunk that fails to embed or upsert is logged and skipped.
    pub async fn ingest_file(&self, path: &Path) -> Result<(usize, usize)> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let content = to_text(path, &raw);

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let title = extract_title(&content).unwrap_or_else(|| file_name.clone());
        let chunks = self.chunker.chunk(&content);
        let ingested_at = chrono::Utc::now();

        let mut stored = 0usize;
        let mut failed = 0usize;
        for chunk in &chunks {
            let meta = RecordMeta {
                source: file_name.clone(),
                title: title.clone(),
                file_path: path.display().to_string(),
                chunk_index: chunk.index,
                total_chunks: chunk.total,
                ingested_at: ingested_at.timestamp(),
            };
            let id = record_id(
                &meta.file_path,
                chunk.index,
                &chunk.text,
                ingested_at.timestamp_nanos_opt().unwrap_or_default(),
            );

            debug!(
                chunk = chunk.index,
                overlap = chunk.overlap,
                fresh_chars = chunk.fresh_text().chars().count(),
                "embedding chunk"
            );
            match self.store_chunk(id, &chunk.text, &meta).await {
                Ok(true) => stored += 1,
                Ok(false) => {
                    failed += 1;
                    error!(path = %path.display(), chunk = chunk.index, "Index rejected chunk");
                }
                Err(e) => {
                    failed += 1;
                    error!(path = %path.display(), chunk = chunk.index, "Failed to ingest chunk: {:#}", e);
                }
            }
        }

        info!(path = %path.display(), chunks = chunks.len(), stored, failed, "File ingested");
        Ok((stored, failed))
    }

    async fn store_chunk(&self, id: RecordId, text: &str, meta: &RecordMeta) -> Result<bool> {
        let vector = self.embedder.embed(text).await?;
        let mut metadata = match serde_json::to_value(meta)? {
            Value::Object(map) => map,
            _ => anyhow::bail!("record metadata did not serialize to an object"),
        };
        metadata.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        self.index
            .upsert(vec![VectorRecord {
                id,
                vector,
                metadata,
            }])
            .await
    }

    /// Recursively ingest every file under `dir` whose name ends with one of
    /// `extensions` (all files when empty).
    pub async fn ingest_directory(&self, dir: &Path, extensions: &[String]) -> Result<IngestSummary> {
        anyhow::ensure!(dir.is_dir(), "{} does not exist or is not a directory", dir.display());

        let mut files = Vec::new();
        collect_files(dir, &mut files)?;
        files.sort();

        let mut summary = IngestSummary::default();
        for path in files {
            let name = path.to_string_lossy();
            if !extensions.is_empty() && !extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
                continue;
            }
            match self.ingest_file(&path).await {
                Ok((stored, failed)) => {
                    if stored > 0 {
                        summary.files += 1;
                    }
                    summary.chunks += stored;
                    summary.failed_chunks += failed;
                }
                Err(e) => warn!(path = %path.display(), "Skipping file: {:#}", e),
            }
        }
        Ok(summary)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// HTML files are flattened to text; everything else is read as UTF-8 (lossy).
fn to_text(path: &Path, raw: &[u8]) -> String {
    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
        .unwrap_or(false);
    if is_html {
        html2text::from_read(raw, 120).unwrap_or_else(|_| String::from_utf8_lossy(raw).to_string())
    } else {
        String::from_utf8_lossy(raw).to_string()
    }
}

/// First markdown `# ` heading, if any.
pub fn extract_title(content: &str) -> Option<String> {
    TITLE_HEADING
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Unique per ingestion run: the timestamp makes re-ingestion produce new IDs.
fn record_id(file_path: &str, chunk_index: usize, text: &str, nanos: i64) -> RecordId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(file_path.as_bytes());
    hasher.update(&chunk_index.to_le_bytes());
    hasher.update(&nanos.to_le_bytes());
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{IndexMatch, MetadataFilter};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingGateway for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("poison") {
                anyhow::bail!("embedding backend down");
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        records: Mutex<Vec<VectorRecord>>,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn upsert(&self, records: Vec<VectorRecord>) -> Result<bool> {
            self.records.lock().unwrap().extend(records);
            Ok(true)
        }
        async fn query(&self, _: &[f32], _: usize, _: Option<&MetadataFilter>) -> Result<Vec<IndexMatch>> {
            Ok(vec![])
        }
        async fn delete_all(&self) -> Result<bool> {
            self.records.lock().unwrap().clear();
            Ok(true)
        }
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("intro\n# Meta Ads Guide\n\nbody"),
            Some("Meta Ads Guide".to_string())
        );
        assert_eq!(extract_title("## not a title\nplain"), None);
    }

    #[test]
    fn test_record_ids_change_between_runs() {
        let a = record_id("kb/a.md", 0, "text", 1);
        let b = record_id("kb/a.md", 0, "text", 2);
        assert_ne!(a, b);
        assert_eq!(a, record_id("kb/a.md", 0, "text", 1));
    }

    #[tokio::test]
    async fn test_ingest_directory_filters_and_stores_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("guide.md"),
            "# Budget Guide\n\nStart with $10 per day.\n\nScale winners.",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/notes.txt"), "Plain notes").unwrap();
        std::fs::write(dir.path().join("image.png"), "not text").unwrap();

        let index = RecordingIndex::default();
        let ingestor = Ingestor {
            embedder: &FakeEmbedder,
            index: &index,
            chunker: Chunker::new(1000, 200),
        };
        let summary = ingestor
            .ingest_directory(dir.path(), &[".md".to_string(), ".txt".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.failed_chunks, 0);

        let records = index.records.lock().unwrap();
        let guide = records
            .iter()
            .find(|r| r.metadata["source"] == "guide.md")
            .unwrap();
        assert_eq!(guide.metadata["title"], "Budget Guide");
        assert_eq!(guide.metadata["chunk_index"], 0);
        assert_eq!(guide.metadata["total_chunks"], 1);
        assert!(guide.metadata[TEXT_KEY].as_str().unwrap().contains("Scale winners."));

        let notes = records
            .iter()
            .find(|r| r.metadata["source"] == "notes.txt")
            .unwrap();
        assert_eq!(notes.metadata["title"], "notes.txt");
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_abort_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.md");
        std::fs::write(&path, format!("{}\n\npoison paragraph", "a".repeat(40))).unwrap();

        let index = RecordingIndex::default();
        let ingestor = Ingestor {
            embedder: &FakeEmbedder,
            index: &index,
            chunker: Chunker::new(30, 0),
        };
        let (stored, failed) = ingestor.ingest_file(&path).await.unwrap();
        assert_eq!((stored, failed), (1, 1));
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let index = RecordingIndex::default();
        let ingestor = Ingestor {
            embedder: &FakeEmbedder,
            index: &index,
            chunker: Chunker::new(1000, 200),
        };
        assert!(ingestor
            .ingest_directory(Path::new("/definitely/not/here"), &[])
            .await
            .is_err());
    }
}

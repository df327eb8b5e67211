use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Chat and embedding endpoint settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            max_tokens: 4000,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub data_dir: PathBuf,
    pub namespace: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/index"),
            namespace: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Process-wide settings. Loaded once in `main`, then handed to each
/// component's constructor and never mutated.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub index: IndexConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = AppConfig::default();

        let llm = LlmConfig {
            base_url: get("LLM_BASE_URL").unwrap_or(defaults.llm.base_url),
            api_key: get("LLM_API_KEY"),
            model: get("LLM_MODEL").unwrap_or(defaults.llm.model),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.llm.embedding_model),
            max_tokens: parse_or(&get, "LLM_MAX_TOKENS", defaults.llm.max_tokens)?,
            temperature: parse_or(&get, "LLM_TEMPERATURE", defaults.llm.temperature)?,
            timeout: Duration::from_secs(parse_or(
                &get,
                "LLM_TIMEOUT_SECS",
                defaults.llm.timeout.as_secs(),
            )?),
            max_retries: parse_or(&get, "LLM_MAX_RETRIES", defaults.llm.max_retries)?.max(1),
        };

        let index = IndexConfig {
            data_dir: get("INDEX_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index.data_dir),
            namespace: get("INDEX_NAMESPACE").unwrap_or(defaults.index.namespace),
        };
        if index.namespace.contains('/') {
            return Err(ConfigError::Invalid {
                key: "INDEX_NAMESPACE",
                value: index.namespace,
            });
        }

        let chunking = ChunkingConfig {
            max_chunk_size: parse_or(&get, "CHUNK_SIZE", defaults.chunking.max_chunk_size)?,
            overlap: parse_or(&get, "CHUNK_OVERLAP", defaults.chunking.overlap)?,
        };
        if chunking.overlap >= chunking.max_chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                size: chunking.max_chunk_size,
                overlap: chunking.overlap,
            });
        }

        let retrieval = RetrievalConfig {
            top_k: parse_or(&get, "RETRIEVAL_TOP_K", defaults.retrieval.top_k)?,
        };

        Ok(Self {
            llm,
            index,
            chunking,
            retrieval,
        })
    }

    /// The chat and embedding gateways cannot run without a key.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.llm
            .api_key
            .as_deref()
            .ok_or(ConfigError::Missing("LLM_API_KEY"))
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.chunking.max_chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert!(config.llm.api_key.is_none());
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("LLM_MODEL", "gpt-4o"),
            ("LLM_API_KEY", "  "),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("INDEX_NAMESPACE", "ads"),
        ]))
        .unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.chunking.max_chunk_size, 500);
        assert_eq!(config.index.namespace, "ads");
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = AppConfig::from_lookup(lookup(&[("RETRIEVAL_TOP_K", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "RETRIEVAL_TOP_K", .. }));

        let err = AppConfig::from_lookup(lookup(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::OverlapTooLarge { .. }));
    }
}

pub mod context;
pub mod prompts;

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::docs::types::ContextDocument;
use crate::error::GenerationError;
use crate::gateway::{EmbeddingGateway, GenerationGateway, Message, MetadataFilter, VectorIndex};
use crate::validate::rules::{REQUIRED_SECTIONS, SECTION_FIELDS};

use context::{format_context, to_context_document};
use prompts::CampaignBrief;

/// Embeds a query and reshapes index hits into context documents.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingGateway>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingGateway>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Most similar first. Any gateway failure degrades to an empty result.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Vec<ContextDocument> {
        let vector = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to embed query, continuing without context: {:#}", e);
                return Vec::new();
            }
        };

        match self.index.query(&vector, top_k, filter).await {
            Ok(hits) => {
                debug!(hits = hits.len(), top_k, "context retrieved");
                hits.into_iter().map(to_context_document).collect()
            }
            Err(e) => {
                warn!("Failed to query index, continuing without context: {:#}", e);
                Vec::new()
            }
        }
    }
}

/// Outcome of one generation attempt. Parse and shape problems are data so
/// the caller can decide whether to retry.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Spec(Value),
    Failed(GenerationError),
}

pub struct CampaignDraft {
    pub query: String,
    pub sources: Vec<ContextDocument>,
    pub generation: Generation,
}

pub struct Answer {
    pub text: String,
    pub sources: Vec<ContextDocument>,
}

pub struct RagService {
    retriever: Retriever,
    llm: Arc<dyn GenerationGateway>,
    top_k: usize,
}

impl RagService {
    pub fn new(retriever: Retriever, llm: Arc<dyn GenerationGateway>, top_k: usize) -> Self {
        Self {
            retriever,
            llm,
            top_k,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Retrieve grounding context for the brief and ask the model for a
    /// specification. A failing completion call is fatal and propagates.
    pub async fn generate_campaign(&self, brief: &CampaignBrief) -> Result<CampaignDraft> {
        let query = prompts::brief_to_query(brief);
        let sources = self.retriever.retrieve(&query, self.top_k, None).await;
        let context = format_context(&sources);

        let messages = vec![
            Message::system(prompts::campaign_system_message(&context)),
            Message::user(prompts::campaign_user_message(brief)),
        ];
        let raw = self.llm.complete(&messages, true).await?;

        let generation = match parse_specification(&raw) {
            Ok(spec) => Generation::Spec(spec),
            Err(e) => {
                warn!("Generated specification rejected: {}", e);
                Generation::Failed(e)
            }
        };
        info!(
            sources = sources.len(),
            ok = matches!(generation, Generation::Spec(_)),
            "campaign generation finished"
        );

        Ok(CampaignDraft {
            query,
            sources,
            generation,
        })
    }

    /// Grounded question answering over the knowledge base.
    pub async fn ask(&self, question: &str, top_k: usize) -> Result<Answer> {
        let sources = self.retriever.retrieve(question, top_k, None).await;
        let context = format_context(&sources);
        let messages = vec![
            Message::system(prompts::ask_system_message(&context)),
            Message::user(question),
        ];
        let text = self.llm.complete(&messages, false).await?;
        Ok(Answer { text, sources })
    }
}

/// Parse completion text and check it has every section and the fields each
/// section needs before it can be validated in depth.
pub fn parse_specification(raw: &str) -> Result<Value, GenerationError> {
    let spec: Value =
        serde_json::from_str(raw).map_err(|e| GenerationError::InvalidJson(e.to_string()))?;
    let object = spec.as_object().ok_or(GenerationError::NotAnObject)?;

    let missing: Vec<String> = REQUIRED_SECTIONS
        .iter()
        .filter(|s| !object.get(**s).map_or(false, Value::is_object))
        .map(|s| s.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(GenerationError::MissingSections(missing));
    }

    let mut missing_fields = Vec::new();
    for (section, fields) in SECTION_FIELDS {
        let body = &object[*section];
        for (field, _) in fields.iter() {
            if body.get(field).map_or(true, Value::is_null) {
                missing_fields.push(format!("{}.{}", section, field));
            }
        }
    }
    if !missing_fields.is_empty() {
        return Err(GenerationError::MissingFields(missing_fields));
    }

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{IndexMatch, VectorRecord};
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::Mutex;

    struct FixedEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingGateway for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail {
                anyhow::bail!("embedding service unavailable");
            }
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    struct CannedIndex {
        hits: Vec<IndexMatch>,
        fail: bool,
    }

    #[async_trait]
    impl VectorIndex for CannedIndex {
        async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<bool> {
            Ok(true)
        }
        async fn query(&self, _: &[f32], top_k: usize, _: Option<&MetadataFilter>) -> Result<Vec<IndexMatch>> {
            if self.fail {
                anyhow::bail!("index unreachable");
            }
            Ok(self.hits.iter().take(top_k).cloned().collect())
        }
        async fn delete_all(&self) -> Result<bool> {
            Ok(true)
        }
    }

    struct ScriptedLlm {
        reply: String,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl GenerationGateway for ScriptedLlm {
        async fn complete(&self, messages: &[Message], _json_object: bool) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn hit(text: &str, source: &str, score: f32) -> IndexMatch {
        let mut metadata = Map::new();
        metadata.insert("text".to_string(), json!(text));
        metadata.insert("source".to_string(), json!(source));
        IndexMatch {
            id: source.to_string(),
            score,
            metadata,
        }
    }

    fn canned_hits() -> Vec<IndexMatch> {
        vec![
            hit("Test document 1", "test_source_1", 0.95),
            hit("Test document 2", "test_source_2", 0.85),
        ]
    }

    fn retriever(embed_fail: bool, index_fail: bool) -> Retriever {
        Retriever::new(
            Arc::new(FixedEmbedder { fail: embed_fail }),
            Arc::new(CannedIndex {
                hits: canned_hits(),
                fail: index_fail,
            }),
        )
    }

    fn valid_spec() -> Value {
        json!({
            "campaign": {"name": "Test Campaign", "objective": "OUTCOME_AWARENESS", "status": "PAUSED"},
            "ad_set": {
                "name": "Test Ad Set",
                "optimization_goal": "REACH",
                "billing_event": "IMPRESSIONS",
                "bid_strategy": "LOWEST_COST_WITHOUT_CAP",
                "budget": {"amount": 1000, "type": "daily"},
                "targeting": {"geo_locations": {"countries": ["US"]}}
            },
            "ad": {
                "name": "Test Ad",
                "creative": {
                    "title": "Test Title",
                    "body": "Test Body",
                    "call_to_action": "LEARN_MORE",
                    "link": "https://example.com"
                }
            }
        })
    }

    #[tokio::test]
    async fn test_retrieve_preserves_order_and_strips_text() {
        let docs = retriever(false, false).retrieve("Test query", 5, None).await;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "Test document 1");
        assert_eq!(docs[1].text, "Test document 2");
        assert!(docs.iter().all(|d| !d.metadata.contains_key("text")));
        assert_eq!(docs[0].source(), "test_source_1");
        assert_eq!(docs[0].score, 0.95);
    }

    #[tokio::test]
    async fn test_retrieve_degrades_to_empty() {
        assert!(retriever(true, false).retrieve("q", 5, None).await.is_empty());
        assert!(retriever(false, true).retrieve("q", 5, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_generate_campaign_grounds_prompt() {
        let llm = Arc::new(ScriptedLlm {
            reply: valid_spec().to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let service = RagService::new(retriever(false, false), llm.clone(), 5);
        let brief = CampaignBrief {
            platform: "Meta".to_string(),
            product_description: "A test product".to_string(),
            objective: "OUTCOME_AWARENESS".to_string(),
            target_audience: "Test audience".to_string(),
            daily_budget: Some(10.0),
            ..CampaignBrief::default()
        };

        let draft = service.generate_campaign(&brief).await.unwrap();
        assert_eq!(draft.sources.len(), 2);
        match &draft.generation {
            Generation::Spec(spec) => assert_eq!(spec["campaign"]["name"], "Test Campaign"),
            Generation::Failed(e) => panic!("unexpected failure: {}", e),
        }

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0][0].content.contains("Document 1 from test_source_1:"));
        assert!(seen[0][1].content.contains("daily_budget_cents: 1000"));
    }

    #[tokio::test]
    async fn test_generate_campaign_reports_parse_failure() {
        let llm = Arc::new(ScriptedLlm {
            reply: "not json at all".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let service = RagService::new(retriever(false, true), llm, 5);
        let draft = service.generate_campaign(&CampaignBrief::default()).await.unwrap();
        assert!(draft.sources.is_empty());
        assert!(matches!(draft.generation, Generation::Failed(GenerationError::InvalidJson(_))));
    }

    #[test]
    fn test_parse_specification_shape_errors() {
        assert_eq!(parse_specification("[1, 2]"), Err(GenerationError::NotAnObject));

        let err = parse_specification(r#"{"campaign": {}, "ad": {}}"#).unwrap_err();
        assert_eq!(err, GenerationError::MissingSections(vec!["ad_set".to_string()]));

        let mut spec = valid_spec();
        spec["ad"].as_object_mut().unwrap().remove("creative");
        let err = parse_specification(&spec.to_string()).unwrap_err();
        assert_eq!(err, GenerationError::MissingFields(vec!["ad.creative".to_string()]));

        assert!(parse_specification(&valid_spec().to_string()).is_ok());
    }

    #[tokio::test]
    async fn test_ask_returns_sources() {
        let llm = Arc::new(ScriptedLlm {
            reply: "Start at $10/day.".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let service = RagService::new(retriever(false, false), llm, 5);
        let answer = service.ask("How much should I spend?", 1).await.unwrap();
        assert_eq!(answer.text, "Start at $10/day.");
        assert_eq!(answer.sources.len(), 1);
    }
}

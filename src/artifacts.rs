use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

/// An identifier that only exists once an upstream object has been created
/// on the ads platform. Payloads carry it as a literal `{{name}}` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderDependency {
    pub name: &'static str,
    /// Artifacts whose payload references the token.
    pub files: &'static [&'static str],
    pub description: &'static str,
    pub depends_on: Option<&'static str>,
    /// Execution step that has to finish before the token can be filled.
    pub required_before: &'static str,
}

impl PlaceholderDependency {
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.name)
    }
}

pub const PLACEHOLDERS: &[PlaceholderDependency] = &[
    PlaceholderDependency {
        name: "campaign_id",
        files: &["ad_set"],
        description: "ID returned when the campaign is created",
        depends_on: None,
        required_before: "create_ad_set",
    },
    PlaceholderDependency {
        name: "ad_set_id",
        files: &["ad"],
        description: "ID returned when the ad set is created",
        depends_on: Some("campaign_id"),
        required_before: "create_ad",
    },
    PlaceholderDependency {
        name: "creative_id",
        files: &["ad"],
        description: "ID returned when the ad creative is created",
        depends_on: Some("page_id"),
        required_before: "create_ad",
    },
    PlaceholderDependency {
        name: "page_id",
        files: &["ad_creative"],
        description: "Facebook page that publishes the ad",
        depends_on: None,
        required_before: "create_ad_creative",
    },
];

/// Artifact name to payload, in a stable order.
pub type Artifacts = BTreeMap<String, Value>;

/// Turn a checked specification into the four ads-platform payloads.
pub fn build_artifacts(spec: &Value) -> Artifacts {
    let campaign = &spec["campaign"];
    let ad_set = &spec["ad_set"];
    let ad = &spec["ad"];
    let creative = &ad["creative"];
    let status = campaign["status"].clone();

    let campaign_payload = json!({
        "name": campaign["name"],
        "objective": campaign["objective"],
        "status": status,
        "special_ad_categories": campaign.get("special_ad_categories").cloned().unwrap_or_else(|| json!([])),
    });

    let mut ad_set_payload = Map::new();
    ad_set_payload.insert("name".into(), ad_set["name"].clone());
    ad_set_payload.insert("campaign_id".into(), json!("{{campaign_id}}"));
    for key in ["optimization_goal", "billing_event", "bid_strategy", "targeting"] {
        ad_set_payload.insert(key.into(), ad_set[key].clone());
    }
    ad_set_payload.insert("status".into(), status.clone());
    let budget = &ad_set["budget"];
    let budget_key = match budget["type"].as_str() {
        Some("lifetime") => "lifetime_budget",
        _ => "daily_budget",
    };
    ad_set_payload.insert(budget_key.into(), budget["amount"].clone());
    if let Some(schedule) = ad_set.get("schedule").and_then(Value::as_object) {
        for key in ["start_time", "end_time"] {
            if let Some(value) = schedule.get(key).filter(|v| !v.is_null()) {
                ad_set_payload.insert(key.into(), value.clone());
            }
        }
    }

    let name = ad["name"].as_str().unwrap_or_default();
    let creative_payload = json!({
        "name": format!("{} Creative", name),
        "object_story_spec": {
            "page_id": "{{page_id}}",
            "link_data": {
                "message": creative["body"],
                "link": creative["link"],
                "name": creative["title"],
                "description": creative.get("image_description").cloned().unwrap_or_else(|| json!("")),
                "call_to_action": {
                    "type": creative["call_to_action"],
                    "value": {"link": creative["link"]}
                }
            }
        }
    });

    let ad_payload = json!({
        "name": ad["name"],
        "adset_id": "{{ad_set_id}}",
        "creative": {"creative_id": "{{creative_id}}"},
        "status": status,
    });

    BTreeMap::from([
        ("campaign".to_string(), campaign_payload),
        ("ad_set".to_string(), Value::Object(ad_set_payload)),
        ("ad_creative".to_string(), creative_payload),
        ("ad".to_string(), ad_payload),
    ])
}

/// Registry entries whose token occurs in any payload, once each, in
/// registry order.
pub fn find_placeholders(artifacts: &Artifacts) -> Vec<&'static PlaceholderDependency> {
    let serialized: Vec<String> = artifacts.values().map(Value::to_string).collect();
    PLACEHOLDERS
        .iter()
        .filter(|p| {
            let token = p.token();
            serialized.iter().any(|s| s.contains(&token))
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ArtifactMetadata<'a> {
    generated_at: String,
    query: &'a str,
    placeholders: BTreeMap<&'static str, &'static PlaceholderDependency>,
}

/// Write `<name>.json` per artifact plus `metadata.json`. Returns the paths
/// written, metadata last.
pub async fn write_artifacts(dir: &Path, artifacts: &Artifacts, query: &str) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(artifacts.len() + 1);
    for (name, payload) in artifacts {
        let path = dir.join(format!("{}.json", name));
        write_json(&path, payload).await?;
        written.push(path);
    }

    let metadata = ArtifactMetadata {
        generated_at: chrono::Utc::now().to_rfc3339(),
        query,
        placeholders: find_placeholders(artifacts)
            .into_iter()
            .map(|p| (p.name, p))
            .collect(),
    };
    let path = dir.join("metadata.json");
    write_json(&path, &metadata).await?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "artifacts written");
    Ok(written)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> Value {
        json!({
            "campaign": {"name": "Trail Launch", "objective": "OUTCOME_TRAFFIC", "status": "PAUSED"},
            "ad_set": {
                "name": "Runners",
                "optimization_goal": "LINK_CLICKS",
                "billing_event": "IMPRESSIONS",
                "bid_strategy": "LOWEST_COST_WITHOUT_CAP",
                "budget": {"amount": 5000, "type": "lifetime"},
                "targeting": {"geo_locations": {"countries": ["US"]}},
                "schedule": {"start_time": "2026-03-01T00:00:00Z"}
            },
            "ad": {
                "name": "Trail Ad",
                "creative": {
                    "title": "Run Further",
                    "body": "Grip for every trail.",
                    "call_to_action": "SHOP_NOW",
                    "link": "https://example.com"
                }
            }
        })
    }

    #[test]
    fn test_token_format() {
        assert_eq!(PLACEHOLDERS[0].token(), "{{campaign_id}}");
    }

    #[test]
    fn test_single_reference_found_once() {
        let artifacts = BTreeMap::from([
            ("ad_set".to_string(), json!({"campaign_id": "{{campaign_id}}", "note": "{{campaign_id}}"})),
            ("campaign".to_string(), json!({"name": "Plain"})),
        ]);
        let found = find_placeholders(&artifacts);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], &PLACEHOLDERS[0]);
        assert_eq!(found[0].files, &["ad_set"]);
        assert_eq!(found[0].required_before, "create_ad_set");
    }

    #[test]
    fn test_build_artifacts_payloads() {
        let artifacts = build_artifacts(&spec());
        assert_eq!(
            artifacts.keys().collect::<Vec<_>>(),
            vec!["ad", "ad_creative", "ad_set", "campaign"]
        );

        let ad_set = &artifacts["ad_set"];
        assert_eq!(ad_set["lifetime_budget"], 5000);
        assert!(ad_set.get("daily_budget").is_none());
        assert_eq!(ad_set["start_time"], "2026-03-01T00:00:00Z");
        assert!(ad_set.get("end_time").is_none());

        assert_eq!(artifacts["campaign"]["special_ad_categories"], json!([]));
        assert_eq!(artifacts["ad_creative"]["name"], "Trail Ad Creative");
        assert_eq!(artifacts["ad"]["creative"]["creative_id"], "{{creative_id}}");
    }

    #[test]
    fn test_all_placeholders_in_registry_order() {
        let names: Vec<&str> = find_placeholders(&build_artifacts(&spec()))
            .iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["campaign_id", "ad_set_id", "creative_id", "page_id"]);
    }

    #[tokio::test]
    async fn test_write_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let artifacts = build_artifacts(&spec());

        let written = write_artifacts(&out, &artifacts, "trail shoes").await.unwrap();
        assert_eq!(written.len(), 5);
        assert!(written.last().unwrap().ends_with("metadata.json"));

        let raw = std::fs::read_to_string(out.join("metadata.json")).unwrap();
        let metadata: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(metadata["query"], "trail shoes");
        assert!(chrono::DateTime::parse_from_rfc3339(metadata["generated_at"].as_str().unwrap()).is_ok());
        assert_eq!(metadata["placeholders"]["ad_set_id"]["depends_on"], "campaign_id");
        assert!(metadata["placeholders"]["page_id"]["depends_on"].is_null());

        let ad_set: Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("ad_set.json")).unwrap()).unwrap();
        assert_eq!(ad_set["campaign_id"], "{{campaign_id}}");
    }
}

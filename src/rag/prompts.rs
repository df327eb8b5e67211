use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::Value;

/// Campaign brief as supplied by the user. Unknown keys are kept and passed
/// through to the prompt verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignBrief {
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub target_audience: String,
    /// Major currency units (dollars).
    #[serde(default)]
    pub daily_budget: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_platform() -> String {
    "Meta".to_string()
}

/// Dollars to integer cents, the unit every specification `amount` uses.
pub fn to_minor_units(major: f64) -> i64 {
    (major * 100.0).round() as i64
}

/// Cents back to a `$12.34` display string.
pub fn format_minor_units(minor: f64) -> String {
    format!("${:.2}", minor / 100.0)
}

/// Condense a brief into the retrieval query.
pub fn brief_to_query(brief: &CampaignBrief) -> String {
    let platform = if brief.platform.trim().is_empty() {
        "Meta"
    } else {
        brief.platform.as_str()
    };
    format!(
        "Create a {} ad campaign for {} with objective {} targeting {}",
        platform, brief.product_description, brief.objective, brief.target_audience
    )
}

pub const CAMPAIGN_SYSTEM_PROMPT: &str = r#"You are an advertising strategist working inside a retrieval-augmented campaign generator. Turn the user's brief into a complete, platform-ready campaign specification.

### What to produce
- One JSON object with the sections `campaign`, `ad_set`, `ad` and `reasoning`.
- Campaign names must reflect the product and the objective.
- The ad set's optimization goal must fit the campaign objective (awareness -> reach or impressions, sales -> conversions, traffic -> link clicks or landing page views).
- Billing events, bid strategies and call-to-action values must use the platform's enum names exactly.
- Targeting should be neither too broad nor too narrow; ages stay within 13-65; genders use 1 (male) and 2 (female).

### Units and limits
- Every budget `amount` is an integer in minor currency units (cents). $10.00 per day is `1000`. The minimum is `100`.
- Names are at most 255 characters, ad titles 125, ad bodies 500, image descriptions 200.
- Links must be absolute `https://` URLs.
- Schedule times are ISO-8601 strings with the start before the end.

### Using the documentation
- Prefer recommendations backed by the retrieved documents below and cite them in `reasoning.documentation_references`.
- When the documents are silent, fall back to common industry benchmarks and say so in the reasoning.

Here is relevant context from documentation that may help:

"#;

pub const SPEC_SHAPE: &str = r#"{
  "campaign": {
    "name": string,
    "objective": string,
    "special_ad_categories": [string],
    "budget_optimization": boolean,
    "status": string
  },
  "ad_set": {
    "name": string,
    "optimization_goal": string,
    "billing_event": string,
    "bid_strategy": string,
    "budget": { "amount": integer (cents), "type": "daily" | "lifetime" },
    "targeting": {
      "geo_locations": object,
      "age_min": integer,
      "age_max": integer,
      "genders": [integer],
      "interests": [object]
    },
    "schedule": { "start_time": string, "end_time": string }
  },
  "ad": {
    "name": string,
    "creative": {
      "title": string,
      "body": string,
      "call_to_action": string,
      "link": string,
      "image_description": string
    }
  },
  "reasoning": {
    "audience_analysis": string,
    "creative_strategy": string,
    "budget_rationale": string,
    "documentation_references": [string]
  }
}"#;

pub fn campaign_system_message(context: &str) -> String {
    format!("{}{}", CAMPAIGN_SYSTEM_PROMPT, context)
}

/// Brief lines followed by the expected JSON shape. The dollar budget is
/// converted to cents here, so the model never sees two unit conventions.
pub fn campaign_user_message(brief: &CampaignBrief) -> String {
    let mut msg = String::from("Please create a complete campaign specification based on this brief:\n\n");
    let _ = writeln!(msg, "platform: {}", brief.platform);
    for (key, value) in [
        ("product_name", &brief.product_name),
        ("product_description", &brief.product_description),
        ("objective", &brief.objective),
        ("target_audience", &brief.target_audience),
    ] {
        if !value.trim().is_empty() {
            let _ = writeln!(msg, "{}: {}", key, value);
        }
    }
    if let Some(budget) = brief.daily_budget {
        let _ = writeln!(msg, "daily_budget_cents: {}", to_minor_units(budget));
    }
    for (key, value) in &brief.extra {
        match value {
            Value::String(s) => {
                let _ = writeln!(msg, "{}: {}", key, s);
            }
            other => {
                let _ = writeln!(msg, "{}: {}", key, other);
            }
        }
    }
    msg.push_str("\nRespond with a complete campaign specification in JSON format with the following structure:\n");
    msg.push_str(SPEC_SHAPE);
    msg
}

pub fn ask_system_message(context: &str) -> String {
    format!(
        "You are a knowledgeable assistant specialized in Meta advertising best practices.\n\
         Use the following retrieved information to answer the user's question.\n\
         If the information does not contain the answer, say so instead of guessing.\n\n\
         Retrieved information:\n{}",
        context
    )
}

//! Rule engine for generated campaign specifications.
//!
//! Validation is read-only and deterministic. A missing top-level section
//! stops everything with a single issue; otherwise every section is checked
//! and all issues accumulate in order. A section with missing fields reports
//! them once and skips its deeper value checks.

pub mod rules;

use serde::Serialize;
use serde_json::{Map, Value};

use rules::{FieldSpec, Kind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_sections: Vec<String>,
}

impl ValidationResult {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            issues,
            missing_sections: Vec::new(),
        }
    }
}

/// Check a specification against every section, field, value and
/// cross-section rule.
pub fn validate(spec: &Value) -> ValidationResult {
    let empty = Map::new();
    let root = spec.as_object().unwrap_or(&empty);

    let missing_sections: Vec<String> = rules::REQUIRED_SECTIONS
        .iter()
        .filter(|s| !root.contains_key(**s))
        .map(|s| s.to_string())
        .collect();
    if !missing_sections.is_empty() {
        return ValidationResult {
            is_valid: false,
            issues: vec![format!(
                "Missing required top-level sections in campaign specification: {}",
                missing_sections.join(", ")
            )],
            missing_sections,
        };
    }

    let campaign = &root["campaign"];
    let ad_set = &root["ad_set"];
    let ad = &root["ad"];
    let objective = campaign.get("objective").and_then(Value::as_str);

    let mut issues = Vec::new();
    check_campaign(campaign, &mut issues);
    check_ad_set(ad_set, objective, &mut issues);
    check_ad(ad, &mut issues);
    check_cross_section(campaign, ad_set, &mut issues);

    ValidationResult::from_issues(issues)
}

fn check_campaign(campaign: &Value, issues: &mut Vec<String>) {
    let Some(c) = require_fields(campaign, "campaign", rules::CAMPAIGN_FIELDS, issues) else {
        return;
    };

    check_length(text(c, "name"), rules::MAX_NAME_LEN, "Campaign name", issues);

    let objective = text(c, "objective");
    if !rules::OBJECTIVES.contains(&objective) {
        issues.push(format!(
            "Invalid campaign objective: {}. Must be one of: {}",
            objective,
            rules::OBJECTIVES.join(", ")
        ));
    }

    let status = text(c, "status");
    if !rules::STATUSES.contains(&status) {
        issues.push(format!(
            "Invalid campaign status: {}. Must be one of: {}",
            status,
            rules::STATUSES.join(", ")
        ));
    }
}

fn check_ad_set(ad_set: &Value, objective: Option<&str>, issues: &mut Vec<String>) {
    let Some(s) = require_fields(ad_set, "ad_set", rules::AD_SET_FIELDS, issues) else {
        return;
    };

    check_length(text(s, "name"), rules::MAX_NAME_LEN, "Ad set name", issues);

    // An objective outside the table allows no goals here.
    let goal = text(s, "optimization_goal");
    if let Some(objective) = objective {
        let allowed = rules::allowed_goals(objective).unwrap_or(&[]);
        if !allowed.contains(&goal) {
            issues.push(format!(
                "Invalid optimization goal '{}' for campaign objective '{}'",
                goal, objective
            ));
        }
    }

    let billing = text(s, "billing_event");
    if !rules::BILLING_EVENTS.contains(&billing) {
        issues.push(format!(
            "Invalid billing event: {}. Must be one of: {}",
            billing,
            rules::BILLING_EVENTS.join(", ")
        ));
    }

    let bid = text(s, "bid_strategy");
    if !rules::BID_STRATEGIES.contains(&bid) {
        issues.push(format!(
            "Invalid bid strategy: {}. Must be one of: {}",
            bid,
            rules::BID_STRATEGIES.join(", ")
        ));
    }

    check_budget(&s["budget"], issues);
    check_targeting(&s["targeting"], issues);

    if let Some(schedule) = present(s, "schedule") {
        check_schedule(schedule, issues);
    }
}

fn check_budget(budget: &Value, issues: &mut Vec<String>) {
    let Some(b) = require_fields(budget, "budget", rules::BUDGET_FIELDS, issues) else {
        return;
    };

    let kind = text(b, "type");
    if !rules::BUDGET_TYPES.contains(&kind) {
        issues.push(format!(
            "Invalid budget type: {}. Must be one of: {}",
            kind,
            rules::BUDGET_TYPES.join(", ")
        ));
    }

    let amount = &b["amount"];
    match as_number(amount) {
        Some(value) if value < rules::MIN_BUDGET_AMOUNT => issues.push(format!(
            "Budget amount must be at least {} cents",
            rules::MIN_BUDGET_AMOUNT
        )),
        Some(_) => {}
        None => issues.push(format!(
            "Invalid budget amount: {}. Must be a number",
            display(amount)
        )),
    }
}

fn check_targeting(targeting: &Value, issues: &mut Vec<String>) {
    let Some(t) = targeting.as_object().filter(|t| present(t, "geo_locations").is_some()) else {
        issues.push("Missing required targeting field: geo_locations".to_string());
        return;
    };

    // Age bounds are only checked as a pair.
    if let (Some(age_min), Some(age_max)) = (present(t, "age_min"), present(t, "age_max")) {
        match (as_integer(age_min), as_integer(age_max)) {
            (Some(min), Some(max)) => {
                if min < rules::MIN_AGE {
                    issues.push(format!("Minimum age cannot be less than {}", rules::MIN_AGE));
                }
                if max > rules::MAX_AGE {
                    issues.push(format!("Maximum age cannot be greater than {}", rules::MAX_AGE));
                }
                if min > max {
                    issues.push("Minimum age cannot be greater than maximum age".to_string());
                }
            }
            _ => issues.push("Age values must be integers".to_string()),
        }
    }

    if let Some(genders) = present(t, "genders") {
        match genders.as_array() {
            Some(values) => {
                for gender in values {
                    let valid = as_integer(gender).map_or(false, |g| rules::VALID_GENDERS.contains(&g));
                    if !valid {
                        issues.push(format!(
                            "Invalid gender value: {}. Must be one of: {:?}",
                            display(gender),
                            rules::VALID_GENDERS
                        ));
                    }
                }
            }
            None => issues.push(format!(
                "Invalid genders: {}. Must be a list of {:?}",
                display(genders),
                rules::VALID_GENDERS
            )),
        }
    }
}

/// ISO-8601 timestamps in one format compare correctly as strings.
fn check_schedule(schedule: &Value, issues: &mut Vec<String>) {
    let Some(s) = schedule.as_object() else {
        issues.push("Invalid schedule: must be an object".to_string());
        return;
    };
    match (present(s, "start_time"), present(s, "end_time")) {
        (Some(start), Some(end)) => match (start.as_str(), end.as_str()) {
            (Some(start), Some(end)) => {
                if start >= end {
                    issues.push("Start time must be before end time".to_string());
                }
            }
            _ => issues.push("Schedule times must be strings".to_string()),
        },
        _ => {}
    }
}

fn check_ad(ad: &Value, issues: &mut Vec<String>) {
    let Some(a) = require_fields(ad, "ad", rules::AD_FIELDS, issues) else {
        return;
    };
    check_length(text(a, "name"), rules::MAX_NAME_LEN, "Ad name", issues);
    check_creative(&a["creative"], issues);
}

fn check_creative(creative: &Value, issues: &mut Vec<String>) {
    let Some(c) = require_fields(creative, "creative", rules::CREATIVE_FIELDS, issues) else {
        return;
    };

    check_length(text(c, "title"), rules::MAX_TITLE_LEN, "Ad title", issues);
    check_length(text(c, "body"), rules::MAX_BODY_LEN, "Ad body", issues);
    if let Some(description) = c.get("image_description").and_then(Value::as_str) {
        check_length(
            description,
            rules::MAX_IMAGE_DESCRIPTION_LEN,
            "Image description",
            issues,
        );
    }

    let cta = text(c, "call_to_action");
    if !rules::CALL_TO_ACTIONS.contains(&cta) {
        issues.push(format!(
            "Invalid call to action: {}. Must be one of: {}",
            cta,
            rules::CALL_TO_ACTIONS.join(", ")
        ));
    }

    let link = text(c, "link");
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        issues.push("Link URL must start with http:// or https://".to_string());
    }
}

/// Objective and optimization goal live in different sections; this runs
/// whenever both are present, regardless of other missing fields.
fn check_cross_section(campaign: &Value, ad_set: &Value, issues: &mut Vec<String>) {
    let objective = campaign.get("objective").and_then(Value::as_str);
    let goal = ad_set.get("optimization_goal").and_then(Value::as_str);
    if let (Some(objective), Some(goal)) = (objective, goal) {
        if let Some(allowed) = rules::allowed_goals(objective) {
            if !allowed.contains(&goal) {
                issues.push(format!(
                    "Optimization goal '{}' is not compatible with campaign objective '{}'",
                    goal, objective
                ));
            }
        }
    }
}

/// The section as an object when every required field is present with the
/// right kind. Otherwise one issue listing the missing fields.
fn require_fields<'a>(
    section: &'a Value,
    name: &str,
    fields: &[FieldSpec],
    issues: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    let object = section.as_object();
    let missing: Vec<String> = fields
        .iter()
        .filter(|(field, kind)| !object.map_or(false, |o| has_kind(o.get(*field), *kind)))
        .map(|(field, _)| format!("{}.{}", name, field))
        .collect();

    if missing.is_empty() {
        object
    } else {
        issues.push(format!(
            "Missing required {} fields: {}",
            name.replace('_', " "),
            missing.join(", ")
        ));
        None
    }
}

fn has_kind(value: Option<&Value>, kind: Kind) -> bool {
    match (value, kind) {
        (None, _) | (Some(Value::Null), _) => false,
        (Some(v), Kind::Text) => v.is_string(),
        (Some(v), Kind::Object) => v.is_object(),
        (Some(_), Kind::Value) => true,
    }
}

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| !v.is_null())
}

/// Only called after `require_fields` confirmed the field is a string.
fn text<'a>(object: &'a Map<String, Value>, key: &str) -> &'a str {
    object.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn check_length(value: &str, max: usize, label: &str, issues: &mut Vec<String>) {
    if value.chars().count() > max {
        issues.push(format!(
            "{} exceeds maximum length of {} characters",
            label, max
        ));
    }
}

/// Numbers and numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Whole numbers, including `25.0` and `"25"`.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::rag::prompts::format_minor_units;
use crate::validate::{validate, ValidationResult};

pub async fn run(path: &Path, json: bool) -> Result<ExitCode> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let spec: Value =
        serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))?;

    let result = validate(&spec);
    info!(path = %path.display(), valid = result.is_valid, issues = result.issues.len(), "Specification validated");

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&spec);
        print_report(&result);
    }
    Ok(if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub(super) fn print_report(result: &ValidationResult) {
    if result.is_valid {
        println!("Specification is valid.");
        return;
    }
    println!("Specification has {} issue(s):", result.issues.len());
    for issue in &result.issues {
        println!("  - {}", issue);
    }
}

/// One-line overview of the main fields, budget shown in dollars.
pub(super) fn print_summary(spec: &Value) {
    let field = |section: &str, key: &str| spec[section][key].as_str().unwrap_or("?").to_string();
    let budget = &spec["ad_set"]["budget"];
    let amount = match &budget["amount"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    let budget = match amount {
        Some(cents) => format!(
            "{} {}",
            format_minor_units(cents),
            budget["type"].as_str().unwrap_or("")
        ),
        None => "?".to_string(),
    };

    println!("Campaign:  {} ({})", field("campaign", "name"), field("campaign", "objective"));
    println!("Ad set:    {} ({})", field("ad_set", "name"), field("ad_set", "optimization_goal"));
    println!("Budget:    {}", budget.trim_end());
    println!("Ad:        {}", field("ad", "name"));
}

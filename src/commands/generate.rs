use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::validate::{print_report, print_summary};
use crate::artifacts::{build_artifacts, find_placeholders, write_artifacts};
use crate::rag::prompts::CampaignBrief;
use crate::rag::Generation;
use crate::state::AppState;
use crate::validate::validate;

pub async fn run(state: &AppState, input: &Path, output: &Path, force: bool) -> Result<ExitCode> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read brief {}", input.display()))?;
    let brief: CampaignBrief =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a valid campaign brief", input.display()))?;

    info!(input = %input.display(), objective = %brief.objective, "Campaign generation started");
    let draft = state.rag.generate_campaign(&brief).await?;

    println!("Grounded on {} document(s):", draft.sources.len());
    super::print_sources(&draft.sources);
    println!();

    let spec = match draft.generation {
        Generation::Spec(spec) => spec,
        Generation::Failed(e) => {
            println!("Generation failed: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let result = validate(&spec);
    print_summary(&spec);
    print_report(&result);

    if !result.is_valid {
        if !force {
            println!("\nNot writing artifacts. Fix the brief or rerun with --force to export anyway.");
            return Ok(ExitCode::FAILURE);
        }
        warn!(issues = result.issues.len(), "Exporting invalid specification (--force)");
    }

    let artifacts = build_artifacts(&spec);
    let written = write_artifacts(output, &artifacts, &draft.query).await?;
    println!("\nWrote {} file(s) to {}", written.len(), output.display());

    let placeholders = find_placeholders(&artifacts);
    if !placeholders.is_empty() {
        println!("Placeholders to fill at execution time:");
        for p in placeholders {
            println!("  {} -> {} (before {})", p.token(), p.files.join(", "), p.required_before);
        }
    }
    Ok(ExitCode::SUCCESS)
}

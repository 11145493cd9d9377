//! Summarise a variant classification history file.

use std::path::Path;

use serde::Serialize;
use watchtower_core::{VariantHistory, VariantSummary};

use super::CliResult;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    summary: VariantSummary,
    significant: Vec<&'a VariantHistory>,
}

pub fn run(file: &Path, json: bool) -> CliResult {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let histories: Vec<VariantHistory> = serde_json::from_str(&content)?;

    let report = Report {
        summary: VariantSummary::from_histories(&histories),
        significant: histories.iter().filter(|h| h.has_significant_change()).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let s = &report.summary;
    println!("Variants:          {}", s.variants);
    println!("Significant:       {}", s.significant);
    println!("Upgraded:          {}", s.upgraded);
    println!("Downgraded:        {}", s.downgraded);
    println!("Multiple changes:  {}", s.multiple_changes);

    for h in &report.significant {
        if let Some(change) = h.latest_significant_change() {
            println!(
                "  {} {}: {} -> {} ({}, {})",
                h.gene,
                h.variant,
                change.previous_classification.label(),
                change.new_classification.label(),
                change.source,
                change.date
            );
        }
    }
    Ok(())
}

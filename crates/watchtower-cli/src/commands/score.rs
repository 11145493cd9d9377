//! Score opportunities from a JSON file without touching the store.

use std::path::Path;

use serde::Serialize;
use watchtower_core::{Capabilities, MatchBreakdown, MatchingEngine, Opportunity};

use super::{CliResult, Context};

#[derive(Serialize)]
struct Scored<'a> {
    id: &'a str,
    title: &'a str,
    #[serde(flatten)]
    breakdown: MatchBreakdown,
}

/// Accepts a single opportunity or an array of them.
fn read_opportunities(path: &Path) -> Result<Vec<Opportunity>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

pub fn run(
    ctx: &Context,
    file: &Path,
    capabilities_file: Option<&Path>,
    json: bool,
) -> CliResult {
    let capabilities = match capabilities_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            serde_json::from_str::<Capabilities>(&content)?
        }
        None => ctx.load_config()?.capabilities(),
    };
    let opportunities = read_opportunities(file)?;
    let engine = MatchingEngine::new();

    let scored: Vec<Scored> = opportunities
        .iter()
        .map(|o| Scored {
            id: &o.id,
            title: &o.title,
            breakdown: engine.breakdown(o, &capabilities),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&scored)?);
        return Ok(());
    }

    for s in &scored {
        println!("{}  {:.3}  {}", s.id, s.breakdown.total, s.title);
        for term in &s.breakdown.terms {
            println!("    {:<16} {:.3}", term.name, term.contribution);
        }
        if !s.breakdown.matched_keywords.is_empty() {
            println!("    matched: {}", s.breakdown.matched_keywords.join(", "));
        }
    }
    Ok(())
}

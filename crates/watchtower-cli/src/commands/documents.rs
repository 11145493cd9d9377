//! Grant proposal drafts and trial registration.

use std::path::Path;

use watchtower_core::{CoreError, TrialOpportunity};

use super::{block_on, CliResult, Context};

/// Draft a proposal for a cached opportunity, scanning first when it is not
/// cached yet.
pub fn proposal(ctx: &Context, opportunity_id: &str, json: bool) -> CliResult {
    let (_, engine) = ctx.engine()?;
    let id = opportunity_id.to_string();
    let proposal = block_on(async move {
        let proposal = match engine.generate_grant_proposal_for(&id).await {
            Err(CoreError::NotFound(_)) => {
                engine.scan_opportunities().await?;
                engine.generate_grant_proposal_for(&id).await?
            }
            other => other?,
        };
        Ok::<_, Box<dyn std::error::Error>>(proposal)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&proposal)?);
        return Ok(());
    }
    println!("Proposal generated: {}", proposal.id);
    println!("  Title: {}", proposal.title);
    println!(
        "  Budget: ${} personnel, ${} equipment, ${} supplies, ${} travel, ${} indirect",
        proposal.budget.personnel,
        proposal.budget.equipment,
        proposal.budget.supplies,
        proposal.budget.travel,
        proposal.budget.indirect
    );
    for phase in &proposal.timeline {
        println!("  {phase}");
    }
    Ok(())
}

/// Register a draft trial read from a JSON file.
pub fn register_trial(ctx: &Context, file: &Path, json: bool) -> CliResult {
    let content = std::fs::read_to_string(file)
        .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
    let trial: TrialOpportunity = serde_json::from_str(&content)?;

    let (_, engine) = ctx.engine()?;
    let registration = block_on(async move {
        Ok::<_, Box<dyn std::error::Error>>(engine.auto_register_trial(trial).await?)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registration)?);
    } else {
        println!("Trial {} submitted: {}", registration.trial_id, registration.registration_id);
    }
    Ok(())
}

//! Daily report assembly from live store data.

use chrono::NaiveDate;

use crate::compliance::ComplianceMonitor;
use crate::engine::ResearchEngine;
use crate::error::Result;
use crate::opportunity::{Opportunity, OpportunityStatus};
use crate::records::{
    self, keys, AutomationFigures, CoordinationFigures, DailyReport, FundingFigures, MatchSnapshot,
    OpportunityFigures, ScanSnapshot,
};

fn sum_budget<'a>(opportunities: impl Iterator<Item = &'a Opportunity>) -> u64 {
    opportunities.map(|o| o.budget_cap).sum()
}

/// Summarise the cached opportunities, coordinations, retained proposals
/// and the last scan and match snapshots as of `today`.
pub async fn build_daily_report(
    engine: &ResearchEngine,
    compliance: &ComplianceMonitor,
    alerts_sent: u32,
    today: NaiveDate,
) -> Result<DailyReport> {
    let store = engine.store().as_ref();
    let threshold = engine.high_priority_threshold();

    let opportunities = engine.opportunities().await?;
    let coordinations = engine.coordinations().await?;
    let proposals = engine.proposals().await?;
    let last_scan = records::fetch_lenient::<ScanSnapshot>(store, keys::LAST_SCAN).await?;
    let last_match = records::fetch_lenient::<MatchSnapshot>(store, keys::LAST_MATCH).await?;

    let active: Vec<&Opportunity> = opportunities.iter().filter(|o| o.is_active()).collect();
    let completed = coordinations.iter().filter(|c| c.is_completed(today)).count() as u32;

    Ok(DailyReport {
        date: today,
        opportunities: OpportunityFigures {
            total: opportunities.len() as u32,
            new: last_scan.map(|s| s.opportunities_found).unwrap_or(0),
            high_priority: opportunities.iter().filter(|o| o.match_score > threshold).count() as u32,
            average_match_score: last_match.map(|m| m.average_match_score).unwrap_or(0.0),
        },
        coordinations: CoordinationFigures {
            active: coordinations.len() as u32 - completed,
            completed,
            compliance_issues: compliance.check(&coordinations, today).issues,
        },
        funding: FundingFigures {
            total_pipeline: sum_budget(active.iter().copied()),
            high_probability: sum_budget(active.iter().copied().filter(|o| o.match_score > threshold)),
            submitted: sum_budget(
                opportunities
                    .iter()
                    .filter(|o| o.status == OpportunityStatus::Submitted),
            ),
        },
        automation: AutomationFigures {
            proposals_generated: proposals.len() as u32,
            documents_created: coordinations.iter().map(|c| c.documents.len() as u32).sum(),
            alerts_sent,
        },
    })
}

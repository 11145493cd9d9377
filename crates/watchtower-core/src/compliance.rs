//! Regulatory compliance checks over stored coordinations.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::coordination::ResearchCoordination;

/// Days ahead within which a certification counts as expiring.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub checked: u32,
    pub issues: u32,
    pub expiring: u32,
    /// Ids of coordinations with at least one issue.
    #[serde(default)]
    pub flagged: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ComplianceMonitor {
    expiry_window: Duration,
}

impl Default for ComplianceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_WINDOW_DAYS)
    }
}

impl ComplianceMonitor {
    pub fn new(expiry_window_days: i64) -> Self {
        Self {
            expiry_window: Duration::days(expiry_window_days),
        }
    }

    /// Whether `coordination` is missing a required approval.
    pub fn has_issue(&self, coordination: &ResearchCoordination) -> bool {
        let c = &coordination.compliance;
        !c.irb_approval
            || !c.institutional_approval
            || !c.hipaa_compliance
            || (coordination.automation.auto_compliance_monitoring && !c.cpic_compliance)
    }

    /// Certifications expiring on or before `today + window`. Already
    /// expired ones count.
    pub fn expiring(&self, coordination: &ResearchCoordination, today: NaiveDate) -> u32 {
        let horizon = today + self.expiry_window;
        coordination
            .compliance
            .expiration_dates
            .values()
            .filter(|date| **date <= horizon)
            .count() as u32
    }

    pub fn check(&self, coordinations: &[ResearchCoordination], today: NaiveDate) -> ComplianceResult {
        let mut result = ComplianceResult {
            checked: coordinations.len() as u32,
            ..ComplianceResult::default()
        };
        for coordination in coordinations {
            if self.has_issue(coordination) {
                result.issues += 1;
                result.flagged.push(coordination.id.clone());
            }
            result.expiring += self.expiring(coordination, today);
        }
        result
    }
}

//! Funding opportunity records.
//!
//! An [`Opportunity`] is created by a scan, re-scored in place by every
//! matching pass and expires from the store when no scan refreshes it.
//! Clinical trials arrive as [`TrialOpportunity`] and are folded into the
//! same shape before caching.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Agency feed an opportunity was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FundingSource {
    Nih,
    Barda,
    Sbir,
    Va,
    Dod,
    Nsf,
    Cdc,
}

/// Funding mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundingMechanism {
    R01,
    R21,
    U01,
    U24,
    SbirI,
    SbirIi,
    Baa,
    Cooperative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceLevel {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReimbursementPotential {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    Active,
    Archived,
    Submitted,
    Awarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    UnderReview,
    Awarded,
    Declined,
}

/// Pharmacogenomic (CPIC) alignment of an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpicAlignment {
    #[serde(default)]
    pub genes: Vec<String>,
    #[serde(default)]
    pub drugs: Vec<String>,
    #[serde(default)]
    pub guidelines: Vec<String>,
    pub evidence_level: EvidenceLevel,
    /// 0..=100
    pub implementation_score: u8,
    pub reimbursement_potential: ReimbursementPotential,
}

/// A past submission against an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub opportunity_id: String,
    pub submission_date: NaiveDate,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub award_amount: Option<u64>,
    #[serde(default)]
    pub project_period: Option<String>,
}

/// A funding or collaboration opportunity being scored for relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub source: FundingSource,
    #[serde(rename = "type")]
    pub kind: FundingMechanism,
    pub title: String,
    pub agency: String,
    pub institute: String,
    pub program: String,
    pub announcement_number: String,
    pub due_date: NaiveDate,
    /// Whole dollars.
    pub budget_cap: u64,
    #[serde(rename = "duration")]
    pub duration_months: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "keyWords")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub eligibility_criteria: Vec<String>,
    #[serde(default)]
    pub strategic_priorities: Vec<String>,
    pub cpic_alignment: CpicAlignment,
    /// 0.0..=1.0, overwritten by every matching pass.
    #[serde(default)]
    pub match_score: f64,
    pub status: OpportunityStatus,
    #[serde(default)]
    pub submission_history: Vec<SubmissionRecord>,
}

impl Opportunity {
    pub fn is_active(&self) -> bool {
        self.status == OpportunityStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialPhase {
    I,
    II,
    III,
    IV,
}

impl std::fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TrialPhase::I => "I",
            TrialPhase::II => "II",
            TrialPhase::III => "III",
            TrialPhase::IV => "IV",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Recruiting,
    Planning,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Draft,
    Submitted,
    Approved,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Recruiting,
    NotRecruiting,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSite {
    pub name: String,
    pub location: String,
    pub principal_investigator: String,
    pub status: SiteStatus,
    pub target_enrollment: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    High,
    Low,
    Normal,
}

/// Genomic eligibility criterion of a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenomicCriteria {
    pub gene: String,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub expression: Option<Expression>,
    #[serde(default)]
    pub biomarker: Option<String>,
    pub required: bool,
    pub cpic_relevant: bool,
}

/// A clinical trial that can be coordinated as a funding opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialOpportunity {
    pub id: String,
    #[serde(default)]
    pub nct_id: Option<String>,
    pub title: String,
    pub phase: TrialPhase,
    pub condition: String,
    pub intervention: String,
    pub sponsor: String,
    #[serde(default)]
    pub sites: Vec<TrialSite>,
    #[serde(default)]
    pub inclusion_criteria: Vec<String>,
    #[serde(default)]
    pub exclusion_criteria: Vec<String>,
    #[serde(default)]
    pub genomic_requirements: Vec<GenomicCriteria>,
    pub estimated_enrollment: u32,
    pub status: TrialStatus,
    pub registration_status: RegistrationStatus,
}

/// Days between conversion and the due date of a trial-derived opportunity.
const TRIAL_DUE_IN_DAYS: i64 = 30;

impl TrialOpportunity {
    /// Fold this trial into a coordination-support opportunity.
    ///
    /// `today` anchors the due date so conversion stays deterministic.
    pub fn to_opportunity(&self, today: NaiveDate) -> Opportunity {
        let nct = self.nct_id.as_deref().unwrap_or("UNREGISTERED");
        Opportunity {
            id: format!("TRIAL_OPP_{}", self.id),
            source: FundingSource::Nih,
            kind: FundingMechanism::U01,
            title: format!("Clinical Trial Coordination: {}", self.title),
            agency: "NIH".into(),
            institute: "NCI".into(),
            program: "Clinical Trials Network".into(),
            announcement_number: format!("CTN-{nct}"),
            due_date: today + Duration::days(TRIAL_DUE_IN_DAYS),
            budget_cap: 1_000_000,
            duration_months: 36,
            description: format!("Coordination and support for {}", self.title),
            keywords: vec![
                self.condition.to_lowercase(),
                self.intervention.to_lowercase(),
                "clinical trial".into(),
            ],
            eligibility_criteria: vec!["Academic medical centers".into(), "Cancer centers".into()],
            strategic_priorities: vec!["Cancer Research".into(), "Clinical Trials".into()],
            cpic_alignment: CpicAlignment {
                genes: self
                    .genomic_requirements
                    .iter()
                    .filter(|g| g.cpic_relevant)
                    .map(|g| g.gene.clone())
                    .collect(),
                drugs: Vec::new(),
                guidelines: vec!["CPIC".into()],
                evidence_level: EvidenceLevel::B,
                implementation_score: 70,
                reimbursement_potential: ReimbursementPotential::Medium,
            },
            match_score: 0.0,
            status: OpportunityStatus::Active,
            submission_history: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial() -> TrialOpportunity {
        TrialOpportunity {
            id: "TRIAL_001".into(),
            nct_id: Some("NCT05123456".into()),
            title: "Precision Oncology Trial for Breast Cancer".into(),
            phase: TrialPhase::II,
            condition: "Breast Cancer".into(),
            intervention: "Targeted Therapy".into(),
            sponsor: "Norton Healthcare".into(),
            sites: vec![],
            inclusion_criteria: vec![],
            exclusion_criteria: vec![],
            genomic_requirements: vec![
                GenomicCriteria {
                    gene: "HER2".into(),
                    variant: None,
                    expression: Some(Expression::High),
                    biomarker: None,
                    required: true,
                    cpic_relevant: false,
                },
                GenomicCriteria {
                    gene: "CYP2D6".into(),
                    variant: Some("*4/*4".into()),
                    expression: None,
                    biomarker: None,
                    required: false,
                    cpic_relevant: true,
                },
            ],
            estimated_enrollment: 200,
            status: TrialStatus::Recruiting,
            registration_status: RegistrationStatus::Live,
        }
    }

    #[test]
    fn trial_conversion_keeps_only_cpic_relevant_genes() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let opp = trial().to_opportunity(today);

        assert_eq!(opp.id, "TRIAL_OPP_TRIAL_001");
        assert_eq!(opp.announcement_number, "CTN-NCT05123456");
        assert_eq!(opp.cpic_alignment.genes, vec!["CYP2D6".to_string()]);
        assert_eq!(opp.cpic_alignment.implementation_score, 70);
        assert_eq!(opp.due_date, NaiveDate::from_ymd_opt(2024, 2, 9).unwrap());
        assert_eq!(
            opp.keywords,
            vec!["breast cancer", "targeted therapy", "clinical trial"]
        );
        assert!(opp.is_active());
    }

    #[test]
    fn opportunity_json_uses_dashboard_field_names() {
        let opp = trial().to_opportunity(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let json = serde_json::to_value(&opp).unwrap();

        assert_eq!(json["type"], "U01");
        assert_eq!(json["source"], "NIH");
        assert_eq!(json["duration"], 36);
        assert_eq!(json["dueDate"], "2024-02-09");
        assert_eq!(json["cpicAlignment"]["evidenceLevel"], "B");
        assert!(json.get("keywords").is_some());
    }

    #[test]
    fn legacy_keyword_field_is_accepted() {
        let raw = serde_json::json!({
            "id": "SBIR_HHS_2024_001",
            "source": "SBIR",
            "type": "SBIR_I",
            "title": "AI-Driven Clinical Trial Matching Platform",
            "agency": "HHS",
            "institute": "ONC",
            "program": "Health IT Innovation",
            "announcementNumber": "SBIR-24-HHS-001",
            "dueDate": "2024-02-28",
            "budgetCap": 300000,
            "duration": 12,
            "keyWords": ["AI", "automation"],
            "cpicAlignment": {
                "evidenceLevel": "B",
                "implementationScore": 75,
                "reimbursementPotential": "medium"
            },
            "status": "active"
        });

        let opp: Opportunity = serde_json::from_value(raw).unwrap();
        assert_eq!(opp.kind, FundingMechanism::SbirI);
        assert_eq!(opp.keywords.len(), 2);
        assert_eq!(opp.match_score, 0.0);
    }
}

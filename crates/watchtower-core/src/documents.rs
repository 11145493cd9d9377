//! Generated research documents: grant proposal drafts and trial
//! registration packets.
//!
//! Generation here is pure. The engine assigns ids, stamps the time and
//! persists the results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;
use crate::opportunity::{Opportunity, TrialOpportunity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    #[default]
    Draft,
    Review,
    Submitted,
}

/// Budget split in whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetBreakdown {
    pub personnel: u64,
    pub equipment: u64,
    pub supplies: u64,
    pub travel: u64,
    pub indirect: u64,
}

impl BudgetBreakdown {
    /// 65% personnel, 15% equipment, 10% supplies and 5% travel, rounded
    /// down. Indirect costs take the remainder so the parts sum to `total`.
    pub fn split(total: u64) -> Self {
        let share = |percent: u128| (total as u128 * percent / 100) as u64;
        let personnel = share(65);
        let equipment = share(15);
        let supplies = share(10);
        let travel = share(5);
        Self {
            personnel,
            equipment,
            supplies,
            travel,
            indirect: total - personnel - equipment - supplies - travel,
        }
    }

    pub fn total(&self) -> u64 {
        self.personnel + self.equipment + self.supplies + self.travel + self.indirect
    }
}

/// A block of project months, 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPhase {
    pub name: String,
    pub start_month: u32,
    pub end_month: u32,
}

impl std::fmt::Display for ProposalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Months {}-{}: {}", self.start_month, self.end_month, self.name)
    }
}

const PHASE_NAMES: [&str; 3] = [
    "Platform Development",
    "Clinical Validation",
    "Implementation and Evaluation",
];

/// Three phases cut at one and two thirds of `months`. A phase left with
/// no months on a very short project is dropped.
pub fn proposal_timeline(months: u32) -> Vec<ProposalPhase> {
    let cuts = [0, months / 3, (u64::from(months) * 2 / 3) as u32, months];
    PHASE_NAMES
        .iter()
        .enumerate()
        .filter(|(i, _)| cuts[i + 1] > cuts[*i])
        .map(|(i, name)| ProposalPhase {
            name: name.to_string(),
            start_month: cuts[i] + 1,
            end_month: cuts[i + 1],
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelRole {
    pub role: String,
    /// `None` until someone is assigned.
    #[serde(default)]
    pub name: Option<String>,
    pub effort_percent: u8,
}

fn role(role: &str, effort_percent: u8) -> PersonnelRole {
    PersonnelRole {
        role: role.to_string(),
        name: None,
        effort_percent,
    }
}

/// Standard staffing plan for an implementation grant.
pub fn default_personnel() -> Vec<PersonnelRole> {
    vec![
        role("Principal Investigator", 25),
        role("Co-Principal Investigator", 50),
        role("Bioinformatician", 100),
        role("Software Engineer", 100),
        role("Clinical Coordinator", 50),
    ]
}

/// A generated grant proposal draft for one opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantProposal {
    pub id: String,
    pub opportunity_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub specific_aims: Vec<String>,
    pub significance: String,
    pub innovation: String,
    pub approach: String,
    pub budget: BudgetBreakdown,
    pub timeline: Vec<ProposalPhase>,
    pub personnel: Vec<PersonnelRole>,
    pub status: ProposalStatus,
    pub generated_at: DateTime<Utc>,
}

const SPECIFIC_AIMS: [&str; 4] = [
    "Develop and validate AI-powered genomic analysis algorithms aligned with CPIC guidelines",
    "Implement Epic FHIR integration for real-time clinical decision support",
    "Deploy automated clinical trial matching for precision oncology patients",
    "Evaluate clinical outcomes and cost-effectiveness in real-world settings",
];

fn bullets(items: &[String]) -> String {
    items.iter().map(|item| format!("- {item}\n")).collect()
}

impl GrantProposal {
    /// Draft a proposal for `opportunity` from the institution's profile.
    pub fn draft(
        id: String,
        opportunity: &Opportunity,
        capabilities: &Capabilities,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let priorities = &opportunity.strategic_priorities;
        let summary = format!(
            "The AGENT (Adaptive Genomic Evidence Network for Trials) platform addresses {} \
             through an AI-driven approach integrated with the electronic health record. \
             It delivers CPIC pharmacogenomic recommendations and automated clinical trial \
             matching at the point of care. This proposal aligns with {} and advances the {} \
             mission to bring genomic medicine into clinical practice.",
            opportunity.title.to_lowercase(),
            if priorities.is_empty() {
                "the program's priorities".to_string()
            } else {
                priorities.join(", ")
            },
            opportunity.institute,
        );

        let mut significance = String::from(
            "This work closes the gap between pharmacogenomic guidelines and routine care \
             by automating CPIC guideline implementation inside the EHR workflow.\n",
        );
        if !priorities.is_empty() {
            significance.push_str(&format!("Direct alignment with {}.\n", priorities.join(" and ")));
        }

        let mut innovation = String::from("Innovation elements include:\n");
        innovation.push_str(&bullets(&[
            "EHR-native application for genomic medicine".to_string(),
            "AI-powered clinical trial matching with CPIC integration".to_string(),
            "Automated regulatory compliance and documentation".to_string(),
        ]));

        let mut approach = String::from("Our approach builds on established institutional capabilities:\n");
        approach.push_str(&bullets(&capabilities.technologies));
        if !capabilities.regulatory_experience.is_empty() {
            approach.push_str(&format!(
                "Regulatory experience: {}.\n",
                capabilities.regulatory_experience.join(", ")
            ));
        }

        Self {
            id,
            opportunity_id: opportunity.id.clone(),
            title: format!("AGENT Platform Implementation for {}", opportunity.title),
            summary,
            specific_aims: SPECIFIC_AIMS.iter().map(|s| s.to_string()).collect(),
            significance,
            innovation,
            approach,
            budget: BudgetBreakdown::split(opportunity.budget_cap),
            timeline: proposal_timeline(opportunity.duration_months),
            personnel: default_personnel(),
            status: ProposalStatus::Draft,
            generated_at,
        }
    }
}

/// Documents submitted with a trial registration, as Markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialDocuments {
    pub protocol: String,
    pub informed_consent: String,
    pub investigator_brochure: String,
}

impl TrialDocuments {
    pub fn for_trial(trial: &TrialOpportunity) -> Self {
        let criteria = |items: &[String]| {
            if items.is_empty() {
                "- None specified\n".to_string()
            } else {
                bullets(items)
            }
        };
        let genomic: Vec<String> = trial
            .genomic_requirements
            .iter()
            .map(|g| format!("{}: {}", g.gene, if g.required { "Required" } else { "Optional" }))
            .collect();
        let cpic: Vec<String> = trial
            .genomic_requirements
            .iter()
            .filter(|g| g.cpic_relevant)
            .map(|g| format!("{}: CPIC guideline applies", g.gene))
            .collect();

        let protocol = format!(
            "# Clinical Trial Protocol: {title}\n\n\
             ## Study Objectives\n\
             Primary: Evaluate efficacy of {intervention} in {condition}\n\
             Secondary: Assess safety and tolerability\n\n\
             ## Study Design\n\
             Phase {phase} clinical trial, estimated enrollment {enrollment}\n\n\
             ## Inclusion Criteria\n{inclusion}\n\
             ## Exclusion Criteria\n{exclusion}\n\
             ## Genomic Requirements\n{genomic}",
            title = trial.title,
            intervention = trial.intervention,
            condition = trial.condition,
            phase = trial.phase,
            enrollment = trial.estimated_enrollment,
            inclusion = criteria(&trial.inclusion_criteria),
            exclusion = criteria(&trial.exclusion_criteria),
            genomic = criteria(&genomic),
        );

        let informed_consent = format!(
            "# Informed Consent Form: {title}\n\n\
             ## Purpose of the Study\n\
             This study evaluates {intervention} for the treatment of {condition}.\n\n\
             ## Procedures\n\
             You will undergo genomic testing and receive study treatment based on your genetic profile.\n\n\
             ## Confidentiality\n\
             Your genetic information is protected under HIPAA.\n",
            title = trial.title,
            intervention = trial.intervention,
            condition = trial.condition,
        );

        let investigator_brochure = format!(
            "# Investigator Brochure: {title}\n\n\
             ## Background\n\
             {intervention} has shown promise in {condition} treatment.\n\n\
             ## Sponsor\n{sponsor}\n\n\
             ## CPIC Guidelines\n{cpic}",
            title = trial.title,
            intervention = trial.intervention,
            condition = trial.condition,
            sponsor = trial.sponsor,
            cpic = criteria(&cpic),
        );

        Self {
            protocol,
            informed_consent,
            investigator_brochure,
        }
    }
}

/// Outcome of submitting a trial for registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRegistration {
    pub registration_id: String,
    pub trial_id: String,
    pub submitted_at: DateTime<Utc>,
    pub documents: TrialDocuments,
}

//! Institutional capability snapshot used as the comparison basis for scoring.

use serde::{Deserialize, Serialize};

/// What the institution can bring to an opportunity.
///
/// Read-only for the duration of a matching pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub research_areas: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub personnel: Vec<String>,
    #[serde(default)]
    pub infrastructure: Vec<String>,
    #[serde(default)]
    pub partnerships: Vec<String>,
    #[serde(default)]
    pub regulatory_experience: Vec<String>,
    #[serde(default)]
    pub cpic_implementation: bool,
    #[serde(default)]
    pub fhir_capability: bool,
    #[serde(default)]
    pub ai_capability: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Capabilities {
    /// The built-in institutional profile.
    pub fn institutional_default() -> Self {
        Self {
            research_areas: strings(&[
                "precision oncology",
                "genomics",
                "clinical trials",
                "AI/ML",
                "health informatics",
            ]),
            technologies: strings(&[
                "Epic FHIR",
                "genomic sequencing",
                "AI platforms",
                "clinical decision support",
            ]),
            personnel: strings(&[
                "medical oncologists",
                "bioinformaticians",
                "clinical researchers",
                "data scientists",
            ]),
            infrastructure: strings(&["genomic lab", "clinical trial unit", "data center", "IRB"]),
            partnerships: strings(&[
                "Norton Healthcare",
                "University of Louisville",
                "Epic Systems",
            ]),
            regulatory_experience: strings(&["FDA", "IRB", "HIPAA", "GCP"]),
            cpic_implementation: true,
            fhir_capability: true,
            ai_capability: true,
        }
    }

    /// More than two infrastructure items.
    pub fn has_infrastructure_depth(&self) -> bool {
        self.infrastructure.len() > 2
    }
}

//! Variant classification history.
//!
//! Tracks how the interpretation of a genomic variant moved over time and
//! flags the changes worth re-contacting patients about.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Pathogenic,
    LikelyPathogenic,
    UncertainSignificance,
    LikelyBenign,
    Benign,
    Conflicting,
    NotProvided,
}

impl Classification {
    /// Rank on the benign (1) to pathogenic (5) axis. Conflicting sits with
    /// VUS, not provided is 0.
    pub fn significance(self) -> u8 {
        match self {
            Classification::NotProvided => 0,
            Classification::Benign => 1,
            Classification::LikelyBenign => 2,
            Classification::UncertainSignificance | Classification::Conflicting => 3,
            Classification::LikelyPathogenic => 4,
            Classification::Pathogenic => 5,
        }
    }

    /// On the five-level ACMG scale.
    pub fn is_graded(self) -> bool {
        !matches!(self, Classification::Conflicting | Classification::NotProvided)
    }

    pub fn label(self) -> &'static str {
        match self {
            Classification::Pathogenic => "Pathogenic",
            Classification::LikelyPathogenic => "Likely Pathogenic",
            Classification::UncertainSignificance => "Uncertain Significance",
            Classification::LikelyBenign => "Likely Benign",
            Classification::Benign => "Benign",
            Classification::Conflicting => "Conflicting",
            Classification::NotProvided => "Not Provided",
        }
    }
}

/// A move of two or more significance levels.
pub fn is_significant_change(previous: Classification, next: Classification) -> bool {
    previous.significance().abs_diff(next.significance()) >= 2
}

/// Toward pathogenic, starting from VUS or below.
pub fn is_upgrade(previous: Classification, next: Classification) -> bool {
    previous.is_graded()
        && next.is_graded()
        && previous.significance() <= Classification::UncertainSignificance.significance()
        && next.significance() > previous.significance()
}

/// Toward benign, starting from VUS or above.
pub fn is_downgrade(previous: Classification, next: Classification) -> bool {
    previous.is_graded()
        && next.is_graded()
        && previous.significance() >= Classification::UncertainSignificance.significance()
        && next.significance() < previous.significance()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub year: String,
    #[serde(default)]
    pub pmid: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInterpretationChange {
    pub id: String,
    pub date: NaiveDate,
    pub gene: String,
    pub variant: String,
    pub previous_classification: Classification,
    pub new_classification: Classification,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub source: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl VariantInterpretationChange {
    pub fn is_significant(&self) -> bool {
        is_significant_change(self.previous_classification, self.new_classification)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantHistory {
    pub gene: String,
    pub variant: String,
    pub current_classification: Classification,
    #[serde(default)]
    pub history: Vec<VariantInterpretationChange>,
}

impl VariantHistory {
    pub fn has_significant_change(&self) -> bool {
        self.history.iter().any(VariantInterpretationChange::is_significant)
    }

    pub fn was_upgraded(&self) -> bool {
        self.history
            .iter()
            .any(|c| is_upgrade(c.previous_classification, c.new_classification))
    }

    pub fn was_downgraded(&self) -> bool {
        self.history
            .iter()
            .any(|c| is_downgrade(c.previous_classification, c.new_classification))
    }

    pub fn has_multiple_changes(&self) -> bool {
        self.history.len() > 1
    }

    /// Most recent significant change, if any.
    pub fn latest_significant_change(&self) -> Option<&VariantInterpretationChange> {
        self.history
            .iter()
            .filter(|c| c.is_significant())
            .max_by_key(|c| c.date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub variants: u32,
    pub significant: u32,
    pub upgraded: u32,
    pub downgraded: u32,
    pub multiple_changes: u32,
}

impl VariantSummary {
    pub fn from_histories(histories: &[VariantHistory]) -> Self {
        let count = |f: fn(&VariantHistory) -> bool| histories.iter().filter(|h| f(h)).count() as u32;
        Self {
            variants: histories.len() as u32,
            significant: count(VariantHistory::has_significant_change),
            upgraded: count(VariantHistory::was_upgraded),
            downgraded: count(VariantHistory::was_downgraded),
            multiple_changes: count(VariantHistory::has_multiple_changes),
        }
    }
}

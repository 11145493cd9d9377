//! Rule-based opportunity matcher.
//!
//! A match score is the sum of four independent terms, capped at 1.0:
//!
//! | Term | Contribution |
//! |------|--------------|
//! | keyword_overlap | `matched / total * 0.3` (0 when there are no keywords) |
//! | technology | `0.2` when the institution lists any technology |
//! | cpic_alignment | `0.3` when implementation score > 80 and CPIC is implemented |
//! | infrastructure | `0.2` with more than two items, otherwise `0.1` |
//!
//! Only the upper bound is enforced. The standard weights cannot produce a
//! negative term, custom weights can and are left as-is.

use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;
use crate::opportunity::Opportunity;

/// Weights for each match term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub keyword_overlap: f64,
    pub technology: f64,
    pub cpic_alignment: f64,
    /// Credit when infrastructure has depth.
    pub infrastructure_deep: f64,
    /// Credit every other capability record gets.
    pub infrastructure_base: f64,
    /// Implementation score must exceed this for CPIC credit.
    pub cpic_threshold: u8,
}

impl MatchWeights {
    pub fn standard() -> Self {
        Self {
            keyword_overlap: 0.3,
            technology: 0.2,
            cpic_alignment: 0.3,
            infrastructure_deep: 0.2,
            infrastructure_base: 0.1,
            cpic_threshold: 80,
        }
    }
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self::standard()
    }
}

/// One named contribution to a match score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTerm {
    pub name: String,
    pub contribution: f64,
}

/// Complete scoring breakdown for explainability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub terms: Vec<MatchTerm>,
    /// Keywords that hit a research area.
    pub matched_keywords: Vec<String>,
    /// Capped sum of the terms.
    pub total: f64,
}

impl MatchBreakdown {
    pub fn term(&self, name: &str) -> Option<f64> {
        self.terms
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.contribution)
    }
}

/// Pure, synchronous scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingEngine {
    weights: MatchWeights,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: MatchWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }

    /// Match score in `[.., 1.0]`.
    pub fn score(&self, opportunity: &Opportunity, capabilities: &Capabilities) -> f64 {
        self.breakdown(opportunity, capabilities).total
    }

    /// Score with every term itemised.
    pub fn breakdown(&self, opportunity: &Opportunity, capabilities: &Capabilities) -> MatchBreakdown {
        let w = &self.weights;
        let matched_keywords = matched_keywords(&opportunity.keywords, &capabilities.research_areas);

        let keyword_overlap = if opportunity.keywords.is_empty() {
            0.0
        } else {
            (matched_keywords.len() as f64 / opportunity.keywords.len() as f64) * w.keyword_overlap
        };

        let technology = if capabilities.technologies.is_empty() {
            0.0
        } else {
            w.technology
        };

        let cpic_alignment = if opportunity.cpic_alignment.implementation_score > w.cpic_threshold
            && capabilities.cpic_implementation
        {
            w.cpic_alignment
        } else {
            0.0
        };

        let infrastructure = if capabilities.has_infrastructure_depth() {
            w.infrastructure_deep
        } else {
            w.infrastructure_base
        };

        let sum = keyword_overlap + technology + cpic_alignment + infrastructure;

        MatchBreakdown {
            terms: vec![
                MatchTerm { name: "keyword_overlap".into(), contribution: keyword_overlap },
                MatchTerm { name: "technology".into(), contribution: technology },
                MatchTerm { name: "cpic_alignment".into(), contribution: cpic_alignment },
                MatchTerm { name: "infrastructure".into(), contribution: infrastructure },
            ],
            matched_keywords,
            total: sum.min(1.0),
        }
    }
}

/// Keywords contained (case-insensitively) in at least one research area.
fn matched_keywords(keywords: &[String], research_areas: &[String]) -> Vec<String> {
    let areas: Vec<String> = research_areas.iter().map(|a| a.to_lowercase()).collect();
    keywords
        .iter()
        .filter(|keyword| {
            let needle = keyword.to_lowercase();
            areas.iter().any(|area| area.contains(&needle))
        })
        .cloned()
        .collect()
}

//! Research engine: scanning, matching and coordination bookkeeping.
//!
//! The engine owns no timers. The scheduler calls into it once per tick and
//! records the outcomes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::config::Config;
use crate::coordination::{ComplianceUpdate, CoordinationDraft, ResearchCoordination};
use crate::documents::{GrantProposal, TrialDocuments, TrialRegistration};
use crate::error::{ConfigError, CoreError, Result};
use crate::matching::MatchingEngine;
use crate::opportunity::{Opportunity, RegistrationStatus, TrialOpportunity};
use crate::records::{self, keys, HighPriorityAlert};
use crate::source::{FixtureSource, HttpSource, OpportunitySource};
use crate::store::KeyValueStore;

pub const DEFAULT_HIGH_PRIORITY_THRESHOLD: f64 = 0.8;

const RECOMMENDED_ACTIONS: [&str; 4] = [
    "Review opportunity details",
    "Assemble research team",
    "Begin preliminary proposal",
    "Contact program officer",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    /// Fetched ids that were not cached before this scan.
    pub new_opportunities: u32,
    /// Cached opportunities after the scan.
    pub total_opportunities: u32,
    /// Fetched opportunities whose last score is above the threshold.
    pub high_priority_alerts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub matched: u32,
    pub high_score: u32,
    /// 0 when nothing was matched.
    pub average_score: f64,
}

pub struct ResearchEngine {
    store: Arc<dyn KeyValueStore>,
    sources: Vec<Arc<dyn OpportunitySource>>,
    capabilities: Capabilities,
    matcher: MatchingEngine,
    high_priority_threshold: f64,
}

impl ResearchEngine {
    /// An engine with no sources and the institutional profile.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            sources: Vec::new(),
            capabilities: Capabilities::institutional_default(),
            matcher: MatchingEngine::new(),
            high_priority_threshold: DEFAULT_HIGH_PRIORITY_THRESHOLD,
        }
    }

    /// Wire sources, capabilities and threshold from `config`.
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self, ConfigError> {
        let mut engine = Self::new(store)
            .with_capabilities(config.capabilities())
            .with_threshold(config.matching.high_priority_threshold);

        if config.builtin_catalog {
            engine = engine.with_source(Arc::new(FixtureSource::federal_catalog(
                Local::now().date_naive(),
            )));
        }
        for source in &config.sources {
            engine = engine.with_source(Arc::new(HttpSource::from_config(source)?));
        }
        Ok(engine)
    }

    pub fn with_source(mut self, source: Arc<dyn OpportunitySource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_matcher(mut self, matcher: MatchingEngine) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.high_priority_threshold = threshold;
        self
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn high_priority_threshold(&self) -> f64 {
        self.high_priority_threshold
    }

    /// Poll every source and cache what they return.
    ///
    /// A failing source is skipped; the scan fails only when every source
    /// does. Cached scores survive a rescan until the next matching pass.
    pub async fn scan_opportunities(&self) -> Result<ScanOutcome> {
        let store = self.store.as_ref();
        let mut fetched = Vec::new();
        let mut first_error = None;
        let mut succeeded = 0usize;

        for source in &self.sources {
            match source.fetch().await {
                Ok(found) => {
                    debug!(source = source.name(), count = found.len(), "source fetched");
                    succeeded += 1;
                    fetched.extend(found);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "source fetch failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if succeeded == 0 {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        let previous: HashMap<String, Opportunity> = records::fetch_all::<Opportunity>(store, keys::OPPORTUNITY_PATTERN)
            .await?
            .into_iter()
            .map(|(_, opp)| (opp.id.clone(), opp))
            .collect();

        let mut outcome = ScanOutcome::default();
        for mut opportunity in fetched {
            match previous.get(&opportunity.id) {
                Some(prior) => {
                    opportunity.match_score = prior.match_score;
                    if prior.match_score > self.high_priority_threshold {
                        outcome.high_priority_alerts += 1;
                    }
                }
                None => outcome.new_opportunities += 1,
            }
            records::put(store, &keys::opportunity(&opportunity.id), &opportunity).await?;
        }
        outcome.total_opportunities = store.keys(keys::OPPORTUNITY_PATTERN).await?.len() as u32;

        info!(
            new = outcome.new_opportunities,
            total = outcome.total_opportunities,
            "opportunity scan finished"
        );
        Ok(outcome)
    }

    /// Score every active cached opportunity and write the score back.
    pub async fn match_opportunities(&self) -> Result<MatchOutcome> {
        let store = self.store.as_ref();
        let active: Vec<Opportunity> = self
            .opportunities()
            .await?
            .into_iter()
            .filter(Opportunity::is_active)
            .collect();

        let mut outcome = MatchOutcome::default();
        let mut total = 0.0;
        for mut opportunity in active {
            let score = self.matcher.score(&opportunity, &self.capabilities);
            opportunity.match_score = score;
            total += score;
            outcome.matched += 1;

            if score > self.high_priority_threshold {
                outcome.high_score += 1;
                self.flag_high_priority(&opportunity).await?;
            }
            records::put(store, &keys::opportunity(&opportunity.id), &opportunity).await?;
        }
        if outcome.matched > 0 {
            outcome.average_score = total / outcome.matched as f64;
        }

        info!(
            matched = outcome.matched,
            high_score = outcome.high_score,
            "opportunity matching finished"
        );
        Ok(outcome)
    }

    async fn flag_high_priority(&self, opportunity: &Opportunity) -> Result<()> {
        let now = Utc::now();
        let alert = HighPriorityAlert {
            id: format!("alert_{}_{}", opportunity.id, now.timestamp_millis()),
            opportunity: opportunity.id.clone(),
            title: opportunity.title.clone(),
            match_score: opportunity.match_score,
            due_date: opportunity.due_date,
            estimated_value: opportunity.budget_cap,
            recommended_actions: RECOMMENDED_ACTIONS.iter().map(|s| s.to_string()).collect(),
            timestamp: now,
        };
        records::put(self.store.as_ref(), &keys::high_priority_alert(&alert.id), &alert).await?;
        info!(
            opportunity = %opportunity.id,
            score = opportunity.match_score,
            "high-priority opportunity flagged"
        );
        Ok(())
    }

    /// Every valid cached opportunity, sorted by key.
    pub async fn opportunities(&self) -> Result<Vec<Opportunity>> {
        Ok(records::fetch_all(self.store.as_ref(), keys::OPPORTUNITY_PATTERN)
            .await?
            .into_iter()
            .map(|(_, opp)| opp)
            .collect())
    }

    /// `{prefix}_{millis}`, suffixed with `_{n}` while `key(id)` is taken.
    async fn unused_id(&self, prefix: &str, key: fn(&str) -> String) -> Result<String> {
        let base = format!("{prefix}_{}", Utc::now().timestamp_millis());
        let mut id = base.clone();
        let mut n = 1;
        while self.store.get(&key(&id)).await?.is_some() {
            id = format!("{base}_{n}");
            n += 1;
        }
        Ok(id)
    }

    /// Fill defaults, assign an id and persist.
    pub async fn create_coordination(&self, draft: CoordinationDraft) -> Result<ResearchCoordination> {
        let store = self.store.as_ref();
        let id = self.unused_id("coord", keys::coordination).await?;

        let coordination = draft.into_coordination(id);
        records::put(store, &keys::coordination(&coordination.id), &coordination).await?;
        info!(id = %coordination.id, title = %coordination.title, "coordination created");
        Ok(coordination)
    }

    /// Every stored coordination. Entries that fail validation are skipped.
    pub async fn coordinations(&self) -> Result<Vec<ResearchCoordination>> {
        Ok(records::fetch_all(self.store.as_ref(), keys::COORDINATION_PATTERN)
            .await?
            .into_iter()
            .map(|(_, coord)| coord)
            .collect())
    }

    pub async fn coordination(&self, id: &str) -> Result<Option<ResearchCoordination>> {
        records::fetch(self.store.as_ref(), &keys::coordination(id)).await
    }

    /// Merge `update` into the stored coordination's compliance status and
    /// persist it, refreshing its retention.
    pub async fn update_compliance_status(
        &self,
        id: &str,
        update: ComplianceUpdate,
    ) -> Result<ResearchCoordination> {
        let key = keys::coordination(id);
        let mut coordination: ResearchCoordination = records::fetch(self.store.as_ref(), &key)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("coordination {id}")))?;

        coordination.compliance.apply(update);
        records::put(self.store.as_ref(), &key, &coordination).await?;
        info!(id, "compliance status updated");
        Ok(coordination)
    }

    /// Draft a grant proposal for `opportunity` and keep it for 30 days.
    pub async fn generate_grant_proposal(&self, opportunity: &Opportunity) -> Result<GrantProposal> {
        let id = self.unused_id("proposal", keys::proposal).await?;
        let proposal = GrantProposal::draft(id, opportunity, &self.capabilities, Utc::now());
        records::put(self.store.as_ref(), &keys::proposal(&proposal.id), &proposal).await?;
        info!(id = %proposal.id, opportunity = %opportunity.id, "grant proposal generated");
        Ok(proposal)
    }

    /// Draft a proposal for a cached opportunity.
    pub async fn generate_grant_proposal_for(&self, opportunity_id: &str) -> Result<GrantProposal> {
        let opportunity: Opportunity = records::fetch(self.store.as_ref(), &keys::opportunity(opportunity_id))
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("opportunity {opportunity_id}")))?;
        self.generate_grant_proposal(&opportunity).await
    }

    /// Every stored proposal, sorted by key.
    pub async fn proposals(&self) -> Result<Vec<GrantProposal>> {
        Ok(records::fetch_all(self.store.as_ref(), keys::PROPOSAL_PATTERN)
            .await?
            .into_iter()
            .map(|(_, proposal)| proposal)
            .collect())
    }

    /// Generate the registration documents for a draft trial, mark it
    /// submitted and persist both.
    ///
    /// Only draft trials can be registered. The trial is cached for a day
    /// under `trial:{id}`; the registration packet is kept for 30 days.
    pub async fn auto_register_trial(&self, mut trial: TrialOpportunity) -> Result<TrialRegistration> {
        if trial.registration_status != RegistrationStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "trial {} is already {:?}",
                trial.id, trial.registration_status
            )));
        }

        let documents = TrialDocuments::for_trial(&trial);
        let registration = TrialRegistration {
            registration_id: self.unused_id("REG", keys::registration).await?,
            trial_id: trial.id.clone(),
            submitted_at: Utc::now(),
            documents,
        };
        trial.registration_status = RegistrationStatus::Submitted;

        let store = self.store.as_ref();
        records::put(store, &keys::registration(&registration.registration_id), &registration).await?;
        records::put(store, &keys::trial(&trial.id), &trial).await?;
        info!(
            trial = %trial.id,
            registration = %registration.registration_id,
            "trial registration submitted"
        );
        Ok(registration)
    }

    pub async fn trial(&self, id: &str) -> Result<Option<TrialOpportunity>> {
        records::fetch(self.store.as_ref(), &keys::trial(id)).await
    }
}

impl std::fmt::Debug for ResearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchEngine")
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("high_priority_threshold", &self.high_priority_threshold)
            .finish_non_exhaustive()
    }
}

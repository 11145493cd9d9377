//! Typed records persisted in the key-value store.
//!
//! Every value is written as a tagged envelope:
//!
//! ```text
//! {"schema": "watchtower.last_scan", "version": 1, "data": {...}}
//! ```
//!
//! Reads check the tag before trusting the payload. A blob written under a
//! different schema, a newer version, or with a malformed payload is
//! rejected with [`CoreError::Schema`].

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coordination::ResearchCoordination;
use crate::documents::{GrantProposal, TrialRegistration};
use crate::error::{CoreError, Result};
use crate::opportunity::{Opportunity, TrialOpportunity};
use crate::store::KeyValueStore;

const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(24 * 3600);
const MONTH: Duration = Duration::from_secs(30 * 24 * 3600);

/// Key layout.
pub mod keys {
    pub const LAST_SCAN: &str = "watchtower:last_scan";
    pub const LAST_MATCH: &str = "watchtower:last_match";
    pub const LAST_COMPLIANCE: &str = "watchtower:last_compliance";
    pub const DAILY_REPORT: &str = "watchtower:daily_report";
    pub const STATUS: &str = "watchtower:status";

    pub const OPPORTUNITY_PATTERN: &str = "federal_opp:*";
    pub const COORDINATION_PATTERN: &str = "coordination:*";
    pub const URGENT_ALERT_PATTERN: &str = "alert:urgent:*";
    pub const PROPOSAL_PATTERN: &str = "proposal:*";

    pub fn opportunity(id: &str) -> String {
        format!("federal_opp:{id}")
    }

    pub fn coordination(id: &str) -> String {
        format!("coordination:{id}")
    }

    pub fn proposal(id: &str) -> String {
        format!("proposal:{id}")
    }

    pub fn trial(id: &str) -> String {
        format!("trial:{id}")
    }

    pub fn registration(id: &str) -> String {
        format!("registration:{id}")
    }

    pub fn high_priority_alert(id: &str) -> String {
        format!("alert:{id}")
    }

    /// `seq` keeps keys distinct when two alerts share a millisecond.
    pub fn urgent_alert(kind: &str, millis: i64, seq: u64) -> String {
        format!("alert:urgent:{kind}_{millis}_{seq}")
    }

    pub fn error_log(component: &str, millis: i64, seq: u64) -> String {
        format!("error:{component}:{millis}_{seq}")
    }

    pub fn error_log_pattern(component: &str) -> String {
        format!("error:{component}:*")
    }
}

/// A value with a fixed schema tag and default time-to-live.
pub trait Record: Serialize + DeserializeOwned {
    const SCHEMA: &'static str;
    const VERSION: u32 = 1;
    const TTL: Duration;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema: &'a str,
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    schema: String,
    version: u32,
    data: serde_json::Value,
}

pub fn encode<R: Record>(record: &R) -> Result<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        schema: R::SCHEMA,
        version: R::VERSION,
        data: record,
    })?)
}

/// Decode `raw` read from `key`, validating the envelope.
pub fn decode<R: Record>(key: &str, raw: &str) -> Result<R> {
    let mismatch = |reason: String| {
        warn!(key, schema = R::SCHEMA, %reason, "rejecting stored value");
        CoreError::Schema {
            key: key.to_string(),
            reason,
        }
    };

    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|e| mismatch(format!("not a tagged record: {e}")))?;
    if envelope.schema != R::SCHEMA {
        return Err(mismatch(format!(
            "expected schema {}, found {}",
            R::SCHEMA,
            envelope.schema
        )));
    }
    if envelope.version > R::VERSION {
        return Err(mismatch(format!(
            "unsupported version {} (max {})",
            envelope.version,
            R::VERSION
        )));
    }
    serde_json::from_value(envelope.data).map_err(|e| mismatch(format!("invalid payload: {e}")))
}

/// Write with the record's default TTL.
pub async fn put<R: Record>(store: &dyn KeyValueStore, key: &str, record: &R) -> Result<()> {
    put_with_ttl(store, key, record, R::TTL).await
}

pub async fn put_with_ttl<R: Record>(
    store: &dyn KeyValueStore,
    key: &str,
    record: &R,
    ttl: Duration,
) -> Result<()> {
    store.set_ex(key, ttl, encode(record)?).await?;
    Ok(())
}

/// Read and validate. Absent keys are `Ok(None)`.
pub async fn fetch<R: Record>(store: &dyn KeyValueStore, key: &str) -> Result<Option<R>> {
    match store.get(key).await? {
        Some(raw) => decode(key, &raw).map(Some),
        None => Ok(None),
    }
}

/// Read, treating schema mismatches as absent. Store errors still propagate.
pub async fn fetch_lenient<R: Record>(store: &dyn KeyValueStore, key: &str) -> Result<Option<R>> {
    match fetch(store, key).await {
        Err(CoreError::Schema { .. }) => Ok(None),
        other => other,
    }
}

/// Every valid record under keys matching `pattern`, sorted by key.
pub async fn fetch_all<R: Record>(store: &dyn KeyValueStore, pattern: &str) -> Result<Vec<(String, R)>> {
    let mut out = Vec::new();
    for key in store.keys(pattern).await? {
        if let Some(record) = fetch_lenient::<R>(store, &key).await? {
            out.push((key, record));
        }
    }
    Ok(out)
}

// ── Snapshots ────────────────────────────────────────────────────────

/// Outcome of one opportunity scan tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Milliseconds; stored as `duration`.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub opportunities_found: u32,
    pub total_opportunities: u32,
    pub high_priority_alerts: u32,
}

impl Record for ScanSnapshot {
    const SCHEMA: &'static str = "watchtower.last_scan";
    const TTL: Duration = HOUR;
}

/// Outcome of one matching tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub timestamp: DateTime<Utc>,
    pub opportunities_matched: u32,
    pub high_score_matches: u32,
    pub average_match_score: f64,
}

impl Record for MatchSnapshot {
    const SCHEMA: &'static str = "watchtower.last_match";
    const TTL: Duration = HOUR;
}

/// Outcome of one compliance tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub coordinations_checked: u32,
    pub compliance_issues: u32,
    pub expiring_certifications: u32,
}

impl Record for ComplianceSnapshot {
    const SCHEMA: &'static str = "watchtower.last_compliance";
    const TTL: Duration = HOUR;
}

// ── Daily report ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityFigures {
    pub total: u32,
    pub new: u32,
    pub high_priority: u32,
    pub average_match_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationFigures {
    pub active: u32,
    pub completed: u32,
    pub compliance_issues: u32,
}

/// Whole dollars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingFigures {
    pub total_pipeline: u64,
    pub high_probability: u64,
    pub submitted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationFigures {
    pub proposals_generated: u32,
    pub documents_created: u32,
    pub alerts_sent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    /// Local calendar date, `YYYY-MM-DD` on the wire.
    pub date: NaiveDate,
    pub opportunities: OpportunityFigures,
    pub coordinations: CoordinationFigures,
    pub funding: FundingFigures,
    pub automation: AutomationFigures,
}

impl Record for DailyReport {
    const SCHEMA: &'static str = "watchtower.daily_report";
    const TTL: Duration = Duration::from_secs(7 * 24 * 3600);
}

// ── Alerts and logs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Queued for the notification flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgentAlert {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Record for UrgentAlert {
    const SCHEMA: &'static str = "watchtower.urgent_alert";
    const TTL: Duration = HOUR;
}

/// Raised when an opportunity scores above the high-priority threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighPriorityAlert {
    pub id: String,
    pub opportunity: String,
    pub title: String,
    pub match_score: f64,
    pub due_date: NaiveDate,
    pub estimated_value: u64,
    pub recommended_actions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Record for HighPriorityAlert {
    const SCHEMA: &'static str = "watchtower.high_priority_alert";
    const TTL: Duration = Duration::from_secs(7 * 24 * 3600);
}

/// One failed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub component: String,
    pub error: String,
    /// `source()` chain of the error, outermost first.
    #[serde(default)]
    pub chain: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorLogEntry {
    pub fn from_error(component: &str, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        Self {
            component: component.to_string(),
            error: err.to_string(),
            chain,
            timestamp: Utc::now(),
        }
    }
}

impl Record for ErrorLogEntry {
    const SCHEMA: &'static str = "watchtower.error_log";
    const TTL: Duration = DAY;
}

/// Published at scheduler bootstrap and stop for dashboard readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    pub active: bool,
    pub tasks: Vec<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub intervals_secs: BTreeMap<String, u64>,
}

impl Record for SchedulerState {
    const SCHEMA: &'static str = "watchtower.status";
    const TTL: Duration = DAY;
}

// ── Domain records ───────────────────────────────────────────────────

impl Record for Opportunity {
    const SCHEMA: &'static str = "watchtower.opportunity";
    const TTL: Duration = DAY;
}

impl Record for ResearchCoordination {
    const SCHEMA: &'static str = "watchtower.coordination";
    const TTL: Duration = MONTH;
}

impl Record for TrialOpportunity {
    const SCHEMA: &'static str = "watchtower.trial";
    const TTL: Duration = DAY;
}

impl Record for GrantProposal {
    const SCHEMA: &'static str = "watchtower.proposal";
    const TTL: Duration = MONTH;
}

impl Record for TrialRegistration {
    const SCHEMA: &'static str = "watchtower.trial_registration";
    const TTL: Duration = MONTH;
}

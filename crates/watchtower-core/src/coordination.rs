//! Research-administration coordinations.
//!
//! A coordination tracks one effort (trial registration, grant submission,
//! site activation, enrollment) with its compliance flags and funding.
//! Coordinations are created on demand; afterwards only their compliance
//! status changes, through [`ComplianceUpdate`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationKind {
    #[default]
    TrialRegistration,
    GrantSubmission,
    SiteActivation,
    PatientEnrollment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationTimeline {
    pub phase: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub milestones: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub automated_tasks: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[serde(rename = "IRB_protocol")]
    IrbProtocol,
    InformedConsent,
    InvestigatorBrochure,
    CaseReportForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Template,
    Draft,
    Review,
    Approved,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratedBy {
    #[serde(rename = "AI")]
    Ai,
    #[serde(rename = "template")]
    Template,
    #[serde(rename = "manual")]
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchDocument {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    pub generated_by: GeneratedBy,
    pub last_updated: NaiveDate,
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub compliance_checks: Vec<String>,
}

/// Regulatory state of a coordination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceStatus {
    pub irb_approval: bool,
    pub fda_approval: bool,
    pub institutional_approval: bool,
    pub cpic_compliance: bool,
    pub hipaa_compliance: bool,
    pub gmp_compliance: bool,
    #[serde(default)]
    pub last_audit: Option<NaiveDate>,
    /// Certification name -> expiry date.
    #[serde(default)]
    pub expiration_dates: BTreeMap<String, NaiveDate>,
}

/// Partial change to a [`ComplianceStatus`]. `None` fields are left as is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceUpdate {
    #[serde(default)]
    pub irb_approval: Option<bool>,
    #[serde(default)]
    pub fda_approval: Option<bool>,
    #[serde(default)]
    pub institutional_approval: Option<bool>,
    #[serde(default)]
    pub cpic_compliance: Option<bool>,
    #[serde(default)]
    pub hipaa_compliance: Option<bool>,
    #[serde(default)]
    pub gmp_compliance: Option<bool>,
    #[serde(default)]
    pub last_audit: Option<NaiveDate>,
    /// Merged by certification name; other entries are kept.
    #[serde(default)]
    pub expiration_dates: BTreeMap<String, NaiveDate>,
}

impl ComplianceUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ComplianceUpdate::default()
    }
}

impl ComplianceStatus {
    pub fn apply(&mut self, update: ComplianceUpdate) {
        let flags = [
            (&mut self.irb_approval, update.irb_approval),
            (&mut self.fda_approval, update.fda_approval),
            (&mut self.institutional_approval, update.institutional_approval),
            (&mut self.cpic_compliance, update.cpic_compliance),
            (&mut self.hipaa_compliance, update.hipaa_compliance),
            (&mut self.gmp_compliance, update.gmp_compliance),
        ];
        for (field, value) in flags {
            if let Some(value) = value {
                *field = value;
            }
        }
        if update.last_audit.is_some() {
            self.last_audit = update.last_audit;
        }
        self.expiration_dates.extend(update.expiration_dates);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSourceEntry {
    pub source: String,
    pub amount: u64,
    pub period: String,
    #[serde(default)]
    pub restrictions: Vec<String>,
    #[serde(default)]
    pub reporting_requirements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingStatus {
    pub total_budget: u64,
    pub secured_funding: u64,
    #[serde(default)]
    pub pending_applications: Vec<String>,
    #[serde(default)]
    pub funding_sources: Vec<FundingSourceEntry>,
    pub burn_rate: u64,
    /// Months.
    pub projected_runway: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFrequency {
    RealTime,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email: bool,
    pub slack: bool,
    pub dashboard: bool,
    pub frequency: NotificationFrequency,
    #[serde(default)]
    pub stakeholders: Vec<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            slack: false,
            dashboard: true,
            frequency: NotificationFrequency::Daily,
            stakeholders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationConfig {
    pub auto_registration: bool,
    pub auto_matching: bool,
    pub auto_document_generation: bool,
    pub auto_compliance_monitoring: bool,
    pub auto_reporting: bool,
    pub notification_settings: NotificationSettings,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            auto_registration: true,
            auto_matching: true,
            auto_document_generation: true,
            auto_compliance_monitoring: true,
            auto_reporting: true,
            notification_settings: NotificationSettings::default(),
        }
    }
}

/// A tracked research-administration effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchCoordination {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CoordinationKind,
    pub title: String,
    pub principal_investigator: String,
    pub institution: String,
    #[serde(default)]
    pub collaborators: Vec<String>,
    #[serde(default)]
    pub timeline: Vec<CoordinationTimeline>,
    #[serde(default)]
    pub documents: Vec<ResearchDocument>,
    pub compliance: ComplianceStatus,
    pub funding: FundingStatus,
    pub automation: AutomationConfig,
}

impl ResearchCoordination {
    /// Every timeline phase ended before `today`.
    pub fn is_completed(&self, today: NaiveDate) -> bool {
        !self.timeline.is_empty() && self.timeline.iter().all(|phase| phase.end_date < today)
    }
}

/// Caller-supplied fields for a new coordination; the rest take defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationDraft {
    #[serde(default, rename = "type")]
    pub kind: Option<CoordinationKind>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub principal_investigator: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub collaborators: Option<Vec<String>>,
    #[serde(default)]
    pub timeline: Option<Vec<CoordinationTimeline>>,
    #[serde(default)]
    pub documents: Option<Vec<ResearchDocument>>,
    #[serde(default)]
    pub compliance: Option<ComplianceStatus>,
    #[serde(default)]
    pub funding: Option<FundingStatus>,
    #[serde(default)]
    pub automation: Option<AutomationConfig>,
}

pub const DEFAULT_COORDINATION_TITLE: &str = "New Research Coordination";
pub const DEFAULT_INSTITUTION: &str = "Norton Healthcare";

impl CoordinationDraft {
    pub fn into_coordination(self, id: String) -> ResearchCoordination {
        ResearchCoordination {
            id,
            kind: self.kind.unwrap_or_default(),
            title: self.title.unwrap_or_else(|| DEFAULT_COORDINATION_TITLE.into()),
            principal_investigator: self.principal_investigator.unwrap_or_default(),
            institution: self.institution.unwrap_or_else(|| DEFAULT_INSTITUTION.into()),
            collaborators: self.collaborators.unwrap_or_default(),
            timeline: self.timeline.unwrap_or_default(),
            documents: self.documents.unwrap_or_default(),
            compliance: self.compliance.unwrap_or_default(),
            funding: self.funding.unwrap_or_default(),
            automation: self.automation.unwrap_or_default(),
        }
    }
}

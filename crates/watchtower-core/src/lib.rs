//! # Watchtower Core Library
//!
//! Business logic for the research watchtower: a background service that
//! scans federal funding feeds, scores each opportunity against the
//! institution's capabilities and keeps research coordinations compliant.
//! The `watchtower` CLI is a thin front end over this crate.
//!
//! ## Architecture
//!
//! - **Matching**: pure scoring of an opportunity against a capability profile
//! - **Store**: Redis-over-HTTP key-value persistence behind an async trait,
//!   with typed, schema-tagged records on top
//! - **Engine**: scan, match and coordination operations over the store,
//!   plus proposal drafting and trial registration
//! - **Scheduler**: recurring tokio tasks that drive the engine and record
//!   every tick outcome
//!
//! ## Key Components
//!
//! - [`MatchingEngine`]: opportunity scoring
//! - [`KeyValueStore`]: persistence seam ([`RestStore`], [`MemoryStore`])
//! - [`ResearchEngine`]: scanning, matching and coordinations
//! - [`WatchtowerScheduler`]: task lifecycle and status
//! - [`Config`]: application configuration management

pub mod capabilities;
pub mod catalog;
pub mod compliance;
pub mod config;
pub mod coordination;
pub mod documents;
pub mod engine;
pub mod error;
pub mod matching;
pub mod notify;
pub mod opportunity;
pub mod records;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod variants;

pub use capabilities::Capabilities;
pub use compliance::{ComplianceMonitor, ComplianceResult};
pub use config::{Config, SchedulerConfig, StoreConfig};
pub use coordination::{ComplianceUpdate, CoordinationDraft, ResearchCoordination};
pub use documents::{GrantProposal, TrialDocuments, TrialRegistration};
pub use engine::{MatchOutcome, ResearchEngine, ScanOutcome};
pub use error::{ConfigError, CoreError, SourceError, StoreError};
pub use matching::{MatchBreakdown, MatchWeights, MatchingEngine};
pub use notify::{LogNotifier, Notifier};
pub use opportunity::{Opportunity, TrialOpportunity};
pub use records::{DailyReport, Record, UrgentAlert};
pub use scheduler::{SchedulerStatus, TaskKind, WatchtowerScheduler};
pub use source::{FixtureSource, HttpSource, OpportunitySource};
pub use store::{KeyValueStore, MemoryStore, RestStore};
pub use variants::{Classification, VariantHistory, VariantSummary};

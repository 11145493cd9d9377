//! Shared fixtures for scheduler integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use watchtower_core::catalog;
use watchtower_core::error::{Result, SourceError, StoreError};
use watchtower_core::{
    DailyReport, FixtureSource, KeyValueStore, MemoryStore, Notifier, Opportunity,
    OpportunitySource, ResearchEngine, SchedulerConfig, UrgentAlert, WatchtowerScheduler,
};

/// Captures everything the scheduler tries to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub reports: Mutex<Vec<(DailyReport, Vec<String>)>>,
    pub urgent: Mutex<Vec<UrgentAlert>>,
}

impl RecordingNotifier {
    pub fn reports(&self) -> Vec<(DailyReport, Vec<String>)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn urgent(&self) -> Vec<UrgentAlert> {
        self.urgent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_daily_report(&self, report: &DailyReport, recipients: &[String]) -> Result<()> {
        self.reports
            .lock()
            .unwrap()
            .push((report.clone(), recipients.to_vec()));
        Ok(())
    }

    async fn send_urgent(&self, alert: &UrgentAlert) -> Result<()> {
        self.urgent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// A feed that is always down.
pub struct FailingSource;

#[async_trait]
impl OpportunitySource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch(&self) -> std::result::Result<Vec<Opportunity>, SourceError> {
        Err(SourceError::Http {
            source_name: "failing".into(),
            message: "connection refused".into(),
        })
    }
}

/// In-memory store whose writes to one key wait for `release`.
pub struct GatedStore {
    pub inner: MemoryStore,
    gated_key: String,
    /// Signalled when a gated write arrives.
    pub entered: Notify,
    pub release: Notify,
}

impl GatedStore {
    pub fn new(gated_key: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            gated_key: gated_key.to_string(),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> std::result::Result<(), StoreError> {
        if key == self.gated_key {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.set_ex(key, ttl, value).await
    }

    async fn keys(&self, pattern: &str) -> std::result::Result<Vec<String>, StoreError> {
        self.inner.keys(pattern).await
    }

    async fn del(&self, key: &str) -> std::result::Result<bool, StoreError> {
        self.inner.del(key).await
    }
}

/// NIH R01, NIH U01 and the SBIR listing.
pub fn fixture_listings() -> Vec<Opportunity> {
    let mut listings = catalog::nih_opportunities();
    listings.extend(catalog::sbir_opportunities());
    listings
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub scheduler: WatchtowerScheduler,
}

pub fn harness_with(sources: Vec<Arc<dyn OpportunitySource>>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let mut engine = ResearchEngine::new(store.clone() as Arc<dyn KeyValueStore>);
    for source in sources {
        engine = engine.with_source(source);
    }
    let scheduler = WatchtowerScheduler::new(
        Arc::new(engine),
        notifier.clone() as Arc<dyn Notifier>,
        SchedulerConfig::default(),
    );
    Harness {
        store,
        notifier,
        scheduler,
    }
}

pub fn harness() -> Harness {
    harness_with(vec![Arc::new(FixtureSource::new("fixture", fixture_listings()))])
}

//! Watchtower scheduler.
//!
//! Five recurring tasks drive the research engine:
//!
//! | Task | Cadence | Writes |
//! |------|---------|--------|
//! | `opportunity_scanning` | 5 min | `watchtower:last_scan` |
//! | `matching_engine` | 10 min | `watchtower:last_match` |
//! | `compliance_monitoring` | 30 min | `watchtower:last_compliance` |
//! | `daily_reports` | daily at 06:00 local | `watchtower:daily_report` |
//! | `notifications` | 2 min | drains `alert:urgent:*` |
//!
//! Each task runs on its own tokio task. Ticks of one task never overlap:
//! the loop awaits the tick body before waiting for the next period, and a
//! late tick is delayed rather than bursted. A failing tick is recorded
//! under `error:{task}:*` and the timer keeps going.

pub mod clock;
mod report;

pub use report::build_daily_report;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::compliance::ComplianceMonitor;
use crate::config::{SchedulerConfig, MAX_INTERVAL_MINS};
use crate::engine::ResearchEngine;
use crate::error::{CoreError, Result};
use crate::notify::Notifier;
use crate::records::{
    self, keys, ComplianceSnapshot, ErrorLogEntry, MatchSnapshot, ScanSnapshot, SchedulerState,
    Severity, UrgentAlert,
};
use crate::store::KeyValueStore;

/// A recurring scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    OpportunityScan,
    Matching,
    Compliance,
    DailyReport,
    NotificationFlush,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::OpportunityScan,
        TaskKind::Matching,
        TaskKind::Compliance,
        TaskKind::DailyReport,
        TaskKind::NotificationFlush,
    ];

    /// Task name used in status output and error-log keys.
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::OpportunityScan => "opportunity_scanning",
            TaskKind::Matching => "matching_engine",
            TaskKind::Compliance => "compliance_monitoring",
            TaskKind::DailyReport => "daily_reports",
            TaskKind::NotificationFlush => "notifications",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opportunity_scanning" | "scan" => Ok(TaskKind::OpportunityScan),
            "matching_engine" | "match" => Ok(TaskKind::Matching),
            "compliance_monitoring" | "compliance" => Ok(TaskKind::Compliance),
            "daily_reports" | "report" => Ok(TaskKind::DailyReport),
            "notifications" | "notify" => Ok(TaskKind::NotificationFlush),
            _ => Err(format!("Unknown task: {}", s)),
        }
    }
}

/// Scheduler activity and the last recorded tick outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub active: bool,
    /// Registered task names, sorted.
    pub tasks: Vec<String>,
    pub last_scan: Option<ScanSnapshot>,
    pub last_match: Option<MatchSnapshot>,
    pub last_compliance: Option<ComplianceSnapshot>,
}

/// State shared by every task loop.
struct Shared {
    engine: Arc<ResearchEngine>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    compliance: ComplianceMonitor,
    config: SchedulerConfig,
    alerts_sent: AtomicU64,
    seq: AtomicU64,
}

pub struct WatchtowerScheduler {
    shared: Arc<Shared>,
    tasks: Mutex<BTreeMap<TaskKind, JoinHandle<()>>>,
}

impl WatchtowerScheduler {
    pub fn new(engine: Arc<ResearchEngine>, notifier: Arc<dyn Notifier>, config: SchedulerConfig) -> Self {
        let store = Arc::clone(engine.store());
        Self {
            shared: Arc::new(Shared {
                engine,
                store,
                notifier,
                compliance: ComplianceMonitor::default(),
                config,
                alerts_sent: AtomicU64::new(0),
                seq: AtomicU64::new(0),
            }),
            tasks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_compliance_monitor(mut self, monitor: ComplianceMonitor) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.compliance = monitor;
        }
        self
    }

    pub fn engine(&self) -> &Arc<ResearchEngine> {
        &self.shared.engine
    }

    /// Urgent alerts delivered since construction.
    pub fn alerts_sent(&self) -> u64 {
        self.shared.alerts_sent.load(Ordering::Relaxed)
    }

    /// Register every task that is not already running.
    ///
    /// Bootstrap publishes the scheduler state first. If that fails (for
    /// instance the store is not configured) the error is returned and no
    /// timer is registered. Calling `start` while running is a no-op. The
    /// task table is not locked while the store write is in flight.
    pub async fn start(&self) -> Result<()> {
        if self.tasks.lock().await.len() == TaskKind::ALL.len() {
            debug!("scheduler already running");
            return Ok(());
        }

        info!("starting watchtower scheduler");
        self.shared.publish_state(true, &TaskKind::ALL).await?;

        let mut tasks = self.tasks.lock().await;
        for kind in TaskKind::ALL {
            if !tasks.contains_key(&kind) {
                tasks.insert(kind, self.spawn(kind));
                debug!(task = kind.name(), "task registered");
            }
        }
        info!(tasks = tasks.len(), "watchtower scheduler active");
        Ok(())
    }

    /// Cancel every task. Safe to call when nothing is running.
    pub async fn stop(&self) {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_empty() {
            return;
        }
        info!("stopping watchtower scheduler");
        for (kind, handle) in std::mem::take(&mut *tasks) {
            handle.abort();
            info!(task = kind.name(), "task stopped");
        }
        drop(tasks);

        if let Err(e) = self.shared.publish_state(false, &[]).await {
            warn!(error = %e, "could not publish stopped state");
        }
        info!("watchtower scheduler stopped");
    }

    /// Start one task. Returns `Ok(false)` if it was already running.
    ///
    /// The stored scheduler state is updated before the timer is
    /// registered; a failed write leaves the task stopped.
    pub async fn start_task(&self, kind: TaskKind) -> Result<bool> {
        let mut next = match self.running_except(kind).await {
            Some(others) => others,
            None => return Ok(false),
        };
        next.push(kind);
        next.sort();
        self.shared.publish_state(true, &next).await?;

        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&kind) {
            return Ok(false);
        }
        tasks.insert(kind, self.spawn(kind));
        info!(task = kind.name(), "task started");
        Ok(true)
    }

    /// Stop one task. Returns false if it was not running.
    ///
    /// The remaining task set is published best-effort, like [`stop`](Self::stop).
    pub async fn stop_task(&self, kind: TaskKind) -> bool {
        let remaining: Vec<TaskKind> = {
            let mut tasks = self.tasks.lock().await;
            match tasks.remove(&kind) {
                Some(handle) => handle.abort(),
                None => return false,
            }
            tasks.keys().copied().collect()
        };
        info!(task = kind.name(), "task stopped");

        if let Err(e) = self.shared.publish_state(!remaining.is_empty(), &remaining).await {
            warn!(task = kind.name(), error = %e, "could not publish scheduler state");
        }
        true
    }

    /// Running tasks other than `kind`, or `None` if `kind` is running.
    async fn running_except(&self, kind: TaskKind) -> Option<Vec<TaskKind>> {
        let tasks = self.tasks.lock().await;
        if tasks.contains_key(&kind) {
            return None;
        }
        Some(tasks.keys().copied().collect())
    }

    pub async fn is_running(&self, kind: TaskKind) -> bool {
        self.tasks.lock().await.contains_key(&kind)
    }

    /// Registered tasks plus the last scan, match and compliance snapshots.
    ///
    /// Snapshots that are missing or fail validation read as `None`; store
    /// failures propagate.
    pub async fn status(&self) -> Result<SchedulerStatus> {
        let (active, mut names) = {
            let tasks = self.tasks.lock().await;
            let names: Vec<String> = tasks.keys().map(|k| k.name().to_string()).collect();
            (!tasks.is_empty(), names)
        };
        names.sort();

        let store = self.shared.store.as_ref();
        Ok(SchedulerStatus {
            active,
            tasks: names,
            last_scan: records::fetch_lenient(store, keys::LAST_SCAN).await?,
            last_match: records::fetch_lenient(store, keys::LAST_MATCH).await?,
            last_compliance: records::fetch_lenient(store, keys::LAST_COMPLIANCE).await?,
        })
    }

    /// Run one tick of `kind` now, returning its error instead of logging it.
    pub async fn run_once(&self, kind: TaskKind) -> Result<()> {
        self.shared.run(kind).await
    }

    fn spawn(&self, kind: TaskKind) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        match shared.period(kind) {
            Some(period) => tokio::spawn(async move { shared.interval_loop(kind, period).await }),
            None => tokio::spawn(async move { shared.daily_loop().await }),
        }
    }
}

impl Drop for WatchtowerScheduler {
    fn drop(&mut self) {
        for handle in self.tasks.get_mut().values() {
            handle.abort();
        }
    }
}

impl Shared {
    /// Fixed period of an interval task; `None` for the daily report.
    fn period(&self, kind: TaskKind) -> Option<Duration> {
        let period = match kind {
            TaskKind::OpportunityScan => self.config.scan_interval(),
            TaskKind::Matching => self.config.match_interval(),
            TaskKind::Compliance => self.config.compliance_interval(),
            TaskKind::NotificationFlush => self.config.notification_interval(),
            TaskKind::DailyReport => return None,
        };
        Some(period.clamp(Duration::from_secs(1), Duration::from_secs(MAX_INTERVAL_MINS * 60)))
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// First tick one full period after registration.
    async fn interval_loop(&self, kind: TaskKind, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_guarded(kind).await;
        }
    }

    /// Sleep until the configured local hour, recomputing the delay each day.
    async fn daily_loop(&self) {
        let hour = self.config.daily_report_hour;
        let mut last_run: Option<NaiveDate> = None;
        loop {
            let delay = clock::until_next_local_hour(&Local::now(), hour);
            debug!(delay_secs = delay.as_secs(), "next daily report scheduled");
            tokio::time::sleep(delay).await;

            let today = Local::now().date_naive();
            if !clock::due_today(last_run, today) {
                continue;
            }
            last_run = Some(today);
            self.run_guarded(TaskKind::DailyReport).await;
        }
    }

    async fn run_guarded(&self, kind: TaskKind) {
        if let Err(e) = self.run(kind).await {
            error!(task = kind.name(), error = %e, "scheduled task failed");
            self.log_error(kind, &e).await;
        }
    }

    async fn log_error(&self, kind: TaskKind, err: &CoreError) {
        let entry = ErrorLogEntry::from_error(kind.name(), err);
        let key = keys::error_log(kind.name(), entry.timestamp.timestamp_millis(), self.next_seq());
        if let Err(e) = records::put(self.store.as_ref(), &key, &entry).await {
            error!(task = kind.name(), error = %e, "could not record task failure");
        }
    }

    async fn publish_state(&self, active: bool, tasks: &[TaskKind]) -> Result<()> {
        let state = SchedulerState {
            active,
            tasks: tasks.iter().map(|k| k.name().to_string()).collect(),
            updated_at: Utc::now(),
            intervals_secs: tasks
                .iter()
                .filter_map(|k| Some((k.name().to_string(), self.period(*k)?.as_secs())))
                .collect(),
        };
        records::put(self.store.as_ref(), keys::STATUS, &state).await
    }

    async fn run(&self, kind: TaskKind) -> Result<()> {
        match kind {
            TaskKind::OpportunityScan => self.scan().await,
            TaskKind::Matching => self.match_opportunities().await,
            TaskKind::Compliance => self.check_compliance().await,
            TaskKind::DailyReport => self.daily_report().await,
            TaskKind::NotificationFlush => self.flush_notifications().await,
        }
    }

    async fn scan(&self) -> Result<()> {
        let started = Instant::now();
        let outcome = self.engine.scan_opportunities().await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let snapshot = ScanSnapshot {
            timestamp: Utc::now(),
            duration_ms,
            opportunities_found: outcome.new_opportunities,
            total_opportunities: outcome.total_opportunities,
            high_priority_alerts: outcome.high_priority_alerts,
        };
        records::put(self.store.as_ref(), keys::LAST_SCAN, &snapshot).await?;
        info!(
            new = snapshot.opportunities_found,
            duration_ms,
            "scan completed"
        );
        Ok(())
    }

    async fn match_opportunities(&self) -> Result<()> {
        let outcome = self.engine.match_opportunities().await?;
        let snapshot = MatchSnapshot {
            timestamp: Utc::now(),
            opportunities_matched: outcome.matched,
            high_score_matches: outcome.high_score,
            average_match_score: outcome.average_score,
        };
        records::put(self.store.as_ref(), keys::LAST_MATCH, &snapshot).await?;
        info!(high_score = snapshot.high_score_matches, "matching completed");
        Ok(())
    }

    async fn check_compliance(&self) -> Result<()> {
        let coordinations = self.engine.coordinations().await?;
        let result = self.compliance.check(&coordinations, Local::now().date_naive());
        let now = Utc::now();

        let snapshot = ComplianceSnapshot {
            timestamp: now,
            coordinations_checked: result.checked,
            compliance_issues: result.issues,
            expiring_certifications: result.expiring,
        };
        records::put(self.store.as_ref(), keys::LAST_COMPLIANCE, &snapshot).await?;

        if result.issues > 0 {
            let alert = UrgentAlert {
                kind: "compliance_alert".into(),
                severity: Severity::High,
                message: format!("{} compliance issues detected", result.issues),
                details: serde_json::to_value(&result)?,
                timestamp: now,
            };
            let key = keys::urgent_alert("compliance", now.timestamp_millis(), self.next_seq());
            records::put(self.store.as_ref(), &key, &alert).await?;
            info!(key = %key, "compliance alert queued");
        }
        info!(issues = result.issues, "compliance check completed");
        Ok(())
    }

    async fn daily_report(&self) -> Result<()> {
        let sent = self.alerts_sent.load(Ordering::Relaxed).min(u32::MAX as u64) as u32;
        let report = build_daily_report(&self.engine, &self.compliance, sent, Local::now().date_naive()).await?;

        records::put(self.store.as_ref(), keys::DAILY_REPORT, &report).await?;
        self.notifier
            .send_daily_report(&report, &self.config.report_recipients)
            .await?;
        info!(date = %report.date, "daily report generated and sent");
        Ok(())
    }

    /// Deliver then delete every queued urgent alert.
    ///
    /// An alert that fails validation is dropped so it cannot wedge the
    /// queue. A delivery failure leaves the alert queued for the next tick.
    async fn flush_notifications(&self) -> Result<()> {
        let store = self.store.as_ref();
        for key in store.keys(keys::URGENT_ALERT_PATTERN).await? {
            let alert = match records::fetch::<UrgentAlert>(store, &key).await {
                Ok(Some(alert)) => alert,
                Ok(None) => continue,
                Err(CoreError::Schema { .. }) => {
                    store.del(&key).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.notifier.send_urgent(&alert).await?;
            store.del(&key).await?;
            self.alerts_sent.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

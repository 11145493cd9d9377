//! Integration tests for the watchtower scheduler.
//!
//! Timer behaviour runs on paused tokio time, so a five-minute interval
//! elapses instantly and deterministically.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use common::{harness, harness_with, FailingSource, GatedStore};
use watchtower_core::records::{
    self, keys, AutomationFigures, CoordinationFigures, DailyReport, ErrorLogEntry, FundingFigures,
    MatchSnapshot, OpportunityFigures, ScanSnapshot, SchedulerState, Severity,
};
use watchtower_core::scheduler::clock;
use watchtower_core::{
    CoordinationDraft, CoreError, KeyValueStore, LogNotifier, RestStore, ResearchEngine,
    SchedulerConfig, StoreError, TaskKind, UrgentAlert, WatchtowerScheduler,
};

#[tokio::test(start_paused = true)]
async fn test_start_registers_every_task_once() {
    let h = harness();
    h.scheduler.start().await.unwrap();
    h.scheduler.start().await.unwrap();

    let status = h.scheduler.status().await.unwrap();
    assert!(status.active);
    assert_eq!(
        status.tasks,
        vec![
            "compliance_monitoring",
            "daily_reports",
            "matching_engine",
            "notifications",
            "opportunity_scanning",
        ]
    );

    let state: SchedulerState = records::fetch(h.store.as_ref(), keys::STATUS)
        .await
        .unwrap()
        .unwrap();
    assert!(state.active);
    assert_eq!(state.intervals_secs.get("opportunity_scanning"), Some(&300));
    assert!(!state.intervals_secs.contains_key("daily_reports"));

    h.scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_without_start_is_a_no_op() {
    let h = harness();
    h.scheduler.stop().await;

    let status = h.scheduler.status().await.unwrap();
    assert!(!status.active);
    assert!(status.tasks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_clears_every_task() {
    let h = harness();
    h.scheduler.start().await.unwrap();
    h.scheduler.stop().await;

    let status = h.scheduler.status().await.unwrap();
    assert!(!status.active);
    assert!(status.tasks.is_empty());

    let state: SchedulerState = records::fetch(h.store.as_ref(), keys::STATUS)
        .await
        .unwrap()
        .unwrap();
    assert!(!state.active);
}

async fn stored_state(h: &common::Harness) -> SchedulerState {
    records::fetch(h.store.as_ref(), keys::STATUS)
        .await
        .unwrap()
        .expect("scheduler state")
}

#[tokio::test(start_paused = true)]
async fn test_individual_task_control() {
    let h = harness();
    assert!(h.scheduler.start_task(TaskKind::Matching).await.unwrap());
    assert!(!h.scheduler.start_task(TaskKind::Matching).await.unwrap());
    assert!(h.scheduler.is_running(TaskKind::Matching).await);

    let state = stored_state(&h).await;
    assert!(state.active);
    assert_eq!(state.tasks, vec!["matching_engine"]);
    assert_eq!(state.intervals_secs.get("matching_engine"), Some(&600));

    // A partial start is completed by `start`.
    h.scheduler.start().await.unwrap();
    assert_eq!(h.scheduler.status().await.unwrap().tasks.len(), 5);

    assert!(h.scheduler.stop_task(TaskKind::NotificationFlush).await);
    assert!(!h.scheduler.stop_task(TaskKind::NotificationFlush).await);
    assert_eq!(h.scheduler.status().await.unwrap().tasks.len(), 4);

    let state = stored_state(&h).await;
    assert!(state.active);
    assert_eq!(state.tasks.len(), 4);
    assert!(!state.tasks.contains(&"notifications".to_string()));

    h.scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stopping_every_task_individually_publishes_inactive_state() {
    let h = harness();
    h.scheduler.start().await.unwrap();
    for kind in TaskKind::ALL {
        assert!(h.scheduler.stop_task(kind).await);
    }

    let state = stored_state(&h).await;
    assert!(!state.active);
    assert!(state.tasks.is_empty());
    assert!(state.intervals_secs.is_empty());
    assert!(!h.scheduler.status().await.unwrap().active);
}

#[tokio::test(start_paused = true)]
async fn test_unconfigured_store_fails_start_task_without_timer() {
    let store: Arc<dyn KeyValueStore> = Arc::new(RestStore::unconfigured());
    let engine = Arc::new(ResearchEngine::new(store));
    let scheduler = WatchtowerScheduler::new(engine, Arc::new(LogNotifier), SchedulerConfig::default());

    let err = scheduler.start_task(TaskKind::Compliance).await.unwrap_err();
    assert!(err.is_not_configured());
    assert!(!scheduler.is_running(TaskKind::Compliance).await);
    assert!(scheduler.status().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_status_is_served_while_start_is_writing_state() {
    let store = Arc::new(GatedStore::new(keys::STATUS));
    let engine = Arc::new(ResearchEngine::new(store.clone() as Arc<dyn KeyValueStore>));
    let scheduler = Arc::new(WatchtowerScheduler::new(
        engine,
        Arc::new(LogNotifier),
        SchedulerConfig::default(),
    ));

    let starting = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.start().await }
    });
    store.entered.notified().await;

    let status = tokio::time::timeout(Duration::from_secs(5), scheduler.status())
        .await
        .expect("status waited on the state write")
        .unwrap();
    assert!(!status.active);
    let running = tokio::time::timeout(Duration::from_secs(5), scheduler.is_running(TaskKind::Matching))
        .await
        .expect("is_running waited on the state write");
    assert!(!running);

    store.release.notify_one();
    starting.await.unwrap().unwrap();
    assert_eq!(scheduler.status().await.unwrap().tasks.len(), 5);

    // Let the stopped-state write through as well.
    store.release.notify_one();
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_daily_report_fires_once_at_the_configured_hour() {
    let h = harness();
    let hour = SchedulerConfig::default().daily_report_hour;
    let delay = clock::until_next_local_hour(&Local::now(), hour);
    h.scheduler.start().await.unwrap();

    tokio::time::sleep(delay + Duration::from_secs(1)).await;
    assert_eq!(h.notifier.reports().len(), 1);
    assert!(h.store.get(keys::DAILY_REPORT).await.unwrap().is_some());

    // Still the same local date on the wall clock: no second report.
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(h.notifier.reports().len(), 1);

    h.scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unconfigured_store_fails_start_without_timers() {
    let store: Arc<dyn KeyValueStore> = Arc::new(RestStore::unconfigured());
    let engine = Arc::new(ResearchEngine::new(store));
    let scheduler = WatchtowerScheduler::new(engine, Arc::new(LogNotifier), SchedulerConfig::default());

    let err = scheduler.start().await.unwrap_err();
    assert!(matches!(err, CoreError::Store(StoreError::NotConfigured)));
    for kind in TaskKind::ALL {
        assert!(!scheduler.is_running(kind).await);
    }
}

#[tokio::test(start_paused = true)]
async fn test_failing_scan_logs_one_error_per_tick() {
    let h = harness_with(vec![Arc::new(FailingSource)]);
    h.scheduler.start().await.unwrap();

    // No tick before the first full period.
    tokio::time::sleep(Duration::from_secs(299)).await;
    assert!(h.store.keys("error:*").await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let errors = h.store.keys("error:opportunity_scanning:*").await.unwrap();
    assert_eq!(errors.len(), 1);

    let entry: ErrorLogEntry = records::fetch(h.store.as_ref(), &errors[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.component, "opportunity_scanning");
    assert!(entry.error.contains("connection refused"));

    // The timer survives the failure.
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.store.keys("error:opportunity_scanning:*").await.unwrap().len(), 2);
    assert!(h.store.get(keys::LAST_SCAN).await.unwrap().is_none());

    h.scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_scan_tick_records_snapshot() {
    let h = harness();
    h.scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(301)).await;

    let status = h.scheduler.status().await.unwrap();
    let scan = status.last_scan.expect("scan snapshot");
    assert_eq!(scan.opportunities_found, 3);
    assert_eq!(scan.total_opportunities, 3);
    assert!(status.last_match.is_none());
    assert!(h.store.keys("error:*").await.unwrap().is_empty());

    h.scheduler.stop().await;
}

#[tokio::test]
async fn test_run_once_returns_the_error_without_logging() {
    let h = harness_with(vec![Arc::new(FailingSource)]);
    let err = h.scheduler.run_once(TaskKind::OpportunityScan).await.unwrap_err();
    assert!(matches!(err, CoreError::Source(_)));
    assert!(h.store.keys("error:*").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_treats_invalid_snapshot_as_absent() {
    let h = harness();
    h.store
        .set_ex(keys::LAST_MATCH, Duration::from_secs(60), r#"{"matched":47}"#.into())
        .await
        .unwrap();
    h.scheduler.run_once(TaskKind::OpportunityScan).await.unwrap();

    let status = h.scheduler.status().await.unwrap();
    assert!(status.last_scan.is_some());
    assert!(status.last_match.is_none());
}

#[tokio::test]
async fn test_compliance_tick_queues_urgent_alert() {
    let h = harness();
    h.scheduler
        .engine()
        .create_coordination(CoordinationDraft::default())
        .await
        .unwrap();

    h.scheduler.run_once(TaskKind::Compliance).await.unwrap();

    let status = h.scheduler.status().await.unwrap();
    let compliance = status.last_compliance.expect("compliance snapshot");
    assert_eq!(compliance.coordinations_checked, 1);
    assert_eq!(compliance.compliance_issues, 1);

    let queued = h.store.keys(keys::URGENT_ALERT_PATTERN).await.unwrap();
    assert_eq!(queued.len(), 1);
    assert!(queued[0].starts_with("alert:urgent:compliance_"));

    let alert: UrgentAlert = records::fetch(h.store.as_ref(), &queued[0]).await.unwrap().unwrap();
    assert_eq!(alert.kind, "compliance_alert");
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.message, "1 compliance issues detected");
}

#[tokio::test]
async fn test_notification_flush_delivers_then_deletes() {
    let h = harness();
    let alert = UrgentAlert {
        kind: "compliance_alert".into(),
        severity: Severity::High,
        message: "2 compliance issues detected".into(),
        details: serde_json::json!({ "issues": 2 }),
        timestamp: Utc::now(),
    };
    records::put(h.store.as_ref(), &keys::urgent_alert("compliance", 1, 0), &alert)
        .await
        .unwrap();
    h.store
        .set_ex("alert:urgent:legacy_1", Duration::from_secs(60), "not a record".into())
        .await
        .unwrap();

    h.scheduler.run_once(TaskKind::NotificationFlush).await.unwrap();

    assert_eq!(h.notifier.urgent(), vec![alert]);
    assert!(h.store.keys(keys::URGENT_ALERT_PATTERN).await.unwrap().is_empty());
    assert_eq!(h.scheduler.alerts_sent(), 1);
}

#[tokio::test]
async fn test_daily_report_matches_store_contents() {
    let h = harness();
    h.scheduler.run_once(TaskKind::OpportunityScan).await.unwrap();
    h.scheduler.run_once(TaskKind::Matching).await.unwrap();
    h.scheduler
        .engine()
        .create_coordination(CoordinationDraft::default())
        .await
        .unwrap();
    h.scheduler
        .engine()
        .generate_grant_proposal_for("NIH_R01_CA_2024_001")
        .await
        .unwrap();

    h.scheduler.run_once(TaskKind::DailyReport).await.unwrap();

    let last_match: MatchSnapshot = records::fetch(h.store.as_ref(), keys::LAST_MATCH)
        .await
        .unwrap()
        .unwrap();
    let last_scan: ScanSnapshot = records::fetch(h.store.as_ref(), keys::LAST_SCAN)
        .await
        .unwrap()
        .unwrap();
    let expected = DailyReport {
        date: Local::now().date_naive(),
        opportunities: OpportunityFigures {
            total: 3,
            new: last_scan.opportunities_found,
            high_priority: 1,
            average_match_score: last_match.average_match_score,
        },
        coordinations: CoordinationFigures {
            active: 1,
            completed: 0,
            compliance_issues: 1,
        },
        funding: FundingFigures {
            total_pipeline: 500_000 + 750_000 + 300_000,
            high_probability: 500_000,
            submitted: 0,
        },
        automation: AutomationFigures {
            proposals_generated: 1,
            documents_created: 0,
            alerts_sent: 0,
        },
    };

    let stored: DailyReport = records::fetch(h.store.as_ref(), keys::DAILY_REPORT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, expected);
    assert_eq!(last_scan.opportunities_found, 3);

    let sent = h.notifier.reports();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, expected);
    assert_eq!(sent[0].1, SchedulerConfig::default().report_recipients);

    let ttl = h.store.ttl(keys::DAILY_REPORT).unwrap();
    assert!(ttl > Duration::from_secs(6 * 24 * 3600));
}

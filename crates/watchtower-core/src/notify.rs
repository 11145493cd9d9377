//! Outbound notifications.
//!
//! Delivery channels are pluggable behind [`Notifier`]. The shipped
//! [`LogNotifier`] only emits tracing events.

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::records::{DailyReport, UrgentAlert};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_daily_report(&self, report: &DailyReport, recipients: &[String]) -> Result<()>;

    async fn send_urgent(&self, alert: &UrgentAlert) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_daily_report(&self, report: &DailyReport, recipients: &[String]) -> Result<()> {
        info!(
            recipients = ?recipients,
            subject = %format!("Research Watchtower Daily Report - {}", report.date),
            new_opportunities = report.opportunities.new,
            active_coordinations = report.coordinations.active,
            "daily report sent"
        );
        Ok(())
    }

    async fn send_urgent(&self, alert: &UrgentAlert) -> Result<()> {
        info!(
            kind = %alert.kind,
            severity = ?alert.severity,
            message = %alert.message,
            "urgent notification sent"
        );
        Ok(())
    }
}

//! Wall-clock helpers for the daily report.
//!
//! The delay is recomputed from the current local time before every run,
//! so a DST change or a restart never shifts the report off its hour.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

/// Resolve a local wall time, stepping forward out of a DST gap.
fn resolve<Tz: TimeZone>(tz: &Tz, mut naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    for _ in 0..3 {
        if let Some(t) = tz.from_local_datetime(&naive).earliest() {
            return Some(t);
        }
        naive += chrono::Duration::hours(1);
    }
    None
}

fn at_hour<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Tz>> {
    resolve(tz, date.and_hms_opt(hour.min(23), 0, 0)?)
}

/// The first `hour:00` local time strictly after `now`.
pub fn next_local_hour<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();
    match at_hour(&tz, today, hour) {
        Some(t) if t > *now => Some(t),
        _ => at_hour(&tz, today.succ_opt()?, hour),
    }
}

/// Whether the daily run is due on `today`, given the date it last ran.
///
/// At most one run per local date. A clock set back to an earlier date
/// does not trigger a second run.
pub fn due_today(last_run: Option<NaiveDate>, today: NaiveDate) -> bool {
    last_run.map_or(true, |last| last < today)
}

/// Time from `now` until the next `hour:00` local.
pub fn until_next_local_hour<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Duration {
    next_local_hour(now, hour)
        .and_then(|next| (next - now.clone()).to_std().ok())
        // Unresolvable hour: fall back to a plain day.
        .unwrap_or(Duration::from_secs(24 * 3600))
}

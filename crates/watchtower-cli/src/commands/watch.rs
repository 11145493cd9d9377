//! Scheduler commands: run, status and one-off ticks.

use tracing::info;
use watchtower_core::records::{self, keys, DailyReport};
use watchtower_core::{SchedulerStatus, TaskKind};

use super::{block_on, CliResult, Context};

/// Start every task and block until Ctrl-C.
pub fn run(ctx: &Context) -> CliResult {
    let scheduler = ctx.scheduler()?;
    block_on(async move {
        scheduler.start().await?;
        println!("watchtower running; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        info!("interrupt received");
        scheduler.stop().await;
        println!("watchtower stopped");
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}

pub fn status(ctx: &Context, json: bool) -> CliResult {
    let scheduler = ctx.scheduler()?;
    let status = block_on(async move { Ok::<_, Box<dyn std::error::Error>>(scheduler.status().await?) })?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn print_status(status: &SchedulerStatus) {
    // Tasks live in the running process; this shows the stored snapshots.
    match &status.last_scan {
        Some(scan) => println!(
            "Last scan:       {} ({} new, {} total, {} ms)",
            scan.timestamp.format("%Y-%m-%d %H:%M:%S"),
            scan.opportunities_found,
            scan.total_opportunities,
            scan.duration_ms
        ),
        None => println!("Last scan:       never"),
    }
    match &status.last_match {
        Some(m) => println!(
            "Last match:      {} ({} matched, {} high, avg {:.2})",
            m.timestamp.format("%Y-%m-%d %H:%M:%S"),
            m.opportunities_matched,
            m.high_score_matches,
            m.average_match_score
        ),
        None => println!("Last match:      never"),
    }
    match &status.last_compliance {
        Some(c) => println!(
            "Last compliance: {} ({} checked, {} issues, {} expiring)",
            c.timestamp.format("%Y-%m-%d %H:%M:%S"),
            c.coordinations_checked,
            c.compliance_issues,
            c.expiring_certifications
        ),
        None => println!("Last compliance: never"),
    }
}

/// Run one tick of `task` and print what it recorded.
pub fn tick(ctx: &Context, task: &str, json: bool) -> CliResult {
    let kind: TaskKind = task.parse()?;
    let scheduler = ctx.scheduler()?;

    let (status, report) = block_on(async move {
        scheduler.run_once(kind).await?;
        let store = scheduler.engine().store().clone();
        let report = if kind == TaskKind::DailyReport {
            records::fetch::<DailyReport>(store.as_ref(), keys::DAILY_REPORT).await?
        } else {
            None
        };
        Ok::<_, Box<dyn std::error::Error>>((scheduler.status().await?, report))
    })?;

    if json {
        let out = match report {
            Some(report) => serde_json::to_value(&report)?,
            None => serde_json::to_value(&status)?,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{kind} tick completed");
    match report {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => print_status(&status),
    }
    Ok(())
}

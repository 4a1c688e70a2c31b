use crate::OutputFormat;
use crate::api::models::TimeEntry;
use crate::session::Session;
use crate::timer::board::TimerRow;
use crate::timer::elapsed::{compute_elapsed_seconds, format_elapsed_secs};
use crate::timer::record::{TimerRecord, TimerStatus};
use crate::timer::ticker::{Ticker, TickerConfig};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// A record plus its live elapsed value, as printed by every timer command.
#[derive(Serialize)]
struct TimerView<'a> {
    #[serde(flatten)]
    record: &'a TimerRecord,
    live_elapsed_seconds: u64,
    live_elapsed: String,
}

fn print_timer(session: &Session, timer: &TimerRecord, format: OutputFormat, verb: &str) -> Result<()> {
    let elapsed = compute_elapsed_seconds(timer, session.clock().now());
    match format {
        OutputFormat::Json => {
            let view = TimerView {
                record: timer,
                live_elapsed_seconds: elapsed,
                live_elapsed: format_elapsed_secs(elapsed),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Text => {
            println!(
                "✓ Timer {} {}: {} [{}] {}",
                timer.id,
                verb,
                display_name(&timer.project_name, timer.project),
                timer.status,
                format_elapsed_secs(elapsed)
            );
        }
    }
    Ok(())
}

fn display_name(name: &str, project: u64) -> String {
    if name.is_empty() {
        format!("Project {}", project)
    } else {
        name.to_string()
    }
}

pub fn start(session: &Session, project: u64, notes: Option<String>, format: OutputFormat) -> Result<()> {
    let timer = session.start(project, notes)?;
    print_timer(session, &timer, format, "started")
}

pub fn pause(session: &Session, id: Option<u64>, format: OutputFormat) -> Result<()> {
    let timer = session.pause(session.resolve_timer(id)?)?;
    print_timer(session, &timer, format, "paused")
}

pub fn resume(session: &Session, id: Option<u64>, format: OutputFormat) -> Result<()> {
    let timer = session.resume(session.resolve_timer(id)?)?;
    print_timer(session, &timer, format, "resumed")
}

pub fn stop(
    session: &Session,
    id: Option<u64>,
    summary: &str,
    task: Option<String>,
    billable: bool,
    format: OutputFormat,
) -> Result<()> {
    let id = session.resolve_timer(id)?;
    let entry = session.stop(id, summary, task, billable)?;
    print_entry(&entry, id, format)
}

fn print_entry(entry: &TimeEntry, timer_id: u64, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entry)?),
        OutputFormat::Text => {
            println!(
                "✓ Timer {} stopped. Logged {} to {} (entry {}{})",
                timer_id,
                format_elapsed_secs(entry.duration_minutes * 60),
                display_name(&entry.project_name, entry.project),
                entry.id,
                if entry.billable { "" } else { ", non-billable" }
            );
            println!("  {}: {}", entry.task, entry.notes);
        }
    }
    Ok(())
}

/// Show every timer with its live elapsed time, or just timer `id`.
pub fn status(session: &Session, id: Option<u64>, offline: bool, format: OutputFormat) -> Result<()> {
    if let Some(id) = id {
        if offline {
            let rows = session.load_snapshot()?;
            let row: Vec<TimerRow> = rows.into_iter().filter(|r| r.id == id).collect();
            if row.is_empty() {
                anyhow::bail!("Timer {} is not in the cached snapshot", id);
            }
            return print_rows(&row, format, &mut io::stdout());
        }
        let timer = session.show(id)?;
        return print_timer(session, &timer, format, "status");
    }

    let rows = if offline {
        session.load_snapshot()?
    } else {
        session.refresh()?
    };
    print_rows(&rows, format, &mut io::stdout())
}

pub fn print_rows<W: Write>(rows: &[TimerRow], format: OutputFormat, out: &mut W) -> Result<()> {
    if format == OutputFormat::Json {
        writeln!(out, "{}", serde_json::to_string(rows)?)?;
        return Ok(());
    }

    if rows.is_empty() {
        writeln!(out, "No active timers.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<6} {:<30} {:<24} {:<8} {:>10}",
        "ID", "Project", "User", "Status", "Elapsed"
    )?;
    writeln!(out, "{}", "-".repeat(82))?;

    for row in rows {
        let project = if row.project_name.chars().count() > 28 {
            format!("{}...", row.project_name.chars().take(25).collect::<String>())
        } else {
            row.project_name.clone()
        };
        let status = if row.pending {
            "...".to_string()
        } else {
            row.status.to_string()
        };
        writeln!(
            out,
            "{:<6} {:<30} {:<24} {:<8} {:>10}",
            row.id, project, row.user_email, status, row.elapsed
        )?;
    }

    let running = rows.iter().filter(|r| r.status == TimerStatus::Running).count();
    writeln!(out, "\nTotal: {} timers ({} running)", rows.len(), running)?;
    Ok(())
}

/// Live board: redraws every second while a timer runs and refetches on the
/// configured poll interval, until Ctrl-C.
pub async fn watch(session: &Session, format: OutputFormat) -> Result<()> {
    let config = TickerConfig {
        tick: Duration::from_secs(1),
        poll_every: Some(Duration::from_secs(session.config().display.poll_interval_secs)),
    };

    // show the cached timers while the first fetch is outstanding
    if let Err(e) = session.load_snapshot() {
        tracing::debug!("No cached timers to show: {:#}", e);
    }

    let handle = Ticker::new(session.board(), session.clock(), config)
        .with_source(session.client())
        .spawn(move |rows| {
            let mut stdout = io::stdout().lock();
            if format == OutputFormat::Text {
                // clear screen, cursor home
                let _ = write!(stdout, "\x1B[2J\x1B[H");
            }
            if let Err(e) = print_rows(rows, format, &mut stdout) {
                tracing::warn!("Failed to render timers: {:#}", e);
            }
            let _ = stdout.flush();
        });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    handle.shutdown().await;
    Ok(())
}

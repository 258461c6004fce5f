//! `tally log` commands: append to and inspect the daily work log.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

use tally_core::{LogEntry, TimeRange};
use tally_store::FileLogStore;

use crate::LogCommands;

/// Run a log subcommand.
pub fn run_log_command(command: LogCommands, store: &FileLogStore) -> Result<()> {
    match command {
        LogCommands::Add {
            date,
            start,
            end,
            tag,
            description,
        } => {
            let date = parse_date_or_today(date.as_deref())?;
            let window = parse_window(date, &start, &end)?;
            let entry = LogEntry {
                window,
                description,
                tags: tag.into_iter().collect::<BTreeSet<_>>(),
            };
            store.append(entry)?;
            println!(
                "Logged {}–{} on {date}.",
                window.start.format("%H:%M"),
                window.end.format("%H:%M"),
            );
        }
        LogCommands::List { date } => {
            let date = parse_date_or_today(date.as_deref())?;
            let entries = store.entries_for(date)?;
            if entries.is_empty() {
                println!("No entries for {date}.");
                return Ok(());
            }
            println!("Entries for {date}:");
            for entry in &entries {
                let tags = if entry.tags.is_empty() {
                    String::new()
                } else {
                    format!(
                        " [{}]",
                        entry.tags.iter().cloned().collect::<Vec<_>>().join(", ")
                    )
                };
                println!(
                    "  {}–{}  {}{tags}",
                    entry.window.start.format("%H:%M"),
                    entry.window.end.format("%H:%M"),
                    entry.description,
                );
            }
        }
    }
    Ok(())
}

pub fn parse_date_or_today(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        None => Ok(Utc::now().date_naive()),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .with_context(|| format!("invalid date {text:?}: expected YYYY-MM-DD")),
    }
}

/// Build the entry window from `HH:MM` times on `date` (UTC). An end at or
/// before the start is taken to be on the following day.
fn parse_window(date: NaiveDate, start: &str, end: &str) -> Result<TimeRange> {
    let start = at(date, parse_time(start)?);
    let mut end = at(date, parse_time(end)?);
    if end <= start {
        end = at(
            date.checked_add_days(Days::new(1))
                .context("date out of range")?,
            end.time(),
        );
    }
    Ok(TimeRange::new(start, end)?)
}

fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .with_context(|| format!("invalid time {text:?}: expected HH:MM"))
}

fn at(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

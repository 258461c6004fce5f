//! `tally report` command: generate a reconciled timesheet and render it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use tokio_util::sync::CancellationToken;

use tally_core::{GenerateOptions, TimeRange};

use crate::config::TallyConfig;
use crate::engine::Engine;
use crate::log_cmd::parse_date_or_today;

pub struct ReportArgs {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub allow_empty_plan: bool,
    pub output: Option<PathBuf>,
}

/// Run the report command. Fails (nonzero exit) when no audience produced
/// a report.
pub async fn run_report(engine: &Engine, config: &TallyConfig, args: ReportArgs) -> Result<()> {
    let range = resolve_range(&args)?;
    let context = config.require_identity()?;
    let identity = engine.plans.resolve(context).await?;

    // A Ctrl-C aborts the run; in-flight plugin calls see the token.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            signal_cancel.cancel();
        }
    });

    let out = engine
        .timesheets
        .generate(
            &identity,
            &range,
            &config.audiences,
            GenerateOptions {
                allow_empty_plan: args.allow_empty_plan,
            },
            &cancel,
        )
        .await?;

    for (name, err) in &out.failed_renders {
        eprintln!("warning: audience {name} failed: {err}");
    }

    match &args.output {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            for (name, report) in &out.reports {
                let path = dir.join(format!(
                    "timesheet-{}.{}",
                    range.start.format("%Y-%m-%d"),
                    extension_for(&report.media_type),
                ));
                std::fs::write(&path, &report.body)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("{name}: wrote {}", path.display());
            }
        }
        None => {
            for (i, (_, report)) in out.reports.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print!("{}", report.body);
            }
        }
    }

    anyhow::ensure!(
        !out.reports.is_empty(),
        "no audience produced a report ({} failed)",
        out.failed_renders.len()
    );
    Ok(())
}

/// Turn `--date` / `--from` / `--to` into a UTC range. Defaults to today;
/// `--to` names the last *included* day.
fn resolve_range(args: &ReportArgs) -> Result<TimeRange> {
    anyhow::ensure!(
        args.date.is_none() || (args.from.is_none() && args.to.is_none()),
        "--date cannot be combined with --from/--to"
    );

    let (first, last) = match (&args.from, &args.to) {
        (None, None) => {
            let date = parse_date_or_today(args.date.as_deref())?;
            (date, date)
        }
        (from, to) => {
            let from = parse_date_or_today(from.as_deref())?;
            let to = parse_date_or_today(to.as_deref())?;
            (from, to)
        }
    };

    let end_day = last
        .checked_add_days(Days::new(1))
        .context("date out of range")?;
    Ok(TimeRange::new(
        day_start(first),
        day_start(end_day),
    )?)
}

fn day_start(date: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn extension_for(media_type: &str) -> &str {
    match media_type {
        "text/markdown" => "md",
        "application/json" => "json",
        _ => "txt",
    }
}

//! Built-in audience rendering a human-readable Markdown timesheet.

use std::fmt::Write as _;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::model::{Identity, LogEntry, ReconciledTimesheet, RenderedReport};
use crate::plugin::Audience;

/// Renders the three reconciliation buckets as a Markdown document with a
/// logged-time total. Suitable for pasting into a status update.
#[derive(Debug, Default)]
pub struct MarkdownAudience;

impl MarkdownAudience {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Audience for MarkdownAudience {
    fn name(&self) -> &str {
        "markdown"
    }

    fn media_type(&self) -> &str {
        "text/markdown"
    }

    async fn render(
        &self,
        timesheet: &ReconciledTimesheet,
        identity: &Identity,
    ) -> Result<RenderedReport> {
        let mut out = String::new();

        writeln!(
            out,
            "# Timesheet for {} ({} – {})",
            identity.display_name,
            fmt_time(timesheet.range.start),
            fmt_time(timesheet.range.end),
        )?;
        writeln!(out)?;

        let mut logged = Duration::zero();

        writeln!(out, "## Planned and done")?;
        if timesheet.fulfilled.is_empty() {
            writeln!(out, "_nothing_")?;
        }
        for fulfilled in &timesheet.fulfilled {
            writeln!(
                out,
                "- **{}** ({} · {})",
                fulfilled.item.title, fulfilled.item.source_id, fulfilled.item.external_ref
            )?;
            for entry in &fulfilled.entries {
                logged += entry.window.duration();
                writeln!(out, "  - {}", entry_line(entry))?;
            }
        }
        writeln!(out)?;

        writeln!(out, "## Planned but not done")?;
        if timesheet.unfulfilled.is_empty() {
            writeln!(out, "_nothing_")?;
        }
        for item in &timesheet.unfulfilled {
            writeln!(
                out,
                "- **{}** ({} · {})",
                item.title, item.source_id, item.external_ref
            )?;
        }
        writeln!(out)?;

        writeln!(out, "## Done but unplanned")?;
        if timesheet.unplanned.is_empty() {
            writeln!(out, "_nothing_")?;
        }
        for entry in &timesheet.unplanned {
            logged += entry.window.duration();
            writeln!(out, "- {}", entry_line(entry))?;
        }
        writeln!(out)?;

        if !timesheet.duplicate_groups.is_empty() {
            writeln!(out, "## Possible duplicates across sources")?;
            for group in &timesheet.duplicate_groups {
                let members: Vec<String> = group
                    .members
                    .iter()
                    .map(|m| format!("{}:{}", m.source_id, m.external_ref))
                    .collect();
                writeln!(out, "- \"{}\": {}", group.normalized_title, members.join(", "))?;
            }
            writeln!(out)?;
        }

        if !timesheet.warnings.is_empty() {
            writeln!(out, "## Collection warnings")?;
            for warning in &timesheet.warnings {
                writeln!(out, "- `{}`: {}", warning.source, warning.message)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "**Total logged:** {}", fmt_duration(logged))?;

        Ok(RenderedReport::new(self.media_type(), out))
    }
}

fn entry_line(entry: &LogEntry) -> String {
    format!(
        "{}–{} ({}) {}",
        fmt_time(entry.window.start),
        fmt_time(entry.window.end),
        fmt_duration(entry.window.duration()),
        entry.description,
    )
}

fn fmt_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

fn fmt_duration(d: Duration) -> String {
    let minutes = d.num_minutes();
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

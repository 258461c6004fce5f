//! The daily work log: one TOML file per day under `logs/`.
//!
//! Entries are filed under the UTC date of their start time. The format is
//! meant to be hand-editable:
//!
//! ```toml
//! [[entry]]
//! start = "2025-03-15T09:00:00Z"
//! end = "2025-03-15T10:30:00Z"
//! description = "drafted the quarterly report"
//! tags = ["reporting"]
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{LogEntry, LogStore, TimeRange};

use crate::layout::{StoreError, StoreLayout};

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    description: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DayFile {
    #[serde(default, rename = "entry", skip_serializing_if = "Vec::is_empty")]
    entries: Vec<EntryRecord>,
}

impl From<&LogEntry> for EntryRecord {
    fn from(entry: &LogEntry) -> Self {
        Self {
            start: entry.window.start,
            end: entry.window.end,
            description: entry.description.clone(),
            tags: entry.tags.clone(),
        }
    }
}

impl EntryRecord {
    fn into_entry(self, path: &Path) -> Result<LogEntry, StoreError> {
        let window = TimeRange::new(self.start, self.end).map_err(|err| StoreError::InvalidEntry {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Ok(LogEntry {
            window,
            description: self.description,
            tags: self.tags,
        })
    }
}

/// Append-capable [`LogStore`] over the `logs/` directory.
#[derive(Debug, Clone)]
pub struct FileLogStore {
    layout: StoreLayout,
}

impl FileLogStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.layout
            .logs_dir()
            .join(format!("{}.toml", date.format("%Y-%m-%d")))
    }

    fn read_day(&self, date: NaiveDate) -> Result<Vec<LogEntry>, StoreError> {
        let path = self.day_path(date);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(StoreError::io(&path, err)),
        };
        let day: DayFile = toml::from_str(&text).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        day.entries
            .into_iter()
            .map(|record| record.into_entry(&path))
            .collect()
    }

    fn write_day(&self, date: NaiveDate, entries: &[LogEntry]) -> Result<(), StoreError> {
        let path = self.day_path(date);
        let day = DayFile {
            entries: entries.iter().map(EntryRecord::from).collect(),
        };
        let text = toml::to_string_pretty(&day).map_err(|source| StoreError::Serialize {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, text).map_err(|err| StoreError::io(&path, err))
    }

    /// Append an entry to its day file, keeping the file sorted by start.
    pub fn append(&self, entry: LogEntry) -> Result<(), StoreError> {
        let date = entry.window.start.date_naive();
        let mut entries = self.read_day(date)?;
        entries.push(entry);
        entries.sort_by_key(|e| e.window.start);
        self.write_day(date, &entries)?;
        tracing::debug!(date = %date, entries = entries.len(), "appended log entry");
        Ok(())
    }

    /// All entries for one UTC date, in start order.
    pub fn entries_for(&self, date: NaiveDate) -> Result<Vec<LogEntry>, StoreError> {
        self.read_day(date)
    }
}

#[async_trait]
impl LogStore for FileLogStore {
    async fn read(&self, range: &TimeRange) -> anyhow::Result<Vec<LogEntry>> {
        // An entry crossing midnight is filed under the day it started, so
        // the scan begins one day before the range.
        let first = range
            .start
            .date_naive()
            .checked_sub_days(Days::new(1))
            .unwrap_or(range.start.date_naive());
        let last = range.end.date_naive();

        let mut entries = Vec::new();
        let mut date = first;
        while date <= last {
            entries.extend(
                self.read_day(date)?
                    .into_iter()
                    .filter(|e| e.window.overlaps(range)),
            );
            date = date.succ_opt().ok_or_else(|| {
                anyhow::anyhow!("date overflow while scanning log directory")
            })?;
        }
        entries.sort_by_key(|e| e.window.start);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn store() -> (tempfile::TempDir, FileLogStore) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StoreLayout::init(tmp.path().join(".tally")).unwrap();
        (tmp, FileLogStore::new(layout))
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, m, 0).unwrap()
    }

    fn entry(start: DateTime<Utc>, end: DateTime<Utc>, desc: &str) -> LogEntry {
        LogEntry {
            window: TimeRange::new(start, end).unwrap(),
            description: desc.to_string(),
            tags: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn append_then_read_round_trips() {
        let (_tmp, store) = store();
        let mut logged = entry(at(15, 9, 0), at(15, 10, 30), "morning work");
        logged.tags.insert("deep-work".into());
        store.append(logged.clone()).unwrap();

        let range = TimeRange::new(at(15, 0, 0), at(16, 0, 0)).unwrap();
        let read = store.read(&range).await.unwrap();
        assert_eq!(read, vec![logged]);
    }

    #[tokio::test]
    async fn entries_are_sorted_across_days() {
        let (_tmp, store) = store();
        store
            .append(entry(at(16, 9, 0), at(16, 10, 0), "second day"))
            .unwrap();
        store
            .append(entry(at(15, 14, 0), at(15, 15, 0), "first day pm"))
            .unwrap();
        store
            .append(entry(at(15, 9, 0), at(15, 10, 0), "first day am"))
            .unwrap();

        let range = TimeRange::new(at(15, 0, 0), at(17, 0, 0)).unwrap();
        let descs: Vec<String> = store
            .read(&range)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(descs, vec!["first day am", "first day pm", "second day"]);
    }

    #[tokio::test]
    async fn midnight_crossing_entry_is_found_from_the_next_day() {
        let (_tmp, store) = store();
        store
            .append(entry(at(14, 23, 0), at(15, 1, 0), "late shift"))
            .unwrap();

        // Query only the 15th; the entry is filed under the 14th.
        let range = TimeRange::new(at(15, 0, 0), at(16, 0, 0)).unwrap();
        let read = store.read(&range).await.unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].description, "late shift");
    }

    #[tokio::test]
    async fn out_of_range_entries_are_filtered() {
        let (_tmp, store) = store();
        store
            .append(entry(at(10, 9, 0), at(10, 10, 0), "long ago"))
            .unwrap();

        let range = TimeRange::new(at(15, 0, 0), at(16, 0, 0)).unwrap();
        assert!(store.read(&range).await.unwrap().is_empty());
    }

    #[test]
    fn day_file_is_hand_editable_toml() {
        let (_tmp, store) = store();
        store
            .append(entry(at(15, 9, 0), at(15, 10, 0), "work"))
            .unwrap();

        let path = store.day_path(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("[[entry]]"));
        assert!(text.contains("description = \"work\""));
    }
}

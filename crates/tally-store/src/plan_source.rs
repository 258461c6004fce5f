//! Locally-authored plans: hand-written TOML files under `plans/`, exposed
//! to the engine as the `local` plan source.
//!
//! ```toml
//! [[item]]
//! ref = "report-q1"
//! title = "Write quarterly report"
//! start = "2025-03-15T09:00:00Z"
//! end = "2025-03-15T11:00:00Z"
//! effort_minutes = 90
//! tags = ["reporting"]
//! ```
//!
//! `end` and `effort_minutes` are optional; an item without an end is
//! open-ended.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use tally_core::{Identity, PlanItem, PlanSource, TimeRange, TimeWindow};

use crate::layout::{StoreError, StoreLayout};

/// Name this source registers under.
pub const SOURCE_NAME: &str = "local";

#[derive(Debug, Deserialize)]
struct ItemRecord {
    #[serde(rename = "ref")]
    external_ref: String,
    title: String,
    start: DateTime<Utc>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    effort_minutes: Option<i64>,
    #[serde(default)]
    tags: BTreeSet<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PlanFile {
    #[serde(default, rename = "item")]
    items: Vec<ItemRecord>,
}

impl ItemRecord {
    fn into_item(self) -> PlanItem {
        PlanItem {
            source_id: SOURCE_NAME.to_string(),
            external_ref: self.external_ref,
            title: self.title,
            window: TimeWindow::new(self.start, self.end),
            estimated_effort: self.effort_minutes.map(Duration::minutes),
            tags: self.tags,
        }
    }
}

/// [`PlanSource`] over the `plans/` directory.
#[derive(Debug, Clone)]
pub struct FilePlanSource {
    layout: StoreLayout,
}

impl FilePlanSource {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    fn plan_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.layout.plans_dir();
        let mut files = Vec::new();
        let reader = std::fs::read_dir(&dir).map_err(|err| StoreError::io(&dir, err))?;
        for dir_entry in reader {
            let path = dir_entry.map_err(|err| StoreError::io(&dir, err))?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        // Directory iteration order is platform-dependent; sort for a
        // deterministic item order.
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<PlanItem>, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|err| StoreError::io(path, err))?;
        let file: PlanFile = toml::from_str(&text).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(file.items.into_iter().map(ItemRecord::into_item).collect())
    }
}

#[async_trait]
impl PlanSource for FilePlanSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self, _identity: &Identity, range: &TimeRange) -> anyhow::Result<Vec<PlanItem>> {
        let mut items = Vec::new();
        for path in self.plan_files()? {
            let all = self.read_file(&path)?;
            let in_range = all.into_iter().filter(|i| i.window.overlaps(range));
            items.extend(in_range);
        }
        tracing::debug!(items = items.len(), "loaded local plan items");
        Ok(items)
    }
}

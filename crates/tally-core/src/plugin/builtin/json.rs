//! Built-in audience exporting the reconciled timesheet as JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::model::{Identity, ReconciledTimesheet, RenderedReport};
use crate::plugin::Audience;

/// Canonical machine-readable export: the full timesheet plus the identity
/// it was generated for.
#[derive(Debug, Default)]
pub struct JsonAudience;

impl JsonAudience {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    identity: &'a Identity,
    timesheet: &'a ReconciledTimesheet,
}

#[async_trait]
impl Audience for JsonAudience {
    fn name(&self) -> &str {
        "json"
    }

    fn media_type(&self) -> &str {
        "application/json"
    }

    async fn render(
        &self,
        timesheet: &ReconciledTimesheet,
        identity: &Identity,
    ) -> Result<RenderedReport> {
        let body = serde_json::to_string_pretty(&JsonExport {
            identity,
            timesheet,
        })
        .context("failed to serialize timesheet")?;
        Ok(RenderedReport::new(self.media_type(), body))
    }
}

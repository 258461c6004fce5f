//! Engine assembly: wire the file-backed stores and built-in plugins into
//! the managers.

use std::sync::Arc;

use anyhow::Result;

use tally_core::plugin::builtin::{JsonAudience, MarkdownAudience};
use tally_core::{CapabilityKind, PlanManager, PluginHandle, PluginManager, TimesheetManager};
use tally_store::{FileIdentityStore, FileLogStore, FilePlanSource, StoreLayout};

use crate::config::TallyConfig;

pub struct Engine {
    pub plugins: Arc<PluginManager>,
    pub plans: Arc<PlanManager>,
    pub timesheets: TimesheetManager,
}

/// Build the standard engine: the `local` plan source plus the built-in
/// `markdown` and `json` audiences.
pub fn build(layout: &StoreLayout, config: &TallyConfig) -> Result<Engine> {
    let plugins = Arc::new(PluginManager::new(config.call_timeout));
    plugins.register(
        PluginHandle::PlanSource(Arc::new(FilePlanSource::new(layout.clone()))),
        CapabilityKind::PlanSource,
    )?;
    plugins.register(
        PluginHandle::Audience(Arc::new(MarkdownAudience)),
        CapabilityKind::Audience,
    )?;
    plugins.register(
        PluginHandle::Audience(Arc::new(JsonAudience)),
        CapabilityKind::Audience,
    )?;

    let plans = Arc::new(PlanManager::new(
        Arc::clone(&plugins),
        Arc::new(FileIdentityStore::new(layout.clone())),
    ));
    let timesheets = TimesheetManager::new(
        Arc::clone(&plans),
        Arc::clone(&plugins),
        Arc::new(FileLogStore::new(layout.clone())),
    );

    Ok(Engine {
        plugins,
        plans,
        timesheets,
    })
}

//! The capability contracts -- the adapter interfaces for plan sources and
//! audience renderers.
//!
//! Each concrete plugin implements exactly one of these traits. Both are
//! intentionally object-safe so they can be stored as `Arc<dyn PlanSource>`
//! / `Arc<dyn Audience>` in the [`super::PluginManager`] registry.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Identity, PlanItem, ReconciledTimesheet, RenderedReport, TimeRange};

/// The capability kinds a plugin can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    PlanSource,
    Audience,
}

impl CapabilityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlanSource => "plan-source",
            Self::Audience => "audience",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter interface for fetching planned work from an external source
/// (ticket tracker, calendar, plan files, ...).
///
/// Implementations must be idempotent and side-effect free on the engine's
/// state: `fetch` may hit the network or disk, but two identical calls with
/// no external change must return the same items.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Unique name this source registers under (e.g. "jira", "local").
    fn name(&self) -> &str;

    /// Plugin version recorded at registration.
    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Fetch the plan items relevant to `identity` within `range`.
    ///
    /// Items should carry this plugin's name as their `source_id`; the
    /// merge pass dedups on `(source_id, external_ref)`.
    async fn fetch(&self, identity: &Identity, range: &TimeRange) -> Result<Vec<PlanItem>>;
}

/// Adapter interface for rendering a reconciled timesheet for one consumer
/// profile (manager, client, the user themselves).
///
/// Renderers receive the timesheet by shared reference and must not mutate
/// it; the same timesheet is fanned out to every requested audience.
#[async_trait]
pub trait Audience: Send + Sync {
    /// Unique name this audience registers under (e.g. "markdown").
    fn name(&self) -> &str;

    /// Plugin version recorded at registration.
    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Media type of the payload `render` produces.
    fn media_type(&self) -> &str;

    /// Render the timesheet for this audience.
    async fn render(
        &self,
        timesheet: &ReconciledTimesheet,
        identity: &Identity,
    ) -> Result<RenderedReport>;
}

/// A plugin handed to the registry, tagged with the capability it actually
/// implements.
///
/// Registration declares a [`CapabilityKind`]; the registry checks the
/// declaration against the variant here so a mismatch is caught once, at
/// registration time, never at call time.
#[derive(Clone)]
pub enum PluginHandle {
    PlanSource(Arc<dyn PlanSource>),
    Audience(Arc<dyn Audience>),
}

impl PluginHandle {
    /// The capability this handle actually implements.
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::PlanSource(_) => CapabilityKind::PlanSource,
            Self::Audience(_) => CapabilityKind::Audience,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::PlanSource(p) => p.name(),
            Self::Audience(a) => a.name(),
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Self::PlanSource(p) => p.version(),
            Self::Audience(a) => a.version(),
        }
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

// Compile-time assertion: both contracts must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanSource, _: &dyn Audience) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    /// A trivial source that returns nothing, used only to prove the trait
    /// can be implemented and used as `dyn PlanSource`.
    struct NoopSource;

    #[async_trait]
    impl PlanSource for NoopSource {
        fn name(&self) -> &str {
            "noop"
        }

        async fn fetch(&self, _identity: &Identity, _range: &TimeRange) -> Result<Vec<PlanItem>> {
            Ok(vec![])
        }
    }

    struct NoopAudience;

    #[async_trait]
    impl Audience for NoopAudience {
        fn name(&self) -> &str {
            "noop"
        }

        fn media_type(&self) -> &str {
            "text/plain"
        }

        async fn render(
            &self,
            _timesheet: &ReconciledTimesheet,
            _identity: &Identity,
        ) -> Result<RenderedReport> {
            Ok(RenderedReport::new("text/plain", ""))
        }
    }

    #[test]
    fn contracts_are_object_safe() {
        let source: Arc<dyn PlanSource> = Arc::new(NoopSource);
        let audience: Arc<dyn Audience> = Arc::new(NoopAudience);
        assert_eq!(source.name(), "noop");
        assert_eq!(audience.media_type(), "text/plain");
    }

    #[test]
    fn handle_reports_its_own_capability() {
        let handle = PluginHandle::PlanSource(Arc::new(NoopSource));
        assert_eq!(handle.kind(), CapabilityKind::PlanSource);
        assert_eq!(handle.name(), "noop");
        assert_eq!(handle.version(), "0.1.0");

        let handle = PluginHandle::Audience(Arc::new(NoopAudience));
        assert_eq!(handle.kind(), CapabilityKind::Audience);
    }
}

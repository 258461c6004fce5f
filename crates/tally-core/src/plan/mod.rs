//! Plan collection: fan out to every registered plan source and merge the
//! responses into one deterministic [`MergedPlan`].

mod merge;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::model::{Identity, IdentityResolver, MergedPlan, TimeRange};
use crate::plugin::{CapabilityKind, PluginManager};

/// Orchestrates plan collection across all registered plan sources.
pub struct PlanManager {
    plugins: Arc<PluginManager>,
    identities: Arc<dyn IdentityResolver>,
}

impl PlanManager {
    pub fn new(plugins: Arc<PluginManager>, identities: Arc<dyn IdentityResolver>) -> Self {
        Self {
            plugins,
            identities,
        }
    }

    /// Resolve an identity context through the external identity store.
    pub async fn resolve(&self, context: &str) -> Result<Identity, EngineError> {
        self.identities.resolve(context).await
    }

    /// Collect and merge plan items from every non-degraded plan source.
    ///
    /// Per-source failures are recorded as warnings on the result, never
    /// escalated. Fails fatally only when at least one source is registered
    /// and *zero* succeeded ([`EngineError::NoPlanData`]) -- with no sources
    /// registered at all, an empty plan is a legitimate answer.
    pub async fn collect(
        &self,
        identity: &Identity,
        range: &TimeRange,
        cancel: &CancellationToken,
    ) -> Result<MergedPlan, EngineError> {
        let registered = self.plugins.list(CapabilityKind::PlanSource).len();
        let outcome = self
            .plugins
            .invoke_all_sources(identity, range, cancel)
            .await?;

        if registered > 0 && outcome.succeeded.is_empty() {
            tracing::error!(registered, "every plan source failed or was skipped");
            return Err(EngineError::NoPlanData { registered });
        }

        let plan = merge::merge(outcome.succeeded, &outcome.failed);
        tracing::info!(
            items = plan.items.len(),
            duplicate_groups = plan.duplicate_groups.len(),
            warnings = plan.warnings.len(),
            "merged plan collected"
        );
        Ok(plan)
    }
}

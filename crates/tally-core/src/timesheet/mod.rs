//! Timesheet generation: reconcile the merged plan against the work log,
//! then fan the result out to the requested audience renderers.

mod reconcile;

pub use reconcile::reconcile;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{EngineError, InvokeError};
use crate::model::{
    CollectionWarning, Identity, LogStore, MergedPlan, ReconciledTimesheet, RenderedReport,
    TimeRange,
};
use crate::plan::PlanManager;
use crate::plugin::PluginManager;

/// Caller-controlled knobs for one generation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Proceed with an empty plan when every registered plan source failed.
    /// Off by default: a silently empty timesheet is usually a bug.
    pub allow_empty_plan: bool,
}

/// Result of one generation run: the reconciled timesheet plus whatever the
/// audience renderers produced.
#[derive(Debug)]
pub struct GenerateOutput {
    pub timesheet: ReconciledTimesheet,
    /// Successful renders, one per audience, in request order.
    pub reports: Vec<(String, RenderedReport)>,
    /// Render targets that failed, with the recovered cause.
    pub failed_renders: Vec<(String, InvokeError)>,
}

/// Orchestrates the full run: plan collection, log read, reconciliation,
/// and render fan-out.
pub struct TimesheetManager {
    plans: Arc<PlanManager>,
    plugins: Arc<PluginManager>,
    logs: Arc<dyn LogStore>,
}

impl TimesheetManager {
    pub fn new(
        plans: Arc<PlanManager>,
        plugins: Arc<PluginManager>,
        logs: Arc<dyn LogStore>,
    ) -> Self {
        Self {
            plans,
            plugins,
            logs,
        }
    }

    /// Generate a reconciled timesheet for `identity` over `range` and
    /// render it for each requested audience.
    ///
    /// Per-renderer failures are reported in the output, never fatal to the
    /// other targets. Fatal errors are reserved for conditions where the
    /// run cannot produce meaningful output: invalid range (checked by the
    /// caller when building [`TimeRange`]), no plan data without the
    /// empty-plan opt-in, an unreadable log, or cancellation.
    pub async fn generate(
        &self,
        identity: &Identity,
        range: &TimeRange,
        render_targets: &[String],
        options: GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<GenerateOutput, EngineError> {
        let run_id = Uuid::new_v4();
        tracing::info!(
            %run_id,
            identity = %identity.id,
            start = %range.start,
            end = %range.end,
            targets = render_targets.len(),
            "starting timesheet run"
        );

        let plan = match self.plans.collect(identity, range, cancel).await {
            Ok(plan) => plan,
            Err(EngineError::NoPlanData { registered }) if options.allow_empty_plan => {
                tracing::warn!(%run_id, registered, "proceeding with empty plan");
                MergedPlan {
                    warnings: vec![CollectionWarning {
                        source: "plan-collection".to_string(),
                        message: format!(
                            "all {registered} registered plan source(s) failed; \
                             empty plan allowed by caller"
                        ),
                    }],
                    ..MergedPlan::default()
                }
            }
            Err(err) => return Err(err),
        };

        let entries = self.logs.read(range).await.map_err(EngineError::LogRead)?;
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let timesheet = reconcile(plan, entries, *range);

        let (reports, failed_renders) = if render_targets.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let outcome = self
                .plugins
                .invoke_all_audiences(&timesheet, identity, render_targets, cancel)
                .await?;
            (outcome.succeeded, outcome.failed)
        };

        for (target, err) in &failed_renders {
            tracing::warn!(%run_id, audience = %target, error = %err, "render target failed");
        }
        tracing::info!(
            %run_id,
            fulfilled = timesheet.fulfilled.len(),
            unfulfilled = timesheet.unfulfilled.len(),
            unplanned = timesheet.unplanned.len(),
            reports = reports.len(),
            "timesheet run complete"
        );

        Ok(GenerateOutput {
            timesheet,
            reports,
            failed_renders,
        })
    }
}

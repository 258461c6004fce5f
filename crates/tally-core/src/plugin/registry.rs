//! Plugin registry: lifecycle and fault-isolated invocation.
//!
//! The [`PluginManager`] owns the only long-lived mutable shared structure
//! in the engine. Lifecycle operations (`register`, degraded-marking,
//! `shutdown`) take the write lock; invocation clones an ordered snapshot of
//! handles under the read lock and releases it before awaiting, so a slow
//! plugin never blocks registry access.
//!
//! Bulk invocation (`invoke_all_*`) is the path the managers use: every
//! per-plugin fault is recovered locally and reported in the
//! [`InvokeOutcome`] -- a single misbehaving plugin never aborts the run.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, InvokeError};
use crate::model::{Identity, PlanItem, ReconciledTimesheet, RenderedReport, TimeRange};

use super::contract::{Audience, CapabilityKind, PlanSource, PluginHandle};

/// Default per-call budget for a single plugin invocation.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of a registered plugin.
///
/// `Degraded` is not terminal: a bulk invocation skips degraded plugins for
/// the rest of the run, but an explicit successful direct invocation clears
/// the mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Ready,
    Degraded,
}

/// Introspection record for one registered plugin.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub kind: CapabilityKind,
    pub version: String,
    pub state: PluginState,
}

/// Result set of a bulk invocation: successes and recovered failures, both
/// in registration order.
#[derive(Debug, Default)]
pub struct InvokeOutcome<T> {
    pub succeeded: Vec<(String, T)>,
    pub failed: Vec<(String, InvokeError)>,
}

impl<T> InvokeOutcome<T> {
    fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

struct PluginRecord {
    name: String,
    kind: CapabilityKind,
    version: String,
    state: PluginState,
    handle: PluginHandle,
}

#[derive(Default)]
struct Registry {
    records: Vec<PluginRecord>,
    shut_down: bool,
}

impl Registry {
    fn find(&self, kind: CapabilityKind, name: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.kind == kind && r.name == name)
    }
}

/// Owner of the plugin registry: registration, discovery, lifecycle, and
/// fault-isolated invocation of [`PlanSource`] and [`Audience`] plugins.
pub struct PluginManager {
    inner: RwLock<Registry>,
    call_timeout: Duration,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

impl PluginManager {
    /// Create a manager with the given per-call timeout budget.
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
            call_timeout,
        }
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Register a plugin under the declared capability kind.
    ///
    /// Fails with [`EngineError::UnsupportedCapability`] if the handle does
    /// not implement the declared kind, and with
    /// [`EngineError::DuplicateName`] if the name is already taken for that
    /// kind. Names are unique per kind, not globally.
    pub fn register(
        &self,
        handle: PluginHandle,
        declared: CapabilityKind,
    ) -> Result<(), EngineError> {
        let name = handle.name().to_string();

        if handle.kind() != declared {
            return Err(EngineError::UnsupportedCapability {
                name,
                kind: declared,
            });
        }

        let mut registry = self.inner.write().expect("plugin registry poisoned");
        if registry.shut_down {
            return Err(EngineError::Shutdown);
        }
        if registry.find(declared, &name).is_some() {
            return Err(EngineError::DuplicateName {
                name,
                kind: declared,
            });
        }

        tracing::info!(
            plugin = %name,
            kind = %declared,
            version = %handle.version(),
            "registered plugin"
        );
        registry.records.push(PluginRecord {
            name,
            kind: declared,
            version: handle.version().to_string(),
            state: PluginState::Ready,
            handle,
        });
        Ok(())
    }

    /// Names of registered plugins of `kind`, in registration order.
    ///
    /// Registration order is load-bearing: the plan merge uses it as a
    /// dedup tie-breaker, so it must be deterministic.
    pub fn list(&self, kind: CapabilityKind) -> Vec<String> {
        let registry = self.inner.read().expect("plugin registry poisoned");
        registry
            .records
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Introspection records for all registered plugins, in registration
    /// order.
    pub fn plugins(&self) -> Vec<PluginInfo> {
        let registry = self.inner.read().expect("plugin registry poisoned");
        registry
            .records
            .iter()
            .map(|r| PluginInfo {
                name: r.name.clone(),
                kind: r.kind,
                version: r.version.clone(),
                state: r.state,
            })
            .collect()
    }

    /// Release all plugin handles. Idempotent; subsequent registrations and
    /// invocations fail with [`EngineError::Shutdown`].
    pub fn shutdown(&self) {
        let mut registry = self.inner.write().expect("plugin registry poisoned");
        if registry.shut_down {
            return;
        }
        let released = registry.records.len();
        registry.records.clear();
        registry.shut_down = true;
        tracing::info!(released, "plugin registry shut down");
    }

    fn mark_degraded(&self, kind: CapabilityKind, name: &str) {
        let mut registry = self.inner.write().expect("plugin registry poisoned");
        if let Some(idx) = registry.find(kind, name) {
            registry.records[idx].state = PluginState::Degraded;
        }
    }

    fn clear_degraded(&self, kind: CapabilityKind, name: &str) {
        let mut registry = self.inner.write().expect("plugin registry poisoned");
        if let Some(idx) = registry.find(kind, name) {
            registry.records[idx].state = PluginState::Ready;
        }
    }

    // -------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------

    fn source_snapshot(
        &self,
        ready_only: bool,
    ) -> Result<Vec<(String, PluginState, Arc<dyn PlanSource>)>, EngineError> {
        let registry = self.inner.read().expect("plugin registry poisoned");
        if registry.shut_down {
            return Err(EngineError::Shutdown);
        }
        Ok(registry
            .records
            .iter()
            .filter(|r| !ready_only || r.state == PluginState::Ready)
            .filter_map(|r| match &r.handle {
                PluginHandle::PlanSource(p) => Some((r.name.clone(), r.state, Arc::clone(p))),
                PluginHandle::Audience(_) => None,
            })
            .collect())
    }

    fn audience_snapshot(
        &self,
    ) -> Result<Vec<(String, PluginState, Arc<dyn Audience>)>, EngineError> {
        let registry = self.inner.read().expect("plugin registry poisoned");
        if registry.shut_down {
            return Err(EngineError::Shutdown);
        }
        Ok(registry
            .records
            .iter()
            .filter_map(|r| match &r.handle {
                PluginHandle::Audience(a) => Some((r.name.clone(), r.state, Arc::clone(a))),
                PluginHandle::PlanSource(_) => None,
            })
            .collect())
    }

    // -------------------------------------------------------------------
    // Invocation
    // -------------------------------------------------------------------

    /// Invoke a single named plan source directly.
    ///
    /// Direct invocation is allowed even on a degraded plugin (explicit
    /// retry); success clears the degraded mark, failure (re)marks it.
    pub async fn invoke_source(
        &self,
        name: &str,
        identity: &Identity,
        range: &TimeRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<PlanItem>, EngineError> {
        let handle = {
            let registry = self.inner.read().expect("plugin registry poisoned");
            if registry.shut_down {
                return Err(EngineError::Shutdown);
            }
            registry
                .find(CapabilityKind::PlanSource, name)
                .and_then(|idx| match &registry.records[idx].handle {
                    PluginHandle::PlanSource(p) => Some(Arc::clone(p)),
                    PluginHandle::Audience(_) => None,
                })
        };
        let Some(source) = handle else {
            return Err(EngineError::PluginInvocation {
                name: name.to_string(),
                cause: InvokeError::NotRegistered,
            });
        };

        match run_call(self.call_timeout, cancel, source.fetch(identity, range)).await {
            Ok(items) => {
                self.clear_degraded(CapabilityKind::PlanSource, name);
                Ok(items)
            }
            Err(InvokeError::Cancelled) => Err(EngineError::Cancelled),
            Err(cause) => {
                self.mark_degraded(CapabilityKind::PlanSource, name);
                tracing::warn!(plugin = %name, error = %cause, "plan source invocation failed");
                Err(EngineError::PluginInvocation {
                    name: name.to_string(),
                    cause,
                })
            }
        }
    }

    /// Invoke a single named audience directly. Same degraded semantics as
    /// [`Self::invoke_source`].
    pub async fn invoke_audience(
        &self,
        name: &str,
        timesheet: &ReconciledTimesheet,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> Result<RenderedReport, EngineError> {
        let handle = {
            let registry = self.inner.read().expect("plugin registry poisoned");
            if registry.shut_down {
                return Err(EngineError::Shutdown);
            }
            registry
                .find(CapabilityKind::Audience, name)
                .and_then(|idx| match &registry.records[idx].handle {
                    PluginHandle::Audience(a) => Some(Arc::clone(a)),
                    PluginHandle::PlanSource(_) => None,
                })
        };
        let Some(audience) = handle else {
            return Err(EngineError::PluginInvocation {
                name: name.to_string(),
                cause: InvokeError::NotRegistered,
            });
        };

        match run_call(
            self.call_timeout,
            cancel,
            audience.render(timesheet, identity),
        )
        .await
        {
            Ok(report) => {
                self.clear_degraded(CapabilityKind::Audience, name);
                Ok(report)
            }
            Err(InvokeError::Cancelled) => Err(EngineError::Cancelled),
            Err(cause) => {
                self.mark_degraded(CapabilityKind::Audience, name);
                tracing::warn!(plugin = %name, error = %cause, "audience invocation failed");
                Err(EngineError::PluginInvocation {
                    name: name.to_string(),
                    cause,
                })
            }
        }
    }

    /// Invoke every non-degraded plan source concurrently.
    ///
    /// Never fails for an individual plugin: faults are recorded in the
    /// outcome and the plugin is marked degraded. Fails only on shutdown or
    /// run-level cancellation (no partial data is returned for a cancelled
    /// run).
    pub async fn invoke_all_sources(
        &self,
        identity: &Identity,
        range: &TimeRange,
        cancel: &CancellationToken,
    ) -> Result<InvokeOutcome<Vec<PlanItem>>, EngineError> {
        let snapshot = self.source_snapshot(true)?;

        let calls = snapshot.iter().map(|(name, _, source)| {
            let source = Arc::clone(source);
            async move {
                run_call(self.call_timeout, cancel, source.fetch(identity, range)).await
            }
        });
        let results = futures::future::join_all(calls).await;

        self.collect_outcome(CapabilityKind::PlanSource, snapshot, results, cancel)
    }

    /// Invoke audiences concurrently, restricted to `targets`.
    ///
    /// Each requested target produces exactly one outcome row: a success, or
    /// a recovered failure (including "not registered" and "degraded,
    /// skipped") -- a broken renderer never takes down the others.
    pub async fn invoke_all_audiences(
        &self,
        timesheet: &ReconciledTimesheet,
        identity: &Identity,
        targets: &[String],
        cancel: &CancellationToken,
    ) -> Result<InvokeOutcome<RenderedReport>, EngineError> {
        let registered = self.audience_snapshot()?;

        // Resolve requested targets against the snapshot, preserving request
        // order. Unknown and degraded targets become failure rows up front.
        let mut outcome = InvokeOutcome::new();
        let mut to_invoke: Vec<(String, Arc<dyn Audience>)> = Vec::new();
        for target in targets {
            match registered.iter().find(|(name, _, _)| name == target) {
                None => {
                    outcome
                        .failed
                        .push((target.clone(), InvokeError::NotRegistered));
                }
                Some((name, PluginState::Degraded, _)) => {
                    outcome.failed.push((name.clone(), InvokeError::Degraded));
                }
                Some((name, PluginState::Ready, audience)) => {
                    to_invoke.push((name.clone(), Arc::clone(audience)));
                }
            }
        }

        let calls = to_invoke.iter().map(|(_, audience)| {
            let audience = Arc::clone(audience);
            async move {
                run_call(
                    self.call_timeout,
                    cancel,
                    audience.render(timesheet, identity),
                )
                .await
            }
        });
        let results = futures::future::join_all(calls).await;

        let snapshot = to_invoke
            .into_iter()
            .map(|(name, a)| (name, PluginState::Ready, a))
            .collect();
        let invoked = self.collect_outcome(CapabilityKind::Audience, snapshot, results, cancel)?;

        outcome.succeeded.extend(invoked.succeeded);
        outcome.failed.extend(invoked.failed);
        Ok(outcome)
    }

    /// Fold per-plugin results into an outcome, degrading failed plugins.
    ///
    /// Results arrive in snapshot (registration) order because `join_all`
    /// preserves input order, so the outcome is deterministic regardless of
    /// completion order.
    fn collect_outcome<T, H>(
        &self,
        kind: CapabilityKind,
        snapshot: Vec<(String, PluginState, H)>,
        results: Vec<Result<T, InvokeError>>,
        cancel: &CancellationToken,
    ) -> Result<InvokeOutcome<T>, EngineError> {
        let mut outcome = InvokeOutcome::new();
        let mut cancelled = cancel.is_cancelled();

        for ((name, _, _), result) in snapshot.into_iter().zip(results) {
            match result {
                Ok(value) => outcome.succeeded.push((name, value)),
                Err(InvokeError::Cancelled) => cancelled = true,
                Err(cause) => {
                    tracing::warn!(
                        plugin = %name,
                        kind = %kind,
                        error = %cause,
                        "plugin failed during bulk invocation, marking degraded"
                    );
                    self.mark_degraded(kind, &name);
                    outcome.failed.push((name, cause));
                }
            }
        }

        if cancelled {
            return Err(EngineError::Cancelled);
        }
        Ok(outcome)
    }
}

/// Drive one plugin call under the per-call timeout and the run-level
/// cancellation token.
async fn run_call<T, F>(
    timeout: Duration,
    cancel: &CancellationToken,
    call: F,
) -> Result<T, InvokeError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        () = cancel.cancelled() => Err(InvokeError::Cancelled),
        outcome = tokio::time::timeout(timeout, call) => match outcome {
            Err(_) => Err(InvokeError::Timeout(timeout)),
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(InvokeError::Plugin(err)),
        },
    }
}

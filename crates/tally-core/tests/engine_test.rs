//! End-to-end tests for the engine pipeline: register plugins, collect and
//! merge plans, reconcile against the log, render for audiences.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use tally_core::plugin::builtin::{JsonAudience, MarkdownAudience};
use tally_core::{
    Audience, CapabilityKind, EngineError, GenerateOptions, Identity, IdentityResolver, LogEntry,
    LogStore, PlanItem, PlanManager, PlanSource, PluginHandle, PluginManager, TimeRange,
    TimeWindow, TimesheetManager,
};

// ===========================================================================
// Fakes
// ===========================================================================

struct FixedResolver;

#[async_trait]
impl IdentityResolver for FixedResolver {
    async fn resolve(&self, context: &str) -> Result<Identity, EngineError> {
        if context == "me" {
            Ok(Identity::new("u1", "Test User"))
        } else {
            Err(EngineError::IdentityNotFound {
                context: context.to_string(),
            })
        }
    }
}

struct StaticSource {
    source_name: String,
    items: Vec<PlanItem>,
    delay: Option<Duration>,
}

#[async_trait]
impl PlanSource for StaticSource {
    fn name(&self) -> &str {
        &self.source_name
    }

    async fn fetch(&self, _identity: &Identity, _range: &TimeRange) -> anyhow::Result<Vec<PlanItem>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.items.clone())
    }
}

struct StaticLog {
    entries: Vec<LogEntry>,
}

#[async_trait]
impl LogStore for StaticLog {
    async fn read(&self, range: &TimeRange) -> anyhow::Result<Vec<LogEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.window.overlaps(range))
            .cloned()
            .collect())
    }
}

struct FailingLog;

#[async_trait]
impl LogStore for FailingLog {
    async fn read(&self, _range: &TimeRange) -> anyhow::Result<Vec<LogEntry>> {
        anyhow::bail!("log directory unreadable")
    }
}

// ===========================================================================
// Fixtures
// ===========================================================================

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, h, m, 0).unwrap()
}

fn day() -> TimeRange {
    TimeRange::new(at(0, 0), Utc.with_ymd_and_hms(2025, 3, 16, 0, 0, 0).unwrap()).unwrap()
}

fn item(source: &str, external_ref: &str, title: &str, start_h: u32, end_h: u32) -> PlanItem {
    PlanItem {
        source_id: source.to_string(),
        external_ref: external_ref.to_string(),
        title: title.to_string(),
        window: TimeWindow::new(at(start_h, 0), Some(at(end_h, 0))),
        estimated_effort: None,
        tags: BTreeSet::new(),
    }
}

fn entry(start: DateTime<Utc>, end: DateTime<Utc>, desc: &str) -> LogEntry {
    LogEntry {
        window: TimeRange::new(start, end).unwrap(),
        description: desc.to_string(),
        tags: BTreeSet::new(),
    }
}

struct Engine {
    plugins: Arc<PluginManager>,
    manager: TimesheetManager,
}

fn engine(sources: Vec<StaticSource>, log: Arc<dyn LogStore>) -> Engine {
    let plugins = Arc::new(PluginManager::default());
    for source in sources {
        plugins
            .register(
                PluginHandle::PlanSource(Arc::new(source)),
                CapabilityKind::PlanSource,
            )
            .unwrap();
    }
    plugins
        .register(
            PluginHandle::Audience(Arc::new(MarkdownAudience)),
            CapabilityKind::Audience,
        )
        .unwrap();
    plugins
        .register(
            PluginHandle::Audience(Arc::new(JsonAudience)),
            CapabilityKind::Audience,
        )
        .unwrap();

    let plans = Arc::new(PlanManager::new(Arc::clone(&plugins), Arc::new(FixedResolver)));
    let manager = TimesheetManager::new(plans, Arc::clone(&plugins), log);
    Engine { plugins, manager }
}

fn source(name: &str, items: Vec<PlanItem>) -> StaticSource {
    StaticSource {
        source_name: name.to_string(),
        items,
        delay: None,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn full_pipeline_buckets_and_renders() {
    let log = Arc::new(StaticLog {
        entries: vec![
            entry(at(9, 10), at(9, 50), "wrote the report"),
            entry(at(16, 0), at(17, 0), "surprise incident"),
        ],
    });
    let engine = engine(
        vec![source(
            "local",
            vec![
                item("local", "a", "Write report", 9, 10),
                item("local", "b", "Plan next sprint", 13, 14),
            ],
        )],
        log,
    );

    let identity = Identity::new("u1", "Test User");
    let out = engine
        .manager
        .generate(
            &identity,
            &day(),
            &["markdown".to_string(), "json".to_string()],
            GenerateOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(out.timesheet.fulfilled.len(), 1);
    assert_eq!(out.timesheet.fulfilled[0].item.external_ref, "a");
    assert_eq!(out.timesheet.unfulfilled.len(), 1);
    assert_eq!(out.timesheet.unplanned.len(), 1);

    assert_eq!(out.reports.len(), 2);
    assert!(out.failed_renders.is_empty());
    let (name, markdown) = &out.reports[0];
    assert_eq!(name, "markdown");
    assert_eq!(markdown.media_type, "text/markdown");
    assert!(markdown.body.contains("Write report"));
    assert!(markdown.body.contains("surprise incident"));
    let (_, json) = &out.reports[1];
    let parsed: serde_json::Value = serde_json::from_str(&json.body).unwrap();
    assert_eq!(parsed["identity"]["id"], "u1");
}

#[tokio::test]
async fn cross_source_lookalikes_survive_into_the_report() {
    // The same piece of work reported by two trackers: both items are kept
    // and linked, and the link is surfaced by the renderer.
    let log = Arc::new(StaticLog { entries: vec![] });
    let engine = engine(
        vec![
            source("tracker-a", vec![item("tracker-a", "x1", "Write report", 9, 10)]),
            source("tracker-b", vec![item("tracker-b", "y9", "write  Report", 9, 11)]),
        ],
        log,
    );

    let identity = Identity::new("u1", "Test User");
    let out = engine
        .manager
        .generate(
            &identity,
            &day(),
            &["markdown".to_string()],
            GenerateOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(out.timesheet.item_count(), 2);
    assert_eq!(out.timesheet.duplicate_groups.len(), 1);
    assert_eq!(out.timesheet.duplicate_groups[0].normalized_title, "write report");
    assert!(out.reports[0].1.body.contains("Possible duplicates"));
}

#[tokio::test(start_paused = true)]
async fn hung_source_times_out_and_the_run_completes() {
    let plugins = Arc::new(PluginManager::new(Duration::from_millis(100)));
    plugins
        .register(
            PluginHandle::PlanSource(Arc::new(StaticSource {
                source_name: "hang".into(),
                items: vec![],
                delay: Some(Duration::from_secs(3600)),
            })),
            CapabilityKind::PlanSource,
        )
        .unwrap();
    plugins
        .register(
            PluginHandle::PlanSource(Arc::new(source(
                "fast",
                vec![item("fast", "a", "Ship it", 9, 10)],
            ))),
            CapabilityKind::PlanSource,
        )
        .unwrap();

    let plans = Arc::new(PlanManager::new(Arc::clone(&plugins), Arc::new(FixedResolver)));
    let manager = TimesheetManager::new(
        plans,
        Arc::clone(&plugins),
        Arc::new(StaticLog { entries: vec![] }),
    );

    let identity = Identity::new("u1", "Test User");
    let out = manager
        .generate(
            &identity,
            &day(),
            &[],
            GenerateOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // The fast source's data is intact; the hung source is a warning.
    assert_eq!(out.timesheet.unfulfilled.len(), 1);
    assert_eq!(out.timesheet.warnings.len(), 1);
    assert_eq!(out.timesheet.warnings[0].source, "hang");
}

#[tokio::test]
async fn cancelled_run_yields_no_partial_output() {
    let log = Arc::new(StaticLog { entries: vec![] });
    let engine = engine(
        vec![source("local", vec![item("local", "a", "Task", 9, 10)])],
        log,
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let identity = Identity::new("u1", "Test User");
    let err = engine
        .manager
        .generate(&identity, &day(), &[], GenerateOptions::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

#[tokio::test]
async fn all_sources_down_is_fatal_unless_opted_into() {
    struct DownSource;

    #[async_trait]
    impl PlanSource for DownSource {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(
            &self,
            _identity: &Identity,
            _range: &TimeRange,
        ) -> anyhow::Result<Vec<PlanItem>> {
            anyhow::bail!("connection refused")
        }
    }

    let plugins = Arc::new(PluginManager::default());
    plugins
        .register(
            PluginHandle::PlanSource(Arc::new(DownSource)),
            CapabilityKind::PlanSource,
        )
        .unwrap();
    let plans = Arc::new(PlanManager::new(Arc::clone(&plugins), Arc::new(FixedResolver)));
    let manager = TimesheetManager::new(
        plans,
        Arc::clone(&plugins),
        Arc::new(StaticLog {
            entries: vec![entry(at(9, 0), at(10, 0), "work anyway")],
        }),
    );
    let identity = Identity::new("u1", "Test User");

    let err = manager
        .generate(
            &identity,
            &day(),
            &[],
            GenerateOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoPlanData { registered: 1 }));

    // The source degraded during the failed run; with the opt-in the log is
    // still reconciled, everything unplanned, with an explanatory warning.
    let out = manager
        .generate(
            &identity,
            &day(),
            &[],
            GenerateOptions {
                allow_empty_plan: true,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(out.timesheet.unplanned.len(), 1);
    assert!(out.timesheet.fulfilled.is_empty());
    assert_eq!(out.timesheet.warnings.len(), 1);
}

#[tokio::test]
async fn unreadable_log_is_fatal() {
    let engine = engine(
        vec![source("local", vec![item("local", "a", "Task", 9, 10)])],
        Arc::new(FailingLog),
    );

    let identity = Identity::new("u1", "Test User");
    let err = engine
        .manager
        .generate(
            &identity,
            &day(),
            &[],
            GenerateOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LogRead(_)));
}

#[tokio::test]
async fn broken_renderer_does_not_take_down_the_others() {
    struct BrokenAudience;

    #[async_trait]
    impl Audience for BrokenAudience {
        fn name(&self) -> &str {
            "broken"
        }

        fn media_type(&self) -> &str {
            "text/plain"
        }

        async fn render(
            &self,
            _timesheet: &tally_core::ReconciledTimesheet,
            _identity: &Identity,
        ) -> anyhow::Result<tally_core::RenderedReport> {
            anyhow::bail!("template engine exploded")
        }
    }

    let log = Arc::new(StaticLog { entries: vec![] });
    let engine = engine(
        vec![source("local", vec![item("local", "a", "Task", 9, 10)])],
        log,
    );
    engine
        .plugins
        .register(
            PluginHandle::Audience(Arc::new(BrokenAudience)),
            CapabilityKind::Audience,
        )
        .unwrap();

    let identity = Identity::new("u1", "Test User");
    let out = engine
        .manager
        .generate(
            &identity,
            &day(),
            &["broken".to_string(), "markdown".to_string()],
            GenerateOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(out.reports.len(), 1);
    assert_eq!(out.reports[0].0, "markdown");
    assert_eq!(out.failed_renders.len(), 1);
    assert_eq!(out.failed_renders[0].0, "broken");
}

#[tokio::test]
async fn repeated_runs_over_identical_inputs_are_identical() {
    let log = Arc::new(StaticLog {
        entries: vec![
            entry(at(9, 0), at(10, 0), "x"),
            entry(at(10, 30), at(11, 30), "y"),
        ],
    });
    let engine = engine(
        vec![
            source("a", vec![item("a", "1", "alpha", 9, 11)]),
            source("b", vec![item("b", "2", "beta", 10, 12)]),
        ],
        log,
    );

    let identity = Identity::new("u1", "Test User");
    let run = || async {
        engine
            .manager
            .generate(
                &identity,
                &day(),
                &["json".to_string()],
                GenerateOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
    };

    let first = run().await;
    let second = run().await;
    assert_eq!(first.timesheet, second.timesheet);
    assert_eq!(first.reports[0].1.body, second.reports[0].1.body);
}

//! # Orchestrator: phased execution over the registry.
//!
//! The [`Orchestrator`] builds an [`ExecutionPlan`] from the registry, runs
//! it stage by stage, and exposes the aggregated results to readers and
//! subscribers.
//!
//! ## High-level architecture
//! ```text
//! run_all() / run_phase(p) / run_unit(id)
//!     │
//!     ├─► ExecutionPlan::build(registry descriptors)
//!     │
//!     └─► for each stage (strictly sequential):
//!           JoinSet ──► worker per unit ──► EngineRunner::execute(run_token)
//!               │            (optional Semaphore cap, panic contained)
//!               └─► as units complete:
//!                     results map ─► latest map ─► ReportSubscriptions::publish
//!
//! Events:
//!   RunStarted ─► Bus ─► listener task ─► SubscriberSet ─► Subscribe::on_event
//!   ... unit events from runners ...
//!   RunCompleted (elapsed)
//!
//! Deadline:
//!   run_deadline > 0 ─► watchdog task cancels the run token; pending units
//!   resolve through their degradation policy, completed reports stay.
//! ```
//!
//! ## Rules
//! - A failing (or panicking) unit never aborts siblings or the run; its
//!   failure is contained in its own Report.
//! - Results merge last-write-wins as units complete; per-unit report
//!   subscribers are notified **after** the map update, never before.
//! - A run always returns a full result map, one entry per executed unit.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::engines::Phase;
use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::registry::{EngineRegistry, QueryFilter};
use crate::report::Report;
use crate::scheduler::plan::ExecutionPlan;
use crate::scheduler::subscriptions::{ReportSubscriptions, SubscriptionHandle};
use crate::subscribers::{Subscribe, SubscriberSet};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinates plan execution, result aggregation, and notification fan-out.
pub struct Orchestrator {
    cfg: OrchestratorConfig,
    registry: Arc<EngineRegistry>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    reports: ReportSubscriptions,
    latest: Mutex<HashMap<String, Report>>,
}

impl Orchestrator {
    /// Creates an orchestrator over an explicitly constructed registry.
    ///
    /// The registry must publish to the same `bus`. Prefer
    /// [`Orchestrator::builder`] unless you are injecting a registry shared
    /// with other components.
    pub fn new(
        cfg: OrchestratorConfig,
        registry: Arc<EngineRegistry>,
        bus: Bus,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Arc<Self> {
        let subs = Arc::new(SubscriberSet::new(subscribers));
        let orch = Arc::new(Self {
            cfg,
            registry,
            bus,
            subs,
            reports: ReportSubscriptions::new(),
            latest: Mutex::new(HashMap::new()),
        });
        orch.spawn_subscriber_listener();
        orch
    }

    /// Returns a builder that wires the bus and registry itself.
    pub fn builder(cfg: OrchestratorConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    /// The registry this orchestrator plans from.
    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    /// The lifecycle event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Registers a per-unit report callback.
    ///
    /// Callbacks fire after each execution of that unit, once the result map
    /// reflects the new report.
    pub fn subscribe_reports(
        &self,
        unit: impl Into<String>,
        callback: impl Fn(&Report) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.reports.subscribe(unit, callback)
    }

    /// Snapshot of the latest report per unit across all runs.
    pub fn latest(&self) -> HashMap<String, Report> {
        lock(&self.latest).clone()
    }

    /// Latest report for one unit, if it has ever produced one.
    pub fn latest_for(&self, id: &str) -> Option<Report> {
        lock(&self.latest).get(id).cloned()
    }

    /// Builds the current full execution plan without running it.
    pub async fn plan(&self) -> ExecutionPlan {
        ExecutionPlan::build(&self.registry.all_descriptors().await)
    }

    /// Runs every registered unit in phase order and returns the result map.
    pub async fn run_all(&self) -> HashMap<String, Report> {
        let plan = self.plan().await;
        self.execute_plan(plan).await
    }

    /// Runs only the units of one phase.
    pub async fn run_phase(&self, phase: Phase) -> HashMap<String, Report> {
        let descriptors = self
            .registry
            .query(&QueryFilter::all().with_phase(phase))
            .await;
        self.execute_plan(ExecutionPlan::build(&descriptors)).await
    }

    /// Runs one unit. Concurrent calls for the same id within one in-flight
    /// window coalesce onto a single physical computation.
    pub async fn run_unit(&self, id: &str) -> Result<Report, RegistryError> {
        let runner =
            self.registry
                .runner(id)
                .await
                .ok_or_else(|| RegistryError::UnknownUnit {
                    id: id.to_string(),
                })?;

        let (token, watchdog) = self.run_token();
        let report = runner.execute(&token).await;
        if let Some(w) = watchdog {
            w.abort();
        }
        self.commit(id, &report);
        Ok(report)
    }

    /// Re-runs `run_all` every `refresh_interval` until `token` is cancelled.
    pub async fn run_periodic(&self, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                break;
            }
            self.run_all().await;
            tokio::select! {
                _ = tokio::time::sleep(self.cfg.refresh_interval) => {}
                _ = token.cancelled() => break,
            }
        }
    }

    /// Executes the stages of a plan strictly in sequence, units within a
    /// stage concurrently under the configured cap.
    async fn execute_plan(&self, plan: ExecutionPlan) -> HashMap<String, Report> {
        let started = Instant::now();
        self.bus.publish(Event::new(EventKind::RunStarted));

        let (token, watchdog) = self.run_token();
        let semaphore = self
            .cfg
            .concurrency_limit()
            .map(|n| Arc::new(Semaphore::new(n)));

        let mut results: HashMap<String, Report> = HashMap::new();
        for stage in plan.stages() {
            let mut set: JoinSet<(String, Report)> = JoinSet::new();

            for id in &stage.units {
                // Unregistered since planning: absent from this run.
                let Some(runner) = self.registry.runner(id).await else {
                    continue;
                };
                let id = id.clone();
                let sem = semaphore.clone();
                let tok = token.clone();

                set.spawn(async move {
                    let _permit = match &sem {
                        Some(s) => {
                            tokio::select! {
                                permit = Arc::clone(s).acquire_owned() => match permit {
                                    Ok(p) => Some(p),
                                    Err(_closed) => return (id, runner.cancelled_report()),
                                },
                                _ = tok.cancelled() => return (id, runner.cancelled_report()),
                            }
                        }
                        None => None,
                    };

                    let report = AssertUnwindSafe(runner.execute(&tok))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            Report::failure(vec!["engine task panicked".to_string()])
                        });
                    (id, report)
                });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((id, report)) => {
                        results.insert(id.clone(), report.clone());
                        self.commit(&id, &report);
                    }
                    Err(join_err) => {
                        tracing::warn!(error = %join_err, "stage worker failed to join");
                    }
                }
            }
        }

        if let Some(w) = watchdog {
            w.abort();
        }
        self.bus
            .publish(Event::new(EventKind::RunCompleted).with_elapsed(started.elapsed()));
        results
    }

    /// Creates the run token and, when a deadline is configured, the
    /// watchdog task cancelling it.
    fn run_token(&self) -> (CancellationToken, Option<JoinHandle<()>>) {
        let token = CancellationToken::new();
        let watchdog = self.cfg.deadline().map(|deadline| {
            let t = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                t.cancel();
            })
        });
        (token, watchdog)
    }

    /// Updates the latest map, then notifies report subscribers — in that
    /// order, so subscribers observe orchestrator state consistent with the
    /// notification.
    fn commit(&self, id: &str, report: &Report) {
        lock(&self.latest).insert(id.to_string(), report.clone());
        self.reports.publish(id, report);
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn spawn_subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

/// Builder wiring the bus, registry, and subscribers for an [`Orchestrator`].
///
/// ```no_run
/// use signalvisor::{Orchestrator, OrchestratorConfig};
///
/// # async fn wire() {
/// let orch = Orchestrator::builder(OrchestratorConfig::default()).build();
/// let registry = orch.registry();
/// // registry.register(...).await ...
/// # }
/// ```
pub struct OrchestratorBuilder {
    cfg: OrchestratorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    fn new(cfg: OrchestratorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets lifecycle event subscribers (logging, metrics, ...).
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the orchestrator with a fresh bus and registry.
    pub fn build(self) -> Arc<Orchestrator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let registry = EngineRegistry::new(bus.clone(), self.cfg.defaults.clone());
        Orchestrator::new(self.cfg, registry, bus, self.subscribers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engines::{EngineDescriptor, EngineFn, EngineRef};
    use crate::policies::{BackoffPolicy, JitterPolicy};
    use crate::report::{ReportData, Signal};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_cfg() -> EngineConfig {
        EngineConfig {
            max_retries: 0,
            timeout: Duration::from_secs(1),
            cache_ttl: Duration::ZERO,
            backoff: BackoffPolicy {
                first: Duration::from_millis(1),
                max: Duration::from_millis(10),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
            degrade: Default::default(),
        }
    }

    fn orchestrator() -> Arc<Orchestrator> {
        let cfg = OrchestratorConfig {
            defaults: fast_cfg(),
            ..OrchestratorConfig::default()
        };
        Orchestrator::builder(cfg).build()
    }

    fn stamping(id: &str, log: Arc<Mutex<Vec<String>>>) -> EngineRef {
        let id_owned = id.to_string();
        EngineFn::arc(id_owned.clone(), move |_ctx| {
            let log = Arc::clone(&log);
            let id = id_owned.clone();
            async move {
                lock(&log).push(id);
                Ok(Report::success(Signal::Neutral, 0.5, ReportData::Empty))
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn run_all_respects_stage_ordering() {
        let orch = orchestrator();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (id, phase) in [
            ("f1", Phase::Foundation),
            ("f2", Phase::Foundation),
            ("g1", Phase::Market),
            ("g2", Phase::Technical),
            ("s1", Phase::Synthesis),
        ] {
            orch.registry()
                .register(
                    stamping(id, Arc::clone(&log)),
                    EngineDescriptor::new(id, phase),
                )
                .await
                .unwrap();
        }

        let results = orch.run_all().await;
        assert_eq!(results.len(), 5);

        let log = lock(&log).clone();
        let pos = |id: &str| log.iter().position(|n| n == id).unwrap();
        // Every foundation unit finishes before any analysis unit starts,
        // and synthesis starts after both analysis groups.
        for f in ["f1", "f2"] {
            for g in ["g1", "g2"] {
                assert!(pos(f) < pos(g), "{f} should precede {g}: {log:?}");
            }
        }
        assert!(pos("g1") < pos("s1") && pos("g2") < pos("s1"));
    }

    #[tokio::test(start_paused = true)]
    async fn dependency_report_lands_before_dependent_compute() {
        let orch = orchestrator();

        orch.registry()
            .register(
                EngineFn::arc("x", |_ctx| async {
                    Ok(Report::success(Signal::Bullish, 0.9, ReportData::Empty))
                }),
                EngineDescriptor::new("x", Phase::Foundation),
            )
            .await
            .unwrap();

        let observed = Arc::new(AtomicBool::new(false));
        let observed2 = Arc::clone(&observed);
        let orch2 = Arc::clone(&orch);
        orch.registry()
            .register(
                EngineFn::arc("y", move |_ctx| {
                    let orch = Arc::clone(&orch2);
                    let observed = Arc::clone(&observed2);
                    async move {
                        observed.store(orch.latest_for("x").is_some(), Ordering::SeqCst);
                        Ok(Report::success(Signal::Neutral, 0.5, ReportData::Empty))
                    }
                }),
                EngineDescriptor::new("y", Phase::Market).with_dependency("x"),
            )
            .await
            .unwrap();

        let results = orch.run_all().await;
        assert!(results.contains_key("x") && results.contains_key("y"));
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_contained_per_unit() {
        let orch = orchestrator();
        orch.registry()
            .register(
                EngineFn::arc("ok", |_ctx| async {
                    Ok(Report::success(Signal::Bullish, 0.8, ReportData::Empty))
                }),
                EngineDescriptor::new("ok", Phase::Market),
            )
            .await
            .unwrap();
        orch.registry()
            .register(
                EngineFn::arc("bad", |_ctx| async {
                    Err::<Report, _>(crate::EngineError::Fatal {
                        error: "wires crossed".into(),
                    })
                }),
                EngineDescriptor::new("bad", Phase::Market)
                    .with_config(EngineConfig {
                        degrade: crate::DegradePolicy {
                            enabled: false,
                            ..Default::default()
                        },
                        ..EngineConfig::default()
                    }),
            )
            .await
            .unwrap();

        let results = orch.run_all().await;
        assert_eq!(results.len(), 2);
        assert!(results["ok"].success);
        assert!(!results["bad"].success);
        assert_eq!(results["bad"].confidence, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_phase_executes_only_that_phase() {
        let orch = orchestrator();
        let log = Arc::new(Mutex::new(Vec::new()));
        orch.registry()
            .register(
                stamping("found", Arc::clone(&log)),
                EngineDescriptor::new("found", Phase::Foundation),
            )
            .await
            .unwrap();
        orch.registry()
            .register(
                stamping("mkt", Arc::clone(&log)),
                EngineDescriptor::new("mkt", Phase::Market),
            )
            .await
            .unwrap();

        let results = orch.run_phase(Phase::Market).await;
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("mkt"));
        assert_eq!(lock(&log).as_slice(), ["mkt"]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_unit_unknown_id_errors_without_side_effects() {
        let orch = orchestrator();
        let err = orch.run_unit("ghost").await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownUnit { .. }));
        assert!(orch.latest().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_run_unit_calls_coalesce() {
        let orch = orchestrator();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        orch.registry()
            .register(
                EngineFn::arc("slow", move |_ctx| {
                    calls2.fetch_add(1, Ordering::SeqCst);
                    async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(Report::success(Signal::Neutral, 0.5, ReportData::Empty))
                    }
                }),
                EngineDescriptor::new("slow", Phase::Foundation),
            )
            .await
            .unwrap();

        let (a, b) = tokio::join!(orch.run_unit("slow"), orch.run_unit("slow"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_pending_units_but_keeps_completed_reports() {
        let cfg = OrchestratorConfig {
            run_deadline: Duration::from_millis(100),
            defaults: fast_cfg(),
            ..OrchestratorConfig::default()
        };
        let orch = Orchestrator::builder(cfg).build();

        orch.registry()
            .register(
                EngineFn::arc("quick", |_ctx| async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(Report::success(Signal::Bullish, 0.9, ReportData::Empty))
                }),
                EngineDescriptor::new("quick", Phase::Market),
            )
            .await
            .unwrap();
        orch.registry()
            .register(
                EngineFn::arc("stuck", |ctx: CancellationToken| async move {
                    // Honors cancellation, but would otherwise outlive the run.
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(3600)) => {}
                        _ = ctx.cancelled() => return Err(crate::EngineError::Canceled),
                    }
                    Ok(Report::success(Signal::Neutral, 0.5, ReportData::Empty))
                }),
                EngineDescriptor::new("stuck", Phase::Market).with_config(EngineConfig {
                    timeout: Duration::from_secs(7200),
                    max_retries: 0,
                    ..fast_cfg()
                }),
            )
            .await
            .unwrap();

        let results = orch.run_all().await;
        assert!(results["quick"].success && !results["quick"].degraded);
        assert!(results["stuck"].degraded, "pending unit resolves degraded");
    }

    #[tokio::test(start_paused = true)]
    async fn unregistering_mid_run_skips_the_unit_without_crashing() {
        let orch = orchestrator();
        let registry = Arc::clone(orch.registry());

        orch.registry()
            .register(
                EngineFn::arc("saboteur", move |_ctx| {
                    let registry = Arc::clone(&registry);
                    async move {
                        registry.unregister("victim").await;
                        Ok(Report::success(Signal::Neutral, 0.5, ReportData::Empty))
                    }
                }),
                EngineDescriptor::new("saboteur", Phase::Foundation),
            )
            .await
            .unwrap();

        let victim_ran = Arc::new(AtomicBool::new(false));
        let victim_ran2 = Arc::clone(&victim_ran);
        orch.registry()
            .register(
                EngineFn::arc("victim", move |_ctx| {
                    victim_ran2.store(true, Ordering::SeqCst);
                    async { Ok(Report::success(Signal::Neutral, 0.5, ReportData::Empty)) }
                }),
                EngineDescriptor::new("victim", Phase::Synthesis),
            )
            .await
            .unwrap();

        let results = orch.run_all().await;
        assert!(results.contains_key("saboteur"));
        assert!(!results.contains_key("victim"));
        assert!(!victim_ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn report_subscribers_see_committed_state() {
        let orch = orchestrator();
        orch.registry()
            .register(
                EngineFn::arc("pulse", |_ctx| async {
                    Ok(Report::success(Signal::Bullish, 0.7, ReportData::Metric(3.0)))
                }),
                EngineDescriptor::new("pulse", Phase::Foundation),
            )
            .await
            .unwrap();

        let consistent = Arc::new(AtomicBool::new(false));
        let consistent2 = Arc::clone(&consistent);
        let orch2 = Arc::clone(&orch);
        let handle = orch.subscribe_reports("pulse", move |report| {
            // The latest map must already hold this very report.
            let committed = orch2.latest_for("pulse");
            consistent2.store(committed.as_ref() == Some(report), Ordering::SeqCst);
        });

        orch.run_all().await;
        assert!(consistent.load(Ordering::SeqCst));
        handle.unsubscribe();
    }

    #[tokio::test(start_paused = true)]
    async fn run_periodic_reruns_until_cancelled() {
        let cfg = OrchestratorConfig {
            refresh_interval: Duration::from_secs(5),
            defaults: fast_cfg(),
            ..OrchestratorConfig::default()
        };
        let orch = Orchestrator::builder(cfg).build();

        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        orch.registry()
            .register(
                EngineFn::arc("tick", move |_ctx| {
                    calls2.fetch_add(1, Ordering::SeqCst);
                    async { Ok(Report::success(Signal::Neutral, 0.5, ReportData::Empty)) }
                }),
                EngineDescriptor::new("tick", Phase::Foundation),
            )
            .await
            .unwrap();

        let token = CancellationToken::new();
        let loop_token = token.clone();
        let orch2 = Arc::clone(&orch);
        let handle = tokio::spawn(async move { orch2.run_periodic(loop_token).await });

        // Covers the initial run plus two refresh intervals.
        tokio::time::sleep(Duration::from_secs(11)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_concurrency_still_completes_every_unit() {
        let cfg = OrchestratorConfig {
            max_concurrent: 1,
            defaults: fast_cfg(),
            ..OrchestratorConfig::default()
        };
        let orch = Orchestrator::builder(cfg).build();
        let log = Arc::new(Mutex::new(Vec::new()));

        for id in ["a", "b", "c", "d"] {
            orch.registry()
                .register(
                    stamping(id, Arc::clone(&log)),
                    EngineDescriptor::new(id, Phase::Market),
                )
                .await
                .unwrap();
        }

        let results = orch.run_all().await;
        assert_eq!(results.len(), 4);
        assert_eq!(lock(&log).len(), 4);
    }
}

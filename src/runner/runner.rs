//! # EngineRunner: resilient single-unit executor.
//!
//! Wraps one [`Engine`] with the full execution policy chain:
//! single-flight guarding, cache check, timeout-guarded attempts, retry with
//! backoff, and degraded/error synthesis once attempts are exhausted.
//! [`EngineRunner::execute`] is infallible — every failure mode is contained
//! in the returned [`Report`].
//!
//! ## Execution flow
//! ```text
//! execute()
//!   ├─► in-flight execution present? ──► subscribe, await its Report
//!   ├─► cache entry within TTL?      ──► return it (no computation)
//!   └─► become the leader:
//!         loop attempt = 1..=max_retries+1 {
//!           ├─► publish EngineStarted
//!           ├─► run_once() with timeout + run-token race
//!           ├─► Ok(success)  → cache, update last-good, return
//!           └─► Err          → publish BackoffScheduled, cancellable sleep
//!         }
//!         exhausted:
//!           ├─► degrade enabled  → degraded report (stale data, damped confidence)
//!           └─► degrade disabled → hard error report
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** within one execution (never parallel).
//! - Only one physical computation per unit at a time; joiners observe the
//!   leader's Report (value-identical clones of one instance).
//! - Cache hits perform no physical computation and leave state untouched.
//! - Degraded reports are **not** written to the cache or the last-good slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use tokio::sync::broadcast;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::engines::EngineRef;
use crate::error::EngineError;
use crate::events::{Bus, Event, EventKind};
use crate::report::Report;
use crate::runner::attempt::run_once;
use crate::runner::cache::ReportCache;
use crate::runner::state::EngineState;

/// Resilient executor owning one unit's cache, state, and in-flight gate.
pub struct EngineRunner {
    engine: EngineRef,
    cfg: EngineConfig,
    bus: Bus,
    cache: Mutex<ReportCache>,
    last_good: Mutex<Option<Report>>,
    state: Mutex<EngineState>,
    inflight: tokio::sync::Mutex<Option<Weak<broadcast::Sender<Report>>>>,
    executions: AtomicU64,
}

/// Outcome of inspecting the in-flight gate.
enum Entry {
    Cached(Report),
    Join(broadcast::Receiver<Report>),
    Lead(Arc<broadcast::Sender<Report>>),
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EngineRunner {
    /// Creates a runner for the given engine with its resolved configuration.
    pub fn new(engine: EngineRef, cfg: EngineConfig, bus: Bus) -> Self {
        Self {
            engine,
            cfg,
            bus,
            cache: Mutex::new(ReportCache::new()),
            last_good: Mutex::new(None),
            state: Mutex::new(EngineState::Idle),
            inflight: tokio::sync::Mutex::new(None),
            executions: AtomicU64::new(0),
        }
    }

    /// Returns the unit id.
    pub fn id(&self) -> &str {
        self.engine.id()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> EngineState {
        *lock(&self.state)
    }

    /// Returns the last genuinely successful report, if any.
    pub fn last_good(&self) -> Option<Report> {
        lock(&self.last_good).clone()
    }

    /// Number of physical executions started (attempt loops, not attempts).
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Executes the unit, never failing: cache hit, joined in-flight result,
    /// fresh computation, degraded report, or hard error report.
    ///
    /// `run_token` carries the run-level deadline; when it fires, pending
    /// attempts and backoff sleeps abort and the execution resolves through
    /// the degradation policy.
    pub async fn execute(&self, run_token: &CancellationToken) -> Report {
        loop {
            let entry = {
                let mut gate = self.inflight.lock().await;
                if let Some(tx) = gate.as_ref().and_then(Weak::upgrade) {
                    Entry::Join(tx.subscribe())
                } else if let Some(hit) = self.cache_lookup() {
                    *gate = None;
                    Entry::Cached(hit)
                } else {
                    let (tx, _) = broadcast::channel(1);
                    let tx = Arc::new(tx);
                    *gate = Some(Arc::downgrade(&tx));
                    Entry::Lead(tx)
                }
            };

            match entry {
                Entry::Cached(hit) => return hit,
                Entry::Join(mut rx) => match rx.recv().await {
                    Ok(report) => return report,
                    // The leader was dropped without a result; start over.
                    Err(_) => continue,
                },
                Entry::Lead(tx) => {
                    let report = self.lead(run_token).await;
                    let mut gate = self.inflight.lock().await;
                    *gate = None;
                    let _ = tx.send(report.clone());
                    return report;
                }
            }
        }
    }

    /// Synthesizes the report for a unit that never got to start because the
    /// run was cancelled (deadline during a semaphore wait).
    pub(crate) fn cancelled_report(&self) -> Report {
        self.resolve_exhausted(vec![EngineError::Canceled.as_message()])
    }

    /// Runs the attempt loop as the single in-flight leader, containing
    /// panics from the engine's compute.
    async fn lead(&self, run_token: &CancellationToken) -> Report {
        self.executions.fetch_add(1, Ordering::Relaxed);
        let fut = self.attempt_loop(run_token);
        match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            Ok(report) => report,
            Err(panic_err) => {
                tracing::warn!(engine = self.id(), panic = ?panic_err, "engine panicked");
                self.resolve_exhausted(vec!["engine panicked".to_string()])
            }
        }
    }

    async fn attempt_loop(&self, run_token: &CancellationToken) -> Report {
        *lock(&self.state) = EngineState::Running;
        let attempts = self.cfg.attempts();
        let mut errors: Vec<String> = Vec::new();

        for attempt in 1..=attempts {
            if run_token.is_cancelled() {
                errors.push(EngineError::Canceled.as_message());
                break;
            }

            self.bus.publish(
                Event::new(EventKind::EngineStarted)
                    .with_engine(self.id())
                    .with_attempt(attempt),
            );

            match run_once(
                self.engine.as_ref(),
                run_token,
                self.cfg.timeout,
                attempt,
                &self.bus,
            )
            .await
            {
                Ok(report) => return self.commit_success(report),
                Err(EngineError::Canceled) => {
                    errors.push(EngineError::Canceled.as_message());
                    break;
                }
                Err(e) => {
                    errors.push(e.as_message());
                    if !e.is_retryable() {
                        break;
                    }
                    if attempt < attempts {
                        let delay = self.cfg.backoff.next(attempt - 1);
                        self.bus.publish(
                            Event::new(EventKind::BackoffScheduled)
                                .with_engine(self.id())
                                .with_attempt(attempt)
                                .with_delay(delay)
                                .with_reason(e.to_string()),
                        );
                        tokio::select! {
                            _ = time::sleep(delay) => {}
                            _ = run_token.cancelled() => {
                                errors.push(EngineError::Canceled.as_message());
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.resolve_exhausted(errors)
    }

    /// Records a genuine success: state, cache, last-good.
    fn commit_success(&self, report: Report) -> Report {
        *lock(&self.state) = EngineState::Success;
        if let Some(ttl) = self.cfg.cache_ttl_opt() {
            lock(&self.cache).put(self.engine.cache_key(), report.clone(), ttl);
        }
        *lock(&self.last_good) = Some(report.clone());
        report
    }

    /// Resolves an exhausted execution through the degradation policy.
    fn resolve_exhausted(&self, errors: Vec<String>) -> Report {
        let reason = if errors.is_empty() {
            "execution aborted".to_string()
        } else {
            errors.join("; ")
        };

        if self.cfg.degrade.enabled {
            *lock(&self.state) = EngineState::Degraded;
            let last = lock(&self.last_good).clone();
            let report = self.cfg.degrade.synthesize(last.as_ref(), reason.clone());
            self.bus.publish(
                Event::new(EventKind::EngineDegraded)
                    .with_engine(self.id())
                    .with_reason(reason),
            );
            report
        } else {
            *lock(&self.state) = EngineState::Error;
            Report::failure(errors)
        }
    }

    fn cache_lookup(&self) -> Option<Report> {
        self.cfg.cache_ttl_opt()?;
        lock(&self.cache).get(self.engine.cache_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::EngineFn;
    use crate::policies::{BackoffPolicy, DegradePolicy, JitterPolicy};
    use crate::report::{ReportData, Signal};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn test_cfg() -> EngineConfig {
        EngineConfig {
            max_retries: 2,
            timeout: Duration::from_millis(50),
            cache_ttl: Duration::ZERO,
            backoff: BackoffPolicy {
                first: Duration::from_millis(10),
                max: Duration::from_millis(100),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
            degrade: DegradePolicy::default(),
        }
    }

    fn counting_flaky(fail_times: u32) -> (EngineRef, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let engine = EngineFn::arc("flaky", move |_ctx| {
            let n = calls2.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n <= fail_times {
                    Err(EngineError::Fail {
                        error: format!("boom #{n}"),
                    })
                } else {
                    Ok(Report::success(
                        Signal::Bullish,
                        0.9,
                        ReportData::Metric(n as f64),
                    ))
                }
            }
        });
        (engine, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let (engine, calls) = counting_flaky(2);
        let runner = EngineRunner::new(engine, test_cfg(), Bus::new(64));

        let report = runner.execute(&CancellationToken::new()).await;
        assert!(report.success && !report.degraded);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(runner.state(), EngineState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_degrades_with_damped_confidence() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        // First call succeeds with confidence 0.9; everything after fails.
        let engine = EngineFn::arc("fading", move |_ctx| {
            let n = calls2.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Ok(Report::success(
                        Signal::Bearish,
                        0.9,
                        ReportData::Metric(7.0),
                    ))
                } else {
                    Err(EngineError::Fail {
                        error: "feed down".into(),
                    })
                }
            }
        });
        let runner = EngineRunner::new(engine, test_cfg(), Bus::new(64));
        let token = CancellationToken::new();

        let good = runner.execute(&token).await;
        assert!(good.success && !good.degraded);

        let degraded = runner.execute(&token).await;
        assert!(degraded.success && degraded.degraded);
        assert!(degraded.confidence < good.confidence);
        assert_eq!(degraded.signal, Signal::Bearish);
        assert_eq!(degraded.data, ReportData::Metric(7.0));
        assert_eq!(runner.state(), EngineState::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_without_degradation_is_a_hard_error() {
        let (engine, calls) = counting_flaky(u32::MAX);
        let mut cfg = test_cfg();
        cfg.degrade.enabled = false;
        let runner = EngineRunner::new(engine, cfg, Bus::new(64));

        let report = runner.execute(&CancellationToken::new()).await;
        assert!(!report.success && !report.degraded);
        assert_eq!(report.confidence, 0.0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.errors.len(), 3);
        assert_eq!(runner.state(), EngineState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_hit_skips_compute() {
        let (engine, calls) = counting_flaky(0);
        let mut cfg = test_cfg();
        cfg.cache_ttl = Duration::from_secs(60);
        let runner = EngineRunner::new(engine, cfg, Bus::new(64));
        let token = CancellationToken::new();

        let first = runner.execute(&token).await;
        let second = runner.execute(&token).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_cache_recomputes_exactly_once() {
        let (engine, calls) = counting_flaky(0);
        let mut cfg = test_cfg();
        cfg.cache_ttl = Duration::from_secs(60);
        let runner = EngineRunner::new(engine, cfg, Bus::new(64));
        let token = CancellationToken::new();

        runner.execute(&token).await;
        time::advance(Duration::from_secs(61)).await;
        runner.execute(&token).await;
        runner.execute(&token).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_executes_are_single_flight() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let engine = EngineFn::arc("slow", move |_ctx| {
            calls2.fetch_add(1, Ordering::SeqCst);
            async move {
                time::sleep(Duration::from_millis(30)).await;
                Ok(Report::success(Signal::Neutral, 0.4, ReportData::Empty))
            }
        });
        let runner = Arc::new(EngineRunner::new(engine, test_cfg(), Bus::new(64)));
        let token = CancellationToken::new();

        let (a, b) = tokio::join!(runner.execute(&token), runner.execute(&token));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
        assert_eq!(runner.executions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_retry_then_degrade() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        // Takes 200ms against a 50ms per-attempt timeout.
        let engine = EngineFn::arc("stuck", move |_ctx| {
            calls2.fetch_add(1, Ordering::SeqCst);
            async move {
                time::sleep(Duration::from_millis(200)).await;
                Ok(Report::success(Signal::Neutral, 0.5, ReportData::Empty))
            }
        });
        let runner = EngineRunner::new(engine, test_cfg(), Bus::new(64));

        let report = runner.execute(&CancellationToken::new()).await;
        assert!(report.degraded);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(report.errors[0].contains("timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn soft_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let engine = EngineFn::arc("soft", move |_ctx| {
            calls2.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Report::failure(vec!["no quotes".into()])) }
        });
        let runner = EngineRunner::new(engine, test_cfg(), Bus::new(64));

        let report = runner.execute(&CancellationToken::new()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(report.degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_skip_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);
        let engine = EngineFn::arc("broken", move |_ctx| {
            calls2.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<Report, _>(EngineError::Fatal {
                    error: "bad config".into(),
                })
            }
        });
        let mut cfg = test_cfg();
        cfg.degrade.enabled = false;
        let runner = EngineRunner::new(engine, cfg, Bus::new(64));

        let report = runner.execute(&CancellationToken::new()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!report.success);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_resolves_without_compute() {
        let (engine, calls) = counting_flaky(0);
        let runner = EngineRunner::new(engine, test_cfg(), Bus::new(64));
        let token = CancellationToken::new();
        token.cancel();

        let report = runner.execute(&token).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(report.degraded);
        assert!(report.errors[0].contains("cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_events_are_published_in_order() {
        let (engine, _calls) = counting_flaky(1);
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let runner = EngineRunner::new(engine, test_cfg(), bus);

        runner.execute(&CancellationToken::new()).await;

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::EngineStarted,
                EventKind::EngineFailed,
                EventKind::BackoffScheduled,
                EventKind::EngineStarted,
                EventKind::EngineSucceeded,
            ]
        );
    }
}

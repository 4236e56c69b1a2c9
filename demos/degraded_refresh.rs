//! # Demo: degraded_refresh
//!
//! Shows the resilience chain on a flaky feed: the first run succeeds and
//! seeds the last-good slot; the feed then goes down, and the next run walks
//! through retries with backoff before serving a degraded report built from
//! the stale payload with damped confidence.
//!
//! ## Flow
//! ```text
//! run 1: compute → Ok(confidence 0.8)          → cached + last-good
//! run 2: compute → Err ×3 (retries + backoff)  → degraded report
//!        confidence = 0.8 × damping(0.7) = 0.56, flagged degraded=true
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example degraded_refresh --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use signalvisor::{
    BackoffPolicy, EngineConfig, EngineDescriptor, EngineError, EngineFn, JitterPolicy,
    LogWriter, Orchestrator, OrchestratorConfig, Phase, Report, ReportData, Signal, Subscribe,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let orch = Orchestrator::builder(OrchestratorConfig::default())
        .with_subscribers(subs)
        .build();

    // Succeeds once, then the upstream goes dark.
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = Arc::clone(&calls);
    let flaky = EngineFn::arc("options-skew", move |_ctx| {
        let n = calls2.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 1 {
                Ok(Report::success(Signal::Bearish, 0.8, ReportData::Metric(-1.3)))
            } else {
                Err(EngineError::Fail {
                    error: format!("feed unreachable (call #{n})"),
                })
            }
        }
    });

    let cfg = EngineConfig::builder()
        .max_retries(2)
        .timeout(Duration::from_millis(500))
        .cache_ttl(Duration::ZERO) // recompute on every run
        .backoff(BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(2),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        })
        .build()?;

    orch.registry()
        .register(
            flaky,
            EngineDescriptor::new("options-skew", Phase::Market).with_config(cfg),
        )
        .await?;

    let fresh = orch.run_unit("options-skew").await?;
    println!(
        "run 1: success={} degraded={} confidence={:.2}",
        fresh.success, fresh.degraded, fresh.confidence
    );

    let stale = orch.run_unit("options-skew").await?;
    println!(
        "run 2: success={} degraded={} confidence={:.2} reason={:?}",
        stale.success, stale.degraded, stale.confidence, stale.errors
    );

    Ok(())
}

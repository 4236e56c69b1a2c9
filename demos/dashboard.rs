//! # Demo: dashboard
//!
//! Wires a small analytics dashboard: two foundation units, three analysis
//! units across the parallel groups, and one synthesis unit that reads its
//! dependencies' results out of the orchestrator.
//!
//! ## Flow
//! ```text
//! Orchestrator::run_all()
//!   ├─► stage 0: vix-level, breadth            (Foundation)
//!   ├─► stage 1: vol-regime | rsi | news-tone  (Market | Technical | Sentiment)
//!   └─► stage 2: trend-composite               (Synthesis)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example dashboard --features logging
//! ```

use std::sync::Arc;

use signalvisor::{
    EngineDescriptor, EngineFn, LogWriter, Orchestrator, OrchestratorConfig, Phase, Report,
    ReportData, Signal, Subscribe,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let orch = Orchestrator::builder(OrchestratorConfig::default())
        .with_subscribers(subs)
        .build();

    orch.registry()
        .register(
            EngineFn::arc("vix-level", |_ctx| async {
                Ok(Report::success(Signal::Neutral, 0.8, ReportData::Metric(17.4)))
            }),
            EngineDescriptor::new("vix-level", Phase::Foundation).with_priority(1),
        )
        .await?;
    orch.registry()
        .register(
            EngineFn::arc("breadth", |_ctx| async {
                Ok(Report::success(
                    Signal::Bullish,
                    0.6,
                    ReportData::Breakdown(vec![
                        ("advancers".into(), 312.0),
                        ("decliners".into(), 188.0),
                    ]),
                ))
            }),
            EngineDescriptor::new("breadth", Phase::Foundation).with_priority(2),
        )
        .await?;

    orch.registry()
        .register(
            EngineFn::arc("vol-regime", |_ctx| async {
                Ok(Report::success(Signal::Bearish, 0.55, ReportData::Note("elevated".into())))
            }),
            EngineDescriptor::new("vol-regime", Phase::Market).with_dependency("vix-level"),
        )
        .await?;
    orch.registry()
        .register(
            EngineFn::arc("rsi", |_ctx| async {
                Ok(Report::success(Signal::Bullish, 0.7, ReportData::Metric(62.0)))
            }),
            EngineDescriptor::new("rsi", Phase::Technical),
        )
        .await?;
    orch.registry()
        .register(
            EngineFn::arc("news-tone", |_ctx| async {
                Ok(Report::success(
                    Signal::Neutral,
                    0.4,
                    ReportData::Series(vec![0.1, -0.2, 0.05]),
                ))
            }),
            EngineDescriptor::new("news-tone", Phase::Sentiment),
        )
        .await?;

    // Synthesis reads dependency results out of the orchestrator.
    let orch_for_composite = Arc::clone(&orch);
    orch.registry()
        .register(
            EngineFn::arc("trend-composite", move |_ctx| {
                let orch = Arc::clone(&orch_for_composite);
                async move {
                    let inputs = ["vol-regime", "rsi", "news-tone"];
                    let mut score = 0.0;
                    for id in inputs {
                        if let Some(r) = orch.latest_for(id) {
                            score += match r.signal {
                                Signal::Bullish => r.confidence,
                                Signal::Bearish => -r.confidence,
                                Signal::Neutral => 0.0,
                            };
                        }
                    }
                    let signal = if score > 0.1 {
                        Signal::Bullish
                    } else if score < -0.1 {
                        Signal::Bearish
                    } else {
                        Signal::Neutral
                    };
                    Ok(Report::success(signal, 0.65, ReportData::Metric(score)))
                }
            }),
            EngineDescriptor::new("trend-composite", Phase::Synthesis)
                .with_dependency("vol-regime")
                .with_dependency("rsi")
                .with_dependency("news-tone"),
        )
        .await?;

    // Tile layer: push notifications for one unit.
    let handle = orch.subscribe_reports("trend-composite", |report| {
        println!(
            "tile update: trend-composite signal={} confidence={:.2}",
            report.signal.as_label(),
            report.confidence
        );
    });

    let results = orch.run_all().await;
    for (id, report) in &results {
        println!(
            "{id}: success={} degraded={} signal={} confidence={:.2}",
            report.success,
            report.degraded,
            report.signal.as_label(),
            report.confidence
        );
    }

    handle.unsubscribe();
    Ok(())
}

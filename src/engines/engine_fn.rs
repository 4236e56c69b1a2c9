//! # Closure-backed engine (`EngineFn`)
//!
//! [`EngineFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing
//! a fresh future per attempt. Each attempt owns its own state; engines that
//! need shared state across attempts hold an `Arc<...>` inside the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use signalvisor::{EngineFn, EngineRef, EngineError, Report, ReportData, Signal};
//!
//! let e: EngineRef = EngineFn::arc("vix-level", |_ctx: CancellationToken| async move {
//!     Ok::<_, EngineError>(Report::success(Signal::Neutral, 0.6, ReportData::Metric(17.4)))
//! });
//!
//! assert_eq!(e.id(), "vix-level");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::engines::engine::Engine;
use crate::error::EngineError;
use crate::report::Report;

/// Function-backed engine implementation.
///
/// Wraps a closure that *creates* a new compute future per attempt.
pub struct EngineFn<F> {
    id: Cow<'static, str>,
    f: F,
}

impl<F> EngineFn<F> {
    /// Creates a new closure-backed engine.
    ///
    /// Prefer [`EngineFn::arc`] when you immediately need an [`EngineRef`](crate::EngineRef).
    pub fn new(id: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { id: id.into(), f }
    }

    /// Creates the engine and returns it as a shared handle.
    pub fn arc(id: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(id, f))
    }
}

#[async_trait]
impl<F, Fut> Engine for EngineFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Report, EngineError>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn compute(&self, ctx: CancellationToken) -> Result<Report, EngineError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportData, Signal};

    #[tokio::test]
    async fn closure_engine_computes() {
        let e = EngineFn::arc("demo", |_ctx| async {
            Ok(Report::success(Signal::Bullish, 0.5, ReportData::Empty))
        });
        let report = e.compute(CancellationToken::new()).await.unwrap();
        assert!(report.success);
        assert_eq!(e.cache_key(), "demo");
    }
}

//! # Unit lifecycle state.
//!
//! Transitions:
//! ```text
//! Idle ──► Running ──► Success
//!                 ├──► Error      (retries exhausted, degradation disabled)
//!                 └──► Degraded   (retries exhausted, degradation enabled)
//! ```
//! Any terminal state goes back to `Running` on the next physical execution.
//! Cache hits perform no physical computation and leave the state untouched.

/// Lifecycle state of one unit's runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Never executed (or reset).
    Idle,
    /// A physical computation is in flight.
    Running,
    /// Last execution produced a genuine successful report.
    Success,
    /// Last execution exhausted retries with degradation disabled.
    Error,
    /// Last execution exhausted retries and served a degraded report.
    Degraded,
}

impl EngineState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Running => "running",
            EngineState::Success => "success",
            EngineState::Error => "error",
            EngineState::Degraded => "degraded",
        }
    }
}

//! # Runtime configuration.
//!
//! Two layers of configuration:
//!
//! 1. [`EngineConfig`] — per-unit execution knobs (retries, timeout, cache
//!    TTL, backoff, degradation). Built through [`EngineConfigBuilder`],
//!    which validates ranges at construction time and fails fast with
//!    [`ConfigError`](crate::ConfigError) instead of silently clamping.
//! 2. [`OrchestratorConfig`] — run-wide settings (concurrency cap, bus
//!    capacity, run deadline, refresh interval) plus the default
//!    `EngineConfig` inherited by units that do not override it.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore created)
//! - `run_deadline = 0s` → no run-level deadline
//! - `cache_ttl = 0s` → caching disabled for that unit

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::{BackoffPolicy, DegradePolicy, JitterPolicy};

/// Per-unit execution configuration.
///
/// A descriptor may carry its own `EngineConfig`; otherwise the orchestrator
/// defaults apply. All fields are public for inspection; construct through
/// [`EngineConfig::builder`] to get range validation.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Per-attempt timeout. Always positive (validated).
    pub timeout: Duration,
    /// Cache time-to-live for successful reports. `0s` disables caching.
    pub cache_ttl: Duration,
    /// Retry delay policy.
    pub backoff: BackoffPolicy,
    /// What to return when retries are exhausted.
    pub degrade: DegradePolicy,
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `max_retries = 2`
    /// - `timeout = 5s`
    /// - `cache_ttl = 30s`
    /// - `backoff = BackoffPolicy::default()` (exponential, equal jitter)
    /// - `degrade = DegradePolicy::default()` (enabled, damping 0.7, floor 0.1)
    fn default() -> Self {
        Self {
            max_retries: 2,
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
            degrade: DegradePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Returns a validating builder seeded with the defaults.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Total number of attempts (initial + retries).
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the cache TTL as an `Option` (`0s` → caching disabled).
    #[inline]
    pub fn cache_ttl_opt(&self) -> Option<Duration> {
        if self.cache_ttl == Duration::ZERO {
            None
        } else {
            Some(self.cache_ttl)
        }
    }
}

/// Fluent, validating builder for [`EngineConfig`].
///
/// ```rust
/// use std::time::Duration;
/// use signalvisor::EngineConfig;
///
/// let cfg = EngineConfig::builder()
///     .max_retries(1)
///     .timeout(Duration::from_millis(250))
///     .cache_ttl(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert_eq!(cfg.attempts(), 2);
///
/// assert!(EngineConfig::builder().timeout(Duration::ZERO).build().is_err());
/// ```
#[derive(Clone, Debug)]
pub struct EngineConfigBuilder {
    cfg: EngineConfig,
}

impl EngineConfigBuilder {
    fn new() -> Self {
        Self {
            cfg: EngineConfig::default(),
        }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.cfg.max_retries = retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.cfg.timeout = timeout;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cfg.cache_ttl = ttl;
        self
    }

    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.cfg.backoff = backoff;
        self
    }

    pub fn jitter(mut self, jitter: JitterPolicy) -> Self {
        self.cfg.backoff.jitter = jitter;
        self
    }

    pub fn degrade(mut self, degrade: DegradePolicy) -> Self {
        self.cfg.degrade = degrade;
        self
    }

    /// Enables or disables graceful degradation, keeping damping/floor.
    pub fn graceful_degradation(mut self, enabled: bool) -> Self {
        self.cfg.degrade.enabled = enabled;
        self
    }

    /// Validates ranges and returns the configuration.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let cfg = self.cfg;
        if cfg.timeout == Duration::ZERO {
            return Err(ConfigError::NonPositiveTimeout);
        }
        if !cfg.backoff.factor.is_finite() || cfg.backoff.factor < 1.0 {
            return Err(ConfigError::FactorTooSmall(cfg.backoff.factor));
        }
        if !cfg.degrade.damping.is_finite()
            || cfg.degrade.damping <= 0.0
            || cfg.degrade.damping > 1.0
        {
            return Err(ConfigError::DampingOutOfRange(cfg.degrade.damping));
        }
        if !cfg.degrade.floor.is_finite() || cfg.degrade.floor < 0.0 || cfg.degrade.floor > 1.0 {
            return Err(ConfigError::FloorOutOfRange(cfg.degrade.floor));
        }
        Ok(cfg)
    }
}

/// Run-wide orchestrator configuration.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Maximum units running simultaneously within a stage. `0` = unlimited.
    pub max_concurrent: usize,
    /// Event bus ring buffer size (min 1; clamped by the bus).
    pub bus_capacity: usize,
    /// Run-level deadline. `0s` = none. Units still pending when it elapses
    /// resolve like an internal timeout (degraded or error report).
    pub run_deadline: Duration,
    /// Interval between automatic re-runs in
    /// [`Orchestrator::run_periodic`](crate::Orchestrator::run_periodic).
    pub refresh_interval: Duration,
    /// Defaults for units whose descriptor carries no config override.
    pub defaults: EngineConfig,
}

impl Default for OrchestratorConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `run_deadline = 0s` (none)
    /// - `refresh_interval = 60s`
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            bus_capacity: 1024,
            run_deadline: Duration::ZERO,
            refresh_interval: Duration::from_secs(60),
            defaults: EngineConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Returns the concurrency cap as an `Option` (`0` → unlimited).
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the run deadline as an `Option` (`0s` → none).
    #[inline]
    pub fn deadline(&self) -> Option<Duration> {
        if self.run_deadline == Duration::ZERO {
            None
        } else {
            Some(self.run_deadline)
        }
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

//! Probe cadence and failure threshold used by the monitor.

use std::time::Duration;

use texedit_config::Config;

const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(1);

/// Tuning knobs for the probe loop and failure accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    probe_interval: Duration,
    probe_timeout: Duration,
    failure_threshold: u32,
}

impl MonitorSettings {
    /// Builds settings, clamping the interval to at least one millisecond and
    /// the threshold to at least one failure.
    #[must_use]
    pub fn new(probe_interval: Duration, probe_timeout: Duration, failure_threshold: u32) -> Self {
        Self {
            probe_interval: probe_interval.max(MIN_PROBE_INTERVAL),
            probe_timeout,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Derives the monitor settings from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.probe_interval(),
            config.probe_timeout(),
            config.failure_threshold(),
        )
    }

    /// Delay between probes.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        self.probe_interval
    }

    /// Upper bound on a single probe.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Consecutive failures before the state becomes `Error`.
    #[must_use]
    pub const fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

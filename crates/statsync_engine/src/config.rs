//! Configuration for the stats manager.

use std::time::Duration;

/// Configuration for a [`StatsManager`](crate::StatsManager).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Rolling window during which flush requests for the same scheduler
    /// are coalesced into one downstream push. `Duration::ZERO` disables
    /// the delay (useful for tests).
    pub debounce_window: Duration,
    /// Interval of the background sweep that flushes dirty documents even
    /// when the host never requests a flush.
    pub sweep_interval: Duration,
}

impl ManagerConfig {
    /// Creates a configuration with production defaults: a 60 second
    /// debounce window and a 16 millisecond sweep interval.
    pub fn new() -> Self {
        Self {
            debounce_window: Duration::from_secs(60),
            sweep_interval: Duration::from_millis(16),
        }
    }

    /// Sets the debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Sets the background sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = ManagerConfig::new()
            .with_debounce_window(Duration::ZERO)
            .with_sweep_interval(Duration::from_millis(5));

        assert_eq!(config.debounce_window, Duration::ZERO);
        assert_eq!(config.sweep_interval, Duration::from_millis(5));
    }

    #[test]
    fn production_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.debounce_window, Duration::from_secs(60));
        assert_eq!(config.sweep_interval, Duration::from_millis(16));
    }
}

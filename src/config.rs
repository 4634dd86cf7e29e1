//! Runtime configuration.

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Ticks per second for the async driver.
    pub fps: u32,
    /// How many times a node re-checks whether it has settled before giving up.
    pub max_settle_attempts: u32,
    /// Register the `attr`, `set`, `on` and `cls` namespaces on every provider.
    pub builtin_namespaces: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            max_settle_attempts: 120,
            builtin_namespaces: true,
        }
    }
}

impl RuntimeConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target ticks per second (builder).
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the settle retry cap (builder).
    pub fn with_max_settle_attempts(mut self, attempts: u32) -> Self {
        self.max_settle_attempts = attempts;
        self
    }

    /// Enable or disable the built-in namespaces (builder).
    pub fn with_builtin_namespaces(mut self, enabled: bool) -> Self {
        self.builtin_namespaces = enabled;
        self
    }

    /// Duration of one tick at the configured rate. A rate of zero counts as one.
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.fps, 60);
        assert_eq!(config.max_settle_attempts, 120);
        assert!(config.builtin_namespaces);
    }

    #[test]
    fn builders() {
        let config = RuntimeConfig::new()
            .with_fps(30)
            .with_max_settle_attempts(3)
            .with_builtin_namespaces(false);
        assert_eq!(config.fps, 30);
        assert_eq!(config.max_settle_attempts, 3);
        assert!(!config.builtin_namespaces);
    }

    #[test]
    fn tick_period() {
        assert_eq!(RuntimeConfig::new().with_fps(4).tick_period(), Duration::from_millis(250));
        assert_eq!(RuntimeConfig::new().with_fps(0).tick_period(), Duration::from_secs(1));
    }
}

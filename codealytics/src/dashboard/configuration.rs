use std::time::Duration;

/// The banner printed above the metrics unless you configure another one.
pub const DEFAULT_PREFIX: &str = "--------------- Analytics ---------------\n";
/// The banner printed below the metrics unless you configure another one.
pub const DEFAULT_SUFFIX: &str = "-----------------------------------------\n";
/// Frames per second unless you configure another rate.
pub const DEFAULT_UPDATES_PER_SECOND: u32 = 32;

/// Configuration for a [`crate::Dashboard`].
///
/// Banners are line oriented: end them with `\n` so the first metric starts
/// on its own line.
#[derive(Debug, Clone)]
pub struct DashboardConfiguration {
    pub(crate) updates_per_second: u32,
    pub(crate) prefix: String,
    pub(crate) suffix: String,
}

impl Default for DashboardConfiguration {
    fn default() -> Self {
        Self {
            updates_per_second: DEFAULT_UPDATES_PER_SECOND,
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl DashboardConfiguration {
    /// The default configuration: 32 updates per second and the default banners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repaint rate (default 32). 0 is treated as 1.
    pub fn updates_per_second(&mut self, updates_per_second: u32) -> &mut Self {
        self.updates_per_second = updates_per_second.max(1);
        self
    }

    /// Set the banner printed above the metrics
    pub fn prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the banner printed below the metrics
    pub fn suffix(&mut self, suffix: impl Into<String>) -> &mut Self {
        self.suffix = suffix.into();
        self
    }

    /// Time between two render ticks: `1000 / updates_per_second` milliseconds.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.updates_per_second.max(1)))
    }
}

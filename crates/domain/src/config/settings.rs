use parking_lot::RwLock;

use super::ScribeConfig;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Settings provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared, reloadable view of the config.
///
/// The worker takes a snapshot at each dispatched call, never mid-call, so a
/// `replace` applies to subsequent calls without a restart.  This is the only
/// refresh point; nothing re-reads config storage inline.
pub struct Settings {
    inner: RwLock<ScribeConfig>,
}

impl Settings {
    pub fn new(config: ScribeConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    /// Clone the current config.
    pub fn snapshot(&self) -> ScribeConfig {
        self.inner.read().clone()
    }

    /// Swap in a whole new config.
    pub fn replace(&self, config: ScribeConfig) {
        *self.inner.write() = config;
    }

    /// Edit the current config in place.
    pub fn update(&self, f: impl FnOnce(&mut ScribeConfig)) {
        f(&mut self.inner.write());
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(ScribeConfig::default())
    }
}

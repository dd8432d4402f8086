use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Worker concurrency
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Admission-control settings for one session worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum number of remote calls in flight at once.  Clamped to ≥ 1.
    #[serde(default = "d_3")]
    pub max_concurrent: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 3 }
    }
}

impl WorkerConfig {
    /// Clamp `max_concurrent` so a zero or missing value never disables the
    /// pipeline.
    pub fn clamped(&self) -> Self {
        Self {
            max_concurrent: self.max_concurrent.max(1),
        }
    }
}

fn d_3() -> usize {
    3
}

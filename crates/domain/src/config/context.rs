use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context window budgets
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Budgets applied to the transcript before every remote call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Transcripts at or under this many turns are sent unchanged.
    #[serde(default = "d_20")]
    pub max_messages: usize,
    /// Estimated-token ceiling for the retained suffix.
    #[serde(default = "d_100000")]
    pub max_token_estimate: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_messages: 20,
            max_token_estimate: 100_000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_20() -> usize {
    20
}
fn d_100000() -> u64 {
    100_000
}

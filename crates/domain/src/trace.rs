use serde::Serialize;

/// Structured trace events emitted across all scribe crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    /// Context truncation removed turns before a remote call.
    ContextTruncated {
        dropped_turns: usize,
        tokens_kept: u64,
    },
    CompletionCall {
        model: String,
        duration_ms: u64,
        input_tokens: u64,
        output_tokens: u64,
    },
    /// A single call's usage crossed the cost high-water mark.
    HighUsage {
        input_tokens: u64,
        output_tokens: u64,
        total: u64,
        threshold: u64,
    },
    MemorySessionAssigned {
        session_id: String,
        memory_session_id: String,
        reused: bool,
    },
    TranscriptAppend {
        session_id: String,
        turns: usize,
    },
    ItemDropped {
        kind: String,
        error: String,
    },
    SessionEscalated {
        session_id: String,
        reason: String,
    },
    SessionAborted {
        session_id: String,
    },
    SessionDrained {
        session_id: String,
        items_submitted: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "scribe_event");
    }
}

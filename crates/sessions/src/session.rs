//! Shared per-session state.
//!
//! One `Session` is shared by the stream driver and every in-flight call.
//! All mutation is append/increment only: turns are pushed through a single
//! RwLock-guarded append point, counters are atomics.  Nothing edits an
//! existing transcript entry, which is what keeps concurrent completions safe
//! without a global lock.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use scribe_domain::trace::TraceEvent;
use scribe_domain::turn::{TokenUsage, Turn};

pub struct Session {
    session_id: String,
    /// Secondary identity used as a foreign key by the storage layer.
    /// Assigned exactly once; never regenerated once set.
    memory_session_id: RwLock<Option<String>>,
    transcript: RwLock<Vec<Turn>>,
    last_prompt_number: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    /// Oldest enqueue time among unprocessed items, cleared after each
    /// successfully processed one.
    earliest_pending: RwLock<Option<DateTime<Utc>>>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            memory_session_id: RwLock::new(None),
            transcript: RwLock::new(Vec::new()),
            last_prompt_number: AtomicU64::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            earliest_pending: RwLock::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    // ── memory session identity ─────────────────────────────────────

    pub fn memory_session_id(&self) -> Option<String> {
        self.memory_session_id.read().clone()
    }

    /// Set-if-absent.  Returns the effective id: the existing one when a
    /// prior assignment already happened, otherwise `candidate`.
    pub fn assign_memory_session_id(&self, candidate: impl Into<String>) -> String {
        let mut slot = self.memory_session_id.write();
        match &*slot {
            Some(existing) => existing.clone(),
            None => {
                let id = candidate.into();
                *slot = Some(id.clone());
                id
            }
        }
    }

    // ── transcript ──────────────────────────────────────────────────

    /// The single mutation point for the transcript.  Appends happen in
    /// completion order, not submission order.
    pub fn append_turns(&self, turns: &[Turn]) {
        if turns.is_empty() {
            return;
        }
        self.transcript.write().extend_from_slice(turns);

        TraceEvent::TranscriptAppend {
            session_id: self.session_id.clone(),
            turns: turns.len(),
        }
        .emit();
    }

    pub fn transcript_snapshot(&self) -> Vec<Turn> {
        self.transcript.read().clone()
    }

    /// Snapshot of the first `n` turns: the independent context given to a
    /// concurrent item so it never observes siblings' in-progress appends.
    pub fn head(&self, n: usize) -> Vec<Turn> {
        let transcript = self.transcript.read();
        transcript.iter().take(n).cloned().collect()
    }

    pub fn transcript_len(&self) -> usize {
        self.transcript.read().len()
    }

    // ── counters ────────────────────────────────────────────────────

    pub fn record_usage(&self, usage: TokenUsage) {
        self.input_tokens.fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens, Ordering::Relaxed);
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        }
    }

    /// Monotonically advance the prompt counter.  A lower value never wins.
    pub fn advance_prompt_number(&self, n: u64) {
        self.last_prompt_number.fetch_max(n, Ordering::Relaxed);
    }

    pub fn last_prompt_number(&self) -> u64 {
        self.last_prompt_number.load(Ordering::Relaxed)
    }

    // ── pending watermark ───────────────────────────────────────────

    pub fn set_pending_watermark(&self, ts: DateTime<Utc>) {
        let mut slot = self.earliest_pending.write();
        match *slot {
            Some(existing) if existing <= ts => {}
            _ => *slot = Some(ts),
        }
    }

    pub fn clear_pending_watermark(&self) {
        *self.earliest_pending.write() = None;
    }

    pub fn earliest_pending(&self) -> Option<DateTime<Utc>> {
        *self.earliest_pending.read()
    }
}

//! The bounded-concurrency session processing pipeline.
//!
//! A [`orchestrator::SessionWorker`] drains a live stream of pending items
//! for one session and turns each into a remote inference call.  The
//! [`limiter::AdmissionLimiter`] caps how many calls run at once, the
//! [`inflight::InFlightSet`] keeps bookkeeping for spawned calls bounded, and
//! per-item failures are absorbed without disturbing siblings.  Only
//! unavailable/unauthorized-class failures escalate the whole session to a
//! configured fallback strategy.

pub mod dispatch;
pub mod hooks;
pub mod inflight;
pub mod limiter;
pub mod orchestrator;

pub use hooks::{
    default_escalation, EscalationPredicate, FallbackStrategy, ObservationSink, PromptBuilders,
    PromptContext, SessionDirectory,
};
pub use limiter::AdmissionLimiter;
pub use orchestrator::{SessionOutcome, SessionWorker, WorkerOptions};

//! Collaborator contracts.
//!
//! Everything the pipeline deliberately does not own (prompt wording,
//! observation persistence, durable session identity, the fallback execution
//! strategy) sits behind the narrow traits in this module.  The worker calls
//! them and lets their failures propagate; it never interprets their results
//! beyond that.

use std::sync::Arc;

use scribe_domain::error::{Error, Result};
use scribe_domain::item::ObservationItem;
use scribe_domain::turn::TokenUsage;
use scribe_sessions::{Session, SessionStore};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt builders
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parameters every prompt is rendered against.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub project: String,
    /// Identifier of the content session being resumed.
    pub content_session_id: String,
    /// Active mode configuration name.
    pub mode: String,
}

/// Pure prompt renderers, one per call shape.  No I/O.
pub trait PromptBuilders: Send + Sync {
    /// Opening prompt for a session with an empty transcript.
    fn session_opening(&self, ctx: &PromptContext) -> String;

    /// Opening prompt when the transcript already has turns.
    fn continuation(&self, ctx: &PromptContext) -> String;

    fn observation(&self, ctx: &PromptContext, item: &ObservationItem) -> String;

    fn summary(&self, ctx: &PromptContext, last_assistant_message: &str) -> String;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response processor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// External sink performing persistence and downstream indexing of a reply.
///
/// Fire and await completion; a thrown failure propagates to the caller's
/// per-item (or initial-turn) error handling.
#[async_trait::async_trait]
pub trait ObservationSink: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn process(
        &self,
        reply: &str,
        session: &Session,
        usage: TokenUsage,
        original_timestamp: Option<i64>,
        provider_label: &str,
        cwd: Option<&str>,
    ) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Durable session identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read-through storage for the memory session id.
#[async_trait::async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn load_memory_session_id(&self, session_id: &str) -> Result<Option<String>>;

    /// Persist a freshly minted id.  Returns the effective id: an id a
    /// concurrent or earlier writer got there with first wins.
    async fn persist_memory_session_id(
        &self,
        session_id: &str,
        memory_session_id: &str,
    ) -> Result<String>;
}

/// The file-backed store is the default directory.
#[async_trait::async_trait]
impl SessionDirectory for SessionStore {
    async fn load_memory_session_id(&self, session_id: &str) -> Result<Option<String>> {
        Ok(self.memory_session_id(session_id))
    }

    async fn persist_memory_session_id(
        &self,
        session_id: &str,
        memory_session_id: &str,
    ) -> Result<String> {
        self.set_memory_session_id(session_id, memory_session_id)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Escalation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Alternate execution strategy a session is handed to on escalation.
#[async_trait::async_trait]
pub trait FallbackStrategy: Send + Sync {
    async fn start_session(&self, session: Arc<Session>, worker: &str) -> Result<()>;
}

/// Decides which failures abandon the current strategy for the fallback.
pub type EscalationPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Default predicate: the unavailable/unauthorized class (auth, transport
/// status, connection, timeout).  Provider payload errors and local failures
/// stay per-item.
pub fn default_escalation() -> EscalationPredicate {
    Arc::new(|err| err.is_availability_class())
}

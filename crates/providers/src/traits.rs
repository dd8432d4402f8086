use scribe_domain::error::Result;
use scribe_domain::turn::{TokenUsage, Turn};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One outbound completion request built from an already-truncated transcript.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Conversation turns, oldest first.
    pub turns: Vec<Turn>,
    /// Model identifier override.  When `None`, the client uses its default.
    pub model: Option<String>,
    /// Maximum tokens in the response.  When `None`, the client uses its default.
    pub max_tokens: Option<u32>,
}

/// A completed remote call.
///
/// `text` may be empty: a well-formed response with no extractable text
/// segment is a soft-empty result, not an error.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One outbound call to a remote inference endpoint.
///
/// The worker depends on this trait, never on a concrete wire client, so the
/// pipeline is testable without a network and other providers slot in behind
/// the same seam.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Execute the call and wait for the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Short label identifying the provider (recorded alongside persisted
    /// observations).
    fn label(&self) -> &str;
}

pub mod anthropic;
pub mod traits;
pub(crate) mod util;

// Re-exports for convenience.
pub use anthropic::AnthropicClient;
pub use traits::{Completion, CompletionClient, CompletionRequest};
pub use util::resolve_api_key;

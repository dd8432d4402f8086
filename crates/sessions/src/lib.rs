//! Session state: the shared transcript, token counters, the context-window
//! truncation policy, and a file-backed store for what must survive restarts.

pub mod context_window;
pub mod session;
pub mod store;

pub use context_window::truncate;
pub use session::Session;
pub use store::{SessionRecord, SessionStore};

//! Shared types for the scribe pipeline.
//!
//! Everything that more than one crate needs lives here: the error taxonomy,
//! structured trace events, transcript turns, pending work items, the config
//! surface, and the boxed stream alias used by the pending-item source.

pub mod config;
pub mod error;
pub mod item;
pub mod stream;
pub mod trace;
pub mod turn;

//! Pending work items.
//!
//! Items arrive from an external live source (a queue table, a socket; the
//! worker does not care) in source order and are processed independently once
//! dispatched.  Kinds the worker does not understand deserialize into
//! [`PendingItem::Unknown`] and are skipped rather than failing the stream.

use serde::{Deserialize, Serialize};

/// A unit of deferred work awaiting conversion into a model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingItem {
    /// An observed tool invocation to be summarized into memory.
    Observation(ObservationItem),
    /// A request to summarize the session so far.
    Summarize {
        #[serde(default)]
        last_assistant_message: String,
    },
    /// Any kind this worker does not handle.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationItem {
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
    #[serde(default)]
    pub tool_output: serde_json::Value,
    /// Epoch milliseconds at which the tool call was observed.
    pub created_at_epoch: i64,
    #[serde(default)]
    pub cwd: Option<String>,
    /// Prompt sequence number, when the upstream recorder assigned one.
    #[serde(default)]
    pub prompt_number: Option<u64>,
}

impl PendingItem {
    /// Short label for logs and trace events.
    pub fn kind(&self) -> &'static str {
        match self {
            PendingItem::Observation(_) => "observation",
            PendingItem::Summarize { .. } => "summarize",
            PendingItem::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_deserializes() {
        let json = r#"{
            "kind": "observation",
            "tool_name": "Read",
            "tool_input": {"file_path": "/tmp/x"},
            "tool_output": "contents",
            "created_at_epoch": 1722945600000,
            "cwd": "/home/user/project",
            "prompt_number": 7
        }"#;
        let item: PendingItem = serde_json::from_str(json).unwrap();
        match item {
            PendingItem::Observation(obs) => {
                assert_eq!(obs.tool_name, "Read");
                assert_eq!(obs.prompt_number, Some(7));
                assert_eq!(obs.cwd.as_deref(), Some("/home/user/project"));
            }
            other => panic!("expected observation, got {other:?}"),
        }
    }

    #[test]
    fn summarize_deserializes() {
        let json = r#"{"kind": "summarize", "last_assistant_message": "done"}"#;
        let item: PendingItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind(), "summarize");
    }

    #[test]
    fn foreign_kind_maps_to_unknown() {
        let json = r#"{"kind": "compact_transcript"}"#;
        let item: PendingItem = serde_json::from_str(json).unwrap();
        assert!(matches!(item, PendingItem::Unknown));
    }
}

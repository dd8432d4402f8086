//! File-backed session store.
//!
//! Persists what must survive a worker restart in `sessions.json` under the
//! configured state path: the memory session id (assigned once, reused on
//! every later run), cumulative token counters, and the last prompt number.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use scribe_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Durable per-session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// Memory session id (foreign key for the storage layer).
    #[serde(default)]
    pub memory_session_id: Option<String>,
    #[serde(default)]
    pub last_prompt_number: u64,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.to_owned(),
            memory_session_id: None,
            last_prompt_number: 0,
            input_tokens: 0,
            output_tokens: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// JSON-file session store.
pub struct SessionStore {
    store_path: PathBuf,
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    /// Load or create the store at `state_path/sessions.json`.
    pub fn new(state_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_path).map_err(Error::Io)?;

        let store_path = state_path.join("sessions.json");
        let records = if store_path.exists() {
            let raw = std::fs::read_to_string(&store_path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        tracing::info!(
            sessions = records.len(),
            path = %store_path.display(),
            "session store loaded"
        );

        Ok(Self {
            store_path,
            records: RwLock::new(records),
        })
    }

    /// Look up a session record.
    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.records.read().get(session_id).cloned()
    }

    /// The persisted memory session id, if a prior run assigned one.
    pub fn memory_session_id(&self, session_id: &str) -> Option<String> {
        self.records
            .read()
            .get(session_id)
            .and_then(|r| r.memory_session_id.clone())
    }

    /// Persist a freshly minted memory session id.  A value already on disk
    /// wins; the id is assigned exactly once per session.  Returns the
    /// effective id.
    pub fn set_memory_session_id(
        &self,
        session_id: &str,
        memory_session_id: &str,
    ) -> Result<String> {
        let effective = {
            let mut records = self.records.write();
            let record = records
                .entry(session_id.to_owned())
                .or_insert_with(|| SessionRecord::new(session_id));
            match &record.memory_session_id {
                Some(existing) => existing.clone(),
                None => {
                    record.memory_session_id = Some(memory_session_id.to_owned());
                    record.updated_at = Utc::now();
                    memory_session_id.to_owned()
                }
            }
        };
        self.flush()?;
        Ok(effective)
    }

    /// Accumulate token counters for a session.
    pub fn record_usage(&self, session_id: &str, input_tokens: u64, output_tokens: u64) {
        let mut records = self.records.write();
        let record = records
            .entry(session_id.to_owned())
            .or_insert_with(|| SessionRecord::new(session_id));
        record.input_tokens += input_tokens;
        record.output_tokens += output_tokens;
        record.updated_at = Utc::now();
    }

    /// Advance the persisted prompt number (monotonic).
    pub fn record_prompt_number(&self, session_id: &str, prompt_number: u64) {
        let mut records = self.records.write();
        let record = records
            .entry(session_id.to_owned())
            .or_insert_with(|| SessionRecord::new(session_id));
        if prompt_number > record.last_prompt_number {
            record.last_prompt_number = prompt_number;
            record.updated_at = Utc::now();
        }
    }

    /// Persist the current state to disk.
    pub fn flush(&self) -> Result<()> {
        let records = self.records.read();
        let json = serde_json::to_string_pretty(&*records)
            .map_err(|e| Error::Other(format!("serializing sessions: {e}")))?;
        std::fs::write(&self.store_path, json).map_err(Error::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_session_id_round_trips_across_reload() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = SessionStore::new(dir.path()).unwrap();
            assert!(store.memory_session_id("s1").is_none());
            let effective = store.set_memory_session_id("s1", "mem-1").unwrap();
            assert_eq!(effective, "mem-1");
        }

        // A fresh store over the same path sees the persisted id.
        let store = SessionStore::new(dir.path()).unwrap();
        assert_eq!(store.memory_session_id("s1").as_deref(), Some("mem-1"));
    }

    #[test]
    fn persisted_id_wins_over_later_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        store.set_memory_session_id("s1", "mem-1").unwrap();
        let effective = store.set_memory_session_id("s1", "mem-2").unwrap();
        assert_eq!(effective, "mem-1");
        assert_eq!(store.memory_session_id("s1").as_deref(), Some("mem-1"));
    }

    #[test]
    fn usage_and_prompt_number_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        store.record_usage("s1", 100, 7);
        store.record_usage("s1", 20, 3);
        store.record_prompt_number("s1", 4);
        store.record_prompt_number("s1", 2);

        let record = store.get("s1").unwrap();
        assert_eq!(record.input_tokens, 120);
        assert_eq!(record.output_tokens, 10);
        assert_eq!(record.last_prompt_number, 4);
    }

    #[test]
    fn unknown_session_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        assert!(store.get("nope").is_none());
    }
}

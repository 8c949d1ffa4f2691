//! Persistence gateway for session state.
//!
//! Session state is stored under a single fixed key as a versioned envelope:
//!
//! ```json
//! { "schemaVersion": 2, "savedAtMs": 1700000000000, "state": { ... } }
//! ```
//!
//! Reads never fail: a missing, unreadable, malformed, or foreign-version
//! record is reported as absent so callers start fresh. Writes and imports
//! surface their errors and leave the previous durable record in place.

use crate::config::StorageConfig;
use crate::program::validate_weeks;
use crate::store::KeyValueStore;
use crate::{Error, PersistenceEnvelope, Result, SessionState};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Outcome of a successful save
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveReceipt {
    pub saved_at: DateTime<Utc>,
}

impl SaveReceipt {
    pub fn saved_at_ms(&self) -> i64 {
        self.saved_at.timestamp_millis()
    }
}

/// Reads and writes the session-state envelope in a [`KeyValueStore`]
#[derive(Debug)]
pub struct Gateway<S: KeyValueStore> {
    store: S,
    key: String,
    schema_version: u32,
}

impl<S: KeyValueStore> Gateway<S> {
    pub fn new(store: S, config: &StorageConfig) -> Self {
        Self {
            store,
            key: config.key.clone(),
            schema_version: config.schema_version,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn envelope_bytes(&self, state: &SessionState, saved_at: DateTime<Utc>) -> Result<Vec<u8>> {
        let envelope = PersistenceEnvelope {
            schema_version: self.schema_version,
            saved_at_ms: saved_at.timestamp_millis(),
            state: state.clone(),
        };
        serde_json::to_vec(&envelope)
            .map_err(|e| Error::Storage(format!("failed to serialize state: {}", e)))
    }

    /// Write `state` under the fixed key, stamped with the current time
    pub fn save(&mut self, state: &SessionState) -> Result<SaveReceipt> {
        let saved_at = Utc::now();
        let bytes = self.envelope_bytes(state, saved_at)?;

        self.store.set(&self.key, &bytes).map_err(|e| match e {
            Error::Storage(msg) => Error::Storage(msg),
            other => Error::Storage(other.to_string()),
        })?;

        tracing::info!(key = %self.key, bytes = bytes.len(), "Saved session state");
        Ok(SaveReceipt { saved_at })
    }

    /// Read the durable envelope, if present and trustworthy
    fn load_envelope(&self) -> Option<PersistenceEnvelope> {
        let bytes = match self.store.get(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::info!("No saved state under '{}', starting fresh", self.key);
                return None;
            }
            Err(e) => {
                tracing::warn!("Unable to read saved state '{}': {}. Starting fresh.", self.key, e);
                return None;
            }
        };

        let envelope = match serde_json::from_slice::<PersistenceEnvelope>(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Failed to parse saved state '{}': {}. Starting fresh.", self.key, e);
                return None;
            }
        };

        if envelope.schema_version != self.schema_version {
            tracing::warn!(
                "Saved state '{}' has schema version {}, expected {}. Starting fresh.",
                self.key,
                envelope.schema_version,
                self.schema_version
            );
            return None;
        }

        Some(envelope)
    }

    /// Durable session state, or `None` meaning "start fresh"
    pub fn load(&self) -> Option<SessionState> {
        let envelope = self.load_envelope()?;
        tracing::debug!(
            "Loaded state saved at {} ({} journal entries)",
            envelope.saved_at_ms,
            envelope.state.journal.len()
        );
        let mut state = envelope.state;
        if state.clamp_selection() {
            tracing::warn!(
                "Saved state selected an out-of-range week; now week {}",
                state.selected_week
            );
        }
        Some(state)
    }

    /// When the durable record was written, if there is a trustworthy one
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        let envelope = self.load_envelope()?;
        Utc.timestamp_millis_opt(envelope.saved_at_ms).single()
    }

    /// Bytes for an export file: the durable record verbatim, or a fresh
    /// envelope of `current` when nothing has been saved yet
    pub fn export_snapshot(&self, current: &SessionState) -> Result<Vec<u8>> {
        match self.store.get(&self.key) {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => self.envelope_bytes(current, Utc::now()),
            Err(e) => {
                tracing::warn!("Unable to read saved state for export: {}", e);
                self.envelope_bytes(current, Utc::now())
            }
        }
    }

    /// Fresh envelope of `state`, stamped now, without touching the store
    pub fn snapshot_of(&self, state: &SessionState) -> Result<Vec<u8>> {
        self.envelope_bytes(state, Utc::now())
    }

    /// Replace the durable record with caller-supplied bytes
    ///
    /// Accepts a full envelope or a bare state object. On failure the
    /// durable record is untouched.
    pub fn import_snapshot(&mut self, bytes: &[u8]) -> Result<SessionState> {
        let root: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::Import(format!("not valid JSON: {}", e)))?;

        let state_value = match root {
            Value::Object(mut map) => match map.remove("state") {
                Some(state @ Value::Object(_)) => state,
                Some(_) | None => Value::Object(map),
            },
            _ => return Err(Error::Import("expected a JSON object".into())),
        };

        let mut state: SessionState = serde_json::from_value(state_value)
            .map_err(|e| Error::Import(format!("not a session state: {}", e)))?;
        if state.clamp_selection() {
            tracing::warn!(
                "Imported state selected an out-of-range week; now week {}",
                state.selected_week
            );
        }

        let problems = validate_weeks(&state.weeks);
        if !problems.is_empty() {
            tracing::warn!(
                "Imported program snapshot has {} integrity problem(s): {}",
                problems.len(),
                problems.join("; ")
            );
        }

        self.save(&state)?;
        tracing::info!(
            "Imported session state (week {}, {} journal entries)",
            state.selected_week,
            state.journal.len()
        );
        Ok(state)
    }
}

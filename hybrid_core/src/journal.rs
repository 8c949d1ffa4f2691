//! Journal of completed sets.
//!
//! Entries are keyed by (week, day, exercise index, series index) and
//! serialized under the string form `w{week}_{day}_ex{exercise}_s{series}`.
//! Entries are created lazily on first toggle and never deleted.

use crate::{Day, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifies one set of one exercise of one session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JournalKey {
    pub week: u32,
    pub day: Day,
    pub exercise_index: usize,
    pub series_index: u32,
}

impl JournalKey {
    pub fn new(week: u32, day: Day, exercise_index: usize, series_index: u32) -> Self {
        Self {
            week,
            day,
            exercise_index,
            series_index,
        }
    }
}

impl fmt::Display for JournalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "w{}_{}_ex{}_s{}",
            self.week,
            self.day.as_str(),
            self.exercise_index,
            self.series_index
        )
    }
}

impl FromStr for JournalKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::State(format!("Invalid journal key '{}'", s));

        let mut parts = s.split('_');
        let week = parts
            .next()
            .and_then(|p| p.strip_prefix('w'))
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let day = parts
            .next()
            .and_then(|p| p.parse::<Day>().ok())
            .ok_or_else(invalid)?;
        let exercise_index = parts
            .next()
            .and_then(|p| p.strip_prefix("ex"))
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let series_index = parts
            .next()
            .and_then(|p| p.strip_prefix('s'))
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self::new(week, day, exercise_index, series_index))
    }
}

/// Completion record for one set
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub completed: bool,
    #[serde(alias = "ts", default)]
    pub timestamp_ms: i64,
}

/// All journal entries of a session state
///
/// Stored by the string form of the key so the JSON record stays a flat
/// object. Well-formed keys are normalized on read (French day names become
/// English); keys that do not parse are kept verbatim and ignored by the
/// typed accessors.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(
    from = "BTreeMap<String, JournalEntry>",
    into = "BTreeMap<String, JournalEntry>"
)]
pub struct Journal {
    entries: BTreeMap<String, JournalEntry>,
}

impl From<BTreeMap<String, JournalEntry>> for Journal {
    fn from(raw: BTreeMap<String, JournalEntry>) -> Self {
        let mut entries: BTreeMap<String, JournalEntry> = BTreeMap::new();
        for (raw_key, entry) in raw {
            let key = match raw_key.parse::<JournalKey>() {
                Ok(key) => key.to_string(),
                Err(_) => raw_key.clone(),
            };
            let canonical = key == raw_key;
            match entries.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    // Newer entry wins; on a tie the canonically keyed one
                    let existing = slot.get().timestamp_ms;
                    let replace = entry.timestamp_ms > existing
                        || (canonical && entry.timestamp_ms == existing);
                    tracing::warn!(
                        key = %slot.key(),
                        "Journal record '{}' collides with an existing entry; keeping the {} one",
                        raw_key,
                        if replace { "incoming" } else { "existing" }
                    );
                    if replace {
                        slot.insert(entry);
                    }
                }
            }
        }
        Self { entries }
    }
}

impl From<Journal> for BTreeMap<String, JournalEntry> {
    fn from(journal: Journal) -> Self {
        journal.entries
    }
}

impl Journal {
    pub fn get(&self, key: &JournalKey) -> Option<&JournalEntry> {
        self.entries.get(&key.to_string())
    }

    pub fn is_completed(&self, key: &JournalKey) -> bool {
        self.get(key).map(|e| e.completed).unwrap_or(false)
    }

    /// Flip the completion flag, creating the entry as not-completed first
    ///
    /// The first toggle of a key therefore always yields `completed = true`.
    pub fn toggle(&mut self, key: &JournalKey, now_ms: i64) -> JournalEntry {
        let entry = self.entries.entry(key.to_string()).or_default();
        entry.completed = !entry.completed;
        entry.timestamp_ms = now_ms;
        *entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw string keys, as persisted
    pub fn raw_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Typed view of every well-formed entry
    pub fn entries(&self) -> impl Iterator<Item = (JournalKey, &JournalEntry)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| k.parse::<JournalKey>().ok().map(|key| (key, v)))
    }

    /// Completed entries belonging to one week
    pub fn completed_in_week(&self, week: u32) -> impl Iterator<Item = JournalKey> + '_ {
        self.entries()
            .filter(move |(key, entry)| key.week == week && entry.completed)
            .map(|(key, _)| key)
    }
}

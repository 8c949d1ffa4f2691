//! Core domain types for the hybrid strength program.
//!
//! This module defines the fundamental types used throughout the system:
//! - Training days and the program hierarchy (week → session → exercise → set)
//! - The user's session state (selection, journal, profile, derived stats)
//! - The persistence envelope
//!
//! Field names follow the dashboard's JSON record format (camelCase). The
//! aliases accept records written by earlier dashboard builds.

use crate::journal::Journal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Days
// ============================================================================

/// Training day of a program week
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    #[serde(alias = "dimanche", alias = "Dimanche", alias = "Sunday")]
    Sunday,
    #[serde(alias = "mardi", alias = "Mardi", alias = "Tuesday")]
    Tuesday,
    #[serde(alias = "vendredi", alias = "Vendredi", alias = "Friday")]
    Friday,
}

impl Day {
    /// All training days in program order
    pub const ALL: [Day; 3] = [Day::Sunday, Day::Tuesday, Day::Friday];

    /// Lowercase identifier used in journal keys and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Sunday => "sunday",
            Day::Tuesday => "tuesday",
            Day::Friday => "friday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Day::Sunday => "Sunday",
            Day::Tuesday => "Tuesday",
            Day::Friday => "Friday",
        };
        f.write_str(label)
    }
}

impl FromStr for Day {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sunday" | "sun" | "dimanche" => Ok(Day::Sunday),
            "tuesday" | "tue" | "mardi" => Ok(Day::Tuesday),
            "friday" | "fri" | "vendredi" => Ok(Day::Friday),
            other => Err(crate::Error::State(format!(
                "Unknown training day '{}' (expected sunday, tuesday or friday)",
                other
            ))),
        }
    }
}

// ============================================================================
// Program Types
// ============================================================================

/// One prescribed set of an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetPrescription {
    /// 1-based position within the exercise
    #[serde(alias = "series")]
    pub series_index: u32,
    #[serde(alias = "reps")]
    pub target_reps: u32,
    /// Default duration of the exercise's rest countdown
    #[serde(alias = "repos")]
    pub rest_seconds: u32,
    /// Eccentric-pause-concentric code, e.g. `2-0-1`
    pub tempo: String,
    #[serde(alias = "rpe")]
    pub target_rpe: f64,
    #[serde(alias = "weightKg")]
    pub target_weight_kg: u32,
}

/// An exercise of a session, with its ordered sets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: String,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    #[serde(default)]
    pub notes: String,
    pub sets: Vec<SetPrescription>,
}

fn default_mandatory() -> bool {
    true
}

/// A training session (one day of a week)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub day: Day,
    #[serde(alias = "desc")]
    pub description: String,
    #[serde(alias = "durationMin")]
    pub duration_minutes: u32,
    /// Prescribed execution order
    pub exercises: Vec<Exercise>,
}

/// One week of the 26-week program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramWeek {
    #[serde(alias = "week")]
    pub week_number: u32,
    #[serde(alias = "deload")]
    pub is_deload: bool,
    pub sessions: BTreeMap<Day, Session>,
}

impl ProgramWeek {
    pub fn session(&self, day: Day) -> Option<&Session> {
        self.sessions.get(&day)
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Optional user profile
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
}

/// Derived statistics; recomputable at any time, never authoritative
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsCache {
    /// Σ first-set weight × reps over the selected week's sessions
    pub volume_kg: u64,
    /// Completed sets recorded for the selected week
    pub completed_sets: usize,
    pub average_target_rpe: Option<f64>,
}

/// Root aggregate of the user's mutable application state
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// 0 means no week selected; otherwise 1..=26
    #[serde(default)]
    pub selected_week: u32,
    /// Meaningful only while `selected_week != 0`
    #[serde(default)]
    pub current_day: Option<Day>,
    /// Program snapshot the journal refers to
    #[serde(default = "crate::program::standard_weeks")]
    pub weeks: Vec<ProgramWeek>,
    #[serde(default)]
    pub journal: Journal,
    #[serde(default)]
    pub user: UserProfile,
    #[serde(default)]
    pub stats_cache: StatsCache,
}

impl SessionState {
    /// Fresh state over the given program weeks, with no week selected
    pub fn new(weeks: Vec<ProgramWeek>) -> Self {
        Self {
            selected_week: 0,
            current_day: None,
            weeks,
            journal: Journal::default(),
            user: UserProfile::default(),
            stats_cache: StatsCache::default(),
        }
    }

    /// Pull `selected_week` back into 0..=26, clearing the day at 0.
    /// Returns true when anything changed.
    pub fn clamp_selection(&mut self) -> bool {
        let week = self.selected_week.min(crate::program::PROGRAM_WEEKS);
        let changed = week != self.selected_week || (week == 0 && self.current_day.is_some());
        self.selected_week = week;
        if week == 0 {
            self.current_day = None;
        }
        changed
    }

    /// The selected program week, if any
    pub fn selected(&self) -> Option<&ProgramWeek> {
        if self.selected_week == 0 {
            return None;
        }
        self.week(self.selected_week)
    }

    /// Look up a week by its 1-based number
    pub fn week(&self, week_number: u32) -> Option<&ProgramWeek> {
        self.weeks.iter().find(|w| w.week_number == week_number)
    }

    /// The session currently on screen (selected week + current day)
    pub fn current_session(&self) -> Option<&Session> {
        let week = self.selected()?;
        week.session(self.current_day.unwrap_or(Day::Sunday))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(crate::program::standard_weeks())
    }
}

// ============================================================================
// Persistence Envelope
// ============================================================================

/// Versioned record written to the durable store and to export files
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceEnvelope {
    #[serde(alias = "version")]
    pub schema_version: u32,
    #[serde(alias = "ts")]
    pub saved_at_ms: i64,
    pub state: SessionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_parsing() {
        assert_eq!("sunday".parse::<Day>().unwrap(), Day::Sunday);
        assert_eq!("Mardi".parse::<Day>().unwrap(), Day::Tuesday);
        assert_eq!(" FRI ".parse::<Day>().unwrap(), Day::Friday);
        assert!("monday".parse::<Day>().is_err());
    }

    #[test]
    fn test_day_serialization() {
        assert_eq!(serde_json::to_string(&Day::Tuesday).unwrap(), "\"tuesday\"");
        let day: Day = serde_json::from_str("\"vendredi\"").unwrap();
        assert_eq!(day, Day::Friday);
        let day: Day = serde_json::from_str("\"Dimanche\"").unwrap();
        assert_eq!(day, Day::Sunday);
    }

    #[test]
    fn test_days_are_ordered() {
        let mut days = vec![Day::Friday, Day::Sunday, Day::Tuesday];
        days.sort();
        assert_eq!(days, Day::ALL.to_vec());
    }

    #[test]
    fn test_legacy_set_fields() {
        let json = r#"{"series":2,"reps":5,"repos":120,"tempo":"2-0-1","rpe":7.5,"weightKg":24}"#;
        let set: SetPrescription = serde_json::from_str(json).unwrap();
        assert_eq!(set.series_index, 2);
        assert_eq!(set.rest_seconds, 120);
        assert_eq!(set.target_weight_kg, 24);
    }

    #[test]
    fn test_bare_state_defaults() {
        let state: SessionState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.selected_week, 0);
        assert!(state.current_day.is_none());
        assert_eq!(state.weeks.len(), 26);
        assert!(state.journal.is_empty());
    }

    #[test]
    fn test_current_session_requires_week() {
        let mut state = SessionState::default();
        assert!(state.current_session().is_none());

        state.selected_week = 3;
        state.current_day = Some(Day::Friday);
        let session = state.current_session().unwrap();
        assert_eq!(session.day, Day::Friday);
    }

    #[test]
    fn test_clamp_selection() {
        let mut state = SessionState::default();
        state.selected_week = 40;
        state.current_day = Some(Day::Tuesday);
        assert!(state.clamp_selection());
        assert_eq!(state.selected_week, 26);
        assert_eq!(state.current_day, Some(Day::Tuesday));
        assert!(!state.clamp_selection());

        state.selected_week = 0;
        assert!(state.clamp_selection());
        assert!(state.current_day.is_none());
    }
}

//! The tracker: single owner of session state, persistence and timers.
//!
//! One [`Tracker`] is built at startup and every UI command goes through
//! it. Week/day navigation, set toggling and session completion mutate the
//! state here; derived stats are recomputed and the chart marked stale
//! after each mutation that affects them.

use crate::persistence::{Gateway, SaveReceipt};
use crate::program::{Program, PROGRAM_WEEKS};
use crate::stats::{compute_stats, VolumeChart};
use crate::store::KeyValueStore;
use crate::timer::{default_rest, TimerEvent, TimerRegistry};
use crate::{Day, Error, JournalEntry, JournalKey, Result, SessionState, StatsCache};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Outcome of a week navigation command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeekChange {
    Moved(u32),
    NoWeekSelected,
    /// Already on the last week
    ProgramComplete,
    /// Already on the first week
    AtFirstWeek,
}

impl fmt::Display for WeekChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekChange::Moved(week) => write!(f, "Now on week {}", week),
            WeekChange::NoWeekSelected => f.write_str("No week selected: select a week first"),
            WeekChange::ProgramComplete => write!(
                f,
                "Program complete: week {} is the last week of the program",
                PROGRAM_WEEKS
            ),
            WeekChange::AtFirstWeek => f.write_str("Already at week 1"),
        }
    }
}

/// Top-level controller owning the session state
pub struct Tracker<S: KeyValueStore> {
    state: SessionState,
    gateway: Gateway<S>,
    timers: TimerRegistry,
    chart: Option<VolumeChart>,
}

impl<S: KeyValueStore> Tracker<S> {
    /// Restore durable state, or start fresh over `program`
    pub fn open(gateway: Gateway<S>, timers: TimerRegistry, program: &Program) -> Self {
        let state = match gateway.load() {
            Some(state) => {
                tracing::info!("Restored session state at week {}", state.selected_week);
                state
            }
            None => SessionState::new(program.weeks().to_vec()),
        };
        Self::with_state(state, gateway, timers)
    }

    /// Wrap an explicit state (nothing is read from the store)
    pub fn with_state(mut state: SessionState, gateway: Gateway<S>, timers: TimerRegistry) -> Self {
        if state.clamp_selection() {
            tracing::warn!("Selected week out of range; now week {}", state.selected_week);
        }
        let mut tracker = Self {
            state,
            gateway,
            timers,
            chart: None,
        };
        tracker.refresh_derived();
        tracker
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn gateway(&self) -> &Gateway<S> {
        &self.gateway
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn stats(&self) -> &StatsCache {
        &self.state.stats_cache
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.gateway.last_saved_at()
    }

    /// Recompute stats and mark the chart stale
    fn refresh_derived(&mut self) {
        self.state.stats_cache = compute_stats(&self.state);
        self.chart = None;
    }

    /// The session on screen changed: its exercise timers no longer apply
    fn session_changed(&mut self) {
        self.timers.clear_exercises();
        self.refresh_derived();
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Select a week, clamped to 0..=26; 0 clears the selection
    pub fn select_week(&mut self, week: u32) -> u32 {
        let week = week.min(PROGRAM_WEEKS);
        self.state.selected_week = week;
        if week == 0 {
            self.state.current_day = None;
        } else if self.state.current_day.is_none() {
            self.state.current_day = Some(Day::Sunday);
        }
        tracing::debug!(week, "Selected week");
        self.session_changed();
        week
    }

    /// Switch the displayed day of the selected week
    pub fn change_day(&mut self, day: Day) -> Result<()> {
        if self.state.selected_week == 0 {
            return Err(Error::State("select a week before choosing a day".into()));
        }
        self.state.current_day = Some(day);
        self.session_changed();
        Ok(())
    }

    pub fn advance_week(&mut self) -> WeekChange {
        let change = match self.state.selected_week {
            0 => WeekChange::NoWeekSelected,
            week if week >= PROGRAM_WEEKS => WeekChange::ProgramComplete,
            week => WeekChange::Moved(week + 1),
        };
        self.apply(change)
    }

    pub fn retreat_week(&mut self) -> WeekChange {
        let change = match self.state.selected_week {
            0 => WeekChange::NoWeekSelected,
            1 => WeekChange::AtFirstWeek,
            week => WeekChange::Moved(week - 1),
        };
        self.apply(change)
    }

    fn apply(&mut self, change: WeekChange) -> WeekChange {
        match change {
            WeekChange::Moved(week) => {
                self.state.selected_week = week;
                if self.state.current_day.is_none() {
                    self.state.current_day = Some(Day::Sunday);
                }
                self.session_changed();
            }
            boundary => tracing::info!("Week navigation refused: {}", boundary),
        }
        change
    }

    /// Close out the current session: advance the week and always persist
    pub fn finish_session(&mut self) -> Result<(WeekChange, SaveReceipt)> {
        let change = self.advance_week();
        self.refresh_derived();
        let receipt = self.save()?;
        Ok((change, receipt))
    }

    // ------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------

    /// Journal key for a set of the session on screen
    pub fn key_for(&self, exercise_index: usize, series_index: u32) -> Result<JournalKey> {
        if self.state.selected_week == 0 {
            return Err(Error::State("no week selected".into()));
        }
        let day = self.state.current_day.unwrap_or(Day::Sunday);
        let session = self
            .state
            .current_session()
            .ok_or_else(|| Error::State(format!("week {} has no {} session", self.state.selected_week, day)))?;
        let exercise = session.exercises.get(exercise_index).ok_or_else(|| {
            Error::State(format!(
                "exercise {} is not part of this session ({} exercises)",
                exercise_index,
                session.exercises.len()
            ))
        })?;
        if !exercise.sets.iter().any(|s| s.series_index == series_index) {
            return Err(Error::State(format!(
                "'{}' has no series {}",
                exercise.name, series_index
            )));
        }
        Ok(JournalKey::new(
            self.state.selected_week,
            day,
            exercise_index,
            series_index,
        ))
    }

    /// Flip a set's completion and persist
    ///
    /// If the flush fails the toggle is kept in memory and the storage
    /// error is returned.
    pub fn toggle_set(&mut self, exercise_index: usize, series_index: u32) -> Result<JournalEntry> {
        let key = self.key_for(exercise_index, series_index)?;
        let entry = self
            .state
            .journal
            .toggle(&key, Utc::now().timestamp_millis());
        tracing::info!(key = %key, completed = entry.completed, "Toggled set");
        self.refresh_derived();
        self.save()?;
        Ok(entry)
    }

    pub fn is_set_completed(&self, exercise_index: usize, series_index: u32) -> bool {
        self.key_for(exercise_index, series_index)
            .map(|key| self.state.journal.is_completed(&key))
            .unwrap_or(false)
    }

    /// Completed sets of the session on screen
    pub fn completed_sets_in_session(&self) -> usize {
        let Some(session) = self.state.current_session() else {
            return 0;
        };
        session
            .exercises
            .iter()
            .enumerate()
            .flat_map(|(index, exercise)| {
                exercise.sets.iter().map(move |set| (index, set.series_index))
            })
            .filter(|&(index, series)| self.is_set_completed(index, series))
            .count()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn save(&mut self) -> Result<SaveReceipt> {
        self.gateway.save(&self.state).map_err(|e| {
            tracing::warn!("Save failed, keeping in-memory state: {}", e);
            e
        })
    }

    /// Bytes for a JSON export file
    pub fn export_json(&self) -> Result<Vec<u8>> {
        self.gateway.export_snapshot(&self.state)
    }

    /// Bytes for a CSV export of the program
    pub fn export_csv(&self) -> Result<Vec<u8>> {
        crate::export::program_csv(&self.state.weeks)
    }

    /// Fresh envelope of the in-memory state, for drive backups
    pub fn backup_snapshot(&self) -> Result<Vec<u8>> {
        self.gateway.snapshot_of(&self.state)
    }

    /// Replace durable and in-memory state with an imported snapshot
    pub fn import(&mut self, bytes: &[u8]) -> Result<()> {
        let state = self.gateway.import_snapshot(bytes)?;
        self.state = state;
        self.session_changed();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    pub fn start_timer(&mut self, exercise_index: usize) {
        self.timers.exercise(&self.state, exercise_index).start();
    }

    pub fn pause_timer(&mut self, exercise_index: usize) {
        self.timers.exercise(&self.state, exercise_index).pause();
    }

    pub fn reset_timer(&mut self, exercise_index: usize) {
        self.timers.exercise(&self.state, exercise_index).reset();
    }

    /// Remaining rest for an exercise; its prescribed rest if never started
    pub fn timer_remaining(&self, exercise_index: usize) -> Duration {
        self.timers
            .get(exercise_index)
            .map(|t| t.remaining())
            .unwrap_or_else(|| default_rest(&self.state, exercise_index))
    }

    pub fn start_global_timer(&mut self) {
        self.timers.global_mut().countdown_mut().start();
    }

    /// No-op until the global timer has been started once
    pub fn pause_global_timer(&mut self) {
        if self.timers.global().is_some() {
            self.timers.global_mut().countdown_mut().pause();
        }
    }

    /// No-op until the global timer has been started once
    pub fn reset_global_timer(&mut self) {
        if self.timers.global().is_some() {
            self.timers.global_mut().countdown_mut().reset();
        }
    }

    pub fn poll_timers(&mut self) -> Vec<TimerEvent> {
        self.timers.poll_all()
    }

    // ------------------------------------------------------------------
    // Charts
    // ------------------------------------------------------------------

    /// Volume chart, rebuilt when stale
    pub fn volume_chart(&mut self) -> &VolumeChart {
        let state = &self.state;
        self.chart.get_or_insert_with(|| VolumeChart::build(state))
    }
}

//! Text dashboard for the session on screen.

use crate::program::PROGRAM_WEEKS;
use crate::store::KeyValueStore;
use crate::timer::format_remaining;
use crate::tracker::Tracker;
use crate::Day;
use chrono::Local;
use std::fmt;

/// Width of the volume chart bars, in cells
const CHART_WIDTH: usize = 30;

#[derive(Clone, Debug, PartialEq)]
pub struct SetRow {
    pub series_index: u32,
    pub target_reps: u32,
    pub target_weight_kg: u32,
    pub rest_seconds: u32,
    pub target_rpe: f64,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseRow {
    pub index: usize,
    pub name: String,
    pub notes: String,
    pub sets: Vec<SetRow>,
    pub timer: String,
}

/// Every region of the dashboard, rendered from tracker state
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardView {
    pub week_label: String,
    pub session_title: Option<String>,
    pub save_status: String,
    pub exercises: Vec<ExerciseRow>,
    /// Shown in the exercise list region when no session is on screen
    pub placeholder: Option<String>,
    pub stats_line: String,
    pub global_timer: String,
    pub chart: String,
}

impl DashboardView {
    pub fn build<S: KeyValueStore>(tracker: &mut Tracker<S>) -> Self {
        let chart = tracker.volume_chart().render(CHART_WIDTH);
        let state = tracker.state();
        let week = state.selected();

        let week_label = match week {
            None => "No week selected".to_string(),
            Some(w) if w.is_deload => format!("Week {}/{} (deload)", w.week_number, PROGRAM_WEEKS),
            Some(w) => format!("Week {}/{}", w.week_number, PROGRAM_WEEKS),
        };

        let day = state.current_day.unwrap_or(Day::Sunday);
        let session = week.and_then(|w| w.session(day));
        let session_title = session.map(|s| {
            format!(
                "W{} {}: {} (≈ {} min)",
                state.selected_week, day, s.description, s.duration_minutes
            )
        });

        let exercises: Vec<ExerciseRow> = session
            .map(|s| {
                s.exercises
                    .iter()
                    .enumerate()
                    .map(|(index, exercise)| ExerciseRow {
                        index,
                        name: exercise.name.clone(),
                        notes: exercise.notes.clone(),
                        sets: exercise
                            .sets
                            .iter()
                            .map(|set| SetRow {
                                series_index: set.series_index,
                                target_reps: set.target_reps,
                                target_weight_kg: set.target_weight_kg,
                                rest_seconds: set.rest_seconds,
                                target_rpe: set.target_rpe,
                                completed: tracker.is_set_completed(index, set.series_index),
                            })
                            .collect(),
                        timer: format_remaining(tracker.timer_remaining(index)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let placeholder = match (week, session) {
            (None, _) => Some("Select a week to see its sessions.".to_string()),
            (Some(_), None) => Some(format!("No {} session this week.", day)),
            _ => None,
        };

        let save_status = match tracker.last_saved_at() {
            Some(at) => format!("Saved {}", at.with_timezone(&Local).format("%H:%M:%S")),
            None => "Not saved yet".to_string(),
        };

        let stats = tracker.stats();
        let stats_line = format!(
            "Volume {} kg·rep | {} set(s) done | avg RPE {}",
            stats.volume_kg,
            stats.completed_sets,
            stats
                .average_target_rpe
                .map(|rpe| format!("{:.1}", rpe))
                .unwrap_or_else(|| "-".into())
        );

        let global_timer = match tracker.timers().global() {
            Some(global) => format!(
                "Global {} ({:.0}°)",
                format_remaining(global.countdown().remaining()),
                global.sweep_degrees()
            ),
            None => "Global timer idle".to_string(),
        };

        Self {
            week_label,
            session_title,
            save_status,
            exercises,
            placeholder,
            stats_line,
            global_timer,
            chart,
        }
    }

    /// Names of required regions that rendered empty
    pub fn missing_regions(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.week_label.is_empty() {
            missing.push("week label");
        }
        if self.exercises.is_empty() && self.placeholder.is_none() {
            missing.push("exercise list");
        }
        if self.chart.lines().count() < 2 {
            missing.push("volume chart");
        }
        missing
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}  [{}]", self.week_label, self.save_status)?;
        if let Some(title) = &self.session_title {
            writeln!(f, "{}", title)?;
        }
        writeln!(f)?;

        if let Some(placeholder) = &self.placeholder {
            writeln!(f, "  {}", placeholder)?;
        }
        for exercise in &self.exercises {
            writeln!(f, "{:>2}. {}  rest {}", exercise.index, exercise.name, exercise.timer)?;
            for set in &exercise.sets {
                writeln!(
                    f,
                    "      [{}] s{} {}×{} kg  rest {}s  RPE {}",
                    if set.completed { "x" } else { " " },
                    set.series_index,
                    set.target_reps,
                    set.target_weight_kg,
                    set.rest_seconds,
                    set.target_rpe
                )?;
            }
            if !exercise.notes.is_empty() {
                writeln!(f, "      {}", exercise.notes)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", self.stats_line)?;
        writeln!(f, "{}", self.global_timer)?;
        writeln!(f)?;
        write!(f, "{}", self.chart)
    }
}

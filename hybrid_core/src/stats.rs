//! Derived statistics and the weekly volume chart.
//!
//! Everything here is recomputed from session state on demand; nothing is
//! authoritative.

use crate::{Day, ProgramWeek, SessionState, StatsCache};

/// Number of weeks shown by the volume chart
pub const CHART_WINDOW: usize = 4;

/// Prescribed volume of a week: Σ first-set weight × reps over its sessions
pub fn week_volume(week: &ProgramWeek) -> u64 {
    Day::ALL
        .iter()
        .filter_map(|day| week.session(*day))
        .flat_map(|session| session.exercises.iter())
        .filter_map(|exercise| exercise.sets.first())
        .map(|set| u64::from(set.target_weight_kg) * u64::from(set.target_reps))
        .sum()
}

/// Recompute the stats cache for the selected week (week 1 when none is
/// selected)
pub fn compute_stats(state: &SessionState) -> StatsCache {
    let week_number = state.selected_week.max(1);
    let volume_kg = state
        .week(week_number)
        .or_else(|| state.weeks.first())
        .map(week_volume)
        .unwrap_or(0);

    let completed_rpes: Vec<f64> = state
        .journal
        .completed_in_week(state.selected_week)
        .filter_map(|key| {
            state
                .week(key.week)?
                .session(key.day)?
                .exercises
                .get(key.exercise_index)?
                .sets
                .iter()
                .find(|s| s.series_index == key.series_index)
                .map(|s| s.target_rpe)
        })
        .collect();

    let completed_sets = state.journal.completed_in_week(state.selected_week).count();
    let average_target_rpe = if completed_rpes.is_empty() {
        None
    } else {
        Some(completed_rpes.iter().sum::<f64>() / completed_rpes.len() as f64)
    };

    StatsCache {
        volume_kg,
        completed_sets,
        average_target_rpe,
    }
}

/// One bar of the volume chart
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeBar {
    pub label: String,
    pub week_number: u32,
    pub volume_kg: u64,
}

/// Bar chart of prescribed volume over a four-week window ending at the
/// selected week
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeChart {
    pub bars: Vec<VolumeBar>,
}

impl VolumeChart {
    pub fn build(state: &SessionState) -> Self {
        let anchor = if state.selected_week == 0 {
            CHART_WINDOW
        } else {
            state.selected_week as usize
        };
        let start = anchor.saturating_sub(CHART_WINDOW);
        let end = state.weeks.len().min(start + CHART_WINDOW);

        let bars = state
            .weeks
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|week| VolumeBar {
                label: format!("W{}", week.week_number),
                week_number: week.week_number,
                volume_kg: week_volume(week),
            })
            .collect();

        Self { bars }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Horizontal text bars, the longest `width` cells wide
    pub fn render(&self, width: usize) -> String {
        let max = self.bars.iter().map(|b| b.volume_kg).max().unwrap_or(0);
        let mut out = String::from("Volume (kg·rep)\n");
        for bar in &self.bars {
            let cells = if max == 0 {
                0
            } else {
                (bar.volume_kg as f64 / max as f64 * width as f64).round() as usize
            };
            out.push_str(&format!(
                "{:>4} │{:<width$}│ {}\n",
                bar.label,
                "█".repeat(cells),
                bar.volume_kg,
                width = width
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;
    use crate::JournalKey;

    #[test]
    fn test_week_volume() {
        let week = Program::standard().week(1).unwrap();
        // Per session: Σ heavy round(20 + 1.8i)×5 for i in 0..=10
        //            + Σ isolation (8 + i)×12 for i in 11..=21
        let heavy: u64 = (0..=10)
            .map(|i| (20.0 + i as f64 * 1.8).round() as u64 * 5)
            .sum();
        let isolation: u64 = (11..=21).map(|i| (8 + i) * 12).sum();
        assert_eq!(week_volume(week), 3 * (heavy + isolation));
    }

    #[test]
    fn test_deload_volume_is_lower() {
        let program = Program::standard();
        assert!(week_volume(program.week(6).unwrap()) < week_volume(program.week(5).unwrap()));
    }

    #[test]
    fn test_compute_stats() {
        let mut state = SessionState::default();
        state.selected_week = 2;
        state.current_day = Some(Day::Sunday);
        state.journal.toggle(&JournalKey::new(2, Day::Sunday, 0, 1), 1);
        state.journal.toggle(&JournalKey::new(2, Day::Sunday, 0, 3), 1);
        state.journal.toggle(&JournalKey::new(1, Day::Sunday, 0, 1), 1);

        let stats = compute_stats(&state);
        assert_eq!(stats.completed_sets, 2);
        assert_eq!(stats.average_target_rpe, Some(7.5));
        assert_eq!(stats.volume_kg, week_volume(state.week(2).unwrap()));
    }

    #[test]
    fn test_stats_without_selection() {
        let state = SessionState::default();
        let stats = compute_stats(&state);
        assert_eq!(stats.completed_sets, 0);
        assert_eq!(stats.average_target_rpe, None);
        assert_eq!(stats.volume_kg, week_volume(state.week(1).unwrap()));
    }

    #[test]
    fn test_chart_window() {
        let mut state = SessionState::default();
        let labels = |state: &SessionState| {
            VolumeChart::build(state)
                .bars
                .into_iter()
                .map(|b| b.week_number)
                .collect::<Vec<_>>()
        };

        assert_eq!(labels(&state), vec![1, 2, 3, 4]);
        state.selected_week = 1;
        assert_eq!(labels(&state), vec![1, 2, 3, 4]);
        state.selected_week = 10;
        assert_eq!(labels(&state), vec![7, 8, 9, 10]);
        state.selected_week = 26;
        assert_eq!(labels(&state), vec![23, 24, 25, 26]);
    }

    #[test]
    fn test_chart_render() {
        let chart = VolumeChart::build(&SessionState::default());
        let text = chart.render(20);
        assert!(text.starts_with("Volume"));
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("W1"));
    }

    #[test]
    fn test_chart_empty_program() {
        let state = SessionState::new(Vec::new());
        assert!(VolumeChart::build(&state).is_empty());
    }
}

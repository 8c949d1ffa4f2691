//! Built-in self-test.
//!
//! Runs six independent checks against a live tracker and collects every
//! failure instead of stopping at the first one.

use crate::program::{is_deload_week, PROGRAM_WEEKS};
use crate::store::KeyValueStore;
use crate::timer::{default_rest, Countdown};
use crate::tracker::Tracker;
use crate::view::DashboardView;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelfTestReport {
    pub checks: Vec<CheckResult>,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    fn record(&mut self, name: &'static str, outcome: Result<(), String>) {
        let (passed, message) = match outcome {
            Ok(()) => (true, "ok".to_string()),
            Err(message) => {
                tracing::warn!(check = name, "Self-test failure: {}", message);
                (false, message)
            }
        };
        self.checks.push(CheckResult {
            name,
            passed,
            message,
        });
    }
}

impl fmt::Display for SelfTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures: Vec<_> = self.failures().collect();
        if failures.is_empty() {
            return write!(f, "SELF-TEST PASS ({} checks)", self.checks.len());
        }
        write!(f, "SELF-TEST FAILED — {} problem(s)", failures.len())?;
        for failure in failures {
            write!(f, "\n  • {}: {}", failure.name, failure.message)?;
        }
        Ok(())
    }
}

/// Run every check against `tracker`
pub fn run<S: KeyValueStore>(tracker: &mut Tracker<S>) -> SelfTestReport {
    let mut report = SelfTestReport::default();
    report.record("layout", check_layout(tracker));
    report.record("program", check_program(tracker));
    report.record("storage", check_storage(tracker));
    report.record("timer", check_timer(tracker));
    report.record("charts", check_charts(tracker));
    report.record("export", check_export(tracker));
    tracing::info!("{}", report);
    report
}

fn check_layout<S: KeyValueStore>(tracker: &mut Tracker<S>) -> Result<(), String> {
    let missing = DashboardView::build(tracker).missing_regions();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("missing dashboard regions: {}", missing.join(", ")))
    }
}

fn check_program<S: KeyValueStore>(tracker: &Tracker<S>) -> Result<(), String> {
    let weeks = &tracker.state().weeks;
    if weeks.len() != PROGRAM_WEEKS as usize {
        return Err(format!("expected {} weeks, found {}", PROGRAM_WEEKS, weeks.len()));
    }
    let wrong: Vec<String> = weeks
        .iter()
        .filter(|w| w.is_deload != is_deload_week(w.week_number))
        .map(|w| w.week_number.to_string())
        .collect();
    if wrong.is_empty() {
        Ok(())
    } else {
        Err(format!("wrong deload flag on week(s) {}", wrong.join(", ")))
    }
}

fn check_storage<S: KeyValueStore>(tracker: &mut Tracker<S>) -> Result<(), String> {
    tracker.save().map_err(|e| format!("save failed: {}", e))?;
    let loaded = tracker
        .gateway()
        .load()
        .ok_or_else(|| "saved state could not be read back".to_string())?;
    if loaded.weeks.len() != PROGRAM_WEEKS as usize {
        return Err(format!("reloaded state has {} weeks", loaded.weeks.len()));
    }
    Ok(())
}

fn check_timer<S: KeyValueStore>(tracker: &Tracker<S>) -> Result<(), String> {
    let mut probe = tracker.state().clone();
    probe.selected_week = probe.selected_week.max(1);
    let rest = default_rest(&probe, 0);

    let timers = tracker.timers();
    let clock = timers.clock();
    let tick = timers.tick();
    let mut countdown = Countdown::new(rest, tick, clock.clone());

    countdown.reset();
    let before = countdown.remaining();
    countdown.start();
    clock.sleep(tick * 2 + tick / 2);
    countdown.pause();
    let mid = countdown.remaining();
    countdown.reset();
    let after = countdown.remaining();

    if mid >= before {
        return Err(format!("countdown did not decrease ({:?} → {:?})", before, mid));
    }
    if after != before {
        return Err(format!("reset restored {:?}, expected {:?}", after, before));
    }
    Ok(())
}

fn check_charts<S: KeyValueStore>(tracker: &mut Tracker<S>) -> Result<(), String> {
    if tracker.volume_chart().is_empty() {
        Err("volume chart has no bars".into())
    } else {
        Ok(())
    }
}

fn check_export<S: KeyValueStore>(tracker: &Tracker<S>) -> Result<(), String> {
    let bytes = tracker
        .export_json()
        .map_err(|e| format!("export failed: {}", e))?;
    serde_json::from_slice::<serde_json::Value>(&bytes)
        .map(|_| ())
        .map_err(|e| format!("export is not valid JSON: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, TimerConfig};
    use crate::persistence::Gateway;
    use crate::program::Program;
    use crate::store::MemoryStore;
    use crate::timer::{Clock, ManualClock, TimerRegistry};
    use crate::SessionState;
    use std::sync::Arc;

    fn tracker_over(store: MemoryStore, state: Option<SessionState>) -> Tracker<MemoryStore> {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        let timers = TimerRegistry::new(clock, &TimerConfig::default());
        let gateway = Gateway::new(store, &StorageConfig::default());
        match state {
            Some(state) => Tracker::with_state(state, gateway, timers),
            None => Tracker::open(gateway, timers, Program::standard()),
        }
    }

    #[test]
    fn test_all_checks_pass() {
        let mut tracker = tracker_over(MemoryStore::new(), None);
        let report = run(&mut tracker);
        assert_eq!(report.checks.len(), 6);
        assert!(report.passed(), "{}", report);
        assert!(report.to_string().starts_with("SELF-TEST PASS"));
    }

    #[test]
    fn test_failures_are_collected() {
        let mut state = SessionState::default();
        state.weeks.truncate(20);
        let mut tracker = tracker_over(MemoryStore::with_quota(64), Some(state));

        let report = run(&mut tracker);
        assert!(!report.passed());
        let failed: Vec<_> = report.failures().map(|c| c.name).collect();
        assert_eq!(failed, vec!["program", "storage"]);

        let text = report.to_string();
        assert!(text.starts_with("SELF-TEST FAILED — 2 problem(s)"));
        assert!(text.contains("expected 26 weeks, found 20"));
    }

    #[test]
    fn test_wrong_deload_flag() {
        let mut state = SessionState::default();
        state.weeks[4].is_deload = true;
        let mut tracker = tracker_over(MemoryStore::new(), Some(state));

        let report = run(&mut tracker);
        let program = &report.checks[1];
        assert_eq!(program.name, "program");
        assert!(!program.passed);
        assert!(program.message.contains("week(s) 5"));
    }
}

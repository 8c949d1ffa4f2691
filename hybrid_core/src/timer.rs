//! Rest countdowns.
//!
//! A [`Countdown`] reads time from a [`Clock`] instead of owning a thread:
//! while running, its remaining time drops by one tick (250 ms by default)
//! for every whole tick elapsed on the clock, and never below zero. Callers
//! drive expiry by polling, so any number of countdowns can run side by side
//! on one event loop, each touching only its own state.

use crate::config::TimerConfig;
use crate::SessionState;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Rest used when no prescription is available for an exercise
pub const FALLBACK_REST: Duration = Duration::from_secs(60);

// ============================================================================
// Clocks
// ============================================================================

/// Monotonic time source for countdowns
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    /// Block until `duration` has passed on this clock
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock; time only moves through [`ManualClock::advance`] or `sleep`
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

// ============================================================================
// Countdown
// ============================================================================

/// Lifecycle of a countdown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Not started since construction/reset, or expired (remaining 0)
    Idle,
    Running,
    Paused,
}

/// Start/pause/reset countdown over a shared clock
pub struct Countdown {
    initial: Duration,
    tick: Duration,
    state: TimerState,
    /// Remaining time as of the last transition
    remaining: Duration,
    /// Clock reading when the current run began
    started_at: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("initial", &self.initial)
            .field("state", &self.state)
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl Countdown {
    pub fn new(initial: Duration, tick: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            initial,
            tick,
            state: TimerState::Idle,
            remaining: initial,
            started_at: None,
            clock,
        }
    }

    /// Begin decrementing; no-op while already running
    pub fn start(&mut self) {
        if self.state == TimerState::Running {
            return;
        }
        self.state = TimerState::Running;
        self.started_at = Some(self.clock.now());
    }

    /// Stop decrementing and keep the remaining time; idempotent
    ///
    /// An expired countdown stays running so the next [`poll`](Self::poll)
    /// still reports it.
    pub fn pause(&mut self) {
        if self.state != TimerState::Running || self.remaining().is_zero() {
            return;
        }
        self.remaining = self.remaining();
        self.started_at = None;
        self.state = TimerState::Paused;
    }

    /// Stop and restore the initial duration, from any state
    pub fn reset(&mut self) {
        self.remaining = self.initial;
        self.started_at = None;
        self.state = TimerState::Idle;
    }

    /// Current remaining time, without side effects
    pub fn remaining(&self) -> Duration {
        match (self.state, self.started_at) {
            (TimerState::Running, Some(started_at)) => {
                let elapsed = self.clock.now().saturating_sub(started_at);
                let ticks = elapsed.as_nanos() / self.tick.as_nanos().max(1);
                let consumed = self
                    .tick
                    .saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX));
                self.remaining.saturating_sub(consumed)
            }
            _ => self.remaining,
        }
    }

    /// Settle expiry: returns true exactly once when a running countdown
    /// has reached zero, leaving it idle at zero
    pub fn poll(&mut self) -> bool {
        if self.state == TimerState::Running && self.remaining().is_zero() {
            self.remaining = Duration::ZERO;
            self.started_at = None;
            self.state = TimerState::Idle;
            return true;
        }
        false
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }
}

/// The exercise-independent countdown shown as a ring
#[derive(Debug)]
pub struct GlobalTimer {
    countdown: Countdown,
}

impl GlobalTimer {
    pub fn new(duration: Duration, tick: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            countdown: Countdown::new(duration, tick, clock),
        }
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn countdown_mut(&mut self) -> &mut Countdown {
        &mut self.countdown
    }

    /// Elapsed share of the countdown, 0.0 (full) to 1.0 (done)
    pub fn progress_fraction(&self) -> f64 {
        let initial = self.countdown.initial().as_secs_f64();
        if initial == 0.0 {
            return 1.0;
        }
        let fraction = 1.0 - self.countdown.remaining().as_secs_f64() / initial;
        fraction.clamp(0.0, 1.0)
    }

    /// Angular sweep of the ring, in degrees
    pub fn sweep_degrees(&self) -> f64 {
        self.progress_fraction() * 360.0
    }

    /// Dash offset for a stroked circle of the given radius
    pub fn stroke_dash_offset(&self, radius: f64) -> f64 {
        2.0 * PI * radius * (1.0 - self.progress_fraction())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Notification produced when a running countdown reaches zero
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    RestComplete { exercise_index: usize },
    GlobalComplete,
}

impl fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerEvent::RestComplete { exercise_index } => {
                write!(f, "Rest complete for exercise {}", exercise_index + 1)
            }
            TimerEvent::GlobalComplete => f.write_str("Global timer complete"),
        }
    }
}

/// One lazily created countdown per exercise of the rendered session,
/// plus the global timer
pub struct TimerRegistry {
    clock: Arc<dyn Clock>,
    tick: Duration,
    global_duration: Duration,
    exercises: BTreeMap<usize, Countdown>,
    global: Option<GlobalTimer>,
}

impl TimerRegistry {
    pub fn new(clock: Arc<dyn Clock>, config: &TimerConfig) -> Self {
        Self {
            clock,
            tick: config.tick(),
            global_duration: config.global_duration(),
            exercises: BTreeMap::new(),
            global: None,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Countdown for an exercise, created on first use with the rest read
    /// from `state` at that moment
    pub fn exercise(&mut self, state: &SessionState, exercise_index: usize) -> &mut Countdown {
        let clock = &self.clock;
        let tick = self.tick;
        self.exercises.entry(exercise_index).or_insert_with(|| {
            let rest = default_rest(state, exercise_index);
            tracing::debug!(exercise_index, ?rest, "Created exercise timer");
            Countdown::new(rest, tick, Arc::clone(clock))
        })
    }

    pub fn get(&self, exercise_index: usize) -> Option<&Countdown> {
        self.exercises.get(&exercise_index)
    }

    /// Drop every exercise countdown (the rendered session changed)
    pub fn clear_exercises(&mut self) {
        self.exercises.clear();
    }

    /// The global timer, created on first use
    pub fn global_mut(&mut self) -> &mut GlobalTimer {
        let clock = &self.clock;
        let (duration, tick) = (self.global_duration, self.tick);
        self.global
            .get_or_insert_with(|| GlobalTimer::new(duration, tick, Arc::clone(clock)))
    }

    pub fn global(&self) -> Option<&GlobalTimer> {
        self.global.as_ref()
    }

    pub fn any_running(&self) -> bool {
        self.exercises.values().any(Countdown::is_running)
            || self
                .global
                .as_ref()
                .map(|g| g.countdown().is_running())
                .unwrap_or(false)
    }

    /// Settle every countdown and collect the expiries
    pub fn poll_all(&mut self) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        for (&exercise_index, countdown) in self.exercises.iter_mut() {
            if countdown.poll() {
                tracing::info!(exercise_index, "Rest complete");
                events.push(TimerEvent::RestComplete { exercise_index });
            }
        }
        if let Some(global) = self.global.as_mut() {
            if global.countdown_mut().poll() {
                tracing::info!("Global timer complete");
                events.push(TimerEvent::GlobalComplete);
            }
        }
        events
    }
}

/// Prescribed rest for an exercise of the current session: the first
/// set's rest, or [`FALLBACK_REST`]
pub fn default_rest(state: &SessionState, exercise_index: usize) -> Duration {
    state
        .current_session()
        .and_then(|session| session.exercises.get(exercise_index))
        .and_then(|exercise| exercise.sets.first())
        .map(|set| Duration::from_secs(u64::from(set.rest_seconds)))
        .unwrap_or(FALLBACK_REST)
}

/// Render as `mm:ss`, rounded to the nearest second
pub fn format_remaining(remaining: Duration) -> String {
    let secs = (remaining.as_millis() + 500) / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

//! Master clock: video standard timing and wall-clock pacing.
//!
//! The machine runs in bursts of whole instructions. After each step the
//! clock compares the cycles run so far with the wall time elapsed since it
//! started counting:
//!
//! - ahead of the target by at least [`MIN_SLEEP`]: sleep the difference,
//!   so the lead never exceeds a small fraction of a frame;
//! - behind by more than one frame (slow host tick, debugger pause): drop
//!   the debt and restart counting, rather than bursting to catch up.
//!
//! Sleeping goes through the [`ControlHandle`] so a stop or reset request
//! from another thread wakes it immediately.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::computer::ResetLevel;

/// Shortest wait worth handing to the scheduler.
pub const MIN_SLEEP: Duration = Duration::from_millis(2);

/// Slowest accepted speed factor.
pub const MIN_SPEED_FACTOR: f64 = 0.0001;

/// Fastest accepted speed factor.
pub const MAX_SPEED_FACTOR: f64 = 1000.0;

/// Interval over which the real cycle rate is measured.
const MEASURE_WINDOW: Duration = Duration::from_secs(1);

/// Video standard, which fixes the CPU clock and raster geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStandard {
    /// 985,248 Hz, 312 lines of 63 cycles.
    #[default]
    Pal,
    /// 1,022,727 Hz, 263 lines of 65 cycles.
    Ntsc,
}

impl VideoStandard {
    pub const fn cycles_per_second(self) -> u32 {
        match self {
            VideoStandard::Pal => 985_248,
            VideoStandard::Ntsc => 1_022_727,
        }
    }

    pub const fn lines(self) -> u16 {
        match self {
            VideoStandard::Pal => 312,
            VideoStandard::Ntsc => 263,
        }
    }

    pub const fn cycles_per_line(self) -> u16 {
        match self {
            VideoStandard::Pal => 63,
            VideoStandard::Ntsc => 65,
        }
    }

    pub const fn cycles_per_frame(self) -> u32 {
        self.lines() as u32 * self.cycles_per_line() as u32
    }

    pub fn frame_rate(self) -> f64 {
        self.cycles_per_second() as f64 / self.cycles_per_frame() as f64
    }

    /// Cycles per tenth of a second, for time-of-day clocks.
    pub const fn cycles_per_tenth(self) -> u32 {
        self.cycles_per_second() / 10
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Requests {
    pub stop: bool,
    pub reset: Option<ResetLevel>,
}

/// Thread-safe handle for stopping or resetting a running machine.
///
/// Requests are honoured at the next instruction boundary.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    inner: Arc<(Mutex<Requests>, Condvar)>,
}

impl ControlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Requests> {
        self.inner.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Asks the run loop to return at the next instruction boundary.
    pub fn request_stop(&self) {
        self.lock().stop = true;
        self.inner.1.notify_all();
    }

    /// Asks the machine to reset at the next instruction boundary. Of
    /// several pending requests the strongest level wins.
    pub fn request_reset(&self, level: ResetLevel) {
        let mut requests = self.lock();
        requests.reset = requests.reset.max(Some(level));
        drop(requests);
        self.inner.1.notify_all();
    }

    pub fn stop_requested(&self) -> bool {
        self.lock().stop
    }

    /// Returns and clears pending requests.
    pub(crate) fn take(&self) -> Requests {
        std::mem::take(&mut *self.lock())
    }

    /// Waits up to `timeout`. Returns early, with `true`, if a request is
    /// pending or arrives.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .inner
            .1
            .wait_timeout_while(guard, timeout, |r| !r.stop && r.reset.is_none())
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.stop || guard.reset.is_some()
    }
}

/// Paces execution to a target cycle rate.
#[derive(Debug, Clone)]
pub struct Clock {
    standard: VideoStandard,
    factor: f64,
    throttled: bool,
    origin: Option<Instant>,
    counted: u64,
    window_start: Option<Instant>,
    window_cycles: u64,
    measured: f64,
}

impl Clock {
    /// `factor` scales the standard's rate; 1.0 is real speed.
    pub fn new(standard: VideoStandard, factor: f64, throttled: bool) -> Self {
        Self {
            standard,
            factor,
            throttled,
            origin: None,
            counted: 0,
            window_start: None,
            window_cycles: 0,
            measured: 0.0,
        }
    }

    pub fn standard(&self) -> VideoStandard {
        self.standard
    }

    pub fn speed_factor(&self) -> f64 {
        self.factor
    }

    /// Whether `factor` is a usable speed: finite and within
    /// [`MIN_SPEED_FACTOR`]..=[`MAX_SPEED_FACTOR`].
    pub fn valid_speed_factor(factor: f64) -> bool {
        (MIN_SPEED_FACTOR..=MAX_SPEED_FACTOR).contains(&factor)
    }

    /// Changes the speed. Out-of-range factors are clamped to the accepted
    /// range; NaN is ignored.
    pub fn set_speed_factor(&mut self, factor: f64) {
        if factor.is_nan() {
            return;
        }
        self.factor = factor.clamp(MIN_SPEED_FACTOR, MAX_SPEED_FACTOR);
        self.restart();
    }

    pub fn is_throttled(&self) -> bool {
        self.throttled && self.factor > 0.0
    }

    pub fn set_throttled(&mut self, throttled: bool) {
        self.throttled = throttled;
        self.restart();
    }

    /// Cycles per second being aimed for.
    pub fn target_cycles_per_second(&self) -> f64 {
        self.standard.cycles_per_second() as f64 * self.factor
    }

    /// Cycles per second measured over the last complete window, or 0.0
    /// before the first window completes. Only measured while throttled.
    pub fn real_cycles_per_second(&self) -> f64 {
        self.measured
    }

    /// Forgets pacing history; the next step starts a fresh count.
    pub fn restart(&mut self) {
        self.origin = None;
        self.counted = 0;
        self.window_start = None;
        self.window_cycles = 0;
    }

    /// Wall time `cycles` should take, or `None` if it does not fit a
    /// `Duration`.
    fn duration_of(&self, cycles: u64) -> Option<Duration> {
        Duration::try_from_secs_f64(cycles as f64 / self.target_cycles_per_second()).ok()
    }

    fn frame_duration(&self) -> Duration {
        self.duration_of(self.standard.cycles_per_frame() as u64)
            .unwrap_or(Duration::MAX)
    }

    /// Whether simulated time is ahead of wall time.
    pub fn too_quick(&self) -> bool {
        match self.origin {
            Some(origin) if self.is_throttled() => self
                .duration_of(self.counted)
                .is_some_and(|expected| expected > origin.elapsed()),
            _ => false,
        }
    }

    /// Accounts `cycles` of simulated time and sleeps if that puts the
    /// machine ahead of wall time. Never fails; a missed deadline is
    /// absorbed.
    pub fn pace(&mut self, cycles: u32, control: &ControlHandle) {
        if !self.is_throttled() || cycles == 0 {
            return;
        }
        let now = Instant::now();
        let origin = *self.origin.get_or_insert(now);
        self.counted += cycles as u64;
        self.measure(cycles, now);

        let Some(expected) = self.duration_of(self.counted) else {
            // Not expressible as a wait: skip pacing.
            self.restart();
            return;
        };
        let elapsed = now.duration_since(origin);
        if expected > elapsed {
            let ahead = expected - elapsed;
            if ahead >= MIN_SLEEP {
                control.wait(ahead);
            }
        } else if elapsed - expected > self.frame_duration() {
            trace!(behind_us = (elapsed - expected).as_micros() as u64, "clock resync");
            self.origin = Some(now);
            self.counted = 0;
        }
    }

    fn measure(&mut self, cycles: u32, now: Instant) {
        let start = *self.window_start.get_or_insert(now);
        self.window_cycles += cycles as u64;
        let span = now.duration_since(start);
        if span >= MEASURE_WINDOW {
            self.measured = self.window_cycles as f64 / span.as_secs_f64();
            self.window_start = Some(now);
            self.window_cycles = 0;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(VideoStandard::Pal, 1.0, true)
    }
}

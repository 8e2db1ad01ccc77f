//! Clocks shared by the render loop and the audio engine.
//!
//! Both subsystems read seconds from one [`Clock`]; a session pins its start to a
//! [`SessionOrigin`] on that clock instead of sharing any mutable state.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Monotonic time source measured from an arbitrary epoch.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's epoch.
    fn now(&self) -> Duration;

    /// Block the caller until `deadline` (no-op if it already passed).
    fn sleep_until(&self, deadline: Duration);

    /// [`Clock::now`] in seconds.
    fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }
}

/// Wall-clock time starting when the clock is created.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Start a new clock at zero.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
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
        self.epoch.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Virtual time that only moves when told to.
///
/// `sleep_until` jumps straight to the deadline, so an 8 s recording completes as fast as
/// frames can be rendered.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Start a virtual clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `d`.
    pub fn advance(&self, d: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += d;
    }

    /// Move the clock forward by `secs` seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs.max(0.0)));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep_until(&self, deadline: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if deadline > *now {
            *now = deadline;
        }
    }
}

/// Start instant of one playback session on the studio clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionOrigin(Duration);

impl SessionOrigin {
    /// Origin at clock time `at`.
    pub fn at(at: Duration) -> Self {
        Self(at)
    }

    /// Origin at the clock's current time.
    pub fn now(clock: &dyn Clock) -> Self {
        Self(clock.now())
    }

    /// Clock time of the origin.
    pub fn instant(self) -> Duration {
        self.0
    }

    /// Clock time of the origin in seconds.
    pub fn secs(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Session-relative seconds at clock time `now`, saturating at zero.
    pub fn elapsed_secs(self, now: Duration) -> f64 {
        now.saturating_sub(self.0).as_secs_f64()
    }

    /// Clock time `secs` seconds after the origin.
    pub fn offset(self, secs: f64) -> Duration {
        self.0 + Duration::from_secs_f64(secs.max(0.0))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/clock.rs"]
mod tests;

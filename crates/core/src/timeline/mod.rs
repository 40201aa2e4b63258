use std::{
    cell::Cell,
    fmt,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::config::PacingMode;

/// Monotonic time source measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Clock handle shared by the player and the audio signals it drives.
pub type SharedClock = Rc<dyn Clock>;

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    time: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta: Duration) {
        self.time.set(self.time.get() + delta);
    }

    pub fn set(&self, time: Duration) {
        self.time.set(time);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.time.get()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("time", &self.time.get())
            .finish()
    }
}

/// The single outstanding pacing deadline of a player.
#[derive(Debug, Clone, Default)]
pub struct PacingTimer {
    mode: PacingMode,
    deadline: Option<Duration>,
    last_delay: Option<Duration>,
}

impl PacingTimer {
    pub fn new(mode: PacingMode) -> Self {
        Self {
            mode,
            deadline: None,
            last_delay: None,
        }
    }

    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Delay requested by the most recent [`PacingTimer::schedule`].
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    pub fn is_due(&self, now: Duration) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Replaces any pending deadline with one `delay` after the reference
    /// point of the current mode: the time the frame was handled (`now`) in
    /// relaxed mode, the deadline that just fired in compensated mode.
    pub fn schedule(&mut self, now: Duration, fired_deadline: Option<Duration>, delay: Duration) {
        let base = match (self.mode, fired_deadline) {
            (PacingMode::Compensated, Some(previous)) => previous,
            _ => now,
        };
        self.deadline = Some(base + delay);
        self.last_delay = Some(delay);
    }

    /// Takes the pending deadline, leaving the timer idle.
    pub fn take(&mut self) -> Option<Duration> {
        self.deadline.take()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(5 * MS);
        assert_eq!(other.now(), 5 * MS);
        other.set(MS);
        assert_eq!(clock.now(), MS);
    }

    #[test]
    fn relaxed_mode_accumulates_latency() {
        let mut timer = PacingTimer::new(PacingMode::Relaxed);
        timer.schedule(Duration::ZERO, None, 20 * MS);
        let fired = timer.take();
        // handled 3ms late
        timer.schedule(23 * MS, fired, 20 * MS);
        assert_eq!(timer.deadline(), Some(43 * MS));
    }

    #[test]
    fn compensated_mode_chains_deadlines() {
        let mut timer = PacingTimer::new(PacingMode::Compensated);
        timer.schedule(Duration::ZERO, None, 20 * MS);
        let fired = timer.take();
        timer.schedule(23 * MS, fired, 20 * MS);
        assert_eq!(timer.deadline(), Some(40 * MS));
        assert_eq!(timer.last_delay(), Some(20 * MS));
    }

    #[test]
    fn cancel_clears_deadline() {
        let mut timer = PacingTimer::default();
        timer.schedule(Duration::ZERO, None, MS);
        assert!(timer.is_due(MS));
        assert!(!timer.is_due(Duration::ZERO));
        timer.cancel();
        assert!(!timer.is_due(10 * MS));
    }
}

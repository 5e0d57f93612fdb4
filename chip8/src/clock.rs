//! Frame clock.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{constants::*, vm::Hz};

/// Timer to synchronize the host thread with the 60Hz frame cadence.
///
/// It is designed to work with the yielding cooperative pattern
/// of the frame driver. When the driver yields control back to the
/// host, time elapses until it is resumed. Once the driver
/// is resumed, the elapsed time is taken into account when determining
/// the next frame.
pub struct Clock {
    last: Instant,
    interval: Duration,
}

impl Default for Clock {
    fn default() -> Self {
        Self::from_nanos(CLOCK_CYCLE_TIME)
    }
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: Duration) -> Self {
        Self {
            last: Instant::now(),
            interval,
        }
    }

    pub fn from_nanos(nanos: u64) -> Self {
        Self::new(Duration::from_nanos(nanos))
    }

    pub fn from_hz(freq: Hz) -> Self {
        Self::new(freq.into())
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.last = Instant::now()
    }

    /// Point in time when the next cycle is due.
    pub fn deadline(&self) -> Instant {
        self.last + self.interval
    }

    /// Check whether a cycle has elapsed, and if so start the next one.
    pub fn tick(&mut self) -> bool {
        if self.last.elapsed() >= self.interval {
            // Reset back to zero, rather than trying to catch up.
            //
            // If the VM was paused for debugging, and a large
            // amount of time has elapsed until it is resumed,
            // it should simply continue at the next cycle running
            // at its usual speed.
            self.reset();
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        while !self.tick() {
            let remaining = self.interval.saturating_sub(self.last.elapsed());
            if remaining > Duration::from_millis(2) {
                // Sleep does not have enough resolution to hit the
                // deadline, so only sleep the bulk of the remaining time.
                thread::sleep(remaining - Duration::from_millis(2));
            } else {
                thread::yield_now();
            }
        }
    }
}

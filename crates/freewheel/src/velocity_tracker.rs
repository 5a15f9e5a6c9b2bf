//! Velocity estimation from a rolling window of drag deltas.
//!
//! Each sample is a differential 2D displacement with a millisecond
//! timestamp. The exit velocity is the windowed displacement divided by the
//! windowed elapsed time, so a drag moving at a constant rate reports
//! exactly displacement/interval.

use std::collections::VecDeque;

use freewheel_core::Point;

/// Maximum number of retained samples.
const HISTORY_SIZE: usize = 20;

/// Only samples within the last 100ms of the newest one participate.
const HORIZON_MS: i64 = 100;

/// If no movement for this duration, assume the pointer has stopped.
pub const ASSUME_STOPPED_MS: i64 = 40;

#[derive(Clone, Copy, Debug)]
struct SampleAtTime {
    time_ms: i64,
    delta: Point,
}

/// Rolling-window 2D velocity tracker over differential drag samples.
///
/// # Usage
/// ```ignore
/// let mut tracker = VelocityTracker::new();
/// tracker.add_delta(time_ms, delta);
/// // ... more deltas ...
/// let velocity = tracker.calculate_velocity(); // units/sec
/// ```
#[derive(Clone, Debug, Default)]
pub struct VelocityTracker {
    samples: VecDeque<SampleAtTime>,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_SIZE),
        }
    }

    /// Records a displacement that ended at `time_ms`.
    ///
    /// Non-finite deltas and samples whose timestamp runs backwards are
    /// discarded.
    pub fn add_delta(&mut self, time_ms: i64, delta: Point) {
        if !delta.is_finite() {
            log::trace!("discarding non-finite drag delta");
            return;
        }
        if let Some(last) = self.samples.back() {
            // Timestamps should increase monotonically for the events we
            // care about.
            if time_ms < last.time_ms {
                log::trace!(
                    "ignoring sample with timestamp {time_ms}ms earlier than last {}ms",
                    last.time_ms
                );
                return;
            }
        }
        if self.samples.len() == HISTORY_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(SampleAtTime { time_ms, delta });
    }

    /// Calculates the velocity in units/second.
    ///
    /// Returns zero if fewer than two usable samples remain in the window,
    /// or if the newest gap suggests the pointer already stopped.
    pub fn calculate_velocity(&self) -> Point {
        let Some(&newest) = self.samples.back() else {
            return Point::ZERO;
        };

        // Walk backwards from the newest sample, accumulating the deltas
        // that fall inside the horizon. Each delta covers the interval that
        // ends at its own timestamp, so the oldest in-window sample only
        // anchors the elapsed time and its delta stays out of the sum.
        let mut displacement = Point::ZERO;
        let mut oldest = newest;
        let mut previous = newest;
        let mut usable = 1;

        for &sample in self.samples.iter().rev().skip(1) {
            let age = newest.time_ms - sample.time_ms;
            let gap = previous.time_ms - sample.time_ms;
            if age > HORIZON_MS || gap > ASSUME_STOPPED_MS {
                break;
            }
            displacement += previous.delta;
            oldest = sample;
            previous = sample;
            usable += 1;
        }

        if usable < 2 {
            return Point::ZERO;
        }
        let elapsed_ms = newest.time_ms - oldest.time_ms;
        if elapsed_ms <= 0 {
            return Point::ZERO;
        }

        displacement * (1000.0 / elapsed_ms as f32)
    }

    /// Calculates the velocity in units/second, capped to `max_speed`.
    pub fn calculate_velocity_with_max(&self, max_speed: f32) -> Point {
        if !max_speed.is_finite() || max_speed <= 0.0 {
            return Point::ZERO;
        }

        let velocity = self.calculate_velocity();
        let speed = velocity.magnitude();
        if speed <= max_speed {
            velocity
        } else {
            velocity * (max_speed / speed)
        }
    }

    /// Clears all tracked samples.
    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

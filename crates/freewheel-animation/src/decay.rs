//! Geometric velocity decay.
//!
//! Velocity loses a fixed fraction per frame (multiplicative, not linear),
//! normalized to a reference frame interval so hosts running at other
//! refresh rates decelerate at the same perceived rate.

use std::time::Duration;

use freewheel_core::Point;

/// Speed (units/second) below which a running deceleration counts as
/// settled.
pub const MIN_DECAY_SPEED: f32 = 1.0;

/// Per-frame geometric damping model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayCurve {
    damping_per_frame: f32,
    reference_frame_interval: Duration,
}

impl DecayCurve {
    /// Default damping: velocity keeps 95% of itself per reference frame.
    pub const DEFAULT_DAMPING: f32 = 0.95;

    /// Reference cadence the damping factor is expressed against (~60 Hz).
    pub const REFERENCE_FRAME_INTERVAL: Duration = Duration::from_millis(16);

    pub fn new(damping_per_frame: f32) -> Self {
        Self::with_frame_interval(damping_per_frame, Self::REFERENCE_FRAME_INTERVAL)
    }

    /// Damping is clamped away from 0 and 1: a factor of 1 would never
    /// settle and a factor of 0 has no deceleration phase at all.
    pub fn with_frame_interval(damping_per_frame: f32, reference_frame_interval: Duration) -> Self {
        Self {
            damping_per_frame: damping_per_frame.clamp(0.05, 0.999),
            reference_frame_interval,
        }
    }

    pub fn damping_per_frame(&self) -> f32 {
        self.damping_per_frame
    }

    /// Multiplicative velocity factor for a tick of elapsed time `dt`.
    ///
    /// Exactly `damping_per_frame` when `dt` equals the reference interval;
    /// fractional powers in between keep the decay rate independent of the
    /// host's actual frame timing.
    pub fn damping_for(&self, dt: Duration) -> f32 {
        let frames = dt.as_secs_f32() / self.reference_frame_interval.as_secs_f32();
        self.damping_per_frame.powf(frames)
    }

    /// Remaining travel of the decaying series, starting with a tick at
    /// `velocity` and damping once per reference frame:
    /// `v·T + v·d·T + v·d²·T + … = v·T / (1 − d)`.
    pub fn projected_travel(&self, velocity: f32) -> f32 {
        velocity * self.reference_frame_interval.as_secs_f32() / (1.0 - self.damping_per_frame)
    }

    /// Inverse of [`projected_travel`](Self::projected_travel): the velocity
    /// whose decaying series covers exactly `travel`.
    pub fn velocity_for_travel(&self, travel: f32) -> f32 {
        travel * (1.0 - self.damping_per_frame) / self.reference_frame_interval.as_secs_f32()
    }

    pub fn projected_travel_2d(&self, velocity: Point) -> Point {
        Point::new(
            self.projected_travel(velocity.x),
            self.projected_travel(velocity.y),
        )
    }

    pub fn velocity_for_travel_2d(&self, travel: Point) -> Point {
        Point::new(
            self.velocity_for_travel(travel.x),
            self.velocity_for_travel(travel.y),
        )
    }
}

impl Default for DecayCurve {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DAMPING)
    }
}

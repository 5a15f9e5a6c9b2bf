//! Decay physics for inertial scrolling.
//!
//! A deceleration has no fixed end time: it starts with a velocity and loses
//! a fixed fraction of it every frame until the motion is too slow to see.
//! [`DecayCurve`] holds that damping model plus the closed-form helpers the
//! updater needs to announce and re-aim deceleration targets.

mod decay;

pub use decay::{DecayCurve, MIN_DECAY_SPEED};

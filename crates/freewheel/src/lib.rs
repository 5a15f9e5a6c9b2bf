//! Freewheel: inertial scroll kinetics for single-threaded UI hosts.
//!
//! Feed drag deltas into an [`InertialUpdater`] while a gesture is active,
//! call [`InertialUpdater::end_dragging`] when the pointer lifts, and the
//! updater estimates an exit velocity and streams decelerating position
//! deltas to a delegate — one per frame — until the motion settles.
//!
//! The updater never moves anything itself: during the drag the caller owns
//! direct manipulation, and during deceleration the delegate applies the
//! emitted deltas however it likes. Frames come from a host-driven
//! [`freewheel_core::Runtime`], which makes the whole pipeline
//! deterministic under test.

pub mod gesture_constants;
mod inertial;
mod velocity_tracker;

pub use freewheel_animation::DecayCurve;
pub use freewheel_core::Point;
pub use inertial::{InertialConfig, InertialDelegate, InertialUpdater, Phase};
pub use velocity_tracker::VelocityTracker;

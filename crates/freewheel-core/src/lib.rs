//! Core plumbing for Freewheel: the single-threaded frame-callback runtime
//! that hosts drive once per display refresh, and the geometry primitives
//! shared by the higher-level crates.

mod frame_clock;
mod geometry;
mod runtime;

pub use frame_clock::{FrameCallbackRegistration, FrameClock};
pub use geometry::Point;
pub use runtime::{DefaultScheduler, FrameCallbackId, Runtime, RuntimeHandle, RuntimeScheduler};

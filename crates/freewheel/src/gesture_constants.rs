//! Shared gesture tunables for consistent fling behavior.
//!
//! Values are in logical pixels. For very high-density touch screens,
//! consider scaling by the device's DPI factor before constructing an
//! `InertialConfig`.

/// Minimum exit speed, in logical pixels per second, for a released drag to
/// start decelerating at all.
///
/// Below this the gesture reads as "drag and hold", not a flick; the
/// updater settles immediately instead of animating a crawl.
pub const MIN_FLING_SPEED: f32 = 50.0;

/// Maximum exit speed in logical pixels per second.
///
/// Matches Android's default maximum fling velocity (ViewConfiguration) on
/// a baseline density. Tracked velocity is capped here so a noisy last
/// sample cannot launch the content off-screen.
pub const MAX_FLING_SPEED: f32 = 8_000.0;

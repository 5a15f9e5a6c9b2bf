//! The inertial updater: a state machine that turns drag-gesture deltas
//! into a decelerating stream of position deltas.
//!
//! During the drag the caller owns direct manipulation; the updater only
//! samples deltas to estimate the exit velocity. After `end_dragging` it
//! drives a per-frame decay loop and reports each tick's displacement to a
//! weakly-held delegate until the motion settles.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use freewheel_animation::{DecayCurve, MIN_DECAY_SPEED};
use freewheel_core::{FrameCallbackRegistration, Point, RuntimeHandle};
use web_time::Instant;

use crate::gesture_constants::{MAX_FLING_SPEED, MIN_FLING_SPEED};
use crate::velocity_tracker::VelocityTracker;

/// Distance, in logical pixels, within which a corrected target counts as
/// reached. Residuals below this are folded into the final delta.
const TARGET_EPSILON: f32 = 0.5;

/// Callback sink for deceleration updates. Every method has a default
/// implementation, so delegates override only what they need.
pub trait InertialDelegate {
    /// Announces the point the deceleration is heading towards and gives
    /// the delegate a chance to correct it, e.g. to honor scroll bounds.
    /// Returning the target unchanged leaves the trajectory alone.
    ///
    /// Targets are expressed as displacement from the position where the
    /// drag ended, the same space the emitted deltas accumulate in.
    fn will_decelerate_with_target(&mut self, target: Point) -> Point {
        target
    }

    /// One tick's change in position. Apply it to whatever is scrolling.
    fn scrolled_with_delta(&mut self, delta: Point) {
        let _ = delta;
    }

    /// No more updates should be expected. Called exactly once per
    /// deceleration, including the degenerate case where the drag was
    /// released below the fling threshold.
    fn finished_scrolling(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
    Decelerating,
}

/// Tunables for a single updater.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialConfig {
    pub decay: DecayCurve,
    /// Exit speeds below this settle immediately instead of animating.
    pub min_start_speed: f32,
    /// Exit speeds are capped here before the deceleration starts.
    pub max_start_speed: f32,
}

impl Default for InertialConfig {
    fn default() -> Self {
        Self {
            decay: DecayCurve::default(),
            min_start_speed: MIN_FLING_SPEED,
            max_start_speed: MAX_FLING_SPEED,
        }
    }
}

/// Live state of one deceleration episode.
struct FlingState {
    /// Current velocity in units/second, damped every tick.
    velocity: Point,
    /// Displacement accumulated since the deceleration started.
    position: Point,
    /// Delegate-corrected endpoint, once one has been supplied.
    target: Option<Point>,
    /// Frame time of the previous tick; `None` until the origin frame.
    last_frame_nanos: Option<u64>,
}

struct InertialInner {
    runtime: RuntimeHandle,
    config: InertialConfig,
    delegate: Option<Weak<RefCell<dyn InertialDelegate>>>,
    phase: Phase,
    tracker: VelocityTracker,
    epoch: Instant,
    fling: Option<FlingState>,
    registration: Option<FrameCallbackRegistration>,
}

/// Converts drag-gesture deltas into a decelerating scroll animation.
///
/// Feed deltas in with [`add_drag_delta`](Self::add_drag_delta) while the
/// gesture is active and call [`end_dragging`](Self::end_dragging) when the
/// pointer lifts; the updater computes the exit velocity and notifies the
/// delegate of per-frame position deltas until the motion settles.
///
/// Clones share the same underlying state. All calls must happen on the
/// thread that drives the runtime's frames.
pub struct InertialUpdater {
    inner: Rc<RefCell<InertialInner>>,
}

impl InertialUpdater {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self::with_config(runtime, InertialConfig::default())
    }

    pub fn with_config(runtime: RuntimeHandle, config: InertialConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(InertialInner {
                runtime,
                config,
                delegate: None,
                phase: Phase::Idle,
                tracker: VelocityTracker::new(),
                epoch: Instant::now(),
                fling: None,
                registration: None,
            })),
        }
    }

    /// Stores a non-owning reference to the delegate. A delegate that has
    /// been dropped is silently skipped at every callback point.
    pub fn set_delegate<D: InertialDelegate + 'static>(&self, delegate: &Rc<RefCell<D>>) {
        let delegate: Rc<RefCell<dyn InertialDelegate>> = delegate.clone();
        self.inner.borrow_mut().delegate = Some(Rc::downgrade(&delegate));
    }

    pub fn clear_delegate(&self) {
        self.inner.borrow_mut().delegate = None;
    }

    pub fn phase(&self) -> Phase {
        self.inner.borrow().phase
    }

    pub fn is_decelerating(&self) -> bool {
        self.phase() == Phase::Decelerating
    }

    /// Records a drag delta stamped with the current time.
    pub fn add_drag_delta(&self, delta: Point) {
        let elapsed = self.inner.borrow().epoch.elapsed();
        self.add_drag_delta_at(delta, elapsed);
    }

    /// Records a drag delta with an explicit timestamp, for hosts that
    /// carry event times (and for deterministic tests). `elapsed` is
    /// measured from any fixed origin; only differences matter.
    pub fn add_drag_delta_at(&self, delta: Point, elapsed: Duration) {
        let mut inner = self.inner.borrow_mut();
        if !delta.is_finite() {
            log::trace!("discarding non-finite drag delta");
            return;
        }
        match inner.phase {
            Phase::Decelerating => {
                // Deltas while decelerating belong to no gesture; starting
                // a new drag requires the deceleration to be cancelled
                // first.
                log::trace!("ignoring drag delta while decelerating");
                return;
            }
            Phase::Idle => {
                log::trace!("drag started");
                inner.tracker.reset();
                inner.phase = Phase::Dragging;
            }
            Phase::Dragging => {}
        }
        let time_ms = elapsed.as_millis() as i64;
        inner.tracker.add_delta(time_ms, delta);
    }

    /// Ends the active drag and, if the exit velocity is fast enough,
    /// starts the deceleration loop. A no-op unless currently dragging.
    pub fn end_dragging(&self) {
        let (settle, start) = {
            let mut inner = self.inner.borrow_mut();
            if inner.phase != Phase::Dragging {
                log::trace!("end_dragging outside of a drag is a no-op");
                return;
            }
            let velocity = inner
                .tracker
                .calculate_velocity_with_max(inner.config.max_start_speed);
            inner.tracker.reset();

            if velocity.magnitude() < inner.config.min_start_speed {
                log::debug!("drag released below fling threshold");
                inner.phase = Phase::Idle;
                (true, false)
            } else {
                log::debug!("starting deceleration at {velocity:?} units/s");
                inner.phase = Phase::Decelerating;
                inner.fling = Some(FlingState {
                    velocity,
                    position: Point::ZERO,
                    target: None,
                    last_frame_nanos: None,
                });
                (false, true)
            }
        };

        if settle {
            Self::notify(&self.inner, |delegate| delegate.finished_scrolling());
        }
        if start {
            Self::schedule_frame(&self.inner);
        }
    }

    /// Aborts whatever is in progress and returns to idle without any
    /// delegate callbacks.
    pub fn cancel(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.phase != Phase::Idle {
            log::trace!("cancelled from {:?}", inner.phase);
        }
        inner.phase = Phase::Idle;
        inner.fling = None;
        inner.tracker.reset();
        // Dropping the registration cancels the pending frame callback.
        inner.registration = None;
    }

    fn schedule_frame(this: &Rc<RefCell<InertialInner>>) {
        let clock = {
            let inner = this.borrow();
            if inner.registration.is_some() {
                return;
            }
            inner.runtime.frame_clock()
        };
        let weak = Rc::downgrade(this);
        let registration = clock.with_frame_nanos(move |frame_time_nanos| {
            if let Some(strong) = weak.upgrade() {
                Self::on_frame(&strong, frame_time_nanos);
            }
        });
        this.borrow_mut().registration = Some(registration);
    }

    fn on_frame(this: &Rc<RefCell<InertialInner>>, frame_time_nanos: u64) {
        // Advance the clock and damp the velocity. `None` means there is
        // nothing to integrate yet and the loop just re-arms.
        let tick = {
            let mut inner = this.borrow_mut();
            inner.registration = None;
            if inner.phase != Phase::Decelerating {
                return;
            }
            let decay = inner.config.decay;
            let Some(fling) = inner.fling.as_mut() else {
                return;
            };
            match fling.last_frame_nanos.replace(frame_time_nanos) {
                None => None,
                Some(last) => {
                    let dt = Duration::from_nanos(frame_time_nanos.saturating_sub(last));
                    if dt.is_zero() {
                        None
                    } else {
                        fling.velocity = fling.velocity * decay.damping_for(dt);
                        let estimate = match fling.target {
                            Some(target) => target,
                            None => fling.position + decay.projected_travel_2d(fling.velocity),
                        };
                        Some((estimate, dt))
                    }
                }
            }
        };
        let Some((estimate, dt)) = tick else {
            Self::schedule_frame(this);
            return;
        };

        // The delegate may cap or redirect the endpoint. Invoked with no
        // borrow held, so it is free to call back into the updater.
        let corrected = Self::query_target(this, estimate);

        let step = {
            let mut inner = this.borrow_mut();
            if inner.phase != Phase::Decelerating {
                return;
            }
            let decay = inner.config.decay;
            let Some(fling) = inner.fling.as_mut() else {
                return;
            };

            if (corrected - estimate).magnitude() > TARGET_EPSILON {
                log::trace!("deceleration retargeted to {corrected:?}");
                fling.target = Some(corrected);
                fling.velocity = decay.velocity_for_travel_2d(corrected - fling.position);
            }

            let mut delta = fling.velocity * dt.as_secs_f32();
            if let Some(target) = fling.target {
                let remaining = target - fling.position;
                delta.x = clamp_toward(delta.x, remaining.x);
                delta.y = clamp_toward(delta.y, remaining.y);
            }
            fling.position += delta;

            let mut finished = false;
            if let Some(target) = fling.target {
                if (target - fling.position).magnitude() <= TARGET_EPSILON {
                    finished = true;
                }
            }
            if !finished && fling.velocity.magnitude() < MIN_DECAY_SPEED {
                finished = true;
            }
            if finished {
                // Land exactly on a corrected target, never past it.
                if let Some(target) = fling.target {
                    delta += target - fling.position;
                    fling.position = target;
                }
            }
            (delta, finished)
        };
        let (delta, finished) = step;

        if delta != Point::ZERO {
            Self::notify(this, |delegate| delegate.scrolled_with_delta(delta));
        }

        if finished {
            let done = {
                let mut inner = this.borrow_mut();
                if inner.phase == Phase::Decelerating {
                    inner.phase = Phase::Idle;
                    inner.fling = None;
                    true
                } else {
                    false
                }
            };
            if done {
                log::debug!("deceleration finished");
                Self::notify(this, |delegate| delegate.finished_scrolling());
            }
        } else if this.borrow().phase == Phase::Decelerating {
            Self::schedule_frame(this);
        }
    }

    fn query_target(this: &Rc<RefCell<InertialInner>>, estimate: Point) -> Point {
        let Some(weak) = this.borrow().delegate.clone() else {
            return estimate;
        };
        let Some(delegate) = weak.upgrade() else {
            return estimate;
        };
        let Ok(mut delegate) = delegate.try_borrow_mut() else {
            return estimate;
        };
        delegate.will_decelerate_with_target(estimate)
    }

    fn notify(this: &Rc<RefCell<InertialInner>>, f: impl FnOnce(&mut dyn InertialDelegate)) {
        let Some(weak) = this.borrow().delegate.clone() else {
            return;
        };
        let Some(delegate) = weak.upgrade() else {
            return;
        };
        let Ok(mut delegate) = delegate.try_borrow_mut() else {
            log::trace!("delegate busy, skipping notification");
            return;
        };
        f(&mut *delegate);
    }
}

impl Clone for InertialUpdater {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Limits a tick's displacement so the accumulated position stops at
/// `remaining` instead of passing it.
fn clamp_toward(delta: f32, remaining: f32) -> f32 {
    if remaining == 0.0 {
        0.0
    } else if delta.signum() == remaining.signum() && delta.abs() > remaining.abs() {
        remaining
    } else {
        delta
    }
}

#[cfg(test)]
#[path = "tests/inertial_tests.rs"]
mod tests;

use super::*;

use std::sync::Arc;
use std::time::Duration;

use freewheel_core::{DefaultScheduler, Runtime};

/// ~60 FPS frame spacing in nanoseconds.
const FRAME_NANOS: u64 = 16_666_667;

#[derive(Default)]
struct RecordingDelegate {
    deltas: Vec<Point>,
    announced: Vec<Point>,
    finished: u32,
    correction: Option<Point>,
}

impl InertialDelegate for RecordingDelegate {
    fn will_decelerate_with_target(&mut self, target: Point) -> Point {
        self.announced.push(target);
        self.correction.unwrap_or(target)
    }

    fn scrolled_with_delta(&mut self, delta: Point) {
        self.deltas.push(delta);
    }

    fn finished_scrolling(&mut self) {
        self.finished += 1;
    }
}

struct Harness {
    // Keeps the frame-callback registry alive for the updater's weak handle.
    runtime: Runtime,
    now_nanos: u64,
}

impl Harness {
    fn new() -> Self {
        Self {
            runtime: Runtime::new(Arc::new(DefaultScheduler)),
            now_nanos: 0,
        }
    }

    fn updater(&self) -> InertialUpdater {
        InertialUpdater::new(self.runtime.handle())
    }

    fn tick(&mut self) {
        self.now_nanos += FRAME_NANOS;
        self.runtime.handle().drain_frame_callbacks(self.now_nanos);
    }

    fn run_until_idle(&mut self, updater: &InertialUpdater) {
        for _ in 0..1_000 {
            if !updater.is_decelerating() {
                return;
            }
            self.tick();
        }
        panic!("updater did not settle within 1000 frames");
    }
}

/// Feeds equal deltas 16ms apart, like a steady drag.
fn steady_drag(updater: &InertialUpdater, delta: Point, samples: u32) {
    for i in 1..=samples {
        updater.add_drag_delta_at(delta, Duration::from_millis(16 * u64::from(i)));
    }
}

fn total(deltas: &[Point]) -> Point {
    deltas.iter().fold(Point::ZERO, |acc, &d| acc + d)
}

#[test]
fn drag_moves_through_phases() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    assert_eq!(updater.phase(), Phase::Idle);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    assert_eq!(updater.phase(), Phase::Dragging);

    updater.end_dragging();
    assert_eq!(updater.phase(), Phase::Decelerating);

    harness.run_until_idle(&updater);
    assert_eq!(updater.phase(), Phase::Idle);
}

#[test]
fn slow_release_finishes_immediately_without_deltas() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    // 0.5px per 16ms is ~31 px/s, below the 50 px/s fling threshold.
    steady_drag(&updater, Point::new(0.5, 0.0), 3);
    updater.end_dragging();

    assert_eq!(updater.phase(), Phase::Idle);
    assert_eq!(delegate.borrow().finished, 1);
    assert!(delegate.borrow().deltas.is_empty());

    // No frame loop was started.
    assert!(!harness.runtime.needs_frame());
    harness.tick();
    assert_eq!(delegate.borrow().finished, 1);
}

#[test]
fn deltas_shrink_geometrically_and_finish_once() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    // 10px per 16ms: exit velocity 625 px/s.
    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.run_until_idle(&updater);

    let recorded = delegate.borrow();
    assert!(recorded.deltas.len() > 10, "expected a real animation");
    for pair in recorded.deltas.windows(2) {
        assert!(
            pair[1].magnitude() < pair[0].magnitude(),
            "deltas must strictly shrink: {pair:?}"
        );
    }
    assert_eq!(recorded.finished, 1);

    // Total travel is in the ballpark of the projected 200px.
    let travelled = total(&recorded.deltas);
    assert!(travelled.x > 100.0 && travelled.x < 300.0, "got {travelled:?}");
    assert_eq!(travelled.y, 0.0);
}

#[test]
fn announced_target_matches_projected_travel() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.run_until_idle(&updater);

    let recorded = delegate.borrow();
    let first_announced = recorded.announced.first().copied().expect("announced");
    let travelled = total(&recorded.deltas);
    // The uncorrected trajectory should end close to the first estimate;
    // the gap is the truncated sub-epsilon tail.
    assert!(
        (first_announced.x - travelled.x).abs() < 5.0,
        "announced {first_announced:?}, travelled {travelled:?}"
    );
}

#[test]
fn corrected_target_redirects_and_lands_exactly() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate {
        correction: Some(Point::new(40.0, 0.0)),
        ..Default::default()
    }));
    updater.set_delegate(&delegate);

    // Uncorrected, this fling would travel ~200px.
    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.run_until_idle(&updater);

    let recorded = delegate.borrow();
    assert_eq!(recorded.finished, 1);

    let mut position = Point::ZERO;
    for &delta in &recorded.deltas {
        position += delta;
        assert!(
            position.x <= 40.0 + 1e-3,
            "position {position:?} overshot the corrected target"
        );
    }
    assert!(
        (position.x - 40.0).abs() < 1e-3,
        "should land on the corrected target, got {position:?}"
    );
}

#[test]
fn mid_flight_correction_takes_over() {
    struct LateCorrection {
        ticks: u32,
        deltas: Vec<Point>,
        finished: u32,
    }

    impl InertialDelegate for LateCorrection {
        fn will_decelerate_with_target(&mut self, target: Point) -> Point {
            self.ticks += 1;
            // Let the fling run free for five ticks, then clamp it just
            // ahead of wherever it was heading.
            if self.ticks < 5 {
                target
            } else {
                Point::new(60.0, 0.0)
            }
        }

        fn scrolled_with_delta(&mut self, delta: Point) {
            self.deltas.push(delta);
        }

        fn finished_scrolling(&mut self) {
            self.finished += 1;
        }
    }

    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(LateCorrection {
        ticks: 0,
        deltas: Vec::new(),
        finished: 0,
    }));
    updater.set_delegate(&delegate);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.run_until_idle(&updater);

    let recorded = delegate.borrow();
    assert_eq!(recorded.finished, 1);
    let landed = total(&recorded.deltas);
    assert!(
        (landed.x - 60.0).abs() < 1e-3,
        "should land on the late correction, got {landed:?}"
    );
}

#[test]
fn drag_delta_during_deceleration_is_ignored() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.tick();
    harness.tick();

    updater.add_drag_delta_at(Point::new(500.0, 500.0), Duration::from_millis(200));
    assert_eq!(updater.phase(), Phase::Decelerating);

    harness.run_until_idle(&updater);
    let recorded = delegate.borrow();
    assert_eq!(recorded.finished, 1);
    // The stray delta neither restarted nor steered the animation.
    assert_eq!(total(&recorded.deltas).y, 0.0);
}

#[test]
fn end_dragging_while_decelerating_is_a_no_op() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.tick();
    harness.tick();

    updater.end_dragging();
    assert_eq!(updater.phase(), Phase::Decelerating);

    harness.run_until_idle(&updater);
    assert_eq!(delegate.borrow().finished, 1);
}

#[test]
fn cancel_stops_the_stream_without_finished() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.tick();
    harness.tick();
    harness.tick();

    updater.cancel();
    assert_eq!(updater.phase(), Phase::Idle);
    assert!(!harness.runtime.needs_frame());

    let deltas_at_cancel = delegate.borrow().deltas.len();
    harness.tick();
    harness.tick();

    let recorded = delegate.borrow();
    assert_eq!(recorded.deltas.len(), deltas_at_cancel);
    assert_eq!(recorded.finished, 0);
}

#[test]
fn dropped_delegate_is_skipped_and_motion_still_settles() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.tick();
    harness.tick();

    drop(delegate);
    harness.run_until_idle(&updater);
    assert_eq!(updater.phase(), Phase::Idle);
}

#[test]
fn no_delegate_at_all_is_fine() {
    let mut harness = Harness::new();
    let updater = harness.updater();

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.run_until_idle(&updater);
    assert_eq!(updater.phase(), Phase::Idle);
}

#[test]
fn exit_velocity_is_capped() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    // 200px per 16ms would be 12,500 px/s, well over the 8,000 cap.
    steady_drag(&updater, Point::new(200.0, 0.0), 5);
    updater.end_dragging();
    harness.tick();
    harness.tick();

    let first = delegate.borrow().deltas.first().copied().expect("a delta");
    // One damped frame of the capped velocity: 8000 * ~0.948 * ~16.7ms.
    assert!(first.x < 140.0, "cap not applied, first delta {first:?}");
    assert!(first.x > 100.0, "unexpectedly slow, first delta {first:?}");

    updater.cancel();
}

#[test]
fn non_finite_drag_input_is_discarded() {
    let harness = Harness::new();
    let updater = harness.updater();

    updater.add_drag_delta_at(Point::new(f32::NAN, 0.0), Duration::from_millis(16));
    assert_eq!(updater.phase(), Phase::Idle);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.add_drag_delta_at(
        Point::new(f32::INFINITY, f32::NAN),
        Duration::from_millis(64),
    );
    updater.end_dragging();
    assert_eq!(updater.phase(), Phase::Decelerating);
    updater.cancel();
}

#[test]
fn wall_clock_stamping_enters_dragging() {
    let harness = Harness::new();
    let updater = harness.updater();

    updater.add_drag_delta(Point::new(10.0, 0.0));
    assert_eq!(updater.phase(), Phase::Dragging);

    updater.cancel();
    assert_eq!(updater.phase(), Phase::Idle);
}

#[test]
fn updater_can_run_again_after_settling() {
    let mut harness = Harness::new();
    let updater = harness.updater();
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.run_until_idle(&updater);
    assert_eq!(delegate.borrow().finished, 1);

    steady_drag(&updater, Point::new(-10.0, 0.0), 3);
    updater.end_dragging();
    harness.run_until_idle(&updater);

    let recorded = delegate.borrow();
    assert_eq!(recorded.finished, 2);
    // The second episode moved the other way.
    assert!(recorded.deltas.last().expect("deltas").x < 0.0);
}

#[test]
fn heavier_damping_settles_in_fewer_frames() {
    let mut harness = Harness::new();
    let config = InertialConfig {
        decay: DecayCurve::new(0.8),
        ..Default::default()
    };
    let updater = InertialUpdater::with_config(harness.runtime.handle(), config);
    let delegate = Rc::new(RefCell::new(RecordingDelegate::default()));
    updater.set_delegate(&delegate);

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    harness.run_until_idle(&updater);

    let heavy_frames = delegate.borrow().deltas.len();
    // The default 0.95 curve needs well over 100 frames for the same fling.
    assert!(heavy_frames < 50, "expected a short animation, got {heavy_frames} frames");
    assert_eq!(delegate.borrow().finished, 1);
}

#[test]
fn dropping_the_updater_cancels_the_pending_frame() {
    let mut harness = Harness::new();
    let updater = harness.updater();

    steady_drag(&updater, Point::new(10.0, 0.0), 3);
    updater.end_dragging();
    assert!(harness.runtime.needs_frame());

    drop(updater);
    assert!(!harness.runtime.needs_frame());
    harness.tick();
}

//! Single-threaded frame-callback runtime.
//!
//! Components register one-shot callbacks that fire on the next frame; the
//! host pumps [`RuntimeHandle::drain_frame_callbacks`] once per display
//! refresh with the frame timestamp. Registering a callback requests the
//! next frame from the host via [`RuntimeScheduler::schedule_frame`].

use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::FrameClock;

type FrameCallback = Box<dyn FnOnce(u64) + 'static>;

/// Identifies a registered frame callback for cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameCallbackId(u64);

/// Host hook through which the runtime requests another frame.
///
/// Implementations forward to whatever periodic primitive the host has: a
/// vsync callback, `requestAnimationFrame`, or a game-loop tick.
pub trait RuntimeScheduler {
    fn schedule_frame(&self);
}

/// Scheduler for hosts that produce frames unconditionally, and for tests
/// that drive frames by hand.
#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

struct FrameCallbackEntry {
    id: FrameCallbackId,
    callback: Option<FrameCallback>,
}

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    next_frame_callback_id: Cell<u64>,
    frame_callbacks: RefCell<VecDeque<FrameCallbackEntry>>,
    needs_frame: Cell<bool>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            next_frame_callback_id: Cell::new(0),
            frame_callbacks: RefCell::new(VecDeque::new()),
            needs_frame: Cell::new(false),
        }
    }

    fn register_frame_callback(&self, callback: FrameCallback) -> FrameCallbackId {
        let id = FrameCallbackId(self.next_frame_callback_id.get());
        self.next_frame_callback_id.set(id.0 + 1);
        self.frame_callbacks
            .borrow_mut()
            .push_back(FrameCallbackEntry {
                id,
                callback: Some(callback),
            });
        self.needs_frame.set(true);
        self.scheduler.schedule_frame();
        id
    }

    fn cancel_frame_callback(&self, id: FrameCallbackId) {
        let mut callbacks = self.frame_callbacks.borrow_mut();
        if let Some(index) = callbacks.iter().position(|entry| entry.id == id) {
            callbacks.remove(index);
        }
        if callbacks.is_empty() {
            self.needs_frame.set(false);
        }
    }

    fn drain_frame_callbacks(&self, frame_time_nanos: u64) {
        // Take the current batch before running it: callbacks registered
        // while the batch runs belong to the next frame.
        let mut pending: SmallVec<[FrameCallback; 8]> = SmallVec::new();
        {
            let mut callbacks = self.frame_callbacks.borrow_mut();
            while let Some(mut entry) = callbacks.pop_front() {
                if let Some(callback) = entry.callback.take() {
                    pending.push(callback);
                }
            }
        }
        for callback in pending {
            callback(frame_time_nanos);
        }
        self.needs_frame
            .set(!self.frame_callbacks.borrow().is_empty());
    }
}

/// Owns the frame-callback registry. The host keeps the `Runtime` alive and
/// hands [`RuntimeHandle`]s to components.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// True while any frame callback is pending.
    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame.get()
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.handle())
    }
}

/// Weak, cloneable handle to a [`Runtime`]. Every operation becomes a no-op
/// once the runtime has been dropped.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
}

impl RuntimeHandle {
    /// Registers a one-shot callback invoked with the next frame's timestamp
    /// in nanoseconds. Returns `None` when the runtime is gone.
    pub fn register_frame_callback(
        &self,
        callback: impl FnOnce(u64) + 'static,
    ) -> Option<FrameCallbackId> {
        let Some(inner) = self.inner.upgrade() else {
            log::trace!("frame callback dropped: runtime is gone");
            return None;
        };
        Some(inner.register_frame_callback(Box::new(callback)))
    }

    /// Removes a pending callback. Idempotent; unknown ids are ignored.
    pub fn cancel_frame_callback(&self, id: FrameCallbackId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel_frame_callback(id);
        }
    }

    /// Runs the currently pending callbacks with the frame timestamp. Called
    /// by the host once per frame.
    pub fn drain_frame_callbacks(&self, frame_time_nanos: u64) {
        if let Some(inner) = self.inner.upgrade() {
            inner.drain_frame_callbacks(frame_time_nanos);
        }
    }

    pub fn needs_frame(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.needs_frame.get())
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.clone())
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;

use std::cell::{Cell, RefCell};

use foundation::time::Time;

use crate::frame::Frame;

/// Identifies a pending frame callback or timer so it can be cancelled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(pub u64);

pub type FrameCallback = Box<dyn FnOnce(Frame)>;
pub type TimerCallback = Box<dyn FnOnce()>;

/// Host scheduling capability: "run on next display refresh", "run after a
/// delay", and cancellation of either.
///
/// All methods take `&self`; implementations use interior mutability because
/// callbacks routinely schedule their own successors.
pub trait FrameScheduler {
    fn now(&self) -> Time;

    fn request_frame(&self, callback: FrameCallback) -> TaskHandle;

    fn schedule_after(&self, delay_ms: f64, callback: TimerCallback) -> TaskHandle;

    /// Returns `true` if the task was still pending.
    fn cancel(&self, handle: TaskHandle) -> bool;
}

struct PendingTimer {
    handle: TaskHandle,
    due: Time,
    callback: TimerCallback,
}

/// Deterministic scheduler driven explicitly by the caller.
///
/// Nothing runs until [`ManualScheduler::run_frame`] or
/// [`ManualScheduler::advance`] is called. Used by tests and by the CLI
/// simulation; it also counts live callback chains, which is how "at most one
/// animation loop" is checked.
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Time>,
    next_id: Cell<u64>,
    frame_index: Cell<u64>,
    frames: RefCell<Vec<(TaskHandle, FrameCallback)>>,
    timers: RefCell<Vec<PendingTimer>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: Time) -> Self {
        let s = Self::default();
        s.now.set(now);
        s
    }

    fn next_handle(&self) -> TaskHandle {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        TaskHandle(id)
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Runs every frame callback that was pending when called. Callbacks
    /// registered while running wait for the next call, like the browser's
    /// animation frame queue.
    pub fn run_frame(&self) -> usize {
        let batch = std::mem::take(&mut *self.frames.borrow_mut());
        let ran = batch.len();
        if ran == 0 {
            return 0;
        }
        let index = self.frame_index.get();
        self.frame_index.set(index + 1);
        let frame = Frame::new(index, self.now.get());
        for (_handle, callback) in batch {
            callback(frame);
        }
        ran
    }

    /// Moves the clock forward and fires every timer that became due, in due
    /// order. Frame callbacks are not run.
    pub fn advance(&self, ms: f64) -> usize {
        let target = self.now.get().add_millis(ms.max(0.0));
        let mut fired = 0;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let idx = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by(|(_, a), (_, b)| {
                        a.due
                            .partial_cmp(&b.due)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then_with(|| a.handle.cmp(&b.handle))
                    })
                    .map(|(i, _)| i);
                idx.map(|i| timers.remove(i))
            };
            let Some(timer) = next else {
                break;
            };
            if timer.due > self.now.get() {
                self.now.set(timer.due);
            }
            (timer.callback)();
            fired += 1;
        }
        self.now.set(target);
        fired
    }

    /// `advance(dt_ms)` followed by `run_frame()`.
    pub fn step(&self, dt_ms: f64) -> usize {
        self.advance(dt_ms);
        self.run_frame()
    }
}

impl FrameScheduler for ManualScheduler {
    fn now(&self) -> Time {
        self.now.get()
    }

    fn request_frame(&self, callback: FrameCallback) -> TaskHandle {
        let handle = self.next_handle();
        self.frames.borrow_mut().push((handle, callback));
        handle
    }

    fn schedule_after(&self, delay_ms: f64, callback: TimerCallback) -> TaskHandle {
        let handle = self.next_handle();
        let due = self.now.get().add_millis(delay_ms.max(0.0));
        self.timers.borrow_mut().push(PendingTimer {
            handle,
            due,
            callback,
        });
        handle
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        {
            let mut frames = self.frames.borrow_mut();
            if let Some(idx) = frames.iter().position(|(h, _)| *h == handle) {
                drop(frames.remove(idx));
                return true;
            }
        }
        let mut timers = self.timers.borrow_mut();
        if let Some(idx) = timers.iter().position(|t| t.handle == handle) {
            drop(timers.remove(idx));
            return true;
        }
        false
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now.get())
            .field("pending_frames", &self.pending_frames())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

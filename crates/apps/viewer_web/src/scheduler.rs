//! `FrameScheduler` over `requestAnimationFrame` and `setTimeout`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::time::Time;
use runtime::frame::Frame;
use runtime::scheduler::{FrameCallback, FrameScheduler, TaskHandle, TimerCallback};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);

    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout(callback: &JsValue, delay_ms: f64) -> i32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    fn clear_timeout(id: i32);
}

#[derive(Debug, Copy, Clone)]
enum JsTask {
    Frame(i32),
    Timer(i32),
}

/// Browser event-loop scheduler.
///
/// Callbacks are registered as one-shot closures that free themselves after
/// running. A cancelled closure is never invoked and stays allocated.
#[derive(Default)]
pub struct BrowserScheduler {
    next_id: Cell<u64>,
    frame_index: Rc<Cell<u64>>,
    live: Rc<RefCell<BTreeMap<u64, JsTask>>>,
}

impl BrowserScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&self) -> TaskHandle {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        TaskHandle(id)
    }
}

impl FrameScheduler for BrowserScheduler {
    fn now(&self) -> Time {
        Time::from_millis(performance_now())
    }

    fn request_frame(&self, callback: FrameCallback) -> TaskHandle {
        let handle = self.next_handle();
        let live = Rc::clone(&self.live);
        let counter = Rc::clone(&self.frame_index);
        let closure = Closure::once_into_js(move |timestamp_ms: f64| {
            live.borrow_mut().remove(&handle.0);
            let index = counter.get();
            counter.set(index.wrapping_add(1));
            callback(Frame::new(index, Time::from_millis(timestamp_ms)));
        });
        let id = request_animation_frame(&closure);
        self.live.borrow_mut().insert(handle.0, JsTask::Frame(id));
        handle
    }

    fn schedule_after(&self, delay_ms: f64, callback: TimerCallback) -> TaskHandle {
        let handle = self.next_handle();
        let live = Rc::clone(&self.live);
        let closure = Closure::once_into_js(move || {
            live.borrow_mut().remove(&handle.0);
            callback();
        });
        let id = set_timeout(&closure, delay_ms.max(0.0));
        self.live.borrow_mut().insert(handle.0, JsTask::Timer(id));
        handle
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        let Some(task) = self.live.borrow_mut().remove(&handle.0) else {
            return false;
        };
        match task {
            JsTask::Frame(id) => cancel_animation_frame(id),
            JsTask::Timer(id) => clear_timeout(id),
        }
        true
    }
}

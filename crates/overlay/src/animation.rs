//! Per-frame driver that oscillates boundary paint properties.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use foundation::time::Time;
use layers::composer::AnimatedParameter;
use layers::surface::SharedSurface;
use runtime::frame::Frame;
use runtime::metrics::{Metrics, MetricsSnapshot};
use runtime::scheduler::{FrameScheduler, TaskHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::oscillator::Oscillation;

pub const FRAMES_RENDERED: &str = "animation.frames";
pub const FRAMES_NOT_READY: &str = "animation.frames_not_ready";
pub const WRITES_APPLIED: &str = "animation.writes_applied";
pub const WRITES_SKIPPED: &str = "animation.writes_skipped";
pub const WRITES_FAILED: &str = "animation.writes_failed";
pub const ACTIVE_TRACKS: &str = "animation.active_tracks";

/// One oscillated paint parameter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnimationTrack {
    pub parameter: AnimatedParameter,
    pub oscillation: Oscillation,
}

/// Oscillation per animated parameter.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub wall_opacity: Oscillation,
    pub edge_width: Oscillation,
    pub edge_opacity: Oscillation,
    pub pillar_opacity: Oscillation,
    pub inner_glow_opacity: Oscillation,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            wall_opacity: Oscillation::new(3000.0, 0.25, 0.45),
            edge_width: Oscillation::new(2000.0, 2.0, 6.0),
            edge_opacity: Oscillation::new(2500.0, 0.6, 1.0),
            pillar_opacity: Oscillation::new(3500.0, 0.4, 0.8),
            inner_glow_opacity: Oscillation::new(4000.0, 0.04, 0.12),
        }
    }
}

impl AnimationConfig {
    pub fn oscillation(&self, parameter: AnimatedParameter) -> Oscillation {
        match parameter {
            AnimatedParameter::WallOpacity => self.wall_opacity,
            AnimatedParameter::EdgeWidth => self.edge_width,
            AnimatedParameter::EdgeOpacity => self.edge_opacity,
            AnimatedParameter::PillarOpacity => self.pillar_opacity,
            AnimatedParameter::InnerGlowOpacity => self.inner_glow_opacity,
        }
    }

    pub fn tracks(&self) -> Vec<AnimationTrack> {
        AnimatedParameter::ALL
            .into_iter()
            .map(|parameter| AnimationTrack {
                parameter,
                oscillation: self.oscillation(parameter),
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        for track in self.tracks() {
            if !track.oscillation.is_valid() {
                return Err(format!(
                    "animation.{} needs a positive period and min <= max, got {:?}",
                    track.parameter.name(),
                    track.oscillation
                ));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct DriverState {
    /// Bumped by every start and stop; callbacks from older loops exit.
    generation: u64,
    origin: Time,
    pending: Option<TaskHandle>,
    tracks: Vec<AnimationTrack>,
    metrics: Metrics,
}

struct DriverInner {
    surface: SharedSurface,
    scheduler: Rc<dyn FrameScheduler>,
    state: RefCell<DriverState>,
}

/// Drives at most one animation loop against one surface.
///
/// Each frame recomputes every track from wall-clock time since `start` and
/// writes it to its layer. Writes are isolated: a missing layer or a rejected
/// write only affects that parameter for that frame.
pub struct AnimationDriver {
    inner: Rc<DriverInner>,
}

impl AnimationDriver {
    pub fn new(surface: SharedSurface, scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self {
            inner: Rc::new(DriverInner {
                surface,
                scheduler,
                state: RefCell::new(DriverState::default()),
            }),
        }
    }

    /// Cancels any running loop and starts a new one.
    pub fn start(&self, tracks: Vec<AnimationTrack>) {
        self.stop();
        let generation = {
            let mut state = self.inner.state.borrow_mut();
            state.origin = self.inner.scheduler.now();
            let count = i64::try_from(tracks.len()).unwrap_or(i64::MAX);
            state.metrics.set_gauge(ACTIVE_TRACKS, count);
            state.tracks = tracks;
            state.generation
        };
        debug!(generation, "animation started");
        schedule_frame(&self.inner, generation);
    }

    /// Cancels the pending frame. Safe to call when idle or repeatedly.
    pub fn stop(&self) {
        let pending = {
            let mut state = self.inner.state.borrow_mut();
            state.generation = state.generation.wrapping_add(1);
            state.pending.take()
        };
        if let Some(handle) = pending {
            self.inner.scheduler.cancel(handle);
            debug!("animation stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().pending.is_some()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.state.borrow().metrics.snapshot()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.inner.state.borrow().metrics.counter(name)
    }
}

impl Drop for AnimationDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AnimationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("AnimationDriver")
            .field("generation", &state.generation)
            .field("running", &state.pending.is_some())
            .field("tracks", &state.tracks.len())
            .finish()
    }
}

fn schedule_frame(inner: &Rc<DriverInner>, generation: u64) {
    let weak: Weak<DriverInner> = Rc::downgrade(inner);
    let handle = inner.scheduler.request_frame(Box::new(move |frame| {
        if let Some(inner) = weak.upgrade() {
            on_frame(&inner, generation, frame);
        }
    }));
    let mut state = inner.state.borrow_mut();
    if state.generation == generation {
        state.pending = Some(handle);
    } else {
        drop(state);
        inner.scheduler.cancel(handle);
    }
}

fn on_frame(inner: &Rc<DriverInner>, generation: u64, frame: Frame) {
    let (origin, tracks) = {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation {
            trace!(generation, current = state.generation, "stale animation frame");
            return;
        }
        state.pending = None;
        (state.origin, state.tracks.clone())
    };

    let Ok(mut surface) = inner.surface.try_borrow_mut() else {
        // Surface busy in a re-entrant call; try again next frame.
        schedule_frame(inner, generation);
        return;
    };
    if !surface.is_ready() {
        // No writes while the style is away; the phase keeps following the
        // clock so the animation resumes where it would have been.
        drop(surface);
        inner.state.borrow_mut().metrics.inc_counter(FRAMES_NOT_READY, 1);
        trace!("surface not ready; frame skipped");
        schedule_frame(inner, generation);
        return;
    }

    let elapsed = frame.time.elapsed_since(origin);
    let (mut applied, mut skipped, mut failed) = (0u64, 0u64, 0u64);
    for track in &tracks {
        let (layer, property) = track.parameter.target();
        if !surface.has_layer(layer) {
            skipped += 1;
            continue;
        }
        let value = track.oscillation.value_at(elapsed);
        match surface.set_paint_property(layer, property, value) {
            Ok(()) => applied += 1,
            Err(err) => {
                failed += 1;
                trace!(layer, property = property.key(), %err, "paint write failed");
            }
        }
    }
    drop(surface);

    {
        let mut state = inner.state.borrow_mut();
        state.metrics.inc_counter(FRAMES_RENDERED, 1);
        state.metrics.inc_counter(WRITES_APPLIED, applied);
        state.metrics.inc_counter(WRITES_SKIPPED, skipped);
        state.metrics.inc_counter(WRITES_FAILED, failed);
    }
    schedule_frame(inner, generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::bounds::BoundingBox;
    use layers::boundary::{BoundarySource, GeometryBuilder};
    use layers::composer::{GLOW_LAYER, INNER_LAYER, LayerComposer, WALLS_LAYER};
    use layers::layer::PaintProperty;
    use layers::surface::{InMemorySurface, RenderSurface};
    use pretty_assertions::assert_eq;
    use runtime::scheduler::ManualScheduler;

    struct Fixture {
        surface: Rc<RefCell<InMemorySurface>>,
        scheduler: Rc<ManualScheduler>,
        driver: AnimationDriver,
    }

    fn fixture() -> Fixture {
        let surface = Rc::new(RefCell::new(InMemorySurface::new()));
        let composer = LayerComposer::default();
        let bounds = BoundingBox::from_corners([[0.0, 0.0], [1.0, 1.0]]).unwrap();
        let geometry = GeometryBuilder::default().build(&BoundarySource::Bounds(bounds));
        composer
            .install(&mut *surface.borrow_mut(), &composer.compose(&geometry))
            .unwrap();
        let scheduler = Rc::new(ManualScheduler::new());
        let shared: SharedSurface = surface.clone();
        let driver = AnimationDriver::new(shared, scheduler.clone());
        Fixture {
            surface,
            scheduler,
            driver,
        }
    }

    #[test]
    fn start_twice_keeps_one_callback_chain() {
        let f = fixture();
        f.driver.start(AnimationConfig::default().tracks());
        f.driver.start(AnimationConfig::default().tracks());
        assert_eq!(f.scheduler.pending_frames(), 1);
        for _ in 0..5 {
            f.scheduler.step(16.0);
            assert_eq!(f.scheduler.pending_frames(), 1);
        }
        assert_eq!(f.driver.counter(FRAMES_RENDERED), 5);
        assert!(f.driver.metrics().gauges.contains(&(ACTIVE_TRACKS, 5)));
    }

    #[test]
    fn stop_is_idempotent() {
        let f = fixture();
        f.driver.stop();
        f.driver.start(AnimationConfig::default().tracks());
        f.driver.stop();
        f.driver.stop();
        assert!(!f.driver.is_running());
        assert_eq!(f.scheduler.pending_frames(), 0);
        assert_eq!(f.scheduler.step(16.0), 0);
    }

    #[test]
    fn writes_follow_wall_clock() {
        let f = fixture();
        f.driver.start(AnimationConfig::default().tracks());
        f.scheduler.run_frame();
        let s = f.surface.borrow();
        assert_eq!(s.paint_value(WALLS_LAYER, PaintProperty::FillExtrusionOpacity), Some(0.25));
        assert_eq!(s.paint_value(GLOW_LAYER, PaintProperty::LineWidth), Some(2.0));
        drop(s);

        f.scheduler.step(1000.0);
        let width = f.surface.borrow().paint_value(GLOW_LAYER, PaintProperty::LineWidth).unwrap();
        assert!((width - 6.0).abs() < 1e-9, "{width}");
    }

    #[test]
    fn missing_layer_is_skipped_and_loop_continues() {
        let f = fixture();
        f.surface.borrow_mut().remove_layer(INNER_LAYER).unwrap();
        f.driver.start(AnimationConfig::default().tracks());
        f.scheduler.run_frame();
        assert_eq!(f.driver.counter(WRITES_SKIPPED), 1);
        assert_eq!(f.driver.counter(WRITES_APPLIED), 4);
        assert!(f.driver.is_running());
    }

    #[test]
    fn failed_write_is_isolated() {
        let f = fixture();
        f.surface.borrow_mut().fail_paint_writes_on(GLOW_LAYER);
        f.driver.start(AnimationConfig::default().tracks());
        f.scheduler.run_frame();
        assert_eq!(f.driver.counter(WRITES_FAILED), 2);
        assert_eq!(f.driver.counter(WRITES_APPLIED), 3);
        assert_eq!(f.scheduler.pending_frames(), 1);
    }

    #[test]
    fn unready_frames_skip_writes_and_keep_loop() {
        let f = fixture();
        f.driver.start(AnimationConfig::default().tracks());
        f.surface.borrow_mut().set_ready(false);
        f.scheduler.run_frame();
        assert_eq!(f.scheduler.pending_frames(), 1);
        assert_eq!(f.driver.counter(FRAMES_NOT_READY), 1);
        assert_eq!(f.surface.borrow().paint_writes(), 0);
        assert!(f.driver.is_running());
    }

    #[test]
    fn animation_resumes_after_readiness_blip() {
        let f = fixture();
        f.driver.start(AnimationConfig::default().tracks());
        f.scheduler.run_frame();
        let before = f.surface.borrow().paint_value(GLOW_LAYER, PaintProperty::LineWidth);

        f.surface.borrow_mut().set_ready(false);
        f.scheduler.step(16.0);
        f.surface.borrow_mut().set_ready(true);
        for _ in 0..30 {
            f.scheduler.step(16.0);
        }

        let after = f.surface.borrow().paint_value(GLOW_LAYER, PaintProperty::LineWidth);
        assert_ne!(before, after);
        assert_eq!(f.scheduler.pending_frames(), 1);
        assert_eq!(f.driver.counter(FRAMES_NOT_READY), 1);
        assert_eq!(f.driver.counter(FRAMES_RENDERED), 31);
    }

    #[test]
    fn dropping_driver_cancels_frame() {
        let f = fixture();
        f.driver.start(AnimationConfig::default().tracks());
        let scheduler = f.scheduler.clone();
        drop(f);
        assert_eq!(scheduler.pending_frames(), 0);
    }

    #[test]
    fn invalid_track_is_reported() {
        let config = AnimationConfig {
            edge_width: Oscillation::new(2000.0, 6.0, 2.0),
            ..AnimationConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("edge_width"));
        assert_eq!(AnimationConfig::default().validate(), Ok(()));
    }
}

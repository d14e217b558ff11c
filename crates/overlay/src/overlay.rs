//! Map-level coordinator: observation markers, buildings, the boundary
//! session and basemap switching.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use formats::geojson::FeatureCollection;
use formats::observations::{Observation, extent, observations_to_geojson};
use layers::boundary::BoundarySource;
use layers::buildings::{COMPOSITE_SOURCE, install_buildings};
use layers::markers::install_markers;
use layers::surface::SharedSurface;
use runtime::metrics::MetricsSnapshot;
use runtime::retry::RetryDecision;
use runtime::scheduler::{FrameScheduler, TaskHandle};
use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::error::OverlayError;
use crate::session::{BoundarySession, SessionState};

/// Progress of re-adding overlays after a style load.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReattachStatus {
    Idle,
    /// Waiting for the `composite` source; `attempt` is the next check.
    Waiting { attempt: u32 },
    Attached,
    /// Gave up on buildings after `attempts` checks; markers and boundary
    /// were restored without them.
    Failed { attempts: u32 },
}

struct OverlayState {
    markers: Option<FeatureCollection>,
    status: ReattachStatus,
    retry: Option<TaskHandle>,
    /// Bumped on every style load or switch; stale retries exit.
    generation: u64,
}

struct OverlayInner {
    surface: SharedSurface,
    scheduler: Rc<dyn FrameScheduler>,
    config: OverlayConfig,
    session: RefCell<BoundarySession>,
    state: RefCell<OverlayState>,
}

/// Everything the app draws on top of the basemap.
///
/// Cloning is cheap and yields a handle to the same overlay.
#[derive(Clone)]
pub struct MapOverlay {
    inner: Rc<OverlayInner>,
}

impl MapOverlay {
    pub fn new(
        surface: SharedSurface,
        scheduler: Rc<dyn FrameScheduler>,
        config: OverlayConfig,
    ) -> Result<Self, OverlayError> {
        config.validate()?;
        let session = BoundarySession::new(surface.clone(), scheduler.clone(), &config);
        Ok(Self {
            inner: Rc::new(OverlayInner {
                surface,
                scheduler,
                config,
                session: RefCell::new(session),
                state: RefCell::new(OverlayState {
                    markers: None,
                    status: ReattachStatus::Idle,
                    retry: None,
                    generation: 0,
                }),
            }),
        })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.inner.config
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.session.borrow().state()
    }

    pub fn reattach_status(&self) -> ReattachStatus {
        self.inner.state.borrow().status
    }

    pub fn animation_metrics(&self) -> MetricsSnapshot {
        self.inner.session.borrow().driver().metrics()
    }

    /// Replaces the marker data and frames the boundary around it.
    pub fn set_observations(&self, observations: &[Observation]) -> Result<SessionState, OverlayError> {
        let data = observations_to_geojson(observations);
        info!(
            received = observations.len(),
            mapped = data.len(),
            "observations updated"
        );
        self.inner.state.borrow_mut().markers = Some(data.clone());
        {
            let mut surface = self.inner.surface.borrow_mut();
            if surface.is_ready() {
                install_markers(&mut *surface, &self.inner.config.markers, data)?;
            }
        }
        match extent(observations) {
            Some(bounds) => self.show_boundary(BoundarySource::Bounds(bounds)),
            None => {
                self.hide_boundary();
                Ok(SessionState::Absent)
            }
        }
    }

    pub fn show_boundary(&self, source: BoundarySource) -> Result<SessionState, OverlayError> {
        self.inner.session.borrow_mut().show(source)
    }

    pub fn hide_boundary(&self) {
        self.inner.session.borrow_mut().hide();
    }

    /// Loads another basemap style from the configured catalog.
    ///
    /// Custom layers do not survive a style load; call
    /// [`MapOverlay::on_style_loaded`] once the host reports the new style.
    pub fn switch_basemap(&self, name: &str) -> Result<(), OverlayError> {
        let url = self
            .inner
            .config
            .basemap(name)
            .map(|b| b.url.clone())
            .ok_or_else(|| OverlayError::UnknownBasemap(name.to_string()))?;
        // A rejected style leaves the current one and its layers in place.
        self.inner.surface.borrow_mut().load_style(&url)?;
        cancel_retry(&self.inner, ReattachStatus::Idle);
        self.inner.session.borrow_mut().on_style_change();
        info!(basemap = name, %url, "basemap switch requested");
        Ok(())
    }

    /// Re-adds buildings, markers and the boundary after a style load,
    /// waiting a bounded number of times for the `composite` source.
    pub fn on_style_loaded(&self) -> ReattachStatus {
        let generation = cancel_retry(&self.inner, ReattachStatus::Waiting { attempt: 1 });
        // A load event can arrive without a preceding switch (first load).
        self.inner.session.borrow_mut().on_style_change();
        attempt_reattach(&self.inner, generation, 1);
        self.reattach_status()
    }
}

impl std::fmt::Debug for MapOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapOverlay")
            .field("session", &self.session_state())
            .field("reattach", &self.reattach_status())
            .finish()
    }
}

/// Cancels a pending retry, starts a new generation and sets `status`.
fn cancel_retry(inner: &OverlayInner, status: ReattachStatus) -> u64 {
    let (pending, generation) = {
        let mut state = inner.state.borrow_mut();
        state.generation = state.generation.wrapping_add(1);
        state.status = status;
        (state.retry.take(), state.generation)
    };
    if let Some(handle) = pending
        && inner.scheduler.cancel(handle)
    {
        debug!("pending reattach retry cancelled");
    }
    generation
}

fn attempt_reattach(inner: &Rc<OverlayInner>, generation: u64, attempt: u32) {
    {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation {
            return;
        }
        state.retry = None;
    }
    let composite_ready = {
        let surface = inner.surface.borrow();
        surface.is_ready() && surface.has_source(COMPOSITE_SOURCE)
    };
    if composite_ready {
        attach(inner, true);
        inner.state.borrow_mut().status = ReattachStatus::Attached;
        debug!(attempt, "overlays reattached");
        return;
    }

    match inner.config.reattach.after_failure(attempt) {
        RetryDecision::RetryAfter { delay_ms, attempt: next } => {
            let weak: Weak<OverlayInner> = Rc::downgrade(inner);
            let handle = inner.scheduler.schedule_after(
                delay_ms,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        attempt_reattach(&inner, generation, next);
                    }
                }),
            );
            let mut state = inner.state.borrow_mut();
            state.status = ReattachStatus::Waiting { attempt: next };
            state.retry = Some(handle);
        }
        RetryDecision::GiveUp { attempts } => {
            warn!(
                attempts,
                "composite source never became available; continuing without 3d buildings"
            );
            attach(inner, false);
            inner.state.borrow_mut().status = ReattachStatus::Failed { attempts };
        }
    }
}

/// Buildings go in first so markers land on top of them and the boundary
/// slides beneath both.
fn attach(inner: &OverlayInner, with_buildings: bool) {
    if with_buildings {
        let mut surface = inner.surface.borrow_mut();
        if let Err(err) = install_buildings(&mut *surface, &inner.config.buildings) {
            warn!(%err, "failed to add 3d buildings");
        }
    }
    let markers = inner.state.borrow().markers.clone();
    if let Some(data) = markers {
        let mut surface = inner.surface.borrow_mut();
        if let Err(err) = install_markers(&mut *surface, &inner.config.markers, data) {
            warn!(%err, "failed to restore observation markers");
        }
    }
    if let Err(err) = inner.session.borrow_mut().restore() {
        warn!(%err, "failed to restore realm boundary");
    }
}

//! Boundary lifecycle on one surface: Absent until shown, Active while its
//! layers are installed and animating.

use std::rc::Rc;

use layers::boundary::{BoundarySource, GeometryBuilder};
use layers::composer::LayerComposer;
use layers::surface::SharedSurface;
use runtime::scheduler::FrameScheduler;
use tracing::{debug, info, warn};

use crate::animation::{AnimationConfig, AnimationDriver};
use crate::config::OverlayConfig;
use crate::error::OverlayError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Active,
}

pub struct BoundarySession {
    surface: SharedSurface,
    builder: GeometryBuilder,
    composer: LayerComposer,
    animation: AnimationConfig,
    driver: AnimationDriver,
    state: SessionState,
    /// Last boundary asked for, replayed by [`BoundarySession::restore`].
    source: Option<BoundarySource>,
}

impl BoundarySession {
    pub fn new(
        surface: SharedSurface,
        scheduler: Rc<dyn FrameScheduler>,
        config: &OverlayConfig,
    ) -> Self {
        let driver = AnimationDriver::new(surface.clone(), scheduler);
        Self {
            surface,
            builder: GeometryBuilder::new(config.geometry),
            composer: LayerComposer::new(config.boundary.clone()),
            animation: config.animation,
            driver,
            state: SessionState::Absent,
            source: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source(&self) -> Option<&BoundarySource> {
        self.source.as_ref()
    }

    pub fn driver(&self) -> &AnimationDriver {
        &self.driver
    }

    /// Replaces whatever boundary is shown with `source`.
    ///
    /// Ends Absent when the geometry is empty or the surface has no loaded
    /// style yet; the source is still remembered for [`Self::restore`].
    pub fn show(&mut self, source: BoundarySource) -> Result<SessionState, OverlayError> {
        self.teardown();
        let geometry = self.builder.build(&source);
        self.source = Some(source);
        if geometry.is_empty() {
            debug!("boundary geometry is empty; nothing to show");
            return Ok(self.state);
        }
        if !self.surface.borrow().is_ready() {
            debug!("surface not ready; boundary deferred until the style loads");
            return Ok(self.state);
        }

        let set = self.composer.compose(&geometry);
        {
            let mut surface = self.surface.borrow_mut();
            if let Err(err) = self.composer.install(&mut *surface, &set) {
                self.composer.remove(&mut *surface);
                warn!(%err, "boundary install failed; partial install removed");
                return Err(err.into());
            }
        }
        self.driver.start(self.animation.tracks());
        self.state = SessionState::Active;
        info!(
            mode = ?geometry.mode,
            walls = geometry.walls.len(),
            layers = set.layers.len(),
            "boundary shown"
        );
        Ok(self.state)
    }

    /// Stops the animation and removes the boundary. No-op when Absent.
    pub fn hide(&mut self) {
        self.teardown();
        self.source = None;
    }

    /// The surface dropped every custom layer along with the old style.
    /// Stops animating without touching layer names that no longer exist.
    pub fn on_style_change(&mut self) {
        self.driver.stop();
        if self.state == SessionState::Active {
            debug!("style change; boundary waits for restore");
        }
        self.state = SessionState::Absent;
    }

    /// Shows the remembered boundary again after a style load.
    pub fn restore(&mut self) -> Result<SessionState, OverlayError> {
        match self.source.clone() {
            Some(source) => self.show(source),
            None => Ok(self.state),
        }
    }

    fn teardown(&mut self) {
        // Stop before removing so no frame targets a half-removed set.
        self.driver.stop();
        if self.state == SessionState::Active {
            self.composer.remove(&mut *self.surface.borrow_mut());
            self.state = SessionState::Absent;
        }
    }
}

impl std::fmt::Debug for BoundarySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundarySession")
            .field("state", &self.state)
            .field("source", &self.source)
            .field("driver", &self.driver)
            .finish()
    }
}

impl Drop for BoundarySession {
    fn drop(&mut self) {
        self.driver.stop();
    }
}

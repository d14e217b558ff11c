//! Animated realm boundary overlay: geometry, layers, animation and the
//! session lifecycle tying them to a map surface.

pub mod animation;
pub mod config;
pub mod error;
pub mod oscillator;
pub mod overlay;
pub mod session;

pub use animation::{AnimationConfig, AnimationDriver, AnimationTrack};
pub use config::{BasemapStyle, ObservationsConfig, OverlayConfig};
pub use error::OverlayError;
pub use oscillator::{Oscillation, ease_in_out_sine};
pub use overlay::{MapOverlay, ReattachStatus};
pub use session::{BoundarySession, SessionState};

use std::collections::BTreeSet;

use layers::boundary::GeometryParams;
use layers::symbology::{BoundaryStyle, BuildingsStyle, MarkerStyle};
use runtime::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationConfig;
use crate::error::OverlayError;

/// A named basemap style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasemapStyle {
    pub name: String,
    pub url: String,
}

impl BasemapStyle {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationsConfig {
    /// Base URL of the realm API, without the `/realms/...` suffix.
    pub api_base: String,
    pub per_page: u32,
}

impl Default for ObservationsConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            per_page: 200,
        }
    }
}

/// Every tunable of the overlay. Missing fields take their defaults, so a
/// partial JSON document only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub geometry: GeometryParams,
    pub boundary: BoundaryStyle,
    pub markers: MarkerStyle,
    pub buildings: BuildingsStyle,
    pub animation: AnimationConfig,
    /// Waiting for the basemap's `composite` source after a style load.
    pub reattach: RetryPolicy,
    pub basemaps: Vec<BasemapStyle>,
    pub observations: ObservationsConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryParams::default(),
            boundary: BoundaryStyle::default(),
            markers: MarkerStyle::default(),
            buildings: BuildingsStyle::default(),
            animation: AnimationConfig::default(),
            reattach: RetryPolicy::default(),
            basemaps: vec![
                BasemapStyle::new("streets", "mapbox://styles/mapbox/streets-v12"),
                BasemapStyle::new("outdoors", "mapbox://styles/mapbox/outdoors-v12"),
                BasemapStyle::new("satellite", "mapbox://styles/mapbox/satellite-streets-v12"),
                BasemapStyle::new("light", "mapbox://styles/mapbox/light-v11"),
                BasemapStyle::new("dark", "mapbox://styles/mapbox/dark-v11"),
            ],
            observations: ObservationsConfig::default(),
        }
    }
}

impl OverlayConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, OverlayError> {
        let config: OverlayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OverlayError> {
        if !self.geometry.is_valid() {
            return Err(OverlayError::InvalidConfig(format!(
                "geometry thickness and pillar radius must be positive, got {:?}",
                self.geometry
            )));
        }
        self.boundary.validate().map_err(OverlayError::InvalidConfig)?;
        self.animation.validate().map_err(OverlayError::InvalidConfig)?;
        if self.reattach.max_attempts == 0 || !(self.reattach.delay_ms >= 0.0) {
            return Err(OverlayError::InvalidConfig(format!(
                "reattach needs at least one attempt and a non-negative delay, got {:?}",
                self.reattach
            )));
        }
        let mut names = BTreeSet::new();
        for b in &self.basemaps {
            if !names.insert(b.name.as_str()) {
                return Err(OverlayError::InvalidConfig(format!(
                    "duplicate basemap name {:?}",
                    b.name
                )));
            }
        }
        Ok(())
    }

    pub fn basemap(&self, name: &str) -> Option<&BasemapStyle> {
        self.basemaps.iter().find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        OverlayConfig::default().validate().unwrap();
        assert_eq!(
            OverlayConfig::default().basemap("dark").map(|b| b.url.as_str()),
            Some("mapbox://styles/mapbox/dark-v11")
        );
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = OverlayConfig::from_json_str(
            r##"{ "reattach": { "max_attempts": 3 }, "boundary": { "wall_color": "#ff00ff" } }"##,
        )
        .unwrap();
        assert_eq!(config.reattach, RetryPolicy::new(250.0, 3));
        assert_eq!(config.boundary.wall_color.as_str(), "#ff00ff");
        assert_eq!(config.boundary.wall_height_m, BoundaryStyle::default().wall_height_m);
        assert_eq!(config.basemaps.len(), 5);
    }

    #[test]
    fn rejects_invalid_documents() {
        assert!(matches!(
            OverlayConfig::from_json_str("{"),
            Err(OverlayError::ConfigJson(_))
        ));
        assert!(matches!(
            OverlayConfig::from_json_str(r#"{ "reattach": { "max_attempts": 0 } }"#),
            Err(OverlayError::InvalidConfig(_))
        ));
        assert!(matches!(
            OverlayConfig::from_json_str(r#"{ "boundary": { "pillar_height_m": 10 } }"#),
            Err(OverlayError::InvalidConfig(_))
        ));
        let dup = r#"{ "basemaps": [ { "name": "a", "url": "x" }, { "name": "a", "url": "y" } ] }"#;
        assert!(matches!(
            OverlayConfig::from_json_str(dup),
            Err(OverlayError::InvalidConfig(msg)) if msg.contains("duplicate")
        ));
    }
}

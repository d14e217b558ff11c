use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::layer::{PaintProperty, SourceSpec, VisualLayerSpec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("source {0:?} already exists")]
    DuplicateSource(String),
    #[error("layer {0:?} already exists")]
    DuplicateLayer(String),
    #[error("source {0:?} not found")]
    SourceNotFound(String),
    #[error("layer {0:?} not found")]
    LayerNotFound(String),
    #[error("source {source_id:?} is still used by layer {layer:?}")]
    SourceInUse { source_id: String, layer: String },
    #[error("render backend error: {0}")]
    Backend(String),
}

/// The slice of a map renderer the overlay needs: a named table of sources
/// and layers plus paint property writes.
///
/// Implementations must tolerate requests against names that no longer
/// exist by returning an error, never by panicking; callers treat those
/// errors as teardown races.
pub trait RenderSurface {
    /// Whether the surface currently has a loaded style that accepts layers.
    fn is_ready(&self) -> bool;

    fn has_source(&self, id: &str) -> bool;

    fn has_layer(&self, id: &str) -> bool;

    fn add_source(&mut self, source: &SourceSpec) -> Result<(), SurfaceError>;

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError>;

    /// Adds `layer` directly beneath `before`, or on top when `before` is `None`.
    fn add_layer(&mut self, layer: &VisualLayerSpec, before: Option<&str>)
    -> Result<(), SurfaceError>;

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError>;

    fn set_paint_property(
        &mut self,
        layer: &str,
        property: PaintProperty,
        value: f64,
    ) -> Result<(), SurfaceError>;

    /// Replaces the basemap style. Every custom source and layer is
    /// discarded and the surface is not ready until the new style loads.
    fn load_style(&mut self, url: &str) -> Result<(), SurfaceError>;
}

pub type SharedSurface = Rc<RefCell<dyn RenderSurface>>;

/// Removes a layer if present. Returns whether anything was removed.
pub fn remove_layer_if_present(surface: &mut dyn RenderSurface, id: &str) -> bool {
    if !surface.has_layer(id) {
        return false;
    }
    match surface.remove_layer(id) {
        Ok(()) => true,
        Err(err) => {
            debug!(layer = id, %err, "layer vanished during removal");
            false
        }
    }
}

/// Removes a source if present. Returns whether anything was removed.
pub fn remove_source_if_present(surface: &mut dyn RenderSurface, id: &str) -> bool {
    if !surface.has_source(id) {
        return false;
    }
    match surface.remove_source(id) {
        Ok(()) => true,
        Err(err) => {
            debug!(source = id, %err, "source removal failed");
            false
        }
    }
}

/// First candidate layer currently present on the surface.
pub fn first_present_layer<'a>(
    surface: &dyn RenderSurface,
    candidates: &[&'a str],
) -> Option<&'a str> {
    candidates.iter().copied().find(|id| surface.has_layer(id))
}

#[derive(Debug, Clone, PartialEq)]
struct SourceEntry {
    /// Provided by the basemap style rather than added by the overlay.
    builtin: bool,
    feature_count: usize,
    clustered: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct LayerEntry {
    id: String,
    source: String,
    type_name: &'static str,
}

/// Render surface kept entirely in memory.
///
/// Models the parts of a real map renderer the overlay relies on: layer
/// ordering with `before` anchors, source-in-use checks, style reloads that
/// wipe custom content, and readiness. Paint writes can be made to fail per
/// layer to exercise teardown races.
#[derive(Debug, Clone)]
pub struct InMemorySurface {
    style_url: Option<String>,
    ready: bool,
    sources: BTreeMap<String, SourceEntry>,
    /// Bottom to top.
    layers: Vec<LayerEntry>,
    paint: BTreeMap<(String, PaintProperty), f64>,
    paint_writes: u64,
    failing_layers: BTreeSet<String>,
    reject_styles: bool,
}

impl Default for InMemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySurface {
    /// A ready surface without basemap sources.
    pub fn new() -> Self {
        Self {
            style_url: None,
            ready: true,
            sources: BTreeMap::new(),
            layers: Vec::new(),
            paint: BTreeMap::new(),
            paint_writes: 0,
            failing_layers: BTreeSet::new(),
            reject_styles: false,
        }
    }

    /// A ready surface whose style provides the given sources.
    pub fn with_style(url: &str, builtin_sources: &[&str]) -> Self {
        let mut s = Self::new();
        s.style_url = Some(url.to_string());
        s.insert_builtin_sources(builtin_sources);
        s
    }

    fn insert_builtin_sources(&mut self, ids: &[&str]) {
        for id in ids {
            self.sources.insert(
                (*id).to_string(),
                SourceEntry {
                    builtin: true,
                    feature_count: 0,
                    clustered: false,
                },
            );
        }
    }

    /// Completes a pending [`RenderSurface::load_style`].
    pub fn finish_style_load(&mut self, builtin_sources: &[&str]) {
        self.insert_builtin_sources(builtin_sources);
        self.ready = true;
    }

    /// Adds a basemap-provided source after the style loaded, as happens when
    /// a vector source finishes initializing late.
    pub fn add_builtin_source(&mut self, id: &str) {
        self.insert_builtin_sources(&[id]);
    }

    /// Simulates a layer that belongs to the basemap style itself.
    pub fn add_builtin_layer(&mut self, id: &str, source: &str) {
        self.layers.push(LayerEntry {
            id: id.to_string(),
            source: source.to_string(),
            type_name: "background",
        });
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn style_url(&self) -> Option<&str> {
        self.style_url.as_deref()
    }

    /// Layer ids, bottom to top.
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    /// Sources added through [`RenderSurface::add_source`].
    pub fn custom_source_ids(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, s)| !s.builtin)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn layer_type(&self, id: &str) -> Option<&'static str> {
        self.layers.iter().find(|l| l.id == id).map(|l| l.type_name)
    }

    pub fn source_feature_count(&self, id: &str) -> Option<usize> {
        self.sources.get(id).map(|s| s.feature_count)
    }

    pub fn is_clustered(&self, id: &str) -> bool {
        self.sources.get(id).is_some_and(|s| s.clustered)
    }

    pub fn paint_value(&self, layer: &str, property: PaintProperty) -> Option<f64> {
        self.paint.get(&(layer.to_string(), property)).copied()
    }

    /// Successful paint writes since creation.
    pub fn paint_writes(&self) -> u64 {
        self.paint_writes
    }

    /// Makes every paint write to `layer` fail with a backend error.
    pub fn fail_paint_writes_on(&mut self, layer: &str) {
        self.failing_layers.insert(layer.to_string());
    }

    /// Makes every [`RenderSurface::load_style`] fail and keep the current
    /// style, as a renderer does when it rejects the new style document.
    pub fn reject_style_loads(&mut self, reject: bool) {
        self.reject_styles = reject;
    }

    fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }
}

impl RenderSurface for InMemorySurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layer_index(id).is_some()
    }

    fn add_source(&mut self, source: &SourceSpec) -> Result<(), SurfaceError> {
        if self.sources.contains_key(&source.id) {
            return Err(SurfaceError::DuplicateSource(source.id.clone()));
        }
        self.sources.insert(
            source.id.clone(),
            SourceEntry {
                builtin: false,
                feature_count: source.data.len(),
                clustered: source.cluster.is_some(),
            },
        );
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError> {
        if let Some(user) = self.layers.iter().find(|l| l.source == id) {
            return Err(SurfaceError::SourceInUse {
                source_id: id.to_string(),
                layer: user.id.clone(),
            });
        }
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SurfaceError::SourceNotFound(id.to_string()))
    }

    fn add_layer(
        &mut self,
        layer: &VisualLayerSpec,
        before: Option<&str>,
    ) -> Result<(), SurfaceError> {
        if self.has_layer(&layer.id) {
            return Err(SurfaceError::DuplicateLayer(layer.id.clone()));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(SurfaceError::SourceNotFound(layer.source.clone()));
        }
        let entry = LayerEntry {
            id: layer.id.clone(),
            source: layer.source.clone(),
            type_name: layer.kind.type_name(),
        };
        match before {
            Some(anchor) => {
                let idx = self
                    .layer_index(anchor)
                    .ok_or_else(|| SurfaceError::LayerNotFound(anchor.to_string()))?;
                self.layers.insert(idx, entry);
            }
            None => self.layers.push(entry),
        }
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        let idx = self
            .layer_index(id)
            .ok_or_else(|| SurfaceError::LayerNotFound(id.to_string()))?;
        self.layers.remove(idx);
        self.paint.retain(|(layer, _), _| layer != id);
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        layer: &str,
        property: PaintProperty,
        value: f64,
    ) -> Result<(), SurfaceError> {
        if !self.has_layer(layer) {
            return Err(SurfaceError::LayerNotFound(layer.to_string()));
        }
        if self.failing_layers.contains(layer) {
            return Err(SurfaceError::Backend(format!(
                "paint write to {layer} rejected"
            )));
        }
        self.paint.insert((layer.to_string(), property), value);
        self.paint_writes += 1;
        Ok(())
    }

    fn load_style(&mut self, url: &str) -> Result<(), SurfaceError> {
        if self.reject_styles {
            return Err(SurfaceError::Backend(format!("style {url} rejected")));
        }
        self.style_url = Some(url.to_string());
        self.sources.clear();
        self.layers.clear();
        self.paint.clear();
        self.ready = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{FillPaint, LayerKind};
    use crate::symbology::Color;
    use formats::geojson::FeatureCollection;
    use pretty_assertions::assert_eq;

    fn fill(id: &str, source: &str) -> VisualLayerSpec {
        VisualLayerSpec::new(
            id,
            source,
            LayerKind::Fill(FillPaint {
                color: Color::new("#000"),
                opacity: 1.0,
            }),
        )
    }

    fn surface_with_source() -> InMemorySurface {
        let mut s = InMemorySurface::new();
        s.add_source(&SourceSpec::geojson("src", FeatureCollection::default()))
            .unwrap();
        s
    }

    #[test]
    fn before_anchor_inserts_beneath() {
        let mut s = surface_with_source();
        s.add_layer(&fill("top", "src"), None).unwrap();
        s.add_layer(&fill("a", "src"), Some("top")).unwrap();
        s.add_layer(&fill("b", "src"), Some("top")).unwrap();
        assert_eq!(s.layer_ids(), vec!["a", "b", "top"]);
    }

    #[test]
    fn missing_anchor_and_duplicates_are_errors() {
        let mut s = surface_with_source();
        assert_eq!(
            s.add_layer(&fill("a", "src"), Some("nope")),
            Err(SurfaceError::LayerNotFound("nope".into()))
        );
        s.add_layer(&fill("a", "src"), None).unwrap();
        assert_eq!(
            s.add_layer(&fill("a", "src"), None),
            Err(SurfaceError::DuplicateLayer("a".into()))
        );
        assert_eq!(
            s.add_layer(&fill("b", "other"), None),
            Err(SurfaceError::SourceNotFound("other".into()))
        );
    }

    #[test]
    fn source_in_use_cannot_be_removed() {
        let mut s = surface_with_source();
        s.add_layer(&fill("a", "src"), None).unwrap();
        assert!(matches!(
            s.remove_source("src"),
            Err(SurfaceError::SourceInUse { .. })
        ));
        s.remove_layer("a").unwrap();
        s.remove_source("src").unwrap();
        assert!(!s.has_source("src"));
    }

    #[test]
    fn paint_write_to_missing_layer_is_an_error_not_a_panic() {
        let mut s = InMemorySurface::new();
        assert_eq!(
            s.set_paint_property("gone", PaintProperty::LineWidth, 2.0),
            Err(SurfaceError::LayerNotFound("gone".into()))
        );
    }

    #[test]
    fn load_style_discards_custom_content() {
        let mut s = InMemorySurface::with_style("mapbox://styles/a", &["composite"]);
        s.add_source(&SourceSpec::geojson("src", FeatureCollection::default()))
            .unwrap();
        s.add_layer(&fill("a", "src"), None).unwrap();

        s.load_style("mapbox://styles/b").unwrap();
        assert!(!s.is_ready());
        assert!(s.layer_ids().is_empty());
        assert!(!s.has_source("composite"));

        s.finish_style_load(&["composite"]);
        assert!(s.is_ready());
        assert!(s.has_source("composite"));
        assert!(s.custom_source_ids().is_empty());
        assert_eq!(s.style_url(), Some("mapbox://styles/b"));
    }

    #[test]
    fn helpers_ignore_missing_names() {
        let mut s = surface_with_source();
        assert!(!remove_layer_if_present(&mut s, "missing"));
        assert!(remove_source_if_present(&mut s, "src"));
        assert!(!remove_source_if_present(&mut s, "src"));
        s.add_builtin_layer("clusters", "basemap");
        assert_eq!(
            first_present_layer(&s, &["3d-buildings", "clusters"]),
            Some("clusters")
        );
    }
}

//! Extruded basemap buildings from the style's `composite` vector source.

use serde_json::json;
use tracing::debug;

use crate::layer::{FillExtrusionPaint, LayerKind, VisualLayerSpec};
use crate::markers::MARKER_LAYERS;
use crate::surface::{RenderSurface, SurfaceError, first_present_layer, remove_layer_if_present};
use crate::symbology::{BuildingsStyle, PaintValue};

pub const BUILDINGS_LAYER: &str = "3d-buildings";
pub const COMPOSITE_SOURCE: &str = "composite";

pub fn buildings_layer(style: &BuildingsStyle) -> VisualLayerSpec {
    let mut layer = VisualLayerSpec::new(
        BUILDINGS_LAYER,
        COMPOSITE_SOURCE,
        LayerKind::FillExtrusion(FillExtrusionPaint {
            color: style.color.clone(),
            height: PaintValue::Expression(json!(["get", "height"])),
            base: PaintValue::Expression(json!(["get", "min_height"])),
            opacity: style.opacity,
        }),
    )
    .with_filter(json!(["==", "extrude", "true"]));
    layer.source_layer = Some("building".to_string());
    layer.min_zoom = Some(style.min_zoom);
    layer
}

/// Installs the buildings layer beneath the markers.
///
/// Returns `Ok(false)` without touching the surface when the style has no
/// `composite` source yet.
pub fn install_buildings(
    surface: &mut dyn RenderSurface,
    style: &BuildingsStyle,
) -> Result<bool, SurfaceError> {
    if !surface.has_source(COMPOSITE_SOURCE) {
        return Ok(false);
    }
    remove_layer_if_present(surface, BUILDINGS_LAYER);
    let anchor = first_present_layer(surface, &MARKER_LAYERS);
    surface.add_layer(&buildings_layer(style), anchor)?;
    debug!(anchor = anchor.unwrap_or("<top>"), "installed 3d buildings");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::install_markers;
    use crate::surface::InMemorySurface;
    use crate::symbology::MarkerStyle;
    use formats::geojson::FeatureCollection;
    use pretty_assertions::assert_eq;

    #[test]
    fn layer_reads_heights_from_tiles() {
        let v = buildings_layer(&BuildingsStyle::default()).to_style_json();
        assert_eq!(v["source-layer"], "building");
        assert_eq!(v["minzoom"], 14.0);
        assert_eq!(v["paint"]["fill-extrusion-height"], json!(["get", "height"]));
    }

    #[test]
    fn skipped_without_composite_source() {
        let mut surface = InMemorySurface::new();
        assert_eq!(install_buildings(&mut surface, &BuildingsStyle::default()), Ok(false));
        assert!(surface.layer_ids().is_empty());
    }

    #[test]
    fn sits_beneath_markers() {
        let mut surface = InMemorySurface::with_style("mapbox://styles/x", &[COMPOSITE_SOURCE]);
        install_markers(&mut surface, &MarkerStyle::default(), FeatureCollection::default()).unwrap();
        assert_eq!(install_buildings(&mut surface, &BuildingsStyle::default()), Ok(true));
        assert_eq!(install_buildings(&mut surface, &BuildingsStyle::default()), Ok(true));
        assert_eq!(
            surface.layer_ids(),
            vec![BUILDINGS_LAYER, "clusters", "cluster-count", "unclustered-point"]
        );
    }
}

//! Clustered observation markers.

use formats::geojson::FeatureCollection;
use serde_json::json;
use tracing::debug;

use crate::layer::{
    CirclePaint, ClusterOptions, LayerKind, SourceSpec, SymbolStyle, VisualLayerSpec,
};
use crate::surface::{RenderSurface, SurfaceError, remove_layer_if_present, remove_source_if_present};
use crate::symbology::{MarkerStyle, PaintValue};

pub const OBSERVATIONS_SOURCE: &str = "observations";
pub const CLUSTERS_LAYER: &str = "clusters";
pub const CLUSTER_COUNT_LAYER: &str = "cluster-count";
pub const UNCLUSTERED_LAYER: &str = "unclustered-point";

/// Marker layers, bottom to top.
pub const MARKER_LAYERS: [&str; 3] = [CLUSTERS_LAYER, CLUSTER_COUNT_LAYER, UNCLUSTERED_LAYER];

pub fn compose_markers(style: &MarkerStyle, data: FeatureCollection) -> (SourceSpec, Vec<VisualLayerSpec>) {
    let source = SourceSpec::geojson(OBSERVATIONS_SOURCE, data).clustered(ClusterOptions {
        max_zoom: style.cluster_max_zoom,
        radius_px: style.cluster_radius_px,
    });

    let clusters = VisualLayerSpec::new(
        CLUSTERS_LAYER,
        OBSERVATIONS_SOURCE,
        LayerKind::Circle(CirclePaint {
            color: PaintValue::Expression(json!(style.cluster_color.as_str())),
            // 20px below 100 points, 30px below 750, 40px above.
            radius: PaintValue::Expression(json!(["step", ["get", "point_count"], 20, 100, 30, 750, 40])),
            stroke_color: style.point_stroke_color.clone(),
            stroke_width: 1.0,
        }),
    )
    .with_filter(json!(["has", "point_count"]));

    let count = VisualLayerSpec::new(
        CLUSTER_COUNT_LAYER,
        OBSERVATIONS_SOURCE,
        LayerKind::Symbol(SymbolStyle {
            text_field: json!(["get", "point_count_abbreviated"]),
            text_size: 12.0,
            text_color: style.cluster_text_color.clone(),
        }),
    )
    .with_filter(json!(["has", "point_count"]));

    let points = VisualLayerSpec::new(
        UNCLUSTERED_LAYER,
        OBSERVATIONS_SOURCE,
        LayerKind::Circle(CirclePaint {
            color: PaintValue::Expression(json!(style.point_color.as_str())),
            radius: PaintValue::Constant(style.point_radius_px),
            stroke_color: style.point_stroke_color.clone(),
            stroke_width: 1.0,
        }),
    )
    .with_filter(json!(["!", ["has", "point_count"]]));

    (source, vec![clusters, count, points])
}

/// Removes marker layers then the marker source.
pub fn remove_markers(surface: &mut dyn RenderSurface) {
    for id in MARKER_LAYERS.iter().rev() {
        remove_layer_if_present(surface, id);
    }
    remove_source_if_present(surface, OBSERVATIONS_SOURCE);
}

/// Replaces the marker source and layers. Markers always sit on top.
pub fn install_markers(
    surface: &mut dyn RenderSurface,
    style: &MarkerStyle,
    data: FeatureCollection,
) -> Result<(), SurfaceError> {
    remove_markers(surface);
    let count = data.len();
    let (source, layers) = compose_markers(style, data);
    surface.add_source(&source)?;
    for layer in &layers {
        surface.add_layer(layer, None)?;
    }
    debug!(features = count, "installed observation markers");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::InMemorySurface;
    use formats::geojson::{Feature, Geometry};
    use foundation::geo::LonLat;
    use pretty_assertions::assert_eq;

    fn points(n: usize) -> FeatureCollection {
        (0..n)
            .map(|i| Feature::new(Geometry::point(LonLat::new(i as f64, 0.0))))
            .collect()
    }

    #[test]
    fn composes_clustered_source_and_three_layers() {
        let (source, layers) = compose_markers(&MarkerStyle::default(), points(2));
        assert_eq!(source.cluster.map(|c| c.max_zoom), Some(14));
        let ids: Vec<&str> = layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, MARKER_LAYERS.to_vec());
        assert_eq!(layers[0].to_style_json()["paint"]["circle-color"], "#51bbd6");
        assert_eq!(
            layers[2].to_style_json()["filter"],
            json!(["!", ["has", "point_count"]])
        );
    }

    #[test]
    fn install_replaces_previous_markers() {
        let mut surface = InMemorySurface::new();
        install_markers(&mut surface, &MarkerStyle::default(), points(3)).unwrap();
        install_markers(&mut surface, &MarkerStyle::default(), points(5)).unwrap();
        assert_eq!(surface.layer_ids(), MARKER_LAYERS.to_vec());
        assert_eq!(surface.source_feature_count(OBSERVATIONS_SOURCE), Some(5));
        assert!(surface.is_clustered(OBSERVATIONS_SOURCE));
    }

    #[test]
    fn remove_is_safe_when_absent() {
        let mut surface = InMemorySurface::new();
        remove_markers(&mut surface);
        install_markers(&mut surface, &MarkerStyle::default(), points(1)).unwrap();
        remove_markers(&mut surface);
        assert!(surface.layer_ids().is_empty());
        assert!(surface.custom_source_ids().is_empty());
    }
}

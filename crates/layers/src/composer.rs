//! Turns boundary geometry into sources and stacked layers on a surface.

use serde_json::json;
use tracing::{debug, trace};

use crate::boundary::{BoundaryGeometry, BoundaryMode};
use crate::layer::{
    FillExtrusionPaint, FillPaint, LayerKind, LinePaint, PaintProperty, SourceSpec,
    VisualLayerSpec,
};
use crate::surface::{
    RenderSurface, SurfaceError, first_present_layer, remove_layer_if_present,
    remove_source_if_present,
};
use crate::symbology::{BoundaryStyle, PaintValue};

pub const WALLS_SOURCE: &str = "realm-boundary-walls";
pub const PILLARS_SOURCE: &str = "realm-boundary-pillars";
pub const OUTLINE_SOURCE: &str = "realm-boundary-outline";
pub const INNER_SOURCE: &str = "realm-boundary-inner";

pub const INNER_LAYER: &str = "realm-boundary-inner";
pub const WALLS_LAYER: &str = "realm-boundary-walls";
pub const PILLARS_LAYER: &str = "realm-boundary-pillars";
pub const BASE_LAYER: &str = "realm-boundary-base";
pub const GLOW_LAYER: &str = "realm-boundary-glow";

/// Every source id the composer may install.
pub const BOUNDARY_SOURCES: [&str; 4] = [WALLS_SOURCE, PILLARS_SOURCE, OUTLINE_SOURCE, INNER_SOURCE];

/// Every layer id the composer may install, bottom to top.
pub const BOUNDARY_LAYERS: [&str; 5] = [INNER_LAYER, WALLS_LAYER, PILLARS_LAYER, BASE_LAYER, GLOW_LAYER];

/// Layers the boundary must stay beneath, in lookup order.
pub const Z_ANCHORS: [&str; 4] = ["3d-buildings", "clusters", "cluster-count", "unclustered-point"];

/// Paint parameters the animation driver oscillates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnimatedParameter {
    WallOpacity,
    EdgeWidth,
    EdgeOpacity,
    PillarOpacity,
    InnerGlowOpacity,
}

impl AnimatedParameter {
    pub const ALL: [AnimatedParameter; 5] = [
        AnimatedParameter::WallOpacity,
        AnimatedParameter::EdgeWidth,
        AnimatedParameter::EdgeOpacity,
        AnimatedParameter::PillarOpacity,
        AnimatedParameter::InnerGlowOpacity,
    ];

    /// Layer and paint property the parameter is written to.
    pub fn target(self) -> (&'static str, PaintProperty) {
        match self {
            AnimatedParameter::WallOpacity => (WALLS_LAYER, PaintProperty::FillExtrusionOpacity),
            AnimatedParameter::EdgeWidth => (GLOW_LAYER, PaintProperty::LineWidth),
            AnimatedParameter::EdgeOpacity => (GLOW_LAYER, PaintProperty::LineOpacity),
            AnimatedParameter::PillarOpacity => (PILLARS_LAYER, PaintProperty::FillExtrusionOpacity),
            AnimatedParameter::InnerGlowOpacity => (INNER_LAYER, PaintProperty::FillOpacity),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AnimatedParameter::WallOpacity => "wall_opacity",
            AnimatedParameter::EdgeWidth => "edge_width",
            AnimatedParameter::EdgeOpacity => "edge_opacity",
            AnimatedParameter::PillarOpacity => "pillar_opacity",
            AnimatedParameter::InnerGlowOpacity => "inner_glow_opacity",
        }
    }
}

/// Sources and layers for one boundary, layers ordered bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLayers {
    pub sources: Vec<SourceSpec>,
    pub layers: Vec<VisualLayerSpec>,
}

impl BoundaryLayers {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerComposer {
    style: BoundaryStyle,
}

impl LayerComposer {
    pub fn new(style: BoundaryStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &BoundaryStyle {
        &self.style
    }

    pub fn compose(&self, geometry: &BoundaryGeometry) -> BoundaryLayers {
        let mut sources = Vec::new();
        let mut layers = Vec::new();
        if geometry.is_empty() {
            return BoundaryLayers { sources, layers };
        }
        let s = &self.style;
        let rectangle = geometry.mode == BoundaryMode::Rectangle;

        if rectangle && let Some(inner) = geometry.inner_geojson() {
            sources.push(SourceSpec::geojson(INNER_SOURCE, inner));
            layers.push(VisualLayerSpec::new(
                INNER_LAYER,
                INNER_SOURCE,
                LayerKind::Fill(FillPaint {
                    color: s.inner_color.clone(),
                    opacity: s.inner_opacity,
                }),
            ));
        }

        sources.push(SourceSpec::geojson(WALLS_SOURCE, geometry.walls_geojson()));
        layers.push(VisualLayerSpec::new(
            WALLS_LAYER,
            WALLS_SOURCE,
            LayerKind::FillExtrusion(FillExtrusionPaint {
                color: s.wall_color.clone(),
                height: PaintValue::Constant(s.wall_height_m),
                base: PaintValue::Constant(0.0),
                opacity: s.wall_opacity,
            }),
        ));

        if rectangle && !geometry.pillars.is_empty() {
            sources.push(SourceSpec::geojson(PILLARS_SOURCE, geometry.pillars_geojson()));
            layers.push(VisualLayerSpec::new(
                PILLARS_LAYER,
                PILLARS_SOURCE,
                LayerKind::FillExtrusion(FillExtrusionPaint {
                    color: s.pillar_color.clone(),
                    height: PaintValue::Constant(s.pillar_height_m),
                    base: PaintValue::Constant(0.0),
                    opacity: s.pillar_opacity,
                }),
            ));
        }

        sources.push(SourceSpec::geojson(OUTLINE_SOURCE, geometry.outline_geojson()));
        layers.push(VisualLayerSpec::new(
            BASE_LAYER,
            OUTLINE_SOURCE,
            LayerKind::Line(LinePaint {
                color: s.base_color.clone(),
                width: s.base_width_px,
                opacity: s.base_opacity,
                blur: 0.0,
            }),
        ));
        layers.push(
            VisualLayerSpec::new(
                GLOW_LAYER,
                OUTLINE_SOURCE,
                LayerKind::Line(LinePaint {
                    color: s.glow_color.clone(),
                    width: s.glow_width_px,
                    opacity: s.glow_opacity,
                    blur: s.glow_blur_px,
                }),
            )
            .with_filter(json!(["==", ["get", "kind"], "outline"])),
        );

        BoundaryLayers { sources, layers }
    }

    /// Replaces any previously installed boundary with `set`.
    ///
    /// On error the surface may hold a partial install; callers clean up with
    /// [`LayerComposer::remove`].
    pub fn install(
        &self,
        surface: &mut dyn RenderSurface,
        set: &BoundaryLayers,
    ) -> Result<(), SurfaceError> {
        self.remove(surface);
        for source in &set.sources {
            surface.add_source(source)?;
        }
        let anchor = first_present_layer(surface, &Z_ANCHORS);
        for layer in &set.layers {
            surface.add_layer(layer, anchor)?;
        }
        debug!(
            sources = set.sources.len(),
            layers = set.layers.len(),
            anchor = anchor.unwrap_or("<top>"),
            "installed boundary layers"
        );
        Ok(())
    }

    /// Removes every boundary layer, then every boundary source. Missing
    /// names are ignored.
    pub fn remove(&self, surface: &mut dyn RenderSurface) {
        let mut removed = 0usize;
        for id in BOUNDARY_LAYERS.iter().rev() {
            removed += usize::from(remove_layer_if_present(surface, id));
        }
        for id in BOUNDARY_SOURCES {
            removed += usize::from(remove_source_if_present(surface, id));
        }
        if removed > 0 {
            trace!(removed, "removed boundary layers and sources");
        }
    }
}

use formats::geojson::FeatureCollection;
use serde_json::{Map, Value, json};

use crate::symbology::{Color, PaintValue};

/// Numeric paint properties the animation driver is allowed to write.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaintProperty {
    FillOpacity,
    FillExtrusionOpacity,
    LineWidth,
    LineOpacity,
}

impl PaintProperty {
    /// Style-spec property name.
    pub fn key(self) -> &'static str {
        match self {
            PaintProperty::FillOpacity => "fill-opacity",
            PaintProperty::FillExtrusionOpacity => "fill-extrusion-opacity",
            PaintProperty::LineWidth => "line-width",
            PaintProperty::LineOpacity => "line-opacity",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillPaint {
    pub color: Color,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillExtrusionPaint {
    pub color: Color,
    pub height: PaintValue,
    pub base: PaintValue,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePaint {
    pub color: Color,
    pub width: f64,
    pub opacity: f64,
    pub blur: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CirclePaint {
    pub color: PaintValue,
    pub radius: PaintValue,
    pub stroke_color: Color,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolStyle {
    pub text_field: Value,
    pub text_size: f64,
    pub text_color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Fill(FillPaint),
    FillExtrusion(FillExtrusionPaint),
    Line(LinePaint),
    Circle(CirclePaint),
    Symbol(SymbolStyle),
}

impl LayerKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            LayerKind::Fill(_) => "fill",
            LayerKind::FillExtrusion(_) => "fill-extrusion",
            LayerKind::Line(_) => "line",
            LayerKind::Circle(_) => "circle",
            LayerKind::Symbol(_) => "symbol",
        }
    }

    fn paint_json(&self) -> Value {
        match self {
            LayerKind::Fill(p) => json!({
                "fill-color": p.color.as_str(),
                "fill-opacity": p.opacity,
            }),
            LayerKind::FillExtrusion(p) => json!({
                "fill-extrusion-color": p.color.as_str(),
                "fill-extrusion-height": p.height.to_json(),
                "fill-extrusion-base": p.base.to_json(),
                "fill-extrusion-opacity": p.opacity,
            }),
            LayerKind::Line(p) => json!({
                "line-color": p.color.as_str(),
                "line-width": p.width,
                "line-opacity": p.opacity,
                "line-blur": p.blur,
            }),
            LayerKind::Circle(p) => json!({
                "circle-color": p.color.to_json(),
                "circle-radius": p.radius.to_json(),
                "circle-stroke-color": p.stroke_color.as_str(),
                "circle-stroke-width": p.stroke_width,
            }),
            LayerKind::Symbol(s) => json!({
                "text-color": s.text_color.as_str(),
            }),
        }
    }

    fn layout_json(&self) -> Option<Value> {
        match self {
            LayerKind::Line(_) => Some(json!({ "line-join": "round", "line-cap": "round" })),
            LayerKind::Symbol(s) => Some(json!({
                "text-field": s.text_field,
                "text-size": s.text_size,
            })),
            _ => None,
        }
    }
}

/// Declarative description of one render layer.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualLayerSpec {
    pub id: String,
    pub source: String,
    /// Layer inside a vector tile source (e.g. `building` in `composite`).
    pub source_layer: Option<String>,
    pub kind: LayerKind,
    pub filter: Option<Value>,
    pub min_zoom: Option<f64>,
}

impl VisualLayerSpec {
    pub fn new(id: impl Into<String>, source: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            source_layer: None,
            kind,
            filter: None,
            min_zoom: None,
        }
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Layer object in the map style JSON layout, ready for `addLayer`.
    pub fn to_style_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".into(), Value::from(self.id.as_str()));
        obj.insert("type".into(), Value::from(self.kind.type_name()));
        obj.insert("source".into(), Value::from(self.source.as_str()));
        if let Some(sl) = &self.source_layer {
            obj.insert("source-layer".into(), Value::from(sl.as_str()));
        }
        if let Some(filter) = &self.filter {
            obj.insert("filter".into(), filter.clone());
        }
        if let Some(z) = self.min_zoom {
            obj.insert("minzoom".into(), Value::from(z));
        }
        if let Some(layout) = self.kind.layout_json() {
            obj.insert("layout".into(), layout);
        }
        obj.insert("paint".into(), self.kind.paint_json());
        Value::Object(obj)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClusterOptions {
    pub max_zoom: u8,
    pub radius_px: u32,
}

/// A named GeoJSON source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub id: String,
    pub data: FeatureCollection,
    pub cluster: Option<ClusterOptions>,
}

impl SourceSpec {
    pub fn geojson(id: impl Into<String>, data: FeatureCollection) -> Self {
        Self {
            id: id.into(),
            data,
            cluster: None,
        }
    }

    pub fn clustered(mut self, options: ClusterOptions) -> Self {
        self.cluster = Some(options);
        self
    }

    /// Source object in the map style JSON layout, ready for `addSource`.
    pub fn to_style_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::from("geojson"));
        obj.insert("data".into(), self.data.to_value());
        if let Some(c) = self.cluster {
            obj.insert("cluster".into(), Value::from(true));
            obj.insert("clusterMaxZoom".into(), Value::from(c.max_zoom));
            obj.insert("clusterRadius".into(), Value::from(c.radius_px));
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formats::geojson::FeatureCollection;
    use pretty_assertions::assert_eq;

    #[test]
    fn extrusion_layer_style_json() {
        let spec = VisualLayerSpec::new(
            "walls",
            "walls-src",
            LayerKind::FillExtrusion(FillExtrusionPaint {
                color: Color::new("#00ffff"),
                height: PaintValue::Constant(600.0),
                base: PaintValue::Constant(0.0),
                opacity: 0.4,
            }),
        );
        assert_eq!(
            spec.to_style_json(),
            json!({
                "id": "walls",
                "type": "fill-extrusion",
                "source": "walls-src",
                "paint": {
                    "fill-extrusion-color": "#00ffff",
                    "fill-extrusion-height": 600.0,
                    "fill-extrusion-base": 0.0,
                    "fill-extrusion-opacity": 0.4
                }
            })
        );
    }

    #[test]
    fn line_layer_carries_layout_and_filter() {
        let spec = VisualLayerSpec::new(
            "edge",
            "outline",
            LayerKind::Line(LinePaint {
                color: Color::new("#fff"),
                width: 2.0,
                opacity: 1.0,
                blur: 0.0,
            }),
        )
        .with_filter(json!(["==", "kind", "outline"]));
        let v = spec.to_style_json();
        assert_eq!(v["layout"]["line-join"], "round");
        assert_eq!(v["filter"], json!(["==", "kind", "outline"]));
    }

    #[test]
    fn clustered_source_json() {
        let src = SourceSpec::geojson("obs", FeatureCollection::default()).clustered(ClusterOptions {
            max_zoom: 14,
            radius_px: 50,
        });
        let v = src.to_style_json();
        assert_eq!(v["type"], "geojson");
        assert_eq!(v["cluster"], true);
        assert_eq!(v["clusterMaxZoom"], 14);
        assert_eq!(v["data"]["type"], "FeatureCollection");
    }

    #[test]
    fn paint_keys_match_style_spec() {
        assert_eq!(PaintProperty::FillExtrusionOpacity.key(), "fill-extrusion-opacity");
        assert_eq!(PaintProperty::LineWidth.key(), "line-width");
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CSS color string as understood by the map style spec (`#rrggbb`, `rgba(...)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(css: impl Into<String>) -> Self {
        Self(css.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Color {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A paint value: a constant or a style expression evaluated by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaintValue {
    Constant(f64),
    Expression(Value),
}

impl PaintValue {
    pub fn to_json(&self) -> Value {
        match self {
            PaintValue::Constant(v) => Value::from(*v),
            PaintValue::Expression(e) => e.clone(),
        }
    }
}

impl From<f64> for PaintValue {
    fn from(v: f64) -> Self {
        PaintValue::Constant(v)
    }
}

/// Base (un-animated) look of the boundary layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryStyle {
    pub wall_color: Color,
    pub wall_height_m: f64,
    pub wall_opacity: f64,
    pub pillar_color: Color,
    /// Must exceed `wall_height_m` so pillars read as posts above the walls.
    pub pillar_height_m: f64,
    pub pillar_opacity: f64,
    pub glow_color: Color,
    pub glow_width_px: f64,
    pub glow_opacity: f64,
    pub glow_blur_px: f64,
    pub base_color: Color,
    pub base_width_px: f64,
    pub base_opacity: f64,
    pub inner_color: Color,
    pub inner_opacity: f64,
}

impl Default for BoundaryStyle {
    fn default() -> Self {
        Self {
            wall_color: Color::new("#00e5ff"),
            wall_height_m: 600.0,
            wall_opacity: 0.35,
            pillar_color: Color::new("#7df9ff"),
            pillar_height_m: 900.0,
            pillar_opacity: 0.6,
            glow_color: Color::new("#b2fbff"),
            glow_width_px: 4.0,
            glow_opacity: 0.9,
            glow_blur_px: 2.0,
            base_color: Color::new("#00b8d4"),
            base_width_px: 2.0,
            base_opacity: 0.6,
            inner_color: Color::new("#00e5ff"),
            inner_opacity: 0.08,
        }
    }
}

impl BoundaryStyle {
    /// Checks the ordering and range constraints between fields.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.wall_height_m > 0.0) {
            return Err(format!("wall_height_m must be positive, got {}", self.wall_height_m));
        }
        if !(self.pillar_height_m > self.wall_height_m) {
            return Err(format!(
                "pillar_height_m ({}) must exceed wall_height_m ({})",
                self.pillar_height_m, self.wall_height_m
            ));
        }
        for (name, v) in [
            ("wall_opacity", self.wall_opacity),
            ("pillar_opacity", self.pillar_opacity),
            ("glow_opacity", self.glow_opacity),
            ("base_opacity", self.base_opacity),
            ("inner_opacity", self.inner_opacity),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{name} must be within [0, 1], got {v}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub cluster_color: Color,
    pub cluster_text_color: Color,
    pub point_color: Color,
    pub point_radius_px: f64,
    pub point_stroke_color: Color,
    /// Zoom above which points are never clustered.
    pub cluster_max_zoom: u8,
    pub cluster_radius_px: u32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            cluster_color: Color::new("#51bbd6"),
            cluster_text_color: Color::new("#ffffff"),
            point_color: Color::new("#11b4da"),
            point_radius_px: 6.0,
            point_stroke_color: Color::new("#ffffff"),
            cluster_max_zoom: 14,
            cluster_radius_px: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingsStyle {
    pub color: Color,
    pub opacity: f64,
    pub min_zoom: f64,
}

impl Default for BuildingsStyle {
    fn default() -> Self {
        Self {
            color: Color::new("#aaaaaa"),
            opacity: 0.6,
            min_zoom: 14.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundaryStyle, PaintValue};
    use serde_json::json;

    #[test]
    fn default_style_is_valid() {
        assert_eq!(BoundaryStyle::default().validate(), Ok(()));
    }

    #[test]
    fn pillars_must_be_taller_than_walls() {
        let style = BoundaryStyle {
            pillar_height_m: 100.0,
            ..BoundaryStyle::default()
        };
        assert!(style.validate().unwrap_err().contains("pillar_height_m"));
    }

    #[test]
    fn opacity_out_of_range_is_rejected() {
        let style = BoundaryStyle {
            glow_opacity: 1.5,
            ..BoundaryStyle::default()
        };
        assert!(style.validate().unwrap_err().contains("glow_opacity"));
    }

    #[test]
    fn paint_values_deserialize_untagged() {
        let c: PaintValue = serde_json::from_value(json!(3.5)).unwrap();
        let e: PaintValue = serde_json::from_value(json!(["get", "height"])).unwrap();
        assert_eq!(c, PaintValue::Constant(3.5));
        assert_eq!(e.to_json(), json!(["get", "height"]));
    }
}

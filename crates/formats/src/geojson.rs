//! The slice of GeoJSON (RFC 7946) the overlay produces: points, line strings
//! and single-ring polygons in feature collections.

use foundation::geo::LonLat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl Geometry {
    pub fn point(p: LonLat) -> Self {
        Geometry::Point {
            coordinates: p.to_array(),
        }
    }

    pub fn line_string(points: &[LonLat]) -> Self {
        Geometry::LineString {
            coordinates: points.iter().map(|p| p.to_array()).collect(),
        }
    }

    /// Single outer ring. The ring is expected to be closed already.
    pub fn polygon(ring: &[LonLat]) -> Self {
        Geometry::Polygon {
            coordinates: vec![ring.iter().map(|p| p.to_array()).collect()],
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureCollectionTag {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    tag: FeatureTag,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    tag: FeatureCollectionTag,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            tag: FeatureCollectionTag::FeatureCollection,
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn to_value(&self) -> Value {
        // Serializing these types cannot fail: keys are strings and numbers
        // are plain f64 (serde_json maps non-finite floats to null).
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Feature, FeatureCollection, Geometry};
    use foundation::geo::LonLat;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serializes_standard_layout() {
        let fc = FeatureCollection::new(vec![
            Feature::new(Geometry::point(LonLat::new(1.5, -2.0))).with_property("id", 7),
        ]);
        assert_eq!(
            fc.to_value(),
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [1.5, -2.0] },
                    "properties": { "id": 7 }
                }]
            })
        );
    }

    #[test]
    fn polygon_wraps_single_ring() {
        let ring = [
            LonLat::new(0.0, 0.0),
            LonLat::new(1.0, 0.0),
            LonLat::new(1.0, 1.0),
            LonLat::new(0.0, 0.0),
        ];
        let Geometry::Polygon { coordinates } = Geometry::polygon(&ring) else {
            panic!("expected polygon");
        };
        assert_eq!(coordinates.len(), 1);
        assert_eq!(coordinates[0].len(), 4);
    }

    #[test]
    fn parses_back_what_it_writes() {
        let fc: FeatureCollection = [Feature::new(Geometry::line_string(&[
            LonLat::new(0.0, 0.0),
            LonLat::new(2.0, 3.0),
        ]))]
        .into_iter()
        .collect();
        let text = serde_json::to_string(&fc).unwrap();
        let back: FeatureCollection = serde_json::from_str(&text).unwrap();
        assert_eq!(back, fc);
    }
}

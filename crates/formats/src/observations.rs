use std::fmt;

use foundation::bounds::BoundingBox;
use foundation::geo::LonLat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FormatError;
use crate::geojson::{Feature, FeatureCollection, Geometry};

/// Observation ids arrive as numbers from some realms and strings from others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationId::Number(n) => write!(f, "{n}"),
            ObservationId::Text(s) => f.write_str(s),
        }
    }
}

/// A single biodiversity sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: ObservationId,
    #[serde(default, alias = "lng", alias = "lon")]
    pub longitude: Option<f64>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default, alias = "photo_url")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub observed_on: Option<String>,
}

impl Observation {
    /// Coordinates, if present, finite and within WGS84 ranges.
    pub fn position(&self) -> Option<LonLat> {
        let p = LonLat::new(self.longitude?, self.latitude?);
        if !p.is_finite() || p.lon.abs() > 180.0 || p.lat.abs() > 90.0 {
            return None;
        }
        Some(p)
    }

    /// Common name, falling back to the scientific name.
    pub fn display_name(&self) -> Option<&str> {
        self.common_name
            .as_deref()
            .or(self.scientific_name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ObservationResponse {
    Page { results: Vec<Observation> },
    Bare(Vec<Observation>),
}

/// Parses a realm observations response: either `{ "results": [...] }` or a
/// bare array.
pub fn parse_observations(json: &str) -> Result<Vec<Observation>, FormatError> {
    let parsed: ObservationResponse = serde_json::from_str(json)?;
    let observations = match parsed {
        ObservationResponse::Page { results } => results,
        ObservationResponse::Bare(list) => list,
    };
    debug!(count = observations.len(), "parsed observations");
    Ok(observations)
}

/// Bounding box of every observation with usable coordinates.
pub fn extent(observations: &[Observation]) -> Option<BoundingBox> {
    BoundingBox::from_points(observations.iter().filter_map(Observation::position))
}

/// Arithmetic mean of usable coordinates.
pub fn center(observations: &[Observation]) -> Option<LonLat> {
    let mut sum_lon = 0.0;
    let mut sum_lat = 0.0;
    let mut count = 0usize;
    for p in observations.iter().filter_map(Observation::position) {
        sum_lon += p.lon;
        sum_lat += p.lat;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some(LonLat::new(sum_lon / n, sum_lat / n))
}

/// Point features for the clustered marker source. Observations without
/// usable coordinates are dropped.
pub fn observations_to_geojson(observations: &[Observation]) -> FeatureCollection {
    let mut skipped = 0usize;
    let features: Vec<Feature> = observations
        .iter()
        .filter_map(|o| {
            let Some(p) = o.position() else {
                skipped += 1;
                return None;
            };
            let mut feature =
                Feature::new(Geometry::point(p)).with_property("id", o.id.to_string());
            if let Some(name) = o.display_name() {
                feature = feature.with_property("name", name);
            }
            if let Some(s) = &o.scientific_name {
                feature = feature.with_property("scientific_name", s.as_str());
            }
            if let Some(url) = &o.image_url {
                feature = feature.with_property("image_url", url.as_str());
            }
            if let Some(date) = &o.observed_on {
                feature = feature.with_property("observed_on", date.as_str());
            }
            Some(feature)
        })
        .collect();
    if skipped > 0 {
        debug!(skipped, "observations without usable coordinates");
    }
    FeatureCollection::new(features)
}

/// `{base}/realms/{realm}/observations?per_page={per_page}`.
pub fn realm_observations_url(base: &str, realm: &str, per_page: u32) -> Result<String, FormatError> {
    let valid = !realm.is_empty()
        && realm
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(FormatError::InvalidRealm(realm.to_string()));
    }
    Ok(format!(
        "{}/realms/{realm}/observations?per_page={per_page}",
        base.trim_end_matches('/')
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"{
        "results": [
            { "id": 1, "longitude": 10.0, "latitude": 50.0, "common_name": "Red Fox",
              "scientific_name": "Vulpes vulpes", "image_url": "https://img/1.jpg" },
            { "id": "abc", "lng": 12.0, "lat": 48.0, "scientific_name": "Bufo bufo" },
            { "id": 3, "longitude": null, "latitude": 49.0 },
            { "id": 4, "longitude": 200.0, "latitude": 49.0 }
        ]
    }"#;

    #[test]
    fn parses_page_and_bare_array() {
        let page = parse_observations(PAGE).unwrap();
        assert_eq!(page.len(), 4);
        assert_eq!(page[1].id, ObservationId::Text("abc".into()));
        assert_eq!(page[1].position(), Some(LonLat::new(12.0, 48.0)));

        let bare = parse_observations(r#"[{ "id": 9, "lon": 1.0, "lat": 2.0 }]"#).unwrap();
        assert_eq!(bare[0].position(), Some(LonLat::new(1.0, 2.0)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse_observations("{ not json"),
            Err(FormatError::Json(_))
        ));
    }

    #[test]
    fn extent_and_center_skip_unusable_coordinates() {
        let obs = parse_observations(PAGE).unwrap();
        let b = extent(&obs).unwrap();
        assert_eq!(b.sw(), LonLat::new(10.0, 48.0));
        assert_eq!(b.ne(), LonLat::new(12.0, 50.0));
        assert_eq!(center(&obs), Some(LonLat::new(11.0, 49.0)));
        assert_eq!(extent(&[]), None);
        assert_eq!(center(&[]), None);
    }

    #[test]
    fn marker_features_carry_species_properties() {
        let obs = parse_observations(PAGE).unwrap();
        let fc = observations_to_geojson(&obs);
        assert_eq!(fc.len(), 2);
        let first = &fc.features[0].properties;
        assert_eq!(first["id"], "1");
        assert_eq!(first["name"], "Red Fox");
        assert_eq!(first["image_url"], "https://img/1.jpg");
        assert_eq!(fc.features[1].properties["name"], "Bufo bufo");
    }

    #[test]
    fn realm_url_validation() {
        assert_eq!(
            realm_observations_url("https://api.example.org/v1/", "north-sea_2", 200).unwrap(),
            "https://api.example.org/v1/realms/north-sea_2/observations?per_page=200"
        );
        assert!(realm_observations_url("https://x", "a/b", 10).is_err());
        assert!(realm_observations_url("https://x", "", 10).is_err());
    }
}

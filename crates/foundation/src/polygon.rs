use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;
use crate::geo::LonLat;

/// A closed ring of geographic vertices.
///
/// The ring is closed on construction (first vertex repeated at the end).
/// Construction does not enforce renderability; see [`BoundaryPolygon::is_renderable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "Vec<[f64; 2]>")]
pub struct BoundaryPolygon {
    ring: Vec<LonLat>,
}

impl BoundaryPolygon {
    /// Closes the ring if needed. Returns `None` if any vertex is not finite.
    pub fn new(vertices: impl IntoIterator<Item = LonLat>) -> Option<Self> {
        let mut ring: Vec<LonLat> = vertices.into_iter().collect();
        if ring.iter().any(|v| !v.is_finite()) {
            return None;
        }
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied())
            && (ring.len() == 1 || first != last)
        {
            ring.push(first);
        }
        Some(Self { ring })
    }

    pub fn from_coordinates(coords: &[[f64; 2]]) -> Option<Self> {
        Self::new(coords.iter().copied().map(LonLat::from))
    }

    /// The closed ring, first vertex repeated last.
    pub fn ring(&self) -> &[LonLat] {
        &self.ring
    }

    /// Consecutive vertex pairs of the closed ring.
    pub fn edges(&self) -> impl Iterator<Item = (LonLat, LonLat)> + '_ {
        self.ring.windows(2).map(|w| (w[0], w[1]))
    }

    /// Number of distinct vertices (ignoring the closing repeat).
    pub fn distinct_vertex_count(&self) -> usize {
        let open = match self.ring.split_last() {
            Some((_, rest)) => rest,
            None => return 0,
        };
        let mut seen: Vec<LonLat> = Vec::with_capacity(open.len());
        for v in open {
            if !seen.contains(v) {
                seen.push(*v);
            }
        }
        seen.len()
    }

    pub fn is_renderable(&self) -> bool {
        self.distinct_vertex_count() >= 3
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.ring.iter().copied())
    }
}

impl From<BoundaryPolygon> for Vec<[f64; 2]> {
    fn from(p: BoundaryPolygon) -> Self {
        p.ring.into_iter().map(LonLat::to_array).collect()
    }
}

impl<'de> Deserialize<'de> for BoundaryPolygon {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let coords = Vec::<[f64; 2]>::deserialize(deserializer)?;
        BoundaryPolygon::from_coordinates(&coords)
            .ok_or_else(|| serde::de::Error::custom("polygon has non-finite coordinates"))
    }
}

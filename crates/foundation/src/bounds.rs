use serde::{Deserialize, Serialize};

use crate::geo::LonLat;

/// Geographic bounding box.
///
/// Always normalized: `sw.lon <= ne.lon` and `sw.lat <= ne.lat`. The box may
/// still be degenerate (zero width or height); renderers check
/// [`BoundingBox::is_degenerate`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    sw: LonLat,
    ne: LonLat,
}

impl BoundingBox {
    /// Builds a box from two opposite corners in any order.
    ///
    /// Returns `None` if any coordinate is not finite.
    pub fn new(a: LonLat, b: LonLat) -> Option<Self> {
        if !a.is_finite() || !b.is_finite() {
            return None;
        }
        Some(Self {
            sw: LonLat::new(a.lon.min(b.lon), a.lat.min(b.lat)),
            ne: LonLat::new(a.lon.max(b.lon), a.lat.max(b.lat)),
        })
    }

    /// `[[west, south], [east, north]]`.
    pub fn from_corners(corners: [[f64; 2]; 2]) -> Option<Self> {
        Self::new(corners[0].into(), corners[1].into())
    }

    /// Smallest box containing every finite point; `None` if there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LonLat>,
    {
        let mut acc: Option<(LonLat, LonLat)> = None;
        for p in points.into_iter().filter(LonLat::is_finite) {
            acc = Some(match acc {
                None => (p, p),
                Some((lo, hi)) => (
                    LonLat::new(lo.lon.min(p.lon), lo.lat.min(p.lat)),
                    LonLat::new(hi.lon.max(p.lon), hi.lat.max(p.lat)),
                ),
            });
        }
        let (lo, hi) = acc?;
        Self::new(lo, hi)
    }

    pub fn sw(&self) -> LonLat {
        self.sw
    }

    pub fn ne(&self) -> LonLat {
        self.ne
    }

    pub fn se(&self) -> LonLat {
        LonLat::new(self.ne.lon, self.sw.lat)
    }

    pub fn nw(&self) -> LonLat {
        LonLat::new(self.sw.lon, self.ne.lat)
    }

    pub fn width(&self) -> f64 {
        self.ne.lon - self.sw.lon
    }

    pub fn height(&self) -> f64 {
        self.ne.lat - self.sw.lat
    }

    pub fn center(&self) -> LonLat {
        LonLat::new(
            (self.sw.lon + self.ne.lon) * 0.5,
            (self.sw.lat + self.ne.lat) * 0.5,
        )
    }

    /// Zero width or zero height (a point or a line).
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Corners in ring order: SW, SE, NE, NW.
    pub fn corners(&self) -> [LonLat; 4] {
        [self.sw, self.se(), self.ne, self.nw()]
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            sw: LonLat::new(self.sw.lon.min(other.sw.lon), self.sw.lat.min(other.sw.lat)),
            ne: LonLat::new(self.ne.lon.max(other.ne.lon), self.ne.lat.max(other.ne.lat)),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawBoundingBox([[f64; 2]; 2]);

impl Serialize for BoundingBox {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RawBoundingBox([self.sw.to_array(), self.ne.to_array()]).serialize(serializer)
    }
}

// Deserialization goes through `from_corners` so the invariant holds for
// boxes read from configuration or the wire.
impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let RawBoundingBox(corners) = RawBoundingBox::deserialize(deserializer)?;
        BoundingBox::from_corners(corners)
            .ok_or_else(|| serde::de::Error::custom("bounding box has non-finite coordinates"))
    }
}

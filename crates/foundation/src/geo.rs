use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    pub fn offset(self, d: Vec2) -> Self {
        Self::new(self.lon + d.x, self.lat + d.y)
    }

    /// `[lon, lat]`, the GeoJSON position layout.
    pub fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

impl From<[f64; 2]> for LonLat {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<LonLat> for Vec2 {
    fn from(p: LonLat) -> Self {
        Vec2::new(p.lon, p.lat)
    }
}

impl std::ops::Sub for LonLat {
    type Output = Vec2;

    fn sub(self, other: Self) -> Vec2 {
        Vec2::new(self.lon - other.lon, self.lat - other.lat)
    }
}

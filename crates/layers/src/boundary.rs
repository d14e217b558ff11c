//! Boundary geometry: walls, corner pillars and outline rings derived from a
//! bounding box or a polygon.
//!
//! Everything here is a pure function of its input. Invalid input produces an
//! empty [`BoundaryGeometry`] rather than an error, because callers routinely
//! have no data yet during initial load.

use formats::geojson::{Feature, FeatureCollection, Geometry};
use foundation::bounds::BoundingBox;
use foundation::geo::LonLat;
use foundation::math::Vec2;
use foundation::polygon::BoundaryPolygon;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed geometric constants, in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryParams {
    /// Half-thickness ε of a wall: walls extend ε to either side of the edge.
    pub wall_thickness_deg: f64,
    /// Half-width of a square corner pillar.
    pub pillar_radius_deg: f64,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            wall_thickness_deg: 0.0004,
            pillar_radius_deg: 0.0012,
        }
    }
}

impl GeometryParams {
    pub fn is_valid(&self) -> bool {
        self.wall_thickness_deg.is_finite()
            && self.wall_thickness_deg > 0.0
            && self.pillar_radius_deg.is_finite()
            && self.pillar_radius_deg > 0.0
    }
}

/// Four corners of a thin quadrilateral, counter-clockwise.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub corners: [LonLat; 4],
}

impl Quad {
    /// Axis-aligned rectangle from its min and max corners.
    pub fn from_rect(min: LonLat, max: LonLat) -> Self {
        Self {
            corners: [
                min,
                LonLat::new(max.lon, min.lat),
                max,
                LonLat::new(min.lon, max.lat),
            ],
        }
    }

    /// Closed ring: the four corners followed by the first one again.
    pub fn ring(&self) -> [LonLat; 5] {
        let c = self.corners;
        [c[0], c[1], c[2], c[3], c[0]]
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.corners)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WallSide {
    South,
    East,
    North,
    West,
    /// Polygon edge starting at this ring index.
    Edge(usize),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WallSegment {
    pub side: WallSide,
    pub quad: Quad,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CornerPillar {
    pub center: LonLat,
    pub quad: Quad,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    Rectangle,
    Polygon,
}

/// Output of one geometry build. Recomputed, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryGeometry {
    pub mode: BoundaryMode,
    pub walls: Vec<WallSegment>,
    /// Rectangle mode only.
    pub pillars: Vec<CornerPillar>,
    /// Closed ring along the boundary line.
    pub outline: Vec<LonLat>,
    /// Ground-level fill ring, rectangle mode only.
    pub inner: Option<Vec<LonLat>>,
}

impl BoundaryGeometry {
    pub fn empty(mode: BoundaryMode) -> Self {
        Self {
            mode,
            walls: Vec::new(),
            pillars: Vec::new(),
            outline: Vec::new(),
            inner: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }

    /// Union of every wall and pillar footprint.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.walls
            .iter()
            .map(|w| w.quad)
            .chain(self.pillars.iter().map(|p| p.quad))
            .filter_map(|q| q.bounds())
            .reduce(|a, b| a.union(&b))
    }

    pub fn walls_geojson(&self) -> FeatureCollection {
        self.walls
            .iter()
            .map(|w| {
                let feature = Feature::new(Geometry::polygon(&w.quad.ring())).with_property("kind", "wall");
                match w.side {
                    WallSide::Edge(i) => feature.with_property("edge", i),
                    side => feature.with_property("side", side_name(side)),
                }
            })
            .collect()
    }

    pub fn pillars_geojson(&self) -> FeatureCollection {
        self.pillars
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Feature::new(Geometry::polygon(&p.quad.ring()))
                    .with_property("kind", "pillar")
                    .with_property("corner", i)
            })
            .collect()
    }

    pub fn outline_geojson(&self) -> FeatureCollection {
        if self.outline.len() < 2 {
            return FeatureCollection::default();
        }
        FeatureCollection::new(vec![
            Feature::new(Geometry::line_string(&self.outline)).with_property("kind", "outline"),
        ])
    }

    pub fn inner_geojson(&self) -> Option<FeatureCollection> {
        let ring = self.inner.as_ref()?;
        Some(FeatureCollection::new(vec![
            Feature::new(Geometry::polygon(ring)).with_property("kind", "inner"),
        ]))
    }

    /// Every shape in one collection, tagged by `kind`.
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = self.walls_geojson().features;
        features.extend(self.pillars_geojson().features);
        features.extend(self.outline_geojson().features);
        if let Some(inner) = self.inner_geojson() {
            features.extend(inner.features);
        }
        FeatureCollection::new(features)
    }
}

fn side_name(side: WallSide) -> &'static str {
    match side {
        WallSide::South => "south",
        WallSide::East => "east",
        WallSide::North => "north",
        WallSide::West => "west",
        WallSide::Edge(_) => "edge",
    }
}

/// One way of turning a boundary description into geometry.
pub trait BoundaryStrategy {
    fn mode(&self) -> BoundaryMode;

    fn build(&self, params: &GeometryParams) -> BoundaryGeometry;
}

/// Hollow rectangle: four walls straddling the box edges plus corner pillars.
#[derive(Debug, Copy, Clone)]
pub struct RectangleStrategy<'a>(pub &'a BoundingBox);

impl BoundaryStrategy for RectangleStrategy<'_> {
    fn mode(&self) -> BoundaryMode {
        BoundaryMode::Rectangle
    }

    fn build(&self, params: &GeometryParams) -> BoundaryGeometry {
        let b = self.0;
        if b.is_degenerate() {
            debug!(?b, "degenerate bounding box; no boundary geometry");
            return BoundaryGeometry::empty(BoundaryMode::Rectangle);
        }
        let t = params.wall_thickness_deg;
        let (w, s) = (b.sw().lon, b.sw().lat);
        let (e, n) = (b.ne().lon, b.ne().lat);
        // East and west walls run between the south and north walls so that
        // no two walls share area. A box no taller than two wall thicknesses
        // leaves them no length and only the south and north walls remain.
        let spans_between = b.height() > 2.0 * t;

        let mut walls = Vec::with_capacity(4);
        walls.push(WallSegment {
            side: WallSide::South,
            quad: Quad::from_rect(LonLat::new(w - t, s - t), LonLat::new(e + t, s + t)),
        });
        if spans_between {
            walls.push(WallSegment {
                side: WallSide::East,
                quad: Quad::from_rect(LonLat::new(e - t, s + t), LonLat::new(e + t, n - t)),
            });
        }
        walls.push(WallSegment {
            side: WallSide::North,
            quad: Quad::from_rect(LonLat::new(w - t, n - t), LonLat::new(e + t, n + t)),
        });
        if spans_between {
            walls.push(WallSegment {
                side: WallSide::West,
                quad: Quad::from_rect(LonLat::new(w - t, s + t), LonLat::new(w + t, n - t)),
            });
        }

        let r = params.pillar_radius_deg;
        let pillars = b
            .corners()
            .into_iter()
            .map(|c| CornerPillar {
                center: c,
                quad: Quad::from_rect(LonLat::new(c.lon - r, c.lat - r), LonLat::new(c.lon + r, c.lat + r)),
            })
            .collect();

        let ring = Quad::from_rect(b.sw(), b.ne()).ring().to_vec();
        BoundaryGeometry {
            mode: BoundaryMode::Rectangle,
            walls,
            pillars,
            outline: ring.clone(),
            inner: Some(ring),
        }
    }
}

/// One wall per polygon edge, offset along the edge normal.
#[derive(Debug, Copy, Clone)]
pub struct PolygonStrategy<'a>(pub &'a BoundaryPolygon);

impl BoundaryStrategy for PolygonStrategy<'_> {
    fn mode(&self) -> BoundaryMode {
        BoundaryMode::Polygon
    }

    fn build(&self, params: &GeometryParams) -> BoundaryGeometry {
        let polygon = self.0;
        if !polygon.is_renderable() {
            debug!(
                vertices = polygon.distinct_vertex_count(),
                "polygon has fewer than 3 distinct vertices; no boundary geometry"
            );
            return BoundaryGeometry::empty(BoundaryMode::Polygon);
        }
        let t = params.wall_thickness_deg;
        let mut walls = Vec::with_capacity(polygon.ring().len().saturating_sub(1));
        for (i, (a, b)) in polygon.edges().enumerate() {
            // Zero-length edges have no direction.
            let Some(dir) = (b - a).normalized() else {
                continue;
            };
            let offset: Vec2 = dir.perp() * t;
            let back = offset * -1.0;
            walls.push(WallSegment {
                side: WallSide::Edge(i),
                quad: Quad {
                    corners: [a.offset(back), b.offset(back), b.offset(offset), a.offset(offset)],
                },
            });
        }
        BoundaryGeometry {
            mode: BoundaryMode::Polygon,
            walls,
            pillars: Vec::new(),
            outline: polygon.ring().to_vec(),
            inner: None,
        }
    }
}

/// Either boundary description, as supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySource {
    Bounds(BoundingBox),
    Polygon(BoundaryPolygon),
}

impl BoundarySource {
    pub fn strategy(&self) -> Box<dyn BoundaryStrategy + '_> {
        match self {
            BoundarySource::Bounds(b) => Box::new(RectangleStrategy(b)),
            BoundarySource::Polygon(p) => Box::new(PolygonStrategy(p)),
        }
    }
}

impl From<BoundingBox> for BoundarySource {
    fn from(b: BoundingBox) -> Self {
        BoundarySource::Bounds(b)
    }
}

impl From<BoundaryPolygon> for BoundarySource {
    fn from(p: BoundaryPolygon) -> Self {
        BoundarySource::Polygon(p)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GeometryBuilder {
    params: GeometryParams,
}

impl GeometryBuilder {
    pub fn new(params: GeometryParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GeometryParams {
        &self.params
    }

    pub fn build(&self, source: &BoundarySource) -> BoundaryGeometry {
        self.build_with(source.strategy().as_ref())
    }

    pub fn build_with(&self, strategy: &dyn BoundaryStrategy) -> BoundaryGeometry {
        if !self.params.is_valid() {
            debug!(params = ?self.params, "invalid geometry parameters");
            return BoundaryGeometry::empty(strategy.mode());
        }
        strategy.build(&self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EPS: f64 = 0.0004;

    fn builder() -> GeometryBuilder {
        GeometryBuilder::new(GeometryParams {
            wall_thickness_deg: EPS,
            pillar_radius_deg: 0.001,
        })
    }

    fn unit_box() -> BoundarySource {
        BoundingBox::from_corners([[0.0, 0.0], [1.0, 1.0]]).unwrap().into()
    }

    fn polygon(coords: &[[f64; 2]]) -> BoundarySource {
        BoundaryPolygon::from_coordinates(coords).unwrap().into()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn quad_area(q: &Quad) -> f64 {
        let r = q.ring();
        let mut sum = 0.0;
        for w in r.windows(2) {
            sum += w[0].lon * w[1].lat - w[1].lon * w[0].lat;
        }
        sum * 0.5
    }

    fn overlap_area(a: &BoundingBox, b: &BoundingBox) -> f64 {
        let w = (a.ne().lon.min(b.ne().lon) - a.sw().lon.max(b.sw().lon)).max(0.0);
        let h = (a.ne().lat.min(b.ne().lat) - a.sw().lat.max(b.sw().lat)).max(0.0);
        w * h
    }

    #[test]
    fn rectangle_yields_four_walls_and_four_pillars() {
        let g = builder().build(&unit_box());
        assert_eq!(g.mode, BoundaryMode::Rectangle);
        assert_eq!(g.walls.len(), 4);
        assert_eq!(g.pillars.len(), 4);
        for w in &g.walls {
            let ring = w.quad.ring();
            assert_eq!(ring[0], ring[4]);
            assert!(quad_area(&w.quad) > 0.0, "walls wind counter-clockwise");
        }
    }

    #[test]
    fn unit_box_wall_union_extends_by_thickness() {
        let g = builder().build(&unit_box());
        let u = g.walls.iter().filter_map(|w| w.quad.bounds()).reduce(|a, b| a.union(&b)).unwrap();
        assert!(close(u.sw().lon, -EPS) && close(u.sw().lat, -EPS));
        assert!(close(u.ne().lon, 1.0 + EPS) && close(u.ne().lat, 1.0 + EPS));
    }

    #[test]
    fn pillars_are_centered_on_corners() {
        let g = builder().build(&unit_box());
        let centers: Vec<LonLat> = g.pillars.iter().map(|p| p.center).collect();
        assert_eq!(
            centers,
            vec![
                LonLat::new(0.0, 0.0),
                LonLat::new(1.0, 0.0),
                LonLat::new(1.0, 1.0),
                LonLat::new(0.0, 1.0),
            ]
        );
        let b = g.pillars[2].quad.bounds().unwrap();
        assert!(close(b.width(), 0.002) && close(b.center().lon, 1.0));
    }

    #[test]
    fn adjacent_walls_do_not_overlap() {
        let g = builder().build(&unit_box());
        let boxes: Vec<BoundingBox> = g.walls.iter().filter_map(|w| w.quad.bounds()).collect();
        for i in 0..boxes.len() {
            let j = (i + 1) % boxes.len();
            assert_eq!(overlap_area(&boxes[i], &boxes[j]), 0.0, "walls {i} and {j}");
        }
    }

    #[test]
    fn rectangle_has_outline_and_inner_fill() {
        let g = builder().build(&unit_box());
        assert_eq!(g.outline.len(), 5);
        assert_eq!(g.inner.as_deref(), Some(g.outline.as_slice()));
    }

    #[test]
    fn degenerate_boxes_yield_nothing() {
        for corners in [[[2.0, 2.0], [2.0, 2.0]], [[0.0, 1.0], [5.0, 1.0]]] {
            let src: BoundarySource = BoundingBox::from_corners(corners).unwrap().into();
            let g = builder().build(&src);
            assert!(g.is_empty());
            assert!(g.pillars.is_empty());
            assert_eq!(g.to_geojson().len(), 0);
        }
    }

    #[test]
    fn thin_box_drops_east_and_west_walls() {
        let src: BoundarySource = BoundingBox::from_corners([[0.0, 0.0], [1.0, EPS]]).unwrap().into();
        let g = builder().build(&src);
        let sides: Vec<WallSide> = g.walls.iter().map(|w| w.side).collect();
        assert_eq!(sides, vec![WallSide::South, WallSide::North]);
        assert_eq!(g.pillars.len(), 4);
        for w in &g.walls {
            assert!(quad_area(&w.quad) > 0.0);
        }
    }

    #[test]
    fn polygon_yields_one_wall_per_edge() {
        let src = polygon(&[[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 2.0], [0.0, 1.0], [0.0, 0.0]]);
        let g = builder().build(&src);
        assert_eq!(g.mode, BoundaryMode::Polygon);
        assert_eq!(g.walls.len(), 5);
        assert!(g.pillars.is_empty());
        assert!(g.inner.is_none());
        assert_eq!(g.outline.len(), 6);
    }

    #[test]
    fn polygon_wall_is_offset_along_edge_normal() {
        let g = builder().build(&polygon(&[[0.0, 0.0], [2.0, 0.0], [1.0, 1.0]]));
        // First edge runs east along the equator; its normal points north.
        let c = g.walls[0].quad.corners;
        assert_eq!(c[0], LonLat::new(0.0, -EPS));
        assert_eq!(c[1], LonLat::new(2.0, -EPS));
        assert_eq!(c[2], LonLat::new(2.0, EPS));
        assert_eq!(c[3], LonLat::new(0.0, EPS));
    }

    #[test]
    fn zero_length_edges_are_skipped() {
        let g = builder().build(&polygon(&[[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]]));
        assert_eq!(g.walls.len(), 3);
        assert!(g.walls.iter().all(|w| w.quad.corners.iter().all(LonLat::is_finite)));
    }

    #[test]
    fn short_rings_yield_nothing() {
        assert!(builder().build(&polygon(&[[0.0, 0.0], [1.0, 1.0]])).is_empty());
        assert!(builder().build(&polygon(&[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]])).is_empty());
        assert!(builder().build(&polygon(&[[0.0, 0.0], [0.0, 0.0], [0.0, 0.0], [0.0, 0.0]])).is_empty());
    }

    #[test]
    fn build_is_pure() {
        let src = polygon(&[[10.0, 50.0], [10.5, 50.2], [10.2, 50.6]]);
        let b = builder();
        assert_eq!(b.build(&src), b.build(&src));
        assert_eq!(b.build(&unit_box()), b.build(&unit_box()));
    }

    #[test]
    fn invalid_params_yield_nothing() {
        let b = GeometryBuilder::new(GeometryParams {
            wall_thickness_deg: 0.0,
            pillar_radius_deg: 0.001,
        });
        assert!(b.build(&unit_box()).is_empty());
    }

    #[test]
    fn geojson_tags_every_shape() {
        let fc = builder().build(&unit_box()).to_geojson();
        let kinds: Vec<&str> = fc
            .features
            .iter()
            .map(|f| f.properties["kind"].as_str().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "wall", "wall", "wall", "wall", "pillar", "pillar", "pillar", "pillar", "outline",
                "inner"
            ]
        );
        assert_eq!(fc.features[0].properties["side"], "south");
    }

    #[test]
    fn source_round_trips_through_json() {
        let src: BoundarySource = serde_json::from_str(r#"{ "bounds": [[0, 0], [1, 1]] }"#).unwrap();
        assert_eq!(src, unit_box());
        let poly: BoundarySource = serde_json::from_str(r#"{ "polygon": [[0, 0], [1, 0], [0, 1]] }"#).unwrap();
        assert_eq!(poly, polygon(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]));
    }
}

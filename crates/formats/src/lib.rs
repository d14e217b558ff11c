pub mod error;
pub mod geojson;
pub mod observations;

pub use error::*;
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use observations::*;

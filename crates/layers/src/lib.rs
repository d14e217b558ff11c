pub mod boundary;
pub mod buildings;
pub mod composer;
pub mod layer;
pub mod markers;
pub mod surface;
pub mod symbology;

pub use boundary::*;
pub use buildings::*;
pub use composer::*;
pub use layer::*;
pub use markers::*;
pub use surface::*;
pub use symbology::*;

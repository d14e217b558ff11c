use formats::error::FormatError;
use layers::surface::SurfaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("configuration is not valid json: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown basemap {0:?}")]
    UnknownBasemap(String),
}

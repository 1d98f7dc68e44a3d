use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Invalid image: {width}x{height} with {len} bytes")]
    InvalidImage { width: u32, height: u32, len: usize },

    #[error("No graph built for page '{0}'")]
    NoGraphForId(String),

    #[error("No stroke near ({x}, {y})")]
    NoNearbyStroke { x: i32, y: i32 },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request {id} was superseded by a newer generation")]
    Cancelled { id: u64 },

    #[error("Engine worker is no longer running")]
    EngineClosed,

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;

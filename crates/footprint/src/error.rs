use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FootprintError {
    /// A detector row that cannot be turned into a detection. The row is skipped.
    #[error("Malformed input record: {0}")]
    MalformedInputRecord(String),

    /// Too few distinct or non-collinear points to form an area.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid tile identifier '{0}': expected \"<column>/<row>\" or \"<zoom>_<column>_<row>\"")]
    TileIdentifierFormat(String),

    /// Inconsistent tiling/scale parameters. Fatal for the whole run.
    #[error("Scale configuration error: {0}")]
    ScaleConfiguration(String),

    #[error("Unsupported configuration format: {0:?} (use .toml or .json)")]
    UnsupportedConfigFormat(PathBuf),

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FootprintError {
    /// Errors that only invalidate a single record; everything else aborts the run.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            Self::MalformedInputRecord(_) | Self::DegenerateGeometry(_) | Self::TileIdentifierFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FootprintError>;

//! Error types for the standings pipeline

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StandingsError {
    /// The input file could not be read at all
    #[error("Failed to read CSV file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input could not be decoded or tokenized as CSV
    #[error("Failed to parse CSV: {0}")]
    Decode(#[from] csv::Error),

    /// SVG parsing or rasterization failed
    #[error("Failed to capture standings image: {0}")]
    Capture(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to write image {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StandingsError>;

//! Error types for the microshades library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum MicroshadesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Palette exhaustion: {requested} requested but only {available} available")]
    PaletteExhaustion { requested: usize, available: usize },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Unknown palette '{0}'")]
    UnknownPalette(String),

    #[error("Invalid abundance value '{value}' at row {row}")]
    InvalidAbundance { value: String, row: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, MicroshadesError>;

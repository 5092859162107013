use std::path::PathBuf;

/// Errors produced by region proposal, classification and model loading.
#[derive(thiserror::Error, Debug)]
pub enum DiceError {
    /// Empty or malformed image handed to the region proposer.
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// Missing or corrupt model artifact.
    #[error("failed to load model from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// Cropping, resizing or descriptor computation failed for one region.
    #[error("feature computation failed: {0}")]
    FeatureCompute(String),

    /// Unreadable or malformed configuration file.
    #[error("invalid configuration in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, DiceError>;

//! Error types for the pupillary distance measurement library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Landmark set does not satisfy the detector index contract
    #[error("Landmark contract violation: {0}")]
    LandmarkContract(String),

    /// Frame catalog entry rejected or lookup failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Capture requested before the smoothed result became stable
    #[error("Not enough data: {samples} of {required} samples accumulated")]
    InsufficientData {
        /// Samples currently held in the smoothing window
        samples: usize,
        /// Samples needed before a result is stable
        required: usize,
    },

    /// Recorded detector output could not be decoded
    #[error("Recording error: {0}")]
    Recording(String),

    /// Frame loop failed to start or stop cleanly
    #[error("Frame loop error: {0}")]
    FrameLoop(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

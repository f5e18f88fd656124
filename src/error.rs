//! Unified error handling for the trip-insights library.
//!
//! Structural problems (empty inputs, bad configuration, unknown collections, I/O)
//! surface as errors. Data-quality problems inside a route document are recorded
//! by the loader and never abort a computation.

use thiserror::Error;

/// Unified error type for trip-insights operations.
#[derive(Debug, Error)]
pub enum TripInsightsError {
    /// A non-empty input was required
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Coordinate entry without numeric latitude/longitude
    #[error("Trip {trip_index} coordinate {coordinate_index} is malformed: {message}")]
    MalformedCoordinate {
        trip_index: usize,
        coordinate_index: usize,
        message: String,
    },

    /// Timestamp string could not be parsed
    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    /// No collection with this name in the route document
    #[error("Route collection '{name}' not found")]
    CollectionNotFound { name: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Route document is not valid JSON or has the wrong top-level shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for trip-insights operations.
pub type Result<T> = std::result::Result<T, TripInsightsError>;

/// Extension trait for converting Option to TripInsightsError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid input error.
    fn ok_or_invalid_input(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_input(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TripInsightsError::InvalidInput {
            message: message.to_string(),
        })
    }
}

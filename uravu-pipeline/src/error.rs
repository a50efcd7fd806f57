use thiserror::Error;
use uravu_core::{BoundaryUnavailable, WeatherUnavailable};

/// Request-level failure. Every other stage failure degrades in place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Boundary unavailable: {0}")]
    BoundaryUnavailable(String),

    #[error("Weather unavailable: {0}")]
    WeatherUnavailable(String),
}

impl From<BoundaryUnavailable> for PipelineError {
    fn from(e: BoundaryUnavailable) -> Self {
        PipelineError::BoundaryUnavailable(e.to_string())
    }
}

impl From<WeatherUnavailable> for PipelineError {
    fn from(e: WeatherUnavailable) -> Self {
        PipelineError::WeatherUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

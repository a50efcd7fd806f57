/// Error types for the Uravu core library
use thiserror::Error;
use uravu_utils::error::DateError;

/// Rejected request input. Raised before any stage runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// City name was empty after trimming
    #[error("City name must not be empty")]
    EmptyCity,

    /// Interval was not one of daily, monthly, yearly
    #[error("Unknown interval {0:?} (expected daily, monthly or yearly)")]
    UnknownInterval(String),

    /// Start or end date could not be expanded
    #[error(transparent)]
    Date(#[from] DateError),
}

/// A single geocode attempt failed or came back without a polygon.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundaryError {
    /// Transport error or non-success response from the geocoder
    #[error("Geocode request failed: {0}")]
    Geocode(String),

    /// The geocoder answered but had no polygonal result
    #[error("No polygon found for {0:?}")]
    Empty(String),

    /// Polygon area or centroid came out degenerate or non-finite
    #[error("Invalid boundary geometry: {0}")]
    InvalidGeometry(String),
}

/// Fatal: even the country-level fallback region could not be resolved.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Boundary unavailable for {city:?}: {reason}")]
pub struct BoundaryUnavailable {
    pub city: String,
    pub reason: BoundaryError,
}

/// Population lookup failed. Always recovered with the density fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PopulationUnavailable {
    /// Knowledge base answered with a non-success status
    #[error("sparql_fetch_failed: HTTP {0}")]
    FetchFailed(u16),

    /// Result set was empty
    #[error("sparql_no_binding")]
    NoBinding,

    /// Best binding had no usable (positive, numeric) population
    #[error("sparql_population_missing")]
    PopulationMissing,

    /// Transport error, timeout or undecodable body
    #[error("sparql_exception: {0}")]
    Transport(String),
}

impl PopulationUnavailable {
    /// Short diagnostic tag, stable across releases.
    pub fn tag(&self) -> &'static str {
        match self {
            PopulationUnavailable::FetchFailed(_) => "sparql_fetch_failed",
            PopulationUnavailable::NoBinding => "sparql_no_binding",
            PopulationUnavailable::PopulationMissing => "sparql_population_missing",
            PopulationUnavailable::Transport(_) => "sparql_exception",
        }
    }
}

/// Fatal: no usable hourly series for the point and range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeatherUnavailable {
    /// Archive answered with a non-success status
    #[error("Weather API fetch failed: HTTP {0}")]
    FetchFailed(u16),

    /// Archive answered with no hourly samples
    #[error("No weather data for the requested range")]
    Empty,

    /// Transport error or timeout
    #[error("Weather API request failed: {0}")]
    Transport(String),

    /// Body could not be decoded into an hourly series
    #[error("Malformed weather response: {0}")]
    Malformed(String),

    /// Aggregation would have produced a NaN or infinite figure
    #[error("Weather data produced a non-finite {0}")]
    NonFinite(&'static str),
}

/// Elevation lookup failed. Always recovered with a neutral terrain factor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElevationUnavailable {
    /// Transport error, timeout or non-success status
    #[error("Elevation request failed: {0}")]
    Transport(String),

    /// Body was not the expected shape
    #[error("Malformed elevation response: {0}")]
    Malformed(String),

    /// Body had no elevation value
    #[error("Elevation missing from response")]
    Missing,
}

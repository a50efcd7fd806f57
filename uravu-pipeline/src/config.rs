//! Pipeline configuration, fixed at construction time.

use std::time::Duration;
use uravu_core::demand::{Reference, REFERENCE};
use uravu_core::report::Capabilities;

/// Upper bound on each collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub geocode: Duration,
    pub population: Duration,
    pub weather: Duration,
    pub elevation: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            geocode: Duration::from_secs(30),
            population: Duration::from_secs(15),
            weather: Duration::from_secs(30),
            elevation: Duration::from_secs(10),
        }
    }
}

/// Base URLs of the collaborator services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub geocode: String,
    pub population: String,
    pub weather: String,
    pub elevation: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocode: "https://nominatim.openstreetmap.org/search".to_string(),
            population: "https://query.wikidata.org/sparql".to_string(),
            weather: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            elevation: "https://api.open-meteo.com/v1/elevation".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub capabilities: Capabilities,
    pub cache_ttl: Duration,
    /// Appended to the city name on the second geocode attempt.
    pub default_country: String,
    /// Geocoded as the approximate boundary of last resort.
    pub fallback_region: String,
    pub reference: Reference,
    pub timeouts: Timeouts,
    pub endpoints: Endpoints,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            cache_ttl: Duration::from_secs(3600),
            default_country: "India".to_string(),
            fallback_region: "India".to_string(),
            reference: REFERENCE,
            timeouts: Timeouts::default(),
            endpoints: Endpoints::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.reference.city, "Bangalore");
        assert_eq!(config.timeouts.population, Duration::from_secs(15));
        assert!(config.capabilities.cache_enabled);
        assert!(config.endpoints.weather.contains("archive-api.open-meteo.com"));
    }
}

//! Flux estimation pipeline.
//!
//! [`FluxPipeline::run`] takes a normalized query through
//!
//! ```text
//! CacheLookup -> hit: Respond
//!             -> miss: ResolveBoundary -> (EstimatePopulation | FetchWeather | AdjustTerrain)
//!                      -> EstimateDemand -> ComputeFlux -> CacheStore -> Respond
//! ```
//!
//! Only a failed boundary (after the country fallback) or missing weather
//! data fails a request. Population, elevation and cache failures are logged
//! and absorbed into the report's provenance fields.

pub mod config;
mod error;

pub use config::{Endpoints, PipelineConfig, Timeouts};
pub use error::{PipelineError, Result};

use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use uravu_cache::ReportCache;
use uravu_core::boundary::{BoundaryResolver, Geocoder};
use uravu_core::demand::estimate_demand;
use uravu_core::population::{PopulationEstimator, PopulationLookup};
use uravu_core::query::{Fingerprint, NormalizedQuery};
use uravu_core::report::{Capabilities, FluxReport};
use uravu_core::terrain::{self, ElevationSource};
use uravu_core::weather::{fetch_series, WeatherSource};
use uravu_data::flux::{self, FluxInputs};
use uravu_data::humidity::Kernel;

/// Named steps of a request, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CacheLookup,
    ResolveBoundary,
    EstimatePopulation,
    EstimateDemand,
    FetchWeather,
    AdjustTerrain,
    ComputeFlux,
    CacheStore,
    Respond,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CacheLookup => "cache_lookup",
            Stage::ResolveBoundary => "resolve_boundary",
            Stage::EstimatePopulation => "estimate_population",
            Stage::EstimateDemand => "estimate_demand",
            Stage::FetchWeather => "fetch_weather",
            Stage::AdjustTerrain => "adjust_terrain",
            Stage::ComputeFlux => "compute_flux",
            Stage::CacheStore => "cache_store",
            Stage::Respond => "respond",
        };
        f.write_str(name)
    }
}

/// External services the pipeline depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub geocoder: Arc<dyn Geocoder>,
    pub population: Arc<dyn PopulationLookup>,
    pub weather: Arc<dyn WeatherSource>,
    pub elevation: Arc<dyn ElevationSource>,
}

#[cfg(feature = "api")]
impl Collaborators {
    /// HTTP clients for the configured endpoints, each bounded by its timeout.
    pub fn from_config(config: &PipelineConfig) -> std::result::Result<Self, reqwest::Error> {
        use uravu_core::boundary::NominatimGeocoder;
        use uravu_core::population::WikidataPopulation;
        use uravu_core::terrain::OpenMeteoElevation;
        use uravu_core::weather::OpenMeteoArchive;

        let endpoints = &config.endpoints;
        let timeouts = &config.timeouts;
        Ok(Self {
            geocoder: Arc::new(NominatimGeocoder::new(&endpoints.geocode, timeouts.geocode)?),
            population: Arc::new(WikidataPopulation::new(
                &endpoints.population,
                timeouts.population,
            )?),
            weather: Arc::new(OpenMeteoArchive::new(&endpoints.weather, timeouts.weather)?),
            elevation: Arc::new(OpenMeteoElevation::new(
                &endpoints.elevation,
                timeouts.elevation,
            )?),
        })
    }
}

type Flight = Arc<OnceCell<Result<FluxReport>>>;

pub struct FluxPipeline {
    config: PipelineConfig,
    collaborators: Collaborators,
    cache: Option<Arc<dyn ReportCache>>,
    resolver: BoundaryResolver,
    estimator: PopulationEstimator,
    kernel: Kernel,
    in_flight: Mutex<HashMap<Fingerprint, Flight>>,
}

impl FluxPipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        let resolver = BoundaryResolver::new(&config.default_country, &config.fallback_region);
        let estimator = PopulationEstimator::new(config.reference);
        let kernel = Kernel::from_flag(config.capabilities.accelerated_kernel);
        Self {
            config,
            collaborators,
            cache: None,
            resolver,
            estimator,
            kernel,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a result cache. Ignored unless the `cache_enabled` capability is set.
    pub fn with_cache(mut self, cache: Arc<dyn ReportCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Capabilities actually in effect; caching needs both the flag and a store.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            cache_enabled: self.cache().is_some(),
            ..self.config.capabilities
        }
    }

    fn cache(&self) -> Option<&dyn ReportCache> {
        if self.config.capabilities.cache_enabled {
            self.cache.as_deref()
        } else {
            None
        }
    }

    /// Produce the report for `query`, from cache when possible.
    pub async fn run(&self, query: &NormalizedQuery) -> Result<FluxReport> {
        let key = query.fingerprint();
        if self.config.capabilities.single_flight {
            self.run_shared(&key, query).await
        } else {
            self.run_cached(&key, query).await
        }
    }

    /// Join an in-flight run for the same fingerprint, or lead a new one.
    async fn run_shared(&self, key: &Fingerprint, query: &NormalizedQuery) -> Result<FluxReport> {
        let flight = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight.entry(key.clone()).or_default().clone()
        };

        let outcome = flight
            .get_or_init(|| self.run_cached(key, query))
            .await
            .clone();

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, &flight))
        {
            in_flight.remove(key);
        }
        outcome
    }

    async fn run_cached(&self, key: &Fingerprint, query: &NormalizedQuery) -> Result<FluxReport> {
        if let Some(cache) = self.cache() {
            debug!("{}: {}", key, Stage::CacheLookup);
            match cache.get(key).await {
                Ok(Some(report)) => {
                    info!("Cache hit for {}", key);
                    return Ok(report);
                }
                Ok(None) => debug!("Cache miss for {}", key),
                Err(e) => warn!("Cache read for {} failed, recomputing: {}", key, e),
            }
        }

        let report = self.compute(key, query).await?;

        if let Some(cache) = self.cache() {
            debug!("{}: {}", key, Stage::CacheStore);
            match cache.set(key, &report, self.config.cache_ttl).await {
                Ok(()) => info!("Cached {} for {:?}", key, self.config.cache_ttl),
                Err(e) => warn!("Cache write for {} failed: {}", key, e),
            }
        }
        debug!("{}: {}", key, Stage::Respond);
        Ok(report)
    }

    async fn compute(&self, key: &Fingerprint, query: &NormalizedQuery) -> Result<FluxReport> {
        let c = &self.collaborators;

        debug!("{}: {}", key, Stage::ResolveBoundary);
        let boundary = self.resolver.resolve(c.geocoder.as_ref(), &query.city).await?;
        let at = boundary.centroid;

        debug!(
            "{}: {}, {}, {}",
            key,
            Stage::EstimatePopulation,
            Stage::FetchWeather,
            Stage::AdjustTerrain
        );
        let ((population, population_failure), series, terrain) = tokio::join!(
            self.estimator
                .estimate(c.population.as_ref(), &query.city, boundary.area_km2),
            fetch_series(c.weather.as_ref(), at, query.start_date, query.end_date),
            terrain::adjust(c.elevation.as_ref(), at),
        );
        let series = series?;

        debug!("{}: {}", key, Stage::EstimateDemand);
        let demand = estimate_demand(&self.config.reference, &population, query.interval);

        debug!("{}: {}", key, Stage::ComputeFlux);
        let inputs = FluxInputs {
            area_km2: boundary.area_km2,
            terrain_factor: terrain.terrain_factor,
            interval: query.interval,
            num_days: query.num_days(),
        };
        let summary = flux::compute(&series, &inputs, self.kernel)?;
        let ratio = flux::flux_to_demand_ratio(summary.net_flux_l, demand.value_liters);

        let report = FluxReport {
            query: query.clone(),
            boundary,
            population,
            population_note: population_failure.map(|reason| reason.to_string()),
            demand,
            terrain,
            mean_ah_gm3: summary.mean_ah_gm3,
            wind_speed_ms: summary.mean_wind_ms,
            total_stock_l: summary.total_stock_l,
            daily_flux_l: summary.daily_flux_l,
            net_flux_l: summary.net_flux_l,
            flux_to_demand_ratio: ratio,
            flux_series: summary.flux_series,
            wind_series: summary.wind_series,
            capabilities: self.capabilities(),
            generated_at: Utc::now(),
        };
        if !report.is_finite() {
            return Err(PipelineError::WeatherUnavailable(
                "report contains a non-finite figure".to_string(),
            ));
        }

        info!(
            "{}: net flux {:.3e} L, demand {:.3e} L ({}), approximate boundary: {}",
            key,
            report.net_flux_l,
            report.demand.value_liters,
            report.demand.source,
            report.boundary.is_approximate
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uravu_core::fakes::{
        hourly_fixture, rectangle, FakeElevation, FakeGeocoder, FakePopulation, FakeWeather,
    };
    use uravu_core::query::{CityQuery, Interval};

    fn collaborators() -> Collaborators {
        let day = chrono::NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        Collaborators {
            geocoder: Arc::new(
                FakeGeocoder::new().with_polygon("Bangalore", rectangle(12.97, 77.59, 0.12, 0.12)),
            ),
            population: Arc::new(FakePopulation::found(12_000_000)),
            weather: Arc::new(FakeWeather::returning(hourly_fixture(day, 1, 25.0, 70.0, 2.0))),
            elevation: Arc::new(FakeElevation::found(0.0)),
        }
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::CacheLookup.to_string(), "cache_lookup");
        assert_eq!(Stage::ComputeFlux.to_string(), "compute_flux");
    }

    #[test]
    fn cache_capability_needs_a_store() {
        let pipeline = FluxPipeline::new(PipelineConfig::default(), collaborators());
        assert!(!pipeline.capabilities().cache_enabled);

        let pipeline = pipeline.with_cache(Arc::new(uravu_cache::MemoryCache::new()));
        assert!(pipeline.capabilities().cache_enabled);
    }

    #[tokio::test]
    async fn in_flight_entries_are_released() {
        let pipeline = FluxPipeline::new(PipelineConfig::default(), collaborators());
        let query = CityQuery::new("Bangalore", "2024-12-15", "2024-12-15", Interval::Daily)
            .normalize()
            .unwrap();
        pipeline.run(&query).await.unwrap();
        assert!(pipeline.in_flight.lock().unwrap().is_empty());
    }
}

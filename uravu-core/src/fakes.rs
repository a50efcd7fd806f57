//! In-memory collaborator fakes (testing only)
//!
//! Each fake answers from canned data and counts how often it was called,
//! so callers can assert that a code path never reached a collaborator.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use geo::{LineString, MultiPolygon, Polygon};

use crate::boundary::{Boundary, Geocoder, LatLon};
use crate::demand::DemandEstimate;
use crate::error::{BoundaryError, ElevationUnavailable, PopulationUnavailable, WeatherUnavailable};
use crate::population::{PopulationEstimate, PopulationLookup, PopulationSource};
use crate::query::{Interval, NormalizedQuery};
use crate::report::{Capabilities, FluxRecord, FluxReport, WindSample};
use crate::terrain::{ElevationSource, TerrainProfile};
use crate::weather::{HourlySample, WeatherSeries, WeatherSource};

/// Axis-aligned lat/lon rectangle centred on a point, in degrees.
pub fn rectangle(
    center_lat: f64,
    center_lon: f64,
    half_lat: f64,
    half_lon: f64,
) -> MultiPolygon<f64> {
    let (south, north) = (center_lat - half_lat, center_lat + half_lat);
    let (west, east) = (center_lon - half_lon, center_lon + half_lon);
    let ring = LineString::from(vec![
        (west, south),
        (east, south),
        (east, north),
        (west, north),
        (west, south),
    ]);
    MultiPolygon::new(vec![Polygon::new(ring, vec![])])
}

/// `days × 24` hourly samples starting at midnight of `start`, all with the
/// same conditions. Wind blows from the east.
pub fn hourly_fixture(
    start: NaiveDate,
    days: u32,
    temperature_c: f64,
    relative_humidity_pct: f64,
    wind_speed_ms: f64,
) -> WeatherSeries {
    let midnight = start.and_hms_opt(0, 0, 0).unwrap_or_default();
    let samples = (0..i64::from(days) * 24)
        .map(|hour| HourlySample {
            timestamp: midnight + TimeDelta::hours(hour),
            temperature_c,
            relative_humidity_pct,
            wind_speed_ms,
            wind_direction_deg: 90.0,
        })
        .collect();
    WeatherSeries::new(samples)
}

/// A fixed, fully populated report for storage tests.
pub fn sample_report(city: &str) -> FluxReport {
    let day = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap_or_default();
    let polygon = rectangle(12.97, 77.59, 0.1225, 0.1256);
    let boundary = Boundary {
        polygon,
        area_km2: 741.2,
        centroid: LatLon {
            lat: 12.97,
            lon: 77.59,
        },
        is_approximate: false,
    };
    FluxReport {
        query: NormalizedQuery {
            city: city.to_string(),
            interval: Interval::Daily,
            start_date: day,
            end_date: day,
        },
        boundary,
        population: PopulationEstimate {
            value: 8_443_675,
            source: PopulationSource::ExternalLookup,
        },
        population_note: None,
        demand: DemandEstimate {
            value_liters: 1.013_241e9,
            source: "scaled_from_Bangalore_external_lookup".to_string(),
        },
        terrain: TerrainProfile::from_elevation(920.0),
        mean_ah_gm3: 16.117_929_203_403_07,
        wind_speed_ms: 2.5,
        total_stock_l: 1.194_660_914_556_236e10,
        daily_flux_l: 8.284_771_442_147_436e8,
        net_flux_l: 8.284_771_442_147_436e8,
        flux_to_demand_ratio: 0.817_650_3,
        flux_series: vec![FluxRecord {
            date: "2024-12-15".to_string(),
            flux_l: 6.627_817_153_717_949e8,
        }],
        wind_series: vec![WindSample {
            speed_ms: 2.5,
            direction_deg: 135.0,
        }],
        capabilities: Capabilities::default(),
        generated_at: Utc
            .with_ymd_and_hms(2024, 12, 16, 8, 30, 0)
            .single()
            .unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// FakeGeocoder
// ---------------------------------------------------------------------------

/// Geocoder answering from a name → polygon table (case-insensitive).
/// Unknown names yield an empty result; names registered with
/// `with_failure` yield a transport error.
#[derive(Debug, Default)]
pub struct FakeGeocoder {
    polygons: HashMap<String, MultiPolygon<f64>>,
    failures: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_polygon(mut self, query: &str, polygon: MultiPolygon<f64>) -> Self {
        self.polygons.insert(query.to_lowercase(), polygon);
        self
    }

    pub fn with_failure(mut self, query: &str) -> Self {
        self.failures.insert(query.to_lowercase());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<MultiPolygon<f64>>, BoundaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = query.to_lowercase();
        if self.failures.contains(&key) {
            return Err(BoundaryError::Geocode(format!("fake failure for {query:?}")));
        }
        Ok(self.polygons.get(&key).cloned())
    }
}

// ---------------------------------------------------------------------------
// FakePopulation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FakePopulation {
    result: Result<u64, PopulationUnavailable>,
    calls: AtomicUsize,
}

impl FakePopulation {
    pub fn found(population: u64) -> Self {
        Self {
            result: Ok(population),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: PopulationUnavailable) -> Self {
        Self {
            result: Err(reason),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PopulationLookup for FakePopulation {
    async fn population(&self, _city: &str) -> Result<u64, PopulationUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// FakeWeather
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FakeWeather {
    result: Result<WeatherSeries, WeatherUnavailable>,
    calls: AtomicUsize,
}

impl FakeWeather {
    pub fn returning(series: WeatherSeries) -> Self {
        Self {
            result: Ok(series),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: WeatherUnavailable) -> Self {
        Self {
            result: Err(reason),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for FakeWeather {
    async fn hourly(
        &self,
        _at: LatLon,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<WeatherSeries, WeatherUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// FakeElevation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FakeElevation {
    result: Result<f64, ElevationUnavailable>,
    calls: AtomicUsize,
}

impl FakeElevation {
    pub fn found(elevation_m: f64) -> Self {
        Self {
            result: Ok(elevation_m),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: ElevationUnavailable) -> Self {
        Self {
            result: Err(reason),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ElevationSource for FakeElevation {
    async fn elevation(&self, _at: LatLon) -> Result<f64, ElevationUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

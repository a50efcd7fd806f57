//! The flux report returned for a request.

use crate::boundary::Boundary;
use crate::demand::DemandEstimate;
use crate::population::PopulationEstimate;
use crate::query::NormalizedQuery;
use crate::terrain::TerrainProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flux for one day, month or year bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxRecord {
    pub date: String,
    #[serde(rename = "flux_L")]
    pub flux_l: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    pub speed_ms: f64,
    pub direction_deg: f64,
}

/// Optional accelerators a pipeline was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub cache_enabled: bool,
    pub accelerated_kernel: bool,
    /// Collapse concurrent identical requests into one upstream run.
    pub single_flight: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            accelerated_kernel: true,
            single_flight: true,
        }
    }
}

/// Provenance-annotated stock and flux estimate for one city and range.
///
/// Built once by the pipeline and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxReport {
    #[serde(flatten)]
    pub query: NormalizedQuery,
    pub boundary: Boundary,
    #[serde(flatten)]
    pub population: PopulationEstimate,
    /// Why the population lookup fell back, when it did.
    pub population_note: Option<String>,
    #[serde(flatten)]
    pub demand: DemandEstimate,
    pub terrain: TerrainProfile,
    #[serde(rename = "mean_AH_gm3")]
    pub mean_ah_gm3: f64,
    pub wind_speed_ms: f64,
    #[serde(rename = "total_stock_L")]
    pub total_stock_l: f64,
    #[serde(rename = "daily_flux_L")]
    pub daily_flux_l: f64,
    #[serde(rename = "net_flux_L")]
    pub net_flux_l: f64,
    pub flux_to_demand_ratio: f64,
    pub flux_series: Vec<FluxRecord>,
    pub wind_series: Vec<WindSample>,
    pub capabilities: Capabilities,
    pub generated_at: DateTime<Utc>,
}

impl FluxReport {
    /// Every scalar figure in the report is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.boundary.area_km2,
            self.boundary.centroid.lat,
            self.boundary.centroid.lon,
            self.demand.value_liters,
            self.terrain.elevation_m,
            self.terrain.terrain_factor,
            self.mean_ah_gm3,
            self.wind_speed_ms,
            self.total_stock_l,
            self.daily_flux_l,
            self.net_flux_l,
            self.flux_to_demand_ratio,
        ]
        .iter()
        .chain(self.flux_series.iter().map(|r| &r.flux_l))
        .all(|v| v.is_finite())
    }
}

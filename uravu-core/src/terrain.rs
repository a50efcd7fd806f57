//! Elevation lookup and the flux damping factor derived from it.

use crate::boundary::LatLon;
use crate::error::ElevationUnavailable;
use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "api")]
use crate::http::build_client;
#[cfg(feature = "api")]
use std::time::Duration;

/// Elevation at which the factor would reach zero without the floor.
pub const SCALE_HEIGHT_M: f64 = 3000.0;

/// Lowest terrain factor; reached at 2400 m.
pub const TERRAIN_FACTOR_FLOOR: f64 = 0.2;

/// `max(0.2, 1 - elevation_m / 3000)`
pub fn terrain_factor(elevation_m: f64) -> f64 {
    (1.0 - elevation_m / SCALE_HEIGHT_M).max(TERRAIN_FACTOR_FLOOR)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainSource {
    ElevationService,
    /// Elevation lookup failed; no adjustment applied.
    NeutralDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainProfile {
    pub elevation_m: f64,
    pub terrain_factor: f64,
    pub source: TerrainSource,
}

impl TerrainProfile {
    pub fn from_elevation(elevation_m: f64) -> Self {
        Self {
            elevation_m,
            terrain_factor: terrain_factor(elevation_m),
            source: TerrainSource::ElevationService,
        }
    }

    pub fn neutral() -> Self {
        Self {
            elevation_m: 0.0,
            terrain_factor: 1.0,
            source: TerrainSource::NeutralDefault,
        }
    }
}

/// Point elevation lookup.
#[async_trait]
pub trait ElevationSource: Send + Sync {
    async fn elevation(&self, at: LatLon) -> Result<f64, ElevationUnavailable>;
}

/// Elevation from a body shaped `{"elevation": [920.0]}` or `{"elevation": 920.0}`.
pub fn parse_open_meteo_elevation(body: &str) -> Result<f64, ElevationUnavailable> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| ElevationUnavailable::Malformed(e.to_string()))?;
    let field = json.get("elevation").ok_or(ElevationUnavailable::Missing)?;
    let value = match field {
        Value::Array(values) => values.first().ok_or(ElevationUnavailable::Missing)?,
        other => other,
    };
    match value.as_f64() {
        Some(elevation) if elevation.is_finite() => Ok(elevation),
        Some(_) => Err(ElevationUnavailable::Malformed("non-finite elevation".to_string())),
        None => Err(ElevationUnavailable::Malformed(format!("elevation {value}"))),
    }
}

/// Measure the terrain at `at`, degrading to no adjustment on any failure.
pub async fn adjust(source: &dyn ElevationSource, at: LatLon) -> TerrainProfile {
    match source.elevation(at).await {
        Ok(elevation_m) => TerrainProfile::from_elevation(elevation_m),
        Err(e) => {
            warn!(
                "Elevation unavailable at ({:.4}, {:.4}): {}; terrain adjustment disabled",
                at.lat, at.lon, e
            );
            TerrainProfile::neutral()
        }
    }
}

/// Open-Meteo elevation client.
#[cfg(feature = "api")]
pub struct OpenMeteoElevation {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "api")]
impl OpenMeteoElevation {
    pub const DEFAULT_URL: &'static str = "https://api.open-meteo.com/v1/elevation";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
        })
    }
}

#[cfg(feature = "api")]
#[async_trait]
impl ElevationSource for OpenMeteoElevation {
    async fn elevation(&self, at: LatLon) -> Result<f64, ElevationUnavailable> {
        let latitude = format!("{:.6}", at.lat);
        let longitude = format!("{:.6}", at.lon);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("latitude", latitude.as_str()), ("longitude", longitude.as_str())])
            .send()
            .await
            .map_err(|e| ElevationUnavailable::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ElevationUnavailable::Transport(format!(
                "HTTP {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ElevationUnavailable::Transport(e.to_string()))?;
        parse_open_meteo_elevation(&body)
    }
}

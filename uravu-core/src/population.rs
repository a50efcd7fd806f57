//! Population from a public knowledge base, with an area-times-density fallback.

use crate::demand::Reference;
use crate::error::PopulationUnavailable;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "api")]
use crate::http::build_client;
#[cfg(feature = "api")]
use std::time::Duration;

/// Where a population figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationSource {
    ExternalLookup,
    DensityFallback,
}

impl PopulationSource {
    pub fn tag(&self) -> &'static str {
        match self {
            PopulationSource::ExternalLookup => "external_lookup",
            PopulationSource::DensityFallback => "density_fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationEstimate {
    #[serde(rename = "population_used")]
    pub value: u64,
    #[serde(rename = "population_source")]
    pub source: PopulationSource,
}

/// Looks up the population of the most populous place matching a name.
#[async_trait]
pub trait PopulationLookup: Send + Sync {
    async fn population(&self, city: &str) -> Result<u64, PopulationUnavailable>;
}

/// SPARQL for the most populous entity whose English label contains `city`.
pub fn population_query(city: &str) -> String {
    let escaped = city.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"SELECT ?city ?cityLabel ?population WHERE {{
  ?city wdt:P1082 ?population.
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
  FILTER(CONTAINS(LCASE(?cityLabel), LCASE("{escaped}")))
}}
ORDER BY DESC(?population)
LIMIT 1"#
    )
}

/// Extract the population from a SPARQL JSON results body.
pub fn parse_sparql_population(body: &str) -> Result<u64, PopulationUnavailable> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| PopulationUnavailable::Transport(e.to_string()))?;
    let binding = json
        .pointer("/results/bindings/0")
        .ok_or(PopulationUnavailable::NoBinding)?;
    let raw = binding
        .pointer("/population/value")
        .and_then(Value::as_str)
        .ok_or(PopulationUnavailable::PopulationMissing)?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| PopulationUnavailable::PopulationMissing)?;
    if !value.is_finite() || value < 1.0 {
        return Err(PopulationUnavailable::PopulationMissing);
    }
    Ok(value.trunc() as u64)
}

/// Wikidata SPARQL endpoint client.
#[cfg(feature = "api")]
pub struct WikidataPopulation {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "api")]
impl WikidataPopulation {
    pub const DEFAULT_URL: &'static str = "https://query.wikidata.org/sparql";

    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[cfg(feature = "api")]
#[async_trait]
impl PopulationLookup for WikidataPopulation {
    async fn population(&self, city: &str) -> Result<u64, PopulationUnavailable> {
        let query = population_query(city);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query.as_str()), ("format", "json")])
            .send()
            .await
            .map_err(|e| PopulationUnavailable::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PopulationUnavailable::FetchFailed(response.status().as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| PopulationUnavailable::Transport(e.to_string()))?;
        parse_sparql_population(&body)
    }
}

/// Resolves a population, never failing: lookups that come back empty are
/// replaced by `area_km2 × reference density`.
#[derive(Debug, Clone, Copy)]
pub struct PopulationEstimator {
    reference: Reference,
}

impl PopulationEstimator {
    pub fn new(reference: Reference) -> Self {
        Self { reference }
    }

    /// People living on `area_km2` at the reference density.
    pub fn density_fallback(&self, area_km2: f64) -> u64 {
        let estimate = (area_km2 * self.reference.density()).round();
        if estimate.is_finite() && estimate >= 1.0 {
            estimate as u64
        } else {
            1
        }
    }

    /// The estimate, plus the lookup failure when the fallback was used.
    pub async fn estimate(
        &self,
        lookup: &dyn PopulationLookup,
        city: &str,
        area_km2: f64,
    ) -> (PopulationEstimate, Option<PopulationUnavailable>) {
        match lookup.population(city).await {
            Ok(value) if value > 0 => {
                debug!("Population of {:?} from lookup: {}", city, value);
                (
                    PopulationEstimate {
                        value,
                        source: PopulationSource::ExternalLookup,
                    },
                    None,
                )
            }
            outcome => {
                let reason = outcome
                    .err()
                    .unwrap_or(PopulationUnavailable::PopulationMissing);
                let value = self.density_fallback(area_km2);
                warn!(
                    "Population lookup for {:?} unavailable ({}), using density estimate {}",
                    city, reason, value
                );
                (
                    PopulationEstimate {
                        value,
                        source: PopulationSource::DensityFallback,
                    },
                    Some(reason),
                )
            }
        }
    }
}

//! Boundary export as GeoJSON.

use crate::output::write_json;
use crate::Settings;
use log::info;
use std::path::Path;
use uravu_core::boundary::{BoundaryResolver, NominatimGeocoder};

pub async fn run_boundary(
    city: &str,
    settings: &Settings,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let city = city.trim();
    if city.is_empty() {
        anyhow::bail!("City name must not be empty");
    }

    let config = settings.pipeline_config();
    let geocoder = NominatimGeocoder::new(&config.endpoints.geocode, config.timeouts.geocode)?;
    let resolver = BoundaryResolver::new(&config.default_country, &config.fallback_region);
    let boundary = resolver.resolve(&geocoder, city).await?;

    info!(
        "{}: {:.1} km2, centroid ({:.4}, {:.4}), approximate: {}",
        city,
        boundary.area_km2,
        boundary.centroid.lat,
        boundary.centroid.lon,
        boundary.is_approximate
    );
    write_json(&boundary.to_feature_collection(), output)
}

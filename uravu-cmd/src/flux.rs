//! City flux report command.

use crate::output::{round_floats, write_json, write_series_csv};
use crate::Settings;
use log::info;
use serde_json::Value;
use std::path::Path;
use uravu_core::query::CityQuery;
use uravu_core::report::FluxReport;
use uravu_pipeline::{Collaborators, FluxPipeline};

/// Decimal places kept in printed figures.
const DISPLAY_DECIMALS: i32 = 3;

/// Run the pipeline for one query and print its report.
pub async fn run_flux(
    query: &CityQuery,
    settings: &Settings,
    output: Option<&Path>,
    series_csv: Option<&Path>,
    include_polygon: bool,
) -> anyhow::Result<()> {
    let normalized = query.normalize()?;
    info!(
        "Estimating {} flux for {} from {} to {}",
        normalized.interval, normalized.city, normalized.start_date, normalized.end_date
    );

    let config = settings.pipeline_config();
    let collaborators = Collaborators::from_config(&config)?;
    let mut pipeline = FluxPipeline::new(config, collaborators);
    if let Some(cache) = settings.open_cache() {
        pipeline = pipeline.with_cache(cache);
    }

    let report = pipeline.run(&normalized).await?;

    if let Some(path) = series_csv {
        write_series_csv(path, &report.flux_series)?;
    }
    write_json(&present(&report, include_polygon)?, output)
}

/// Report as printed: figures rounded, polygon dropped unless requested.
pub fn present(report: &FluxReport, include_polygon: bool) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(report)?;
    if !include_polygon {
        if let Some(boundary) = value.get_mut("boundary").and_then(Value::as_object_mut) {
            boundary.remove("polygon");
        }
    }
    round_floats(&mut value, DISPLAY_DECIMALS);
    Ok(value)
}

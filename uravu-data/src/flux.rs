//! Vapour stock and flux aggregation.
//!
//! The air column above a boundary is its area times a 1 km height. Stock
//! is the mean absolute humidity over that volume; a fixed fraction of the
//! stock is exchanged per day, scaled by mean wind against a 2 m/s
//! reference and damped by terrain.

use crate::humidity::Kernel;
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;
use uravu_core::error::WeatherUnavailable;
use uravu_core::query::Interval;
use uravu_core::report::{FluxRecord, WindSample};
use uravu_core::weather::WeatherSeries;
use uravu_utils::dates::{format_date, month_end, year_end};

/// Fraction of the column's stock exchanged per day.
pub const TRANSPORT_EFFICIENCY: f64 = 0.08;

/// Wind speed at which wind scaling is 1.
pub const REFERENCE_WIND_MS: f64 = 2.0;

/// m³ of air above one km² for a 1 km column.
pub const COLUMN_M3_PER_KM2: f64 = 1e9;

/// Grams of vapour per liter of condensed water.
pub const GRAMS_PER_LITER: f64 = 1000.0;

/// Everything the aggregation needs besides the series itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxInputs {
    pub area_km2: f64,
    pub terrain_factor: f64,
    pub interval: Interval,
    /// Calendar days in the requested range, inclusive.
    pub num_days: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluxSummary {
    pub mean_ah_gm3: f64,
    pub mean_wind_ms: f64,
    pub total_stock_l: f64,
    pub daily_flux_l: f64,
    pub net_flux_l: f64,
    pub flux_series: Vec<FluxRecord>,
    pub wind_series: Vec<WindSample>,
}

/// Arithmetic mean of the finite values; `None` when there are none.
pub fn nan_mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn column_volume_m3(area_km2: f64) -> f64 {
    area_km2 * COLUMN_M3_PER_KM2
}

/// Liters of vapour in the column at a given absolute humidity.
pub fn stock_liters(ah_gm3: f64, area_km2: f64) -> f64 {
    ah_gm3 * column_volume_m3(area_km2) / GRAMS_PER_LITER
}

/// `net / demand`, or 0 when there is no positive demand.
pub fn flux_to_demand_ratio(net_flux_l: f64, demand_l: f64) -> f64 {
    if demand_l > 0.0 {
        net_flux_l / demand_l
    } else {
        0.0
    }
}

fn bucket_key(date: NaiveDate, interval: Interval) -> NaiveDate {
    match interval {
        Interval::Daily => Some(date),
        Interval::Monthly => month_end(&date),
        Interval::Yearly => year_end(&date),
    }
    .unwrap_or(date)
}

/// Mean absolute humidity per day, month or year, in chronological order.
///
/// Monthly and yearly buckets are labelled by their last day. Buckets with
/// no finite sample are omitted.
pub fn bucket_means(series: &WeatherSeries, ah: &[f64], interval: Interval) -> Vec<(NaiveDate, f64)> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for (sample, value) in series.samples().iter().zip(ah) {
        if !value.is_finite() {
            continue;
        }
        let entry = buckets
            .entry(bucket_key(sample.timestamp.date(), interval))
            .or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(date, (sum, count))| (date, sum / count as f64))
        .collect()
}

/// Aggregate stock and flux for a series.
///
/// Fails with [`WeatherUnavailable::NonFinite`] rather than returning a NaN
/// or infinite figure.
pub fn compute(
    series: &WeatherSeries,
    inputs: &FluxInputs,
    kernel: Kernel,
) -> Result<FluxSummary, WeatherUnavailable> {
    if series.is_empty() {
        return Err(WeatherUnavailable::Empty);
    }
    let ah = kernel.absolute_humidity(&series.temperatures(), &series.relative_humidities());

    let mean_ah_gm3 = nan_mean(ah.iter().copied())
        .ok_or(WeatherUnavailable::NonFinite("mean absolute humidity"))?;
    let mean_wind_ms = nan_mean(series.samples().iter().map(|s| s.wind_speed_ms))
        .ok_or(WeatherUnavailable::NonFinite("mean wind speed"))?;

    let total_stock_l = stock_liters(mean_ah_gm3, inputs.area_km2);
    let wind_scaling = mean_wind_ms / REFERENCE_WIND_MS;
    let daily_flux_l = total_stock_l * TRANSPORT_EFFICIENCY * wind_scaling * inputs.terrain_factor;
    let net_flux_l = daily_flux_l * inputs.num_days as f64;

    // Per-bucket wind is not tracked, so bucket flux carries no wind scaling.
    let flux_series = bucket_means(series, &ah, inputs.interval)
        .into_iter()
        .map(|(date, bucket_ah)| FluxRecord {
            date: format_date(&date),
            flux_l: stock_liters(bucket_ah, inputs.area_km2)
                * TRANSPORT_EFFICIENCY
                * inputs.terrain_factor,
        })
        .collect::<Vec<_>>();

    let wind_series = series
        .samples()
        .iter()
        .filter(|s| s.wind_speed_ms.is_finite() && s.wind_direction_deg.is_finite())
        .map(|s| WindSample {
            speed_ms: s.wind_speed_ms,
            direction_deg: s.wind_direction_deg,
        })
        .collect();

    let figures = [total_stock_l, daily_flux_l, net_flux_l];
    if !figures.iter().all(|v| v.is_finite()) {
        return Err(WeatherUnavailable::NonFinite("flux"));
    }
    if !flux_series.iter().all(|r| r.flux_l.is_finite()) {
        return Err(WeatherUnavailable::NonFinite("flux series"));
    }

    debug!(
        "AH {:.3} g/m3, wind {:.2} m/s, stock {:.3e} L, net flux {:.3e} L over {} days",
        mean_ah_gm3, mean_wind_ms, total_stock_l, net_flux_l, inputs.num_days
    );

    Ok(FluxSummary {
        mean_ah_gm3,
        mean_wind_ms,
        total_stock_l,
        daily_flux_l,
        net_flux_l,
        flux_series,
        wind_series,
    })
}

//! Coarse global absolute-humidity grid from a latitude-only climatology.

use crate::humidity::Kernel;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const GRID_ROWS: usize = 180;
pub const GRID_COLS: usize = 360;

/// Normalised humidity on a 1° grid of cell centres.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalGrid {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    /// Row per latitude, each value scaled to `[0, 1]`.
    pub ah_grid: Vec<Vec<f64>>,
    /// Raw minimum, g/m³
    pub min: f64,
    /// Raw maximum, g/m³
    pub max: f64,
    pub timestamp: DateTime<Utc>,
}

/// `n` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![start; n];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Temperature falls 0.1 °C and humidity 0.2 % per degree away from the equator.
pub fn climatology(lat: f64) -> (f64, f64) {
    (25.0 - 0.1 * lat.abs(), 70.0 - 0.2 * lat.abs())
}

pub fn global_grid(kernel: Kernel) -> GlobalGrid {
    let lats = linspace(-89.5, 89.5, GRID_ROWS);
    let lons = linspace(-179.5, 179.5, GRID_COLS);

    let (temperatures, humidities): (Vec<f64>, Vec<f64>) =
        lats.iter().map(|lat| climatology(*lat)).unzip();
    let row_values = kernel.absolute_humidity(&temperatures, &humidities);

    let min = row_values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = row_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min + 1e-9;

    let ah_grid = row_values
        .iter()
        .map(|value| vec![(value - min) / span; GRID_COLS])
        .collect();

    GlobalGrid {
        lats,
        lons,
        ah_grid,
        min,
        max,
        timestamp: Utc::now(),
    }
}

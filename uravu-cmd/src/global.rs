//! Global humidity grid command.

use crate::output::write_json;
use crate::Settings;
use log::info;
use std::path::Path;
use uravu_data::global::global_grid;
use uravu_data::humidity::Kernel;

pub fn run_global_flux(settings: &Settings, output: Option<&Path>) -> anyhow::Result<()> {
    let kernel = Kernel::from_flag(!settings.reference_kernel);
    let grid = global_grid(kernel);
    info!(
        "Global AH grid {}x{}: {:.3} to {:.3} g/m3",
        grid.lats.len(),
        grid.lons.len(),
        grid.min,
        grid.max
    );
    write_json(&serde_json::to_value(&grid)?, output)
}

//! Command implementations for the Uravu CLI.
//!
//! Provides subcommands for city flux reports, boundary export and the
//! global humidity grid.

use clap::{Args, Subcommand};
use log::warn;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uravu_cache::{ReportCache, SqliteCache};
use uravu_core::query::Interval;
use uravu_pipeline::PipelineConfig;

pub mod boundary;
pub mod flux;
pub mod global;
pub mod output;

#[derive(Subcommand)]
pub enum Command {
    /// Estimate vapour stock, flux and demand for a city over a date range
    Flux {
        /// City name
        #[arg(short, long, default_value = "Bangalore")]
        city: String,

        /// Start date: YYYY, YYYY-MM or YYYY-MM-DD
        #[arg(short, long, default_value = "2024-12-15")]
        start_date: String,

        /// End date: YYYY, YYYY-MM or YYYY-MM-DD
        #[arg(short, long, default_value = "2024-12-20")]
        end_date: String,

        /// Bucket size for the flux series: daily, monthly or yearly
        #[arg(short, long, default_value = "daily")]
        interval: Interval,

        /// Write the report JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the bucketed flux series as CSV (date,flux_L)
        #[arg(long)]
        series_csv: Option<PathBuf>,

        /// Keep the boundary polygon in the report JSON
        #[arg(long)]
        include_polygon: bool,
    },

    /// Resolve a city boundary and print it as a GeoJSON FeatureCollection
    Boundary {
        /// City name
        #[arg(short, long, default_value = "Bangalore")]
        city: String,

        /// Write the GeoJSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute the normalised 1-degree global absolute-humidity grid
    GlobalFlux {
        /// Write the grid JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Pipeline settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// SQLite file for cached reports; an in-memory cache is used when unset
    #[arg(long, global = true, env = "URAVU_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Disable the result cache
    #[arg(long, global = true, env = "URAVU_NO_CACHE")]
    pub no_cache: bool,

    /// Lifetime of cached reports, in seconds
    #[arg(long, global = true, env = "URAVU_CACHE_TTL_SECS", default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    /// Country appended to the city name when the bare name does not geocode
    #[arg(long, global = true, env = "URAVU_DEFAULT_COUNTRY", default_value = "India")]
    pub default_country: String,

    /// Region geocoded as an approximate boundary of last resort
    #[arg(long, global = true, env = "URAVU_FALLBACK_REGION", default_value = "India")]
    pub fallback_region: String,

    /// Use the scalar humidity kernel instead of the lane-batched one
    #[arg(long, global = true, env = "URAVU_REFERENCE_KERNEL")]
    pub reference_kernel: bool,

    /// Run concurrent identical requests independently
    #[arg(long, global = true, env = "URAVU_NO_SINGLE_FLIGHT")]
    pub no_single_flight: bool,
}

impl Settings {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            default_country: self.default_country.clone(),
            fallback_region: self.fallback_region.clone(),
            ..PipelineConfig::default()
        };
        config.capabilities.cache_enabled = !self.no_cache;
        config.capabilities.accelerated_kernel = !self.reference_kernel;
        config.capabilities.single_flight = !self.no_single_flight;
        config
    }

    /// The configured cache store. A store that fails to open is skipped.
    pub fn open_cache(&self) -> Option<Arc<dyn ReportCache>> {
        if self.no_cache {
            return None;
        }
        let opened = match &self.cache_path {
            Some(path) => SqliteCache::open(path),
            None => SqliteCache::open_in_memory(),
        };
        match opened {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                warn!("Result cache unavailable, continuing without it: {}", e);
                None
            }
        }
    }
}

pub async fn run(command: Command, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Command::Flux {
            city,
            start_date,
            end_date,
            interval,
            output,
            series_csv,
            include_polygon,
        } => {
            let query = uravu_core::query::CityQuery::new(&city, &start_date, &end_date, interval);
            flux::run_flux(
                &query,
                settings,
                output.as_deref(),
                series_csv.as_deref(),
                include_polygon,
            )
            .await
        }
        Command::Boundary { city, output } => {
            boundary::run_boundary(&city, settings, output.as_deref()).await
        }
        Command::GlobalFlux { output } => global::run_global_flux(settings, output.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: Settings,
    }

    fn parse(args: &[&str]) -> Settings {
        TestCli::try_parse_from(std::iter::once("uravu").chain(args.iter().copied()))
            .unwrap()
            .settings
    }

    #[test]
    fn default_settings_match_pipeline_defaults() {
        let settings = parse(&[]);
        assert_eq!(settings.pipeline_config(), PipelineConfig::default());
    }

    #[test]
    fn flags_turn_capabilities_off() {
        let settings = parse(&["--no-cache", "--reference-kernel", "--no-single-flight"]);
        let capabilities = settings.pipeline_config().capabilities;
        assert!(!capabilities.cache_enabled);
        assert!(!capabilities.accelerated_kernel);
        assert!(!capabilities.single_flight);
        assert!(settings.open_cache().is_none());
    }

    #[test]
    fn cache_path_opens_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let settings = parse(&["--cache-path", path.to_str().unwrap()]);
        assert!(settings.open_cache().is_some());
        assert!(path.exists());
    }

    #[test]
    fn overrides_geocode_fallbacks() {
        let settings = parse(&["--default-country", "Kenya", "--fallback-region", "Kenya"]);
        let config = settings.pipeline_config();
        assert_eq!(config.default_country, "Kenya");
        assert_eq!(config.fallback_region, "Kenya");
    }
}

//! Hourly historical weather for a point and date range.

use crate::boundary::LatLon;
use crate::error::WeatherUnavailable;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use uravu_utils::dates::format_date;

#[cfg(feature = "api")]
use crate::http::build_client;
#[cfg(feature = "api")]
use std::time::Duration;

/// Timestamp format of the archive's `hourly.time` column: "YYYY-MM-DDTHH:MM"
pub const HOURLY_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Hourly variables requested from the archive.
pub const HOURLY_VARIABLES: &str =
    "temperature_2m,relative_humidity_2m,wind_speed_10m,wind_direction_10m";

/// One hour of weather. Missing readings are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlySample {
    pub timestamp: NaiveDateTime,
    pub temperature_c: f64,
    pub relative_humidity_pct: f64,
    pub wind_speed_ms: f64,
    pub wind_direction_deg: f64,
}

/// Samples ordered by timestamp ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSeries {
    samples: Vec<HourlySample>,
}

impl WeatherSeries {
    pub fn new(mut samples: Vec<HourlySample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self { samples }
    }

    pub fn samples(&self) -> &[HourlySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.temperature_c).collect()
    }

    pub fn relative_humidities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.relative_humidity_pct).collect()
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    hourly: Option<ArchiveHourly>,
}

#[derive(Debug, Deserialize)]
struct ArchiveHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
}

fn column(values: &[Option<f64>], name: &str, len: usize) -> Result<Vec<f64>, WeatherUnavailable> {
    if values.len() != len {
        return Err(WeatherUnavailable::Malformed(format!(
            "{name} has {} values for {len} timestamps",
            values.len()
        )));
    }
    Ok(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Decode an Open-Meteo archive body into a series.
pub fn parse_open_meteo_archive(body: &str) -> Result<WeatherSeries, WeatherUnavailable> {
    let response: ArchiveResponse =
        serde_json::from_str(body).map_err(|e| WeatherUnavailable::Malformed(e.to_string()))?;
    let hourly = response.hourly.ok_or(WeatherUnavailable::Empty)?;
    let len = hourly.time.len();
    if len == 0 {
        return Err(WeatherUnavailable::Empty);
    }

    let temperature = column(&hourly.temperature_2m, "temperature_2m", len)?;
    let humidity = column(&hourly.relative_humidity_2m, "relative_humidity_2m", len)?;
    let wind_speed = column(&hourly.wind_speed_10m, "wind_speed_10m", len)?;
    let wind_direction = column(&hourly.wind_direction_10m, "wind_direction_10m", len)?;

    let samples = hourly
        .time
        .iter()
        .enumerate()
        .map(|(i, ts)| {
            let timestamp = NaiveDateTime::parse_from_str(ts, HOURLY_FORMAT)
                .map_err(|e| WeatherUnavailable::Malformed(format!("time {ts:?}: {e}")))?;
            Ok(HourlySample {
                timestamp,
                temperature_c: temperature[i],
                relative_humidity_pct: humidity[i],
                wind_speed_ms: wind_speed[i],
                wind_direction_deg: wind_direction[i],
            })
        })
        .collect::<Result<Vec<_>, WeatherUnavailable>>()?;
    Ok(WeatherSeries::new(samples))
}

/// Hourly historical weather source.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Local-time hourly samples covering `start..=end`.
    async fn hourly(
        &self,
        at: LatLon,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WeatherSeries, WeatherUnavailable>;
}

/// Fetch a series and reject an empty one.
pub async fn fetch_series(
    source: &dyn WeatherSource,
    at: LatLon,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<WeatherSeries, WeatherUnavailable> {
    let series = source.hourly(at, start, end).await?;
    if series.is_empty() {
        return Err(WeatherUnavailable::Empty);
    }
    log::debug!(
        "Fetched {} hourly samples for {} to {}",
        series.len(),
        format_date(&start),
        format_date(&end)
    );
    Ok(series)
}

/// Open-Meteo historical archive client.
#[cfg(feature = "api")]
pub struct OpenMeteoArchive {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "api")]
impl OpenMeteoArchive {
    pub const DEFAULT_URL: &'static str = "https://archive-api.open-meteo.com/v1/archive";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
        })
    }
}

#[cfg(feature = "api")]
#[async_trait]
impl WeatherSource for OpenMeteoArchive {
    async fn hourly(
        &self,
        at: LatLon,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<WeatherSeries, WeatherUnavailable> {
        let latitude = format!("{:.6}", at.lat);
        let longitude = format!("{:.6}", at.lon);
        let start_date = format_date(&start);
        let end_date = format_date(&end);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("start_date", start_date.as_str()),
                ("end_date", end_date.as_str()),
                ("hourly", HOURLY_VARIABLES),
                ("wind_speed_unit", "ms"),
                ("timezone", "auto"),
            ])
            .send()
            .await
            .map_err(|e| WeatherUnavailable::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(WeatherUnavailable::FetchFailed(response.status().as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| WeatherUnavailable::Transport(e.to_string()))?;
        parse_open_meteo_archive(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{hourly_fixture, FakeWeather};

    #[test]
    fn parses_archive_body() {
        let body = r#"{
            "latitude": 12.97, "longitude": 77.59,
            "hourly": {
                "time": ["2024-12-15T01:00", "2024-12-15T00:00"],
                "temperature_2m": [21.5, 22.0],
                "relative_humidity_2m": [80, 78],
                "wind_speed_10m": [2.1, null],
                "wind_direction_10m": [90, 100]
            }
        }"#;
        let series = parse_open_meteo_archive(body).unwrap();
        assert_eq!(series.len(), 2);
        // sorted ascending
        assert_eq!(series.samples()[0].temperature_c, 22.0);
        assert!(series.samples()[0].wind_speed_ms.is_nan());
        assert_eq!(series.samples()[1].relative_humidity_pct, 80.0);
    }

    #[test]
    fn empty_hourly_block_is_unavailable() {
        let body = r#"{"hourly": {"time": [], "temperature_2m": []}}"#;
        assert_eq!(parse_open_meteo_archive(body), Err(WeatherUnavailable::Empty));
        assert_eq!(parse_open_meteo_archive("{}"), Err(WeatherUnavailable::Empty));
    }

    #[test]
    fn ragged_columns_are_malformed() {
        let body = r#"{"hourly": {
            "time": ["2024-12-15T00:00"],
            "temperature_2m": [22.0, 23.0],
            "relative_humidity_2m": [80],
            "wind_speed_10m": [2.0],
            "wind_direction_10m": [90]
        }}"#;
        assert!(matches!(
            parse_open_meteo_archive(body),
            Err(WeatherUnavailable::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn fetch_rejects_empty_series() {
        let source = FakeWeather::returning(WeatherSeries::default());
        let day = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let at = LatLon { lat: 12.97, lon: 77.59 };
        let err = fetch_series(&source, at, day, day).await.unwrap_err();
        assert_eq!(err, WeatherUnavailable::Empty);
    }

    #[tokio::test]
    async fn fetch_passes_series_through() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let source = FakeWeather::returning(hourly_fixture(day, 1, 25.0, 70.0, 2.0));
        let at = LatLon { lat: 12.97, lon: 77.59 };
        let series = fetch_series(&source, at, day, day).await.unwrap();
        assert_eq!(series.len(), 24);
        assert_eq!(source.calls(), 1);
    }
}

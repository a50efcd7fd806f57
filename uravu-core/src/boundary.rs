//! City name to administrative polygon, area and centroid.
//!
//! Resolution tries the bare name, then the name qualified with the default
//! country, then a country-level region. Only the last step may fail the
//! request; a boundary produced by it is flagged `is_approximate`.

use crate::error::{BoundaryError, BoundaryUnavailable};
use async_trait::async_trait;
use geo::{Area, Centroid, Coord, LineString, MapCoords, MultiPolygon, Polygon};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[cfg(feature = "api")]
use crate::http::build_client;
#[cfg(feature = "api")]
use std::time::Duration;

/// Authalic (equal-area) earth radius in meters.
pub const AUTHALIC_RADIUS_M: f64 = 6_371_007.2;

/// Spherical web mercator radius in meters.
pub const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Web mercator is undefined at the poles.
const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// Geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Polygon resolved for a city, with the figures derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Coordinates are (x = longitude, y = latitude) in degrees.
    pub polygon: MultiPolygon<f64>,
    pub area_km2: f64,
    pub centroid: LatLon,
    /// True when the named place could not be found and a country-level
    /// region was used instead.
    pub is_approximate: bool,
}

impl Boundary {
    /// Derive area and centroid from a geographic polygon.
    pub fn from_polygon(
        polygon: MultiPolygon<f64>,
        is_approximate: bool,
    ) -> Result<Self, BoundaryError> {
        let area_km2 = equal_area_km2(&polygon);
        if !area_km2.is_finite() || area_km2 <= 0.0 {
            return Err(BoundaryError::InvalidGeometry(format!(
                "area {area_km2} km2"
            )));
        }
        let centroid = projected_centroid(&polygon).ok_or_else(|| {
            BoundaryError::InvalidGeometry("polygon has no centroid".to_string())
        })?;
        Ok(Self {
            polygon,
            area_km2,
            centroid,
            is_approximate,
        })
    }

    /// GeoJSON `FeatureCollection` holding this boundary as one feature.
    pub fn to_feature_collection(&self) -> Value {
        let coordinates: Vec<Vec<Vec<[f64; 2]>>> = self
            .polygon
            .iter()
            .map(|polygon| {
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors())
                    .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
                    .collect()
            })
            .collect();
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {
                    "area_km2": self.area_km2,
                    "approx_boundary": self.is_approximate,
                },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": coordinates,
                }
            }]
        })
    }
}

/// Area in km² measured on a Lambert cylindrical equal-area projection.
pub fn equal_area_km2(polygon: &MultiPolygon<f64>) -> f64 {
    let projected = polygon.map_coords(|c| Coord {
        x: AUTHALIC_RADIUS_M * c.x.to_radians(),
        y: AUTHALIC_RADIUS_M * c.y.to_radians().sin(),
    });
    projected.unsigned_area() / 1e6
}

/// Centroid taken in web mercator and projected back to degrees.
pub fn projected_centroid(polygon: &MultiPolygon<f64>) -> Option<LatLon> {
    let projected = polygon.map_coords(|c| {
        let lat = c.y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
        Coord {
            x: MERCATOR_RADIUS_M * c.x.to_radians(),
            y: MERCATOR_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
        }
    });
    let point = projected.centroid()?;
    let lon = (point.x() / MERCATOR_RADIUS_M).to_degrees();
    let lat = (2.0 * (point.y() / MERCATOR_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2)
        .to_degrees();
    (lat.is_finite() && lon.is_finite()).then_some(LatLon { lat, lon })
}

fn ring_from_json(ring: &Value) -> Option<LineString<f64>> {
    let coords = ring
        .as_array()?
        .iter()
        .map(|pair| {
            let pair = pair.as_array()?;
            Some(Coord {
                x: pair.first()?.as_f64()?,
                y: pair.get(1)?.as_f64()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(LineString::new(coords))
}

fn polygon_from_json(rings: &Value) -> Option<Polygon<f64>> {
    let mut rings = rings.as_array()?.iter();
    let exterior = ring_from_json(rings.next()?)?;
    let interiors = rings.map(ring_from_json).collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

/// Convert a GeoJSON `Polygon` or `MultiPolygon` geometry. Other geometry
/// types (points for nodes, lines) yield `None`.
pub fn multipolygon_from_geojson(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => Some(MultiPolygon::new(vec![polygon_from_json(coordinates)?])),
        "MultiPolygon" => {
            let polygons = coordinates
                .as_array()?
                .iter()
                .map(polygon_from_json)
                .collect::<Option<Vec<_>>>()?;
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    geojson: Option<Value>,
}

/// Pick the first polygonal place out of a Nominatim `jsonv2` search body.
pub fn parse_nominatim(body: &str) -> Result<Option<MultiPolygon<f64>>, BoundaryError> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(body).map_err(|e| BoundaryError::Geocode(e.to_string()))?;
    Ok(places.iter().find_map(|place| {
        let polygon = place.geojson.as_ref().and_then(multipolygon_from_geojson);
        if polygon.is_some() {
            debug!("Geocoded to {:?}", place.display_name);
        }
        polygon
    }))
}

/// Name to polygon lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the service answered but had no polygonal match.
    async fn geocode(&self, query: &str) -> Result<Option<MultiPolygon<f64>>, BoundaryError>;
}

/// OpenStreetMap Nominatim search client.
#[cfg(feature = "api")]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "api")]
impl NominatimGeocoder {
    pub const DEFAULT_URL: &'static str = "https://nominatim.openstreetmap.org/search";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.to_string(),
        })
    }
}

#[cfg(feature = "api")]
#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<MultiPolygon<f64>>, BoundaryError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "jsonv2"),
                ("polygon_geojson", "1"),
                ("limit", "5"),
            ])
            .send()
            .await
            .map_err(|e| BoundaryError::Geocode(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BoundaryError::Geocode(format!("HTTP {}", response.status())));
        }
        let body = response
            .text()
            .await
            .map_err(|e| BoundaryError::Geocode(e.to_string()))?;
        parse_nominatim(&body)
    }
}

/// Runs the name, qualified-name, country-region fallback chain.
#[derive(Debug, Clone)]
pub struct BoundaryResolver {
    default_country: String,
    fallback_region: String,
}

impl BoundaryResolver {
    pub fn new(default_country: &str, fallback_region: &str) -> Self {
        Self {
            default_country: default_country.to_string(),
            fallback_region: fallback_region.to_string(),
        }
    }

    async fn attempt(
        geocoder: &dyn Geocoder,
        query: &str,
        is_approximate: bool,
    ) -> Result<Boundary, BoundaryError> {
        match geocoder.geocode(query).await? {
            Some(polygon) => Boundary::from_polygon(polygon, is_approximate),
            None => Err(BoundaryError::Empty(query.to_string())),
        }
    }

    pub async fn resolve(
        &self,
        geocoder: &dyn Geocoder,
        city: &str,
    ) -> Result<Boundary, BoundaryUnavailable> {
        match Self::attempt(geocoder, city, false).await {
            Ok(boundary) => return Ok(boundary),
            Err(e) => warn!("Geocode of {:?} failed: {}", city, e),
        }

        let qualified = format!("{}, {}", city, self.default_country);
        match Self::attempt(geocoder, &qualified, false).await {
            Ok(boundary) => return Ok(boundary),
            Err(e) => warn!("Geocode of {:?} failed: {}", qualified, e),
        }

        warn!(
            "Using country-level region {:?} as an approximate boundary for {:?}",
            self.fallback_region, city
        );
        Self::attempt(geocoder, &self.fallback_region, true)
            .await
            .map_err(|reason| BoundaryUnavailable {
                city: city.to_string(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{rectangle, FakeGeocoder};

    #[test]
    fn one_degree_cell_at_equator() {
        let cell = rectangle(0.5, 0.5, 0.5, 0.5);
        let area = equal_area_km2(&cell);
        assert!((area - 12_364.0).abs() < 20.0, "area was {area}");
    }

    #[test]
    fn area_shrinks_towards_the_poles() {
        let tropics = equal_area_km2(&rectangle(10.0, 0.0, 0.5, 0.5));
        let arctic = equal_area_km2(&rectangle(70.0, 0.0, 0.5, 0.5));
        assert!(arctic < tropics * 0.4);
    }

    #[test]
    fn centroid_of_small_square_is_its_center() {
        let square = rectangle(12.97, 77.59, 0.1225, 0.1256);
        let centroid = projected_centroid(&square).unwrap();
        assert!((centroid.lat - 12.97).abs() < 1e-3);
        assert!((centroid.lon - 77.59).abs() < 1e-9);
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let line = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        )]);
        assert!(matches!(
            Boundary::from_polygon(line, false),
            Err(BoundaryError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn parses_polygon_and_skips_points() {
        let body = r#"[
            {"display_name": "Node", "geojson": {"type": "Point", "coordinates": [77.5, 12.9]}},
            {"display_name": "Bengaluru", "geojson": {"type": "Polygon", "coordinates":
                [[[77.4, 12.8], [77.8, 12.8], [77.8, 13.1], [77.4, 13.1], [77.4, 12.8]]]}}
        ]"#;
        let polygon = parse_nominatim(body).unwrap().unwrap();
        assert_eq!(polygon.0.len(), 1);
        assert_eq!(polygon.0[0].exterior().0.len(), 5);
    }

    #[test]
    fn parses_multipolygon_with_holes() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                 [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0], [1.0, 1.0]]],
                [[[10.0, 10.0], [11.0, 10.0], [11.0, 11.0], [10.0, 10.0]]]
            ]
        });
        let polygon = multipolygon_from_geojson(&geometry).unwrap();
        assert_eq!(polygon.0.len(), 2);
        assert_eq!(polygon.0[0].interiors().len(), 1);
    }

    #[test]
    fn empty_search_result_is_none() {
        assert_eq!(parse_nominatim("[]").unwrap(), None);
        assert!(parse_nominatim("not json").is_err());
    }

    #[test]
    fn feature_collection_carries_flag() {
        let boundary = Boundary::from_polygon(rectangle(20.0, 78.0, 1.0, 1.0), true).unwrap();
        let fc = boundary.to_feature_collection();
        assert_eq!(fc["type"], "FeatureCollection");
        assert_eq!(fc["features"][0]["properties"]["approx_boundary"], true);
        assert_eq!(fc["features"][0]["geometry"]["type"], "MultiPolygon");
    }

    #[tokio::test]
    async fn resolves_exact_name() {
        let geocoder = FakeGeocoder::new().with_polygon("Mysore", rectangle(12.3, 76.6, 0.05, 0.05));
        let resolver = BoundaryResolver::new("India", "India");
        let boundary = resolver.resolve(&geocoder, "Mysore").await.unwrap();
        assert!(!boundary.is_approximate);
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn retries_with_default_country() {
        let geocoder =
            FakeGeocoder::new().with_polygon("Mysore, India", rectangle(12.3, 76.6, 0.05, 0.05));
        let resolver = BoundaryResolver::new("India", "India");
        let boundary = resolver.resolve(&geocoder, "Mysore").await.unwrap();
        assert!(!boundary.is_approximate);
        assert_eq!(geocoder.calls(), 2);
    }

    #[tokio::test]
    async fn unresolvable_city_falls_back_to_country() {
        let india = rectangle(22.0, 79.0, 10.0, 12.0);
        let geocoder = FakeGeocoder::new()
            .with_polygon("India", india.clone())
            .with_failure("Atlantis");
        let resolver = BoundaryResolver::new("India", "India");
        let boundary = resolver.resolve(&geocoder, "Atlantis").await.unwrap();
        assert!(boundary.is_approximate);
        assert_eq!(boundary.area_km2, equal_area_km2(&india));
        assert_eq!(geocoder.calls(), 3);
    }

    #[tokio::test]
    async fn failing_fallback_is_unavailable() {
        let geocoder = FakeGeocoder::new();
        let resolver = BoundaryResolver::new("India", "India");
        let err = resolver.resolve(&geocoder, "Atlantis").await.unwrap_err();
        assert_eq!(err.city, "Atlantis");
        assert_eq!(err.reason, BoundaryError::Empty("India".to_string()));
    }
}

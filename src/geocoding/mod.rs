pub mod nominatim;

pub use nominatim::NominatimClient;

use geo::Point;
use serde::Deserialize;
use thiserror::Error;

/// Failures talking to a geocoding service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("Network timeout")]
    NetworkTimeout,

    #[error("HTTP error: {0}")]
    Http(u16),

    #[error("Rate limited by geocoding service")]
    RateLimited,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request failed: {0}")]
    Request(String),
}

/// One place returned by the geocoder.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeFeature {
    pub display_name: String,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: Option<[f64; 4]>,
}

impl GeocodeFeature {
    pub fn new(display_name: &str, bbox: [f64; 4]) -> Self {
        GeocodeFeature {
            display_name: display_name.to_string(),
            bbox: Some(bbox),
        }
    }

    /// Midpoint of the bounding box, `None` without a bbox.
    pub fn center(&self) -> Option<Point<f64>> {
        let [min_x, min_y, max_x, max_y] = self.bbox?;
        Some(Point::new(
            min_x + (max_x - min_x) / 2.0,
            min_y + (max_y - min_y) / 2.0,
        ))
    }
}

/// External free-text geocoding collaborator.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    async fn lookup(&self, query: &str) -> Result<Vec<GeocodeFeature>, GeocodeError>;
}

/// Geocoder that never finds anything. Used when running offline.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    async fn lookup(&self, _query: &str) -> Result<Vec<GeocodeFeature>, GeocodeError> {
        Ok(Vec::new())
    }
}

// GeoJSON response shape (format=geojson)
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: RawProperties,
    #[serde(default)]
    bbox: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    #[serde(default)]
    display_name: Option<String>,
}

/// Parse a GeoJSON FeatureCollection body into features.
///
/// A bbox that is not exactly four numbers is treated as missing.
pub fn parse_feature_collection(body: &str) -> Result<Vec<GeocodeFeature>, GeocodeError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    Ok(collection
        .features
        .into_iter()
        .map(|f| GeocodeFeature {
            display_name: f.properties.display_name.unwrap_or_default(),
            bbox: f.bbox.and_then(|b| <[f64; 4]>::try_from(b).ok()),
        })
        .collect())
}

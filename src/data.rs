use crate::types::RegionFeature;
use geo::MultiPolygon;
use geojson::GeoJson;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum GeometryLoadError {
    #[error("request for {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read geometry file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse GeoJSON")]
    Parse(#[from] geojson::Error),
    #[error("GeoJSON must be a FeatureCollection")]
    NotFeatureCollection,
    #[error("feature collection contains no polygon coordinates")]
    EmptyCollection,
}

/// Where the municipalities FeatureCollection comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometrySource {
    Url(String),
    File(PathBuf),
}

impl FromStr for GeometrySource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(GeometrySource::Url(s.to_string()))
        } else {
            Ok(GeometrySource::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for GeometrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometrySource::Url(url) => f.write_str(url),
            GeometrySource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub async fn fetch_features(
    source: &GeometrySource,
    client: &reqwest::Client,
) -> Result<Vec<RegionFeature>, GeometryLoadError> {
    info!(%source, "loading feature collection");
    let text = match source {
        GeometrySource::Url(url) => {
            let http = |source| GeometryLoadError::Http { url: url.clone(), source };
            let response = client.get(url).send().await.map_err(http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(GeometryLoadError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }
            response.text().await.map_err(http)?
        }
        GeometrySource::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| GeometryLoadError::Io { path: path.clone(), source })?,
    };
    parse_features(&text)
}

pub fn parse_features(text: &str) -> Result<Vec<RegionFeature>, GeometryLoadError> {
    let geojson: GeoJson = text.parse()?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(GeometryLoadError::NotFeatureCollection),
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let props = feature.properties.as_ref();
        let code = match props.and_then(|p| p.get("id")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let name = props
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let Some(geometry) = feature.geometry else {
            warn!(%code, %name, "feature has no geometry, skipping");
            continue;
        };
        let geometry: geo::Geometry<f64> = match geometry.value.try_into() {
            Ok(g) => g,
            Err(e) => {
                warn!(%code, %name, error = %e, "unconvertible geometry, skipping");
                continue;
            }
        };
        let geometry = match geometry {
            geo::Geometry::MultiPolygon(mp) => mp,
            geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            _ => {
                warn!(%code, %name, "feature is not a polygon, skipping");
                continue;
            }
        };

        features.push(RegionFeature { code, name, geometry });
    }

    info!(count = features.len(), "feature collection parsed");
    Ok(features)
}

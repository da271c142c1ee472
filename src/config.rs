use crate::format::Locale;
use crate::layers::ThematicLayer;
use crate::render::Theme;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_GEOMETRY_URL: &str =
    "https://raw.githubusercontent.com/tbrugz/geodata-br/master/geojson/geojs-33-mun.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub render: RenderConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// URL or file path of the municipalities FeatureCollection.
    pub geometry: String,
    // Tables left unset fall back to the bundled data (population, sanitation)
    // or to an empty table (hdi, homicide_rate).
    pub population_csv: Option<PathBuf>,
    pub sanitation_csv: Option<PathBuf>,
    pub hdi_csv: Option<PathBuf>,
    pub homicide_rate_csv: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            geometry: DEFAULT_GEOMETRY_URL.to_string(),
            population_csv: None,
            sanitation_csv: None,
            hdi_csv: None,
            homicide_rate_csv: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub theme: Theme,
    pub locale: Locale,
    pub layer: ThematicLayer,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            theme: Theme::Dark,
            locale: Locale::PtBr,
            layer: ThematicLayer::None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Optional directory of static assets served at `/`.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Like [`AppConfig::load_from_file`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!(?path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[input]
geometry = "maps/rj.geojson"
hdi_csv = "tables/hdi.csv"

[render]
theme = "light"
layer = "homicide-rate"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.input.geometry, "maps/rj.geojson");
        assert_eq!(config.input.hdi_csv, Some(PathBuf::from("tables/hdi.csv")));
        assert!(config.input.population_csv.is_none());
        assert_eq!(config.render.theme, Theme::Light);
        assert_eq!(config.render.layer, ThematicLayer::HomicideRate);
        assert_eq!(config.render.width, 800.0);
        assert_eq!(config.render.locale, Locale::PtBr);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn layer_accepts_dashboard_keys() {
        let config: AppConfig = toml::from_str("[render]\nlayer = \"taxaHomicidios\"").unwrap();
        assert_eq!(config.render.layer, ThematicLayer::HomicideRate);
        let config: AppConfig = toml::from_str("[render]\nlayer = \"idh\"").unwrap();
        assert_eq!(config.render.layer, ThematicLayer::HumanDevelopmentIndex);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.input.geometry, DEFAULT_GEOMETRY_URL);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render\nwidth = ").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }
}

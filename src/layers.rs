//! Thematic layers and their six-band color scales.

use crate::format::{self, Locale};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Band colors, lightest (lowest values) first.
pub const BAND_COLORS: [&str; 6] = [
    "#e3f2fd", "#bbdefb", "#64b5f6", "#1976d2", "#004a80", "#001f3f",
];

/// Fill for a region with no value in the active layer.
pub const NO_DATA_COLOR: &str = "#4b5563";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThematicLayer {
    #[default]
    #[serde(alias = "normal")]
    None,
    #[serde(alias = "idh")]
    HumanDevelopmentIndex,
    #[serde(alias = "ideb")]
    EducationIndex,
    #[serde(alias = "agua")]
    WaterCoverage,
    #[serde(alias = "esgoto")]
    SewageCoverage,
    #[serde(alias = "lixo")]
    WasteCollectionCoverage,
    #[serde(alias = "taxaHomicidios")]
    HomicideRate,
}

impl ThematicLayer {
    pub const ALL: [ThematicLayer; 7] = [
        ThematicLayer::None,
        ThematicLayer::HumanDevelopmentIndex,
        ThematicLayer::EducationIndex,
        ThematicLayer::WaterCoverage,
        ThematicLayer::SewageCoverage,
        ThematicLayer::WasteCollectionCoverage,
        ThematicLayer::HomicideRate,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ThematicLayer::None => "none",
            ThematicLayer::HumanDevelopmentIndex => "human-development-index",
            ThematicLayer::EducationIndex => "education-index",
            ThematicLayer::WaterCoverage => "water-coverage",
            ThematicLayer::SewageCoverage => "sewage-coverage",
            ThematicLayer::WasteCollectionCoverage => "waste-collection-coverage",
            ThematicLayer::HomicideRate => "homicide-rate",
        }
    }

    /// Short name shown in the layer picker.
    pub fn label(self) -> &'static str {
        match self {
            ThematicLayer::None => "Physical / Political",
            ThematicLayer::HumanDevelopmentIndex => "HDI",
            ThematicLayer::EducationIndex => "IDEB Education",
            ThematicLayer::WaterCoverage => "Sanitation: Water",
            ThematicLayer::SewageCoverage => "Sanitation: Sewage",
            ThematicLayer::WasteCollectionCoverage => "Waste Collection",
            ThematicLayer::HomicideRate => "Security: Homicides",
        }
    }

    /// Legend title; `None` has no legend.
    pub fn legend_title(self) -> Option<&'static str> {
        match self {
            ThematicLayer::None => None,
            ThematicLayer::HumanDevelopmentIndex => Some("Human Development Index (HDI)"),
            ThematicLayer::EducationIndex => Some("IDEB (Secondary School 2023)"),
            ThematicLayer::HomicideRate => Some("Homicide Rate (per 100k inhabitants)"),
            ThematicLayer::WaterCoverage
            | ThematicLayer::SewageCoverage
            | ThematicLayer::WasteCollectionCoverage => Some("Coverage Percentage (%)"),
        }
    }

    pub fn is_coverage(self) -> bool {
        matches!(
            self,
            ThematicLayer::WaterCoverage
                | ThematicLayer::SewageCoverage
                | ThematicLayer::WasteCollectionCoverage
        )
    }

    pub fn scale(self) -> Option<ColorScale> {
        let scale = match self {
            ThematicLayer::None => return None,
            ThematicLayer::HumanDevelopmentIndex => ColorScale {
                thresholds: [0.600, 0.650, 0.700, 0.750, 0.800],
                label_decimals: 2,
                label_suffix: "",
            },
            ThematicLayer::EducationIndex => ColorScale {
                thresholds: [3.0, 3.5, 4.0, 4.5, 5.0],
                label_decimals: 1,
                label_suffix: "",
            },
            ThematicLayer::HomicideRate => ColorScale {
                thresholds: [5.0, 10.0, 20.0, 40.0, 60.0],
                label_decimals: 0,
                label_suffix: "",
            },
            ThematicLayer::WaterCoverage
            | ThematicLayer::SewageCoverage
            | ThematicLayer::WasteCollectionCoverage => ColorScale {
                thresholds: [50.0, 60.0, 70.0, 80.0, 90.0],
                label_decimals: 0,
                label_suffix: "%",
            },
        };
        Some(scale)
    }

    /// Decimals used when the layer value is shown in the info panel.
    pub fn value_decimals(self) -> usize {
        match self {
            ThematicLayer::HumanDevelopmentIndex => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for ThematicLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown thematic layer '{0}'")]
pub struct LayerParseError(String);

impl FromStr for ThematicLayer {
    type Err = LayerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(layer) = ThematicLayer::ALL.into_iter().find(|l| l.id() == s) {
            return Ok(layer);
        }
        // Keys used by the dashboard's layer picker.
        match s {
            "normal" => Ok(ThematicLayer::None),
            "idh" => Ok(ThematicLayer::HumanDevelopmentIndex),
            "ideb" => Ok(ThematicLayer::EducationIndex),
            "agua" => Ok(ThematicLayer::WaterCoverage),
            "esgoto" => Ok(ThematicLayer::SewageCoverage),
            "lixo" => Ok(ThematicLayer::WasteCollectionCoverage),
            "taxaHomicidios" => Ok(ThematicLayer::HomicideRate),
            other => Err(LayerParseError(other.to_string())),
        }
    }
}

/// Six ascending bands split by five lower-inclusive thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub thresholds: [f64; 5],
    label_decimals: usize,
    label_suffix: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: &'static str,
    pub label: String,
}

impl ColorScale {
    /// Band index in `0..6`, or `None` when there is no usable value.
    pub fn band(&self, value: Option<f64>) -> Option<usize> {
        let value = value.filter(|v| v.is_finite())?;
        Some(self.thresholds.iter().filter(|t| value >= **t).count())
    }

    pub fn color(&self, value: Option<f64>) -> &'static str {
        match self.band(value) {
            Some(band) => BAND_COLORS[band],
            None => NO_DATA_COLOR,
        }
    }

    pub fn legend(&self, locale: Locale) -> Vec<LegendEntry> {
        let fmt = |v: f64| {
            format!(
                "{}{}",
                format::decimal(v, self.label_decimals, locale),
                self.label_suffix
            )
        };
        let t = &self.thresholds;
        let mut labels = Vec::with_capacity(6);
        labels.push(format!("< {}", fmt(t[0])));
        for pair in t.windows(2) {
            labels.push(format!("{}-{}", fmt(pair[0]), fmt(pair[1])));
        }
        labels.push(format!("≥ {}", fmt(t[4])));

        BAND_COLORS
            .iter()
            .copied()
            .zip(labels)
            .map(|(color, label)| LegendEntry { color, label })
            .collect()
    }
}

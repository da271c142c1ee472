//! Side panel describing the hovered municipality.

use crate::format::{self, Locale};
use crate::layers::ThematicLayer;
use crate::stats::StatisticTables;
use crate::types::RegionFeature;
use serde::Serialize;
use std::fmt;

pub const DEFAULT_TITLE: &str = "Explore the map";
pub const NO_SELECTION_MESSAGE: &str =
    "Hover over or tap a municipality to load its statistics.";
pub const UNAVAILABLE_MESSAGE: &str = "Data unavailable for this municipality.";
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoPanel {
    pub title: String,
    pub body: PanelBody,
    pub footer: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelBody {
    NoSelection { message: &'static str },
    Unavailable { code: String, message: &'static str },
    Region {
        code: String,
        population: String,
        section: Option<PanelSection>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSection {
    pub heading: String,
    pub lines: Vec<PanelLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelLine {
    pub label: &'static str,
    pub value: String,
}

impl InfoPanel {
    pub fn build(
        hovered: Option<&RegionFeature>,
        layer: ThematicLayer,
        tables: &StatisticTables,
        locale: Locale,
    ) -> Self {
        let footer = match layer {
            ThematicLayer::None => "State overview",
            _ => "Thematic filter active",
        };

        let Some(region) = hovered else {
            return InfoPanel {
                title: DEFAULT_TITLE.to_string(),
                body: PanelBody::NoSelection { message: NO_SELECTION_MESSAGE },
                footer,
            };
        };

        let title = if region.name.is_empty() {
            "Municipality".to_string()
        } else {
            region.name.clone()
        };

        let Some(pop) = tables.population(&region.code) else {
            return InfoPanel {
                title,
                body: PanelBody::Unavailable {
                    code: region.code.clone(),
                    message: UNAVAILABLE_MESSAGE,
                },
                footer,
            };
        };

        let section = match layer {
            ThematicLayer::None => tables.sanitation(&region.code).map(|s| PanelSection {
                heading: "Basic Sanitation".to_string(),
                lines: vec![
                    line("Water", format::coverage(s.missing_water, locale)),
                    line("Sewage", format::coverage(s.missing_sewage, locale)),
                    line("Waste collection", format::coverage(s.missing_waste_collection, locale)),
                ],
            }),
            ThematicLayer::HomicideRate => {
                let rate = tables.homicide_rate(&region.code);
                let estimated = rate.map(|r| (r * pop.population as f64 / 100_000.0).round() as u64);
                Some(PanelSection {
                    heading: "Public Safety".to_string(),
                    lines: vec![
                        line("Rate per 100k", or_na(rate.map(|r| format::decimal(r, 1, locale)))),
                        line("Homicides (est.)", or_na(estimated.map(|n| format::grouped(n, locale)))),
                    ],
                })
            }
            layer => {
                let suffix = if layer.is_coverage() { "%" } else { "" };
                let value = tables
                    .layer_value(layer, &region.code)
                    .map(|v| format!("{}{}", format::decimal(v, layer.value_decimals(), locale), suffix));
                Some(PanelSection {
                    heading: layer.label().to_string(),
                    lines: vec![line("Value", or_na(value))],
                })
            }
        };

        InfoPanel {
            title,
            body: PanelBody::Region {
                code: region.code.clone(),
                population: format!("{} inhabitants", format::grouped(pop.population, locale)),
                section,
            },
            footer,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self.body, PanelBody::NoSelection { .. })
    }
}

fn line(label: &'static str, value: String) -> PanelLine {
    PanelLine { label, value }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

impl fmt::Display for InfoPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        match &self.body {
            PanelBody::NoSelection { message } | PanelBody::Unavailable { message, .. } => {
                writeln!(f, "  {message}")?;
            }
            PanelBody::Region { population, section, .. } => {
                writeln!(f, "  Estimated population: {population}")?;
                if let Some(section) = section {
                    writeln!(f, "  {}", section.heading)?;
                    for l in &section.lines {
                        writeln!(f, "    {}: {}", l.label, l.value)?;
                    }
                }
            }
        }
        write!(f, "  [{}]", self.footer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{PopulationRecord, SanitationRecord};
    use geo::MultiPolygon;

    fn region(code: &str, name: &str) -> RegionFeature {
        RegionFeature {
            code: code.to_string(),
            name: name.to_string(),
            geometry: MultiPolygon::new(vec![]),
        }
    }

    fn tables() -> StatisticTables {
        let mut t = StatisticTables::default();
        t.insert_population(PopulationRecord {
            code: "3300803".into(),
            name: "Cachoeiras de Macacu".into(),
            population: 56943,
            education_index: Some(4.1),
        });
        t.insert_sanitation(SanitationRecord {
            code: "3300803".into(),
            name: "Cachoeiras de Macacu".into(),
            missing_water: Some(28.88),
            missing_sewage: None,
            missing_waste_collection: Some(0.9),
            flood_exposure: Some(28.88),
        });
        t.insert_hdi("3300803", 0.7006);
        t
    }

    fn section(panel: &InfoPanel) -> &PanelSection {
        match &panel.body {
            PanelBody::Region { section: Some(s), .. } => s,
            other => panic!("unexpected panel body {other:?}"),
        }
    }

    #[test]
    fn no_hover_shows_default_message() {
        let panel = InfoPanel::build(None, ThematicLayer::None, &tables(), Locale::PtBr);
        assert!(panel.is_default());
        assert_eq!(panel.title, DEFAULT_TITLE);
        assert_eq!(panel.footer, "State overview");
    }

    #[test]
    fn overview_lists_sanitation_coverage() {
        let r = region("3300803", "Cachoeiras de Macacu");
        let panel = InfoPanel::build(Some(&r), ThematicLayer::None, &tables(), Locale::PtBr);
        assert_eq!(panel.title, "Cachoeiras de Macacu");
        match &panel.body {
            PanelBody::Region { population, .. } => assert_eq!(population, "56.943 inhabitants"),
            other => panic!("unexpected {other:?}"),
        }
        let lines = &section(&panel).lines;
        assert_eq!(lines[0].value, "71,1% coverage");
        assert_eq!(lines[1].value, "No data reported");
        assert_eq!(lines[2].value, "99,1% coverage");
    }

    #[test]
    fn indicator_layers_use_their_precision() {
        let r = region("3300803", "Cachoeiras de Macacu");
        let t = tables();
        let hdi = InfoPanel::build(Some(&r), ThematicLayer::HumanDevelopmentIndex, &t, Locale::PtBr);
        assert_eq!(section(&hdi).lines[0].value, "0,701");
        assert_eq!(hdi.footer, "Thematic filter active");

        let water = InfoPanel::build(Some(&r), ThematicLayer::WaterCoverage, &t, Locale::EnUs);
        assert_eq!(section(&water).lines[0].value, "71.1%");

        let sewage = InfoPanel::build(Some(&r), ThematicLayer::SewageCoverage, &t, Locale::EnUs);
        assert_eq!(section(&sewage).lines[0].value, "N/A");
    }

    #[test]
    fn missing_homicide_rate_is_not_zero() {
        let r = region("3300803", "Cachoeiras de Macacu");
        let mut t = tables();
        let panel = InfoPanel::build(Some(&r), ThematicLayer::HomicideRate, &t, Locale::PtBr);
        assert!(section(&panel).lines.iter().all(|l| l.value == "N/A"));

        t.insert_homicide_rate("3300803", 35.12);
        let panel = InfoPanel::build(Some(&r), ThematicLayer::HomicideRate, &t, Locale::PtBr);
        let lines = &section(&panel).lines;
        assert_eq!(lines[0].value, "35,1");
        // 35.12 * 56943 / 100000 = 19.998
        assert_eq!(lines[1].value, "20");
    }

    #[test]
    fn region_without_population_is_unavailable() {
        let r = region("9999999", "");
        let panel = InfoPanel::build(Some(&r), ThematicLayer::None, &tables(), Locale::PtBr);
        assert_eq!(panel.title, "Municipality");
        assert!(matches!(panel.body, PanelBody::Unavailable { .. }));
    }

    #[test]
    fn display_renders_plain_text() {
        let r = region("3300803", "Cachoeiras de Macacu");
        let text = InfoPanel::build(Some(&r), ThematicLayer::None, &tables(), Locale::EnUs).to_string();
        assert!(text.starts_with("Cachoeiras de Macacu\n"));
        assert!(text.contains("Estimated population: 56,943 inhabitants"));
        assert!(text.contains("Water: 71.1% coverage"));
    }
}

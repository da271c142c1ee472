//! Read-only municipal statistic tables, keyed by administrative code.
//!
//! Source tables may key their rows either by `code` or by `name`. Name-keyed
//! rows are resolved to codes through the (code, name) pairs carried by the
//! population and sanitation tables, so every lookup after loading goes
//! through the administrative code only.

use crate::config::InputConfig;
use crate::layers::ThematicLayer;
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, warn};

const BUNDLED_POPULATION: &str = include_str!("../data/population.csv");
const BUNDLED_SANITATION: &str = include_str!("../data/sanitation.csv");

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to open {table} table {path:?}")]
    Io {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {table} table")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{table} table has neither a 'code' nor a 'name' column")]
    MissingKeyColumn { table: &'static str },
    #[error("{table} table has no value column (expected one of {expected:?})")]
    MissingValueColumn {
        table: &'static str,
        expected: &'static [&'static str],
    },
}

const HDI_COLUMNS: &[&str] = &["value", "hdi"];
const HOMICIDE_RATE_COLUMNS: &[&str] = &["value", "homicide_rate"];

#[derive(Debug, Clone)]
pub enum TableSource {
    Bundled(&'static str),
    File(PathBuf),
    Empty,
}

impl TableSource {
    fn or_default(path: &Option<PathBuf>, default: TableSource) -> TableSource {
        path.clone().map(TableSource::File).unwrap_or(default)
    }
}

#[derive(Debug, Clone)]
pub struct TableSources {
    pub population: TableSource,
    pub sanitation: TableSource,
    pub hdi: TableSource,
    pub homicide_rate: TableSource,
}

impl TableSources {
    pub fn from_config(input: &InputConfig) -> Self {
        Self {
            population: TableSource::or_default(
                &input.population_csv,
                TableSource::Bundled(BUNDLED_POPULATION),
            ),
            sanitation: TableSource::or_default(
                &input.sanitation_csv,
                TableSource::Bundled(BUNDLED_SANITATION),
            ),
            hdi: TableSource::or_default(&input.hdi_csv, TableSource::Empty),
            homicide_rate: TableSource::or_default(&input.homicide_rate_csv, TableSource::Empty),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationRecord {
    pub code: String,
    pub name: String,
    pub population: u64,
    /// IDEB, secondary school, 2023.
    pub education_index: Option<f64>,
}

/// Percentages of households *without* each service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitationRecord {
    pub code: String,
    pub name: String,
    pub missing_water: Option<f64>,
    pub missing_sewage: Option<f64>,
    pub missing_waste_collection: Option<f64>,
    pub flood_exposure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PopulationRow {
    code: Option<String>,
    name: Option<String>,
    population: u64,
    #[serde(default, alias = "ideb")]
    ideb_secondary_2023: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SanitationRow {
    code: Option<String>,
    name: Option<String>,
    #[serde(default)]
    missing_water: Option<f64>,
    #[serde(default)]
    missing_sewage: Option<f64>,
    #[serde(default)]
    missing_waste_collection: Option<f64>,
    #[serde(default)]
    flood_exposure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IndicatorRow {
    code: Option<String>,
    name: Option<String>,
    #[serde(alias = "hdi", alias = "homicide_rate")]
    value: Option<f64>,
}

#[derive(Debug, Default, Clone)]
pub struct StatisticTables {
    population: HashMap<String, PopulationRecord>,
    sanitation: HashMap<String, SanitationRecord>,
    hdi: HashMap<String, f64>,
    homicide_rate: HashMap<String, f64>,
    directory: HashMap<String, String>,
    unresolved: usize,
}

impl StatisticTables {
    pub fn load(sources: &TableSources) -> Result<Self, TableError> {
        let population: Vec<PopulationRow> = read_rows("population", &sources.population, &[])?;
        let sanitation: Vec<SanitationRow> = read_rows("sanitation", &sources.sanitation, &[])?;
        let hdi: Vec<IndicatorRow> = read_rows("hdi", &sources.hdi, HDI_COLUMNS)?;
        let homicide_rate: Vec<IndicatorRow> =
            read_rows("homicide_rate", &sources.homicide_rate, HOMICIDE_RATE_COLUMNS)?;

        let mut tables = StatisticTables::default();
        let pairs = population
            .iter()
            .map(|r| (&r.code, &r.name))
            .chain(sanitation.iter().map(|r| (&r.code, &r.name)));
        for (code, name) in pairs {
            if let (Some(code), Some(name)) = (code, name) {
                tables.directory.entry(name.clone()).or_insert_with(|| code.clone());
            }
        }

        for row in population {
            let Some(code) = tables.resolve("population", &row.code, &row.name) else {
                continue;
            };
            let name = row.name.unwrap_or_default();
            tables.insert_population(PopulationRecord {
                code,
                name,
                population: row.population,
                education_index: row.ideb_secondary_2023,
            });
        }

        for row in sanitation {
            let Some(code) = tables.resolve("sanitation", &row.code, &row.name) else {
                continue;
            };
            tables.insert_sanitation(SanitationRecord {
                code,
                name: row.name.unwrap_or_default(),
                missing_water: row.missing_water,
                missing_sewage: row.missing_sewage,
                missing_waste_collection: row.missing_waste_collection,
                flood_exposure: row.flood_exposure,
            });
        }

        for row in hdi {
            if let (Some(code), Some(value)) = (tables.resolve("hdi", &row.code, &row.name), row.value) {
                tables.insert_hdi(code, value);
            }
        }
        for row in homicide_rate {
            if let (Some(code), Some(value)) =
                (tables.resolve("homicide_rate", &row.code, &row.name), row.value)
            {
                tables.insert_homicide_rate(code, value);
            }
        }

        debug!(
            population = tables.population.len(),
            sanitation = tables.sanitation.len(),
            hdi = tables.hdi.len(),
            homicide_rate = tables.homicide_rate.len(),
            unresolved = tables.unresolved,
            "statistic tables loaded"
        );
        Ok(tables)
    }

    fn resolve(
        &mut self,
        table: &'static str,
        code: &Option<String>,
        name: &Option<String>,
    ) -> Option<String> {
        if let Some(code) = code.as_ref().filter(|c| !c.is_empty()) {
            return Some(code.clone());
        }
        let resolved = name.as_deref().and_then(|n| self.code_for_name(n)).map(str::to_string);
        if resolved.is_none() {
            warn!(table, name = ?name, "row has no resolvable administrative code, dropping");
            self.unresolved += 1;
        }
        resolved
    }

    pub fn insert_population(&mut self, record: PopulationRecord) {
        if !record.name.is_empty() {
            self.directory
                .entry(record.name.clone())
                .or_insert_with(|| record.code.clone());
        }
        self.population.insert(record.code.clone(), record);
    }

    pub fn insert_sanitation(&mut self, record: SanitationRecord) {
        if !record.name.is_empty() {
            self.directory
                .entry(record.name.clone())
                .or_insert_with(|| record.code.clone());
        }
        self.sanitation.insert(record.code.clone(), record);
    }

    pub fn insert_hdi(&mut self, code: impl Into<String>, value: f64) {
        self.hdi.insert(code.into(), value);
    }

    pub fn insert_homicide_rate(&mut self, code: impl Into<String>, value: f64) {
        self.homicide_rate.insert(code.into(), value);
    }

    pub fn population(&self, code: &str) -> Option<&PopulationRecord> {
        self.population.get(code)
    }

    pub fn sanitation(&self, code: &str) -> Option<&SanitationRecord> {
        self.sanitation.get(code)
    }

    pub fn hdi(&self, code: &str) -> Option<f64> {
        self.hdi.get(code).copied()
    }

    pub fn homicide_rate(&self, code: &str) -> Option<f64> {
        self.homicide_rate.get(code).copied()
    }

    pub fn code_for_name(&self, name: &str) -> Option<&str> {
        self.directory.get(name.trim()).map(String::as_str)
    }

    /// Rows dropped during loading because their name matched no known code.
    pub fn unresolved_rows(&self) -> usize {
        self.unresolved
    }

    /// Value that drives the fill color of `code` under `layer`.
    pub fn layer_value(&self, layer: ThematicLayer, code: &str) -> Option<f64> {
        let coverage = |missing: fn(&SanitationRecord) -> Option<f64>| {
            self.sanitation(code)
                .and_then(missing)
                .map(|m| (100.0 - m).clamp(0.0, 100.0))
        };
        match layer {
            ThematicLayer::None => None,
            ThematicLayer::HumanDevelopmentIndex => self.hdi(code),
            ThematicLayer::EducationIndex => {
                self.population(code).and_then(|p| p.education_index)
            }
            ThematicLayer::WaterCoverage => coverage(|s| s.missing_water),
            ThematicLayer::SewageCoverage => coverage(|s| s.missing_sewage),
            ThematicLayer::WasteCollectionCoverage => coverage(|s| s.missing_waste_collection),
            ThematicLayer::HomicideRate => self.homicide_rate(code),
        }
    }
}

/// `value_columns`, when non-empty, lists the accepted names of the column
/// holding the table's value; at least one must be present.
fn read_rows<T: DeserializeOwned>(
    table: &'static str,
    source: &TableSource,
    value_columns: &'static [&'static str],
) -> Result<Vec<T>, TableError> {
    let reader: Box<dyn Read> = match source {
        TableSource::Empty => return Ok(Vec::new()),
        TableSource::Bundled(text) => Box::new(text.as_bytes()),
        TableSource::File(path) => Box::new(File::open(path).map_err(|source| TableError::Io {
            table,
            path: path.clone(),
            source,
        })?),
    };

    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|source| TableError::Csv { table, source })?
        .clone();
    if !headers.iter().any(|h| h == "code" || h == "name") {
        return Err(TableError::MissingKeyColumn { table });
    }
    if !value_columns.is_empty() && !headers.iter().any(|h| value_columns.contains(&h)) {
        return Err(TableError::MissingValueColumn {
            table,
            expected: value_columns,
        });
    }

    rdr.deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| TableError::Csv { table, source })
}

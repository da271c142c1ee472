//! Choropleth map of the municipalities of Rio de Janeiro state.
//!
//! Geometry comes from a GeoJSON FeatureCollection, statistics from CSV
//! tables normalized by administrative (IBGE) code. [`renderer::ChoroplethRenderer`]
//! ties them together: it projects the features, colors them by the selected
//! [`layers::ThematicLayer`] and resolves hover into an [`panel::InfoPanel`].

pub mod config;
pub mod data;
pub mod format;
pub mod layers;
pub mod panel;
pub mod projection;
pub mod render;
pub mod renderer;
pub mod server;
pub mod stats;
pub mod types;

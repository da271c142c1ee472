//! The choropleth view: load state, thematic layer selection and hover.
//!
//! A view starts in `Loading`, moves to `Ready` once the feature collection
//! is fetched and projected, or to `Error` when fetching fails. Layer
//! selection and hover only operate on a `Ready` view and never touch the
//! statistic tables, which are shared read-only.

use crate::data::{self, GeometryLoadError, GeometrySource};
use crate::format::Locale;
use crate::layers::ThematicLayer;
use crate::projection::{BoundingBox, Projection};
use crate::render::{self, FrameInput, MapFrame, Theme};
use crate::stats::StatisticTables;
use crate::types::{ProjectedPath, RegionFeature};
use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RendererError {
    #[error("map is not ready")]
    NotReady,
    #[error("no region '{0}' in the loaded map")]
    UnknownRegion(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Loading,
    Ready,
    Error,
}

#[derive(Debug)]
enum State {
    Loading,
    Ready(LoadedMap),
    Error(String),
}

struct RegionEnvelope {
    feature: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// A loaded, projected feature collection. Immutable once built.
pub struct LoadedMap {
    features: Vec<RegionFeature>,
    projection: Projection,
    paths: Vec<ProjectedPath>,
    index: RTree<RegionEnvelope>,
}

impl std::fmt::Debug for LoadedMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedMap")
            .field("features", &self.features.len())
            .field("projection", &self.projection)
            .finish()
    }
}

impl LoadedMap {
    /// Projects `features` onto a `width` × `height` canvas. Features without
    /// an administrative code get one from `tables` by display name.
    pub fn new(
        mut features: Vec<RegionFeature>,
        tables: &StatisticTables,
        width: f64,
        height: f64,
    ) -> Result<Self, GeometryLoadError> {
        for f in features.iter_mut().filter(|f| f.code.is_empty()) {
            if let Some(code) = tables.code_for_name(&f.name) {
                f.code = code.to_string();
            }
        }

        let bbox = BoundingBox::of_features(&features).ok_or(GeometryLoadError::EmptyCollection)?;
        let projection = Projection::new(bbox, width, height);
        let paths = projection.paths(&features);

        let envelopes = features
            .iter()
            .enumerate()
            .filter_map(|(feature, f)| {
                let rect = f.geometry.bounding_rect()?;
                Some(RegionEnvelope {
                    feature,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        Ok(Self {
            features,
            projection,
            paths,
            index: RTree::bulk_load(envelopes),
        })
    }

    pub fn features(&self) -> &[RegionFeature] {
        &self.features
    }

    pub fn paths(&self) -> &[ProjectedPath] {
        &self.paths
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn feature_by_code(&self, code: &str) -> Option<usize> {
        self.features.iter().position(|f| f.code == code)
    }

    /// Region under a canvas point, if any.
    pub fn feature_at(&self, x: f64, y: f64) -> Option<usize> {
        let (lon, lat) = self.projection.unproject(x, y);
        let point = Point::new(lon, lat);
        self.index
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .map(|e| e.feature)
            .filter(|&i| self.features[i].geometry.contains(&point))
            .min()
    }

    pub fn frame(
        &self,
        tables: &StatisticTables,
        layer: ThematicLayer,
        hover: Option<usize>,
        theme: Theme,
        locale: Locale,
    ) -> MapFrame {
        render::build_frame(FrameInput {
            features: &self.features,
            paths: &self.paths,
            projection: &self.projection,
            tables,
            layer,
            hover,
            theme,
            locale,
        })
    }
}

pub struct ChoroplethRenderer {
    tables: Arc<StatisticTables>,
    width: f64,
    height: f64,
    state: State,
    layer: ThematicLayer,
    hover: Option<usize>,
}

impl ChoroplethRenderer {
    pub fn new(tables: Arc<StatisticTables>, width: f64, height: f64) -> Self {
        Self {
            tables,
            width,
            height,
            state: State::Loading,
            layer: ThematicLayer::None,
            hover: None,
        }
    }

    /// Fetches and projects the feature collection. Callable again after an
    /// error (or to replace a ready map); there is no automatic retry.
    pub async fn load(
        &mut self,
        source: &GeometrySource,
        client: &reqwest::Client,
    ) -> Result<(), GeometryLoadError> {
        self.begin_load();
        let result = data::fetch_features(source, client).await;
        self.finish_load(result)
    }

    /// Loads an already parsed collection.
    pub fn load_features(&mut self, features: Vec<RegionFeature>) -> Result<(), GeometryLoadError> {
        self.begin_load();
        self.finish_load(Ok(features))
    }

    fn begin_load(&mut self) {
        self.state = State::Loading;
        self.hover = None;
    }

    fn finish_load(
        &mut self,
        result: Result<Vec<RegionFeature>, GeometryLoadError>,
    ) -> Result<(), GeometryLoadError> {
        let loaded = result.and_then(|features| {
            LoadedMap::new(features, &self.tables, self.width, self.height)
        });
        match loaded {
            Ok(map) => {
                info!(regions = map.features.len(), "map ready");
                self.state = State::Ready(map);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to load geographic data");
                self.state = State::Error(format!("Failed to load the geographic data: {e}"));
                Err(e)
            }
        }
    }

    pub fn status(&self) -> Status {
        match self.state {
            State::Loading => Status::Loading,
            State::Ready(_) => Status::Ready,
            State::Error(_) => Status::Error,
        }
    }

    /// User-facing message of a failed load.
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            State::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn map(&self) -> Result<&LoadedMap, RendererError> {
        match &self.state {
            State::Ready(map) => Ok(map),
            _ => Err(RendererError::NotReady),
        }
    }

    pub fn tables(&self) -> &StatisticTables {
        &self.tables
    }

    pub fn layer(&self) -> ThematicLayer {
        self.layer
    }

    pub fn select_layer(&mut self, layer: ThematicLayer) -> Result<(), RendererError> {
        self.map()?;
        self.layer = layer;
        Ok(())
    }

    pub fn hover_enter(&mut self, feature: usize) -> Result<(), RendererError> {
        let map = self.map()?;
        if feature >= map.features.len() {
            return Err(RendererError::UnknownRegion(feature.to_string()));
        }
        self.hover = Some(feature);
        Ok(())
    }

    pub fn hover_enter_code(&mut self, code: &str) -> Result<(), RendererError> {
        let feature = self
            .map()?
            .feature_by_code(code)
            .ok_or_else(|| RendererError::UnknownRegion(code.to_string()))?;
        self.hover = Some(feature);
        Ok(())
    }

    /// Pointer at canvas (x, y): hovers the region underneath, or clears the
    /// hover over empty canvas.
    pub fn hover_at(&mut self, x: f64, y: f64) -> Result<Option<usize>, RendererError> {
        self.hover = self.map()?.feature_at(x, y);
        Ok(self.hover)
    }

    pub fn hover_leave(&mut self) {
        self.hover = None;
    }

    pub fn hovered(&self) -> Option<&RegionFeature> {
        let map = self.map().ok()?;
        map.features.get(self.hover?)
    }

    pub fn frame(&self, theme: Theme, locale: Locale) -> Result<MapFrame, RendererError> {
        Ok(self
            .map()?
            .frame(&self.tables, self.layer, self.hover, theme, locale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{PanelBody, NO_SELECTION_MESSAGE};
    use crate::stats::PopulationRecord;
    use geo::{polygon, MultiPolygon};

    fn features() -> Vec<RegionFeature> {
        vec![
            RegionFeature {
                code: "3303302".into(),
                name: "Niterói".into(),
                geometry: MultiPolygon::new(vec![polygon![
                    (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)
                ]]),
            },
            RegionFeature {
                code: String::new(),
                name: "Maricá".into(),
                geometry: MultiPolygon::new(vec![polygon![
                    (x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 1.0), (x: 1.0, y: 1.0)
                ]]),
            },
        ]
    }

    fn tables() -> Arc<StatisticTables> {
        let mut t = StatisticTables::default();
        for (code, name, population) in [("3303302", "Niterói", 481749), ("3302700", "Maricá", 197277)] {
            t.insert_population(PopulationRecord {
                code: code.into(),
                name: name.into(),
                population,
                education_index: None,
            });
        }
        Arc::new(t)
    }

    fn ready() -> ChoroplethRenderer {
        let mut r = ChoroplethRenderer::new(tables(), 800.0, 500.0);
        r.load_features(features()).unwrap();
        r
    }

    #[test]
    fn starts_loading_and_rejects_interaction() {
        let mut r = ChoroplethRenderer::new(tables(), 800.0, 500.0);
        assert_eq!(r.status(), Status::Loading);
        assert_eq!(r.select_layer(ThematicLayer::HomicideRate), Err(RendererError::NotReady));
        assert_eq!(r.hover_enter(0), Err(RendererError::NotReady));
        assert!(r.frame(Theme::Dark, Locale::PtBr).is_err());
    }

    #[test]
    fn empty_collection_enters_error_and_can_reload() {
        let mut r = ChoroplethRenderer::new(tables(), 800.0, 500.0);
        assert!(matches!(
            r.load_features(Vec::new()),
            Err(GeometryLoadError::EmptyCollection)
        ));
        assert_eq!(r.status(), Status::Error);
        assert!(r.error_message().unwrap().contains("geographic data"));
        assert!(r.frame(Theme::Dark, Locale::PtBr).is_err());

        r.load_features(features()).unwrap();
        assert_eq!(r.status(), Status::Ready);
        assert!(r.error_message().is_none());
    }

    #[test]
    fn missing_codes_are_filled_from_names() {
        let r = ready();
        assert_eq!(r.map().unwrap().features()[1].code, "3302700");
    }

    #[test]
    fn hover_replaces_and_leave_restores_default_panel() {
        let mut r = ready();
        r.hover_enter(0).unwrap();
        assert_eq!(r.hovered().unwrap().name, "Niterói");
        r.hover_enter_code("3302700").unwrap();
        assert_eq!(r.hovered().unwrap().name, "Maricá");

        let frame = r.frame(Theme::Dark, Locale::PtBr).unwrap();
        assert_eq!(frame.regions.iter().filter(|reg| reg.hovered).count(), 1);
        assert_eq!(frame.panel.title, "Maricá");

        r.hover_leave();
        let frame = r.frame(Theme::Dark, Locale::PtBr).unwrap();
        assert_eq!(
            frame.panel.body,
            PanelBody::NoSelection { message: NO_SELECTION_MESSAGE }
        );
    }

    #[test]
    fn hover_rejects_unknown_regions() {
        let mut r = ready();
        assert_eq!(r.hover_enter(7), Err(RendererError::UnknownRegion("7".into())));
        assert!(r.hover_enter_code("0000000").is_err());
        assert!(r.hovered().is_none());
    }

    #[test]
    fn hover_at_canvas_point() {
        let mut r = ready();
        // Bounding box is lon 0..3, lat 0..1 on an 800x500 canvas.
        assert_eq!(r.hover_at(100.0, 250.0).unwrap(), Some(0));
        assert_eq!(r.hover_at(600.0, 250.0).unwrap(), Some(1));
        assert_eq!(r.hover_at(900.0, 250.0).unwrap(), None);
        assert!(r.hovered().is_none());
    }

    #[test]
    fn reload_clears_hover_but_keeps_layer() {
        let mut r = ready();
        r.select_layer(ThematicLayer::WaterCoverage).unwrap();
        r.hover_enter(1).unwrap();
        r.load_features(features()).unwrap();
        assert!(r.hovered().is_none());
        assert_eq!(r.layer(), ThematicLayer::WaterCoverage);
    }
}

use geo::MultiPolygon;

/// One municipality as loaded from the feature collection.
#[derive(Debug, Clone)]
pub struct RegionFeature {
    /// Administrative (IBGE) code, e.g. `3304557`.
    pub code: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Projected SVG path for the feature at `feature` in the loaded collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPath {
    pub feature: usize,
    pub d: String,
}

use crate::types::{ProjectedPath, RegionFeature};
use geo::{LineString, MultiPolygon};
use std::fmt::Write;

/// Geographic extent of every ring of every loaded feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// `None` when the features carry no coordinates at all.
    pub fn of_features(features: &[RegionFeature]) -> Option<Self> {
        let mut coords = features.iter().flat_map(|f| rings(&f.geometry)).flat_map(|r| r.coords());
        let first = coords.next()?;
        let mut bbox = BoundingBox {
            min_lon: first.x,
            max_lon: first.x,
            min_lat: first.y,
            max_lat: first.y,
        };
        for c in coords {
            bbox.min_lon = bbox.min_lon.min(c.x);
            bbox.max_lon = bbox.max_lon.max(c.x);
            bbox.min_lat = bbox.min_lat.min(c.y);
            bbox.max_lat = bbox.max_lat.max(c.y);
        }
        Some(bbox)
    }
}

/// Linear (equirectangular) mapping of the bounding box onto a fixed canvas,
/// north up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub bbox: BoundingBox,
    pub width: f64,
    pub height: f64,
}

impl Projection {
    pub fn new(bbox: BoundingBox, width: f64, height: f64) -> Self {
        Self { bbox, width, height }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let b = &self.bbox;
        (
            scale(lon - b.min_lon, b.max_lon - b.min_lon, self.width),
            scale(b.max_lat - lat, b.max_lat - b.min_lat, self.height),
        )
    }

    /// Canvas point back to (lon, lat).
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let b = &self.bbox;
        (
            b.min_lon + scale(x, self.width, b.max_lon - b.min_lon),
            b.max_lat - scale(y, self.height, b.max_lat - b.min_lat),
        )
    }

    /// SVG path data for one feature: one closed subpath per non-empty ring.
    pub fn path(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for ring in rings(geometry) {
            for (i, c) in ring.coords().enumerate() {
                let (x, y) = self.project(c.x, c.y);
                if !d.is_empty() {
                    d.push(' ');
                }
                let cmd = if i == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{} {} {}", cmd, num(x), num(y));
            }
            if !ring.0.is_empty() {
                d.push_str(" Z");
            }
        }
        d
    }

    pub fn paths(&self, features: &[RegionFeature]) -> Vec<ProjectedPath> {
        features
            .iter()
            .enumerate()
            .map(|(feature, f)| ProjectedPath {
                feature,
                d: self.path(&f.geometry),
            })
            .collect()
    }
}

fn scale(offset: f64, span: f64, extent: f64) -> f64 {
    if span == 0.0 {
        0.0
    } else {
        offset / span * extent
    }
}

/// Exterior then interiors for each polygon, in multipolygon order.
fn rings(geometry: &MultiPolygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    geometry
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
}

/// Three decimals, trailing zeros trimmed.
fn num(v: f64) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    fn feature(code: &str, polys: Vec<Polygon<f64>>) -> RegionFeature {
        RegionFeature {
            code: code.to_string(),
            name: code.to_string(),
            geometry: MultiPolygon::new(polys),
        }
    }

    fn unit_projection() -> Projection {
        let bbox = BoundingBox { min_lon: -44.0, max_lon: -41.0, min_lat: -23.0, max_lat: -21.0 };
        Projection::new(bbox, 800.0, 500.0)
    }

    #[test]
    fn corners_map_to_canvas_corners() {
        let p = unit_projection();
        assert_eq!(p.project(-44.0, -21.0), (0.0, 0.0));
        assert_eq!(p.project(-41.0, -23.0), (800.0, 500.0));
        assert_eq!(p.project(-42.5, -22.0), (400.0, 250.0));
    }

    #[test]
    fn projection_preserves_order_and_is_north_up() {
        let p = unit_projection();
        let (x1, _) = p.project(-43.5, -22.0);
        let (x2, _) = p.project(-43.4, -22.0);
        assert!(x1 < x2);
        let (_, y1) = p.project(-43.0, -22.6);
        let (_, y2) = p.project(-43.0, -22.5);
        assert!(y1 > y2);
    }

    #[test]
    fn unproject_inverts_project() {
        let p = unit_projection();
        let (x, y) = p.project(-43.2, -22.9);
        let (lon, lat) = p.unproject(x, y);
        assert!((lon + 43.2).abs() < 1e-9);
        assert!((lat + 22.9).abs() < 1e-9);
    }

    #[test]
    fn degenerate_span_maps_to_zero() {
        let bbox = BoundingBox { min_lon: 1.0, max_lon: 1.0, min_lat: 0.0, max_lat: 2.0 };
        let p = Projection::new(bbox, 800.0, 500.0);
        let (x, y) = p.project(1.0, 1.0);
        assert_eq!(x, 0.0);
        assert_eq!(y, 250.0);
    }

    #[test]
    fn bounding_box_spans_all_rings() {
        let with_hole = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)])],
        );
        let island = polygon![(x: 10.0, y: -3.0), (x: 11.0, y: -3.0), (x: 11.0, y: -2.0)];
        let bbox = BoundingBox::of_features(&[feature("A", vec![with_hole]), feature("B", vec![island])]).unwrap();
        assert_eq!(bbox, BoundingBox { min_lon: 0.0, max_lon: 11.0, min_lat: -3.0, max_lat: 4.0 });
    }

    #[test]
    fn empty_collection_has_no_bounding_box() {
        assert!(BoundingBox::of_features(&[]).is_none());
        assert!(BoundingBox::of_features(&[feature("A", vec![])]).is_none());
    }

    #[test]
    fn path_emits_one_closed_subpath_per_ring() {
        let bbox = BoundingBox { min_lon: 0.0, max_lon: 4.0, min_lat: 0.0, max_lat: 4.0 };
        let p = Projection::new(bbox, 400.0, 400.0);
        let with_hole = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)])],
        );
        let d = p.path(&MultiPolygon::new(vec![with_hole]));
        assert_eq!(
            d,
            "M 0 400 L 400 400 L 400 0 L 0 400 Z M 100 300 L 200 300 L 200 200 L 100 300 Z"
        );
    }

    #[test]
    fn empty_geometry_yields_empty_path() {
        let p = unit_projection();
        assert_eq!(p.path(&MultiPolygon::new(vec![])), "");
        let hollow = Polygon::new(LineString::new(vec![]), vec![]);
        assert_eq!(p.path(&MultiPolygon::new(vec![hollow])), "");
    }

    #[test]
    fn path_numbers_are_trimmed() {
        assert_eq!(num(12.5), "12.5");
        assert_eq!(num(1.0 / 3.0), "0.333");
        assert_eq!(num(-0.0001), "0");
    }
}

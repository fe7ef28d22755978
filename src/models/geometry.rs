//! GeoJSON-compatible polygonal geometry used for land-plot boundaries.
//!
//! Only the measures the local metadata extractor needs are implemented here;
//! everything raster-related happens in the remote service.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PlotStatsError, Result};

/// A `[longitude, latitude]` position in WGS84 degrees
pub type Position = [f64; 2];

/// A closed linear ring; the first and last positions are equal
pub type Ring = Vec<Position>;

/// Mean Earth radius in metres
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Plot boundary geometry, serialized exactly like GeoJSON geometry objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Exterior ring followed by optional interior rings
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Polygon,
    MultiPolygon,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Polygon => write!(f, "Polygon"),
            GeometryKind::MultiPolygon => write!(f, "MultiPolygon"),
        }
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Geometry::Polygon(rings) => vec![rings.as_slice()],
            Geometry::MultiPolygon(polygons) => polygons.iter().map(Vec::as_slice).collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons()
            .iter()
            .flat_map(|rings| rings.iter())
            .map(Vec::len)
            .sum()
    }

    /// Check ring closure, minimum ring size and coordinate sanity
    pub fn validate(&self) -> Result<()> {
        let polygons = self.polygons();
        if polygons.is_empty() {
            return Err(PlotStatsError::ValidationError(
                "geometry contains no polygons".to_string(),
            ));
        }

        for rings in polygons {
            if rings.is_empty() {
                return Err(PlotStatsError::ValidationError(
                    "polygon has no exterior ring".to_string(),
                ));
            }

            for ring in rings {
                if ring.len() < 4 {
                    return Err(PlotStatsError::ValidationError(format!(
                        "ring has {} positions, at least 4 are required",
                        ring.len()
                    )));
                }
                if ring.first() != ring.last() {
                    return Err(PlotStatsError::ValidationError(
                        "ring is not closed".to_string(),
                    ));
                }
                if let Some(position) = ring.iter().find(|p| !valid_position(p)) {
                    return Err(PlotStatsError::ValidationError(format!(
                        "position {position:?} is outside WGS84 bounds"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Area-weighted centroid of the exterior rings, in degrees
    ///
    /// Falls back to the vertex mean for degenerate (zero-area) input.
    pub fn centroid(&self) -> Option<Position> {
        let mut weighted = [0.0_f64; 2];
        let mut total_area = 0.0_f64;

        for rings in self.polygons() {
            let Some(exterior) = rings.first() else {
                continue;
            };
            let (area, centroid) = ring_area_and_centroid(exterior);
            if area.abs() > f64::EPSILON {
                weighted[0] += centroid[0] * area;
                weighted[1] += centroid[1] * area;
                total_area += area;
            }
        }

        if total_area.abs() > f64::EPSILON {
            return Some([weighted[0] / total_area, weighted[1] / total_area]);
        }

        let positions: Vec<&Position> = self
            .polygons()
            .into_iter()
            .filter_map(|rings| rings.first())
            .flat_map(|ring| ring.iter())
            .collect();
        if positions.is_empty() {
            return None;
        }
        let n = positions.len() as f64;
        Some([
            positions.iter().map(|p| p[0]).sum::<f64>() / n,
            positions.iter().map(|p| p[1]).sum::<f64>() / n,
        ])
    }

    /// Approximate planar area in hectares
    ///
    /// Uses a local equirectangular projection around each polygon, which is
    /// adequate for plot-sized geometries. Interior rings are subtracted.
    pub fn approximate_area_hectares(&self) -> f64 {
        let square_metres: f64 = self
            .polygons()
            .into_iter()
            .map(|rings| {
                let Some(exterior) = rings.first() else {
                    return 0.0;
                };
                let reference_lat = exterior.iter().map(|p| p[1]).sum::<f64>()
                    / exterior.len().max(1) as f64;
                let outer = projected_ring_area(exterior, reference_lat);
                let holes: f64 = rings
                    .iter()
                    .skip(1)
                    .map(|ring| projected_ring_area(ring, reference_lat))
                    .sum();
                (outer - holes).max(0.0)
            })
            .sum();

        square_metres / 10_000.0
    }
}

fn valid_position(position: &Position) -> bool {
    position[0].is_finite()
        && position[1].is_finite()
        && (-180.0..=180.0).contains(&position[0])
        && (-90.0..=90.0).contains(&position[1])
}

/// Signed shoelace area and centroid of a ring in degree space
fn ring_area_and_centroid(ring: &[Position]) -> (f64, Position) {
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for pair in ring.windows(2) {
        let [x0, y0] = pair[0];
        let [x1, y1] = pair[1];
        let cross = x0 * y1 - x1 * y0;
        area += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }

    area *= 0.5;
    if area.abs() <= f64::EPSILON {
        return (0.0, [0.0, 0.0]);
    }

    (area, [cx / (6.0 * area), cy / (6.0 * area)])
}

/// Unsigned ring area in square metres using an equirectangular projection
fn projected_ring_area(ring: &[Position], reference_lat: f64) -> f64 {
    let lat_scale = EARTH_RADIUS_M.to_radians();
    let lon_scale = lat_scale * reference_lat.to_radians().cos();

    let mut area = 0.0;
    for pair in ring.windows(2) {
        let (x0, y0) = (pair[0][0] * lon_scale, pair[0][1] * lat_scale);
        let (x1, y1) = (pair[1][0] * lon_scale, pair[1][1] * lat_scale);
        area += x0 * y1 - x1 * y0;
    }

    (area * 0.5).abs()
}

// SPDX-License-Identifier: MIT

//! Coordinate reprojection between the geographic and planar reference systems.
//!
//! Display and intersection happen in EPSG:4326 (lon/lat). Areas are measured
//! in EPSG:9377 (MAGNA-SIRGAS / Origen-Nacional), Colombia's official planar
//! system, where coordinates are meters. proj4rs expects geographic
//! coordinates in radians; this module owns that conversion so callers only
//! ever see degrees and meters.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use proj4rs::Proj;

/// EPSG:4326 — WGS84 geographic, degrees.
pub const EPSG_4326: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// EPSG:9377 — MAGNA-SIRGAS / Origen-Nacional, transverse Mercator, meters.
/// Appropriate for the whole Colombian territory; area distortion over that
/// extent stays far below the hectare scale reported to users.
pub const EPSG_9377: &str =
    "+proj=tmerc +lat_0=4.0 +lon_0=-73.0 +k=0.9992 +x_0=5000000 +y_0=2000000 +ellps=GRS80 +units=m +no_defs";

/// Errors from coordinate transformation.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("Invalid projection definition: {0}")]
    InvalidDefinition(String),

    #[error("Coordinate transform failed: {0}")]
    TransformFailed(String),
}

/// A one-way transform between two coordinate reference systems.
pub struct Projector {
    from: Proj,
    to: Proj,
}

impl Projector {
    pub fn new(from_def: &str, to_def: &str) -> Result<Self, ProjectionError> {
        let from = Proj::from_proj_string(from_def)
            .map_err(|e| ProjectionError::InvalidDefinition(e.to_string()))?;
        let to = Proj::from_proj_string(to_def)
            .map_err(|e| ProjectionError::InvalidDefinition(e.to_string()))?;
        Ok(Self { from, to })
    }

    /// Geographic (EPSG:4326) to planar (EPSG:9377), the direction used for
    /// area measurement.
    pub fn wgs84_to_planar() -> Result<Self, ProjectionError> {
        Self::new(EPSG_4326, EPSG_9377)
    }

    /// Planar (EPSG:9377) back to geographic (EPSG:4326).
    pub fn planar_to_wgs84() -> Result<Self, ProjectionError> {
        Self::new(EPSG_9377, EPSG_4326)
    }

    pub fn project_coord(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let mut point = if self.from.is_latlong() {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };

        proj4rs::transform::transform(&self.from, &self.to, &mut point)
            .map_err(|e| ProjectionError::TransformFailed(e.to_string()))?;

        if self.to.is_latlong() {
            Ok(Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            })
        } else {
            Ok(Coord {
                x: point.0,
                y: point.1,
            })
        }
    }

    pub fn project_line_string(
        &self,
        ring: &LineString<f64>,
    ) -> Result<LineString<f64>, ProjectionError> {
        let coords = ring
            .coords()
            .map(|c| self.project_coord(*c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LineString::new(coords))
    }

    pub fn project_polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, ProjectionError> {
        let exterior = self.project_line_string(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| self.project_line_string(ring))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    pub fn project_multi_polygon(
        &self,
        multi: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, ProjectionError> {
        let polygons = multi
            .iter()
            .map(|p| self.project_polygon(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MultiPolygon::new(polygons))
    }
}

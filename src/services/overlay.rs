// SPDX-License-Identifier: MIT

//! Overlay analysis: which territories does a query polygon affect, and by
//! how much.
//!
//! Inputs are geographic (EPSG:4326). The intersection predicate and the
//! polygon clipping run directly on geographic coordinates; every area is
//! measured after reprojection to the planar CRS. The analyzer is a pure
//! function of its two inputs: no session state, no input mutation.

use crate::models::overlay::{IntersectionRecord, OverlayReport};
use crate::models::territory::Territory;
use crate::services::projection::{ProjectionError, Projector};
use geo::{Area, BooleanOps, Intersects, MultiPolygon};

/// Errors from overlay analysis.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Computes territory/query intersections and their area statistics.
pub struct OverlayAnalyzer {
    to_planar: Projector,
}

impl OverlayAnalyzer {
    pub fn new() -> Result<Self, OverlayError> {
        Ok(Self {
            to_planar: Projector::wgs84_to_planar()?,
        })
    }

    /// Analyze a query polygon against the territory collection.
    ///
    /// `affected` collects every territory that intersects the dissolved query
    /// union, including boundary-only touches. `intersections` holds one
    /// record per territory whose clipped overlap is non-empty, so a
    /// touching-only territory can appear in `affected` without a matching
    /// record. Percentages are rounded to 2 decimals and never clamped:
    /// `pct_of_territory` is derived from the declared area, which may be
    /// smaller than the measured geometry.
    ///
    /// Outputs follow the iteration order of `territories`; callers that need
    /// a display order sort downstream.
    pub fn analyze(
        &self,
        territories: &[Territory],
        query: &MultiPolygon<f64>,
    ) -> Result<OverlayReport, OverlayError> {
        let dissolved = dissolve(query);
        let query_area_m2 = self
            .to_planar
            .project_multi_polygon(&dissolved)?
            .unsigned_area();

        tracing::debug!(
            territories = territories.len(),
            query_parts = query.0.len(),
            query_area_m2,
            "Running overlay analysis"
        );

        // A degenerate query (empty or zero-area) affects nothing.
        if query_area_m2 == 0.0 {
            return Ok(OverlayReport {
                query_area_m2,
                ..Default::default()
            });
        }

        let mut affected = Vec::new();
        let mut intersections = Vec::new();

        for territory in territories {
            if !territory.geometry.intersects(&dissolved) {
                continue;
            }
            affected.push(territory.summary());

            let clipped = territory.geometry.intersection(&dissolved);
            if clipped.0.is_empty() {
                // Boundary touch only: affected, but no measurable overlap.
                continue;
            }

            let area_m2 = self
                .to_planar
                .project_multi_polygon(&clipped)?
                .unsigned_area();

            let declared_m2 = territory.area_total_ha * 10_000.0;
            intersections.push(IntersectionRecord {
                territory_id: territory.id.clone(),
                territory_name: territory.name.clone(),
                geometry: clipped,
                area_m2,
                area_ha: area_m2 / 10_000.0,
                pct_of_query: round2(area_m2 / query_area_m2 * 100.0),
                pct_of_territory: round2(area_m2 / declared_m2 * 100.0),
            });
        }

        tracing::info!(
            affected = affected.len(),
            intersections = intersections.len(),
            "Overlay analysis complete"
        );

        Ok(OverlayReport {
            affected,
            intersections,
            query_area_m2,
        })
    }
}

/// Dissolve the parts of a multipolygon into one geometry so overlapping
/// parts are not double counted in the query area or the affected filter.
fn dissolve(query: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let mut parts = query.iter();
    let Some(first) = parts.next() else {
        return MultiPolygon::new(Vec::new());
    };
    let mut dissolved = MultiPolygon::new(vec![first.clone()]);
    for part in parts {
        dissolved = dissolved.union(part);
    }
    dissolved
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.526315), 10.53);
        assert_eq!(round2(99.994), 99.99);
        assert_eq!(round2(100.005), 100.01);
    }

    #[test]
    fn test_dissolve_merges_duplicate_parts() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let duplicated = MultiPolygon::new(vec![square.clone(), square.clone()]);

        let dissolved = dissolve(&duplicated);
        let single = MultiPolygon::new(vec![square]);

        assert!((dissolved.unsigned_area() - single.unsigned_area()).abs() < 1e-9);
    }

    #[test]
    fn test_dissolve_empty() {
        let empty = MultiPolygon::<f64>::new(Vec::new());
        assert!(dissolve(&empty).0.is_empty());
    }
}

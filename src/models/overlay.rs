// SPDX-License-Identifier: MIT

//! Overlay analysis result types.

use crate::models::territory::TerritorySummary;
use geo::MultiPolygon;

/// One territory/query intersection with its measured areas.
///
/// Areas are measured in the projected planar CRS, never from geographic
/// coordinates. `pct_of_territory` uses the declared `area_total_ha`, so it can
/// exceed 100% when the declared area is smaller than the measured geometry.
/// That mismatch is an artifact of the source data and is passed through
/// unclamped.
#[derive(Debug, Clone)]
pub struct IntersectionRecord {
    pub territory_id: String,
    pub territory_name: String,
    /// Intersection geometry in geographic coordinates (EPSG:4326)
    pub geometry: MultiPolygon<f64>,
    /// Intersection area in square meters (planar CRS)
    pub area_m2: f64,
    /// `area_m2 / 10_000`
    pub area_ha: f64,
    /// Share of the query polygon covered by this territory, rounded to 2 decimals
    pub pct_of_query: f64,
    /// Share of the territory's declared area, rounded to 2 decimals
    pub pct_of_territory: f64,
}

/// Complete output of one overlay analysis.
///
/// `affected` holds every territory whose geometry intersects the dissolved
/// query (boundary touches included); `intersections` only those pairs whose
/// clipped overlap is non-empty. Neither collection is sorted.
#[derive(Debug, Clone, Default)]
pub struct OverlayReport {
    pub affected: Vec<TerritorySummary>,
    pub intersections: Vec<IntersectionRecord>,
    /// Area of the dissolved query polygon in square meters (planar CRS)
    pub query_area_m2: f64,
}

impl OverlayReport {
    pub fn query_area_ha(&self) -> f64 {
        self.query_area_m2 / 10_000.0
    }

    pub fn is_empty(&self) -> bool {
        self.affected.is_empty() && self.intersections.is_empty()
    }
}

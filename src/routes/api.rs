// SPDX-License-Identifier: MIT

//! Viewer API routes: filtering, map data, overlay analysis and exports.

use crate::error::{AppError, Result};
use crate::models::territory::{Territory, TerritoryStats, TerritorySummary};
use crate::services::export::{self, Basemap, BASEMAPS};
use crate::services::territory::{TerritoryFilter, TerritoryService};
use crate::services::{loader, OverlayAnalyzer};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Uploaded query archives larger than this are rejected outright.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/territories", get(get_territories))
        .route("/api/territories/geojson", get(get_territories_geojson))
        .route("/api/options", get(get_options))
        .route(
            "/api/overlay",
            post(post_overlay).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/export/csv", get(export_csv))
        .route("/api/export/shapefile", get(export_shapefile))
        .route("/api/export/html", get(export_html))
}

// ─── Filtering ───────────────────────────────────────────────

/// Query-string filters. Multi-select fields take comma-separated lists.
#[derive(Deserialize, Default)]
struct FilterQuery {
    /// Substring match on the administrative identifier
    id: Option<String>,
    /// Exact name match
    name: Option<String>,
    /// Comma-separated raw type values
    #[serde(rename = "type")]
    types: Option<String>,
    /// Comma-separated departments
    department: Option<String>,
    /// Comma-separated municipalities
    municipality: Option<String>,
}

impl FilterQuery {
    fn into_filter(self) -> TerritoryFilter {
        TerritoryFilter {
            id_contains: self.id.filter(|s| !s.is_empty()),
            name: self.name.filter(|s| !s.is_empty()),
            types: split_list(self.types),
            departments: split_list(self.department),
            municipalities: split_list(self.municipality),
        }
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Serialize)]
pub struct TerritoriesResponse {
    pub territories: Vec<TerritorySummary>,
    pub stats: TerritoryStats,
    /// Informational message when the filters match nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Filtered territory table plus result statistics.
async fn get_territories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<TerritoriesResponse>> {
    let filter = params.into_filter();
    let matched = state.territories.filter(&filter);

    tracing::debug!(matched = matched.len(), "Territory filter applied");

    let stats = TerritoryStats::from_territories(matched.iter().copied());
    let message = matched
        .is_empty()
        .then(|| "No territories matched the applied filters".to_string());

    Ok(Json(TerritoriesResponse {
        territories: matched.iter().map(|t| t.summary()).collect(),
        stats,
        message,
    }))
}

/// Filtered territories as a GeoJSON FeatureCollection for map rendering.
/// Each feature carries its tooltip attributes and the per-kind color.
async fn get_territories_geojson(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<geojson::FeatureCollection>> {
    let filter = params.into_filter();
    let matched = state.territories.filter(&filter);
    Ok(Json(feature_collection(&matched)))
}

// ─── Selector Options ────────────────────────────────────────

#[derive(Serialize)]
pub struct OptionsResponse {
    pub names: Vec<String>,
    pub types: Vec<String>,
    pub departments: Vec<String>,
    pub municipalities: Vec<String>,
    pub basemaps: Vec<Basemap>,
}

/// Distinct attribute values for the sidebar selectors, plus the basemap
/// catalog.
async fn get_options(State(state): State<Arc<AppState>>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        names: state.territories.distinct_names(),
        types: state.territories.distinct_types(),
        departments: state.territories.distinct_departments(),
        municipalities: state.territories.distinct_municipalities(),
        basemaps: BASEMAPS.to_vec(),
    })
}

// ─── Overlay Analysis ────────────────────────────────────────

#[derive(Serialize)]
pub struct IntersectionResponse {
    pub territory_id: String,
    pub territory_name: String,
    pub area_m2: f64,
    pub area_ha: f64,
    pub pct_of_query: f64,
    pub pct_of_territory: f64,
    pub geometry: geojson::Geometry,
}

#[derive(Serialize)]
pub struct OverlayResponse {
    pub affected: Vec<TerritorySummary>,
    pub intersections: Vec<IntersectionResponse>,
    pub query_area_ha: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Analyze an uploaded query-polygon shapefile ZIP against the territory
/// collection.
///
/// The body is the raw ZIP archive. A query that overlaps nothing is a normal
/// success, reported with an informational message. Records are sorted by
/// intersection area, largest first, for display.
async fn post_overlay(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<OverlayResponse>> {
    if body.is_empty() {
        return Err(AppError::BadRequest(
            "Request body must contain a shapefile ZIP archive".to_string(),
        ));
    }

    let query = loader::read_query_geometry(&body)?;

    let analyzer = OverlayAnalyzer::new()?;
    let report = analyzer.analyze(state.territories.territories(), &query)?;

    let mut intersections: Vec<IntersectionResponse> = report
        .intersections
        .iter()
        .map(|r| IntersectionResponse {
            territory_id: r.territory_id.clone(),
            territory_name: r.territory_name.clone(),
            area_m2: r.area_m2,
            area_ha: r.area_ha,
            pct_of_query: r.pct_of_query,
            pct_of_territory: r.pct_of_territory,
            geometry: geojson::Geometry::new(geojson::Value::from(&r.geometry)),
        })
        .collect();
    intersections.sort_by(|a, b| b.area_ha.total_cmp(&a.area_ha));

    let message = report
        .is_empty()
        .then(|| "The query polygon does not overlap any territory".to_string());

    Ok(Json(OverlayResponse {
        query_area_ha: report.query_area_ha(),
        affected: report.affected,
        intersections,
        message,
    }))
}

// ─── Exports ─────────────────────────────────────────────────

/// Download the filtered attribute table as CSV.
async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<impl IntoResponse> {
    let filter = params.into_filter();
    let matched = state.territories.filter(&filter);
    let bytes = export::territories_csv(matched.iter().copied())?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"resultados_formalizados.csv\"",
            ),
        ],
        bytes,
    ))
}

/// Download the filtered set as a packaged shapefile ZIP.
async fn export_shapefile(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<impl IntoResponse> {
    let filter = params.into_filter();
    let matched = state.territories.filter(&filter);
    let bytes =
        export::territories_shapefile_zip(matched.iter().copied(), "territorios_filtrados")?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"territorios_filtrados.zip\"",
            ),
        ],
        bytes,
    ))
}

/// Same filters as [`FilterQuery`] plus the map rendering options.
/// serde_urlencoded cannot flatten nested structs, so the filter fields are
/// repeated here.
#[derive(Deserialize)]
struct HtmlExportQuery {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    types: Option<String>,
    department: Option<String>,
    municipality: Option<String>,
    /// Basemap key from the options catalog
    basemap: Option<String>,
    /// Fill polygons (true) or outline only (false)
    #[serde(default = "default_fill")]
    fill: bool,
}

impl HtmlExportQuery {
    fn filter(&self) -> TerritoryFilter {
        TerritoryFilter {
            id_contains: self.id.clone().filter(|s| !s.is_empty()),
            name: self.name.clone().filter(|s| !s.is_empty()),
            types: split_list(self.types.clone()),
            departments: split_list(self.department.clone()),
            municipalities: split_list(self.municipality.clone()),
        }
    }
}

fn default_fill() -> bool {
    true
}

/// Download a standalone interactive HTML map of the filtered set.
async fn export_html(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HtmlExportQuery>,
) -> Result<impl IntoResponse> {
    let basemap = match params.basemap.as_deref() {
        None => &BASEMAPS[1], // CartoDB Positron, the original default
        Some(key) => export::basemap_by_key(key)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown basemap: {key}")))?,
    };

    let filter = params.filter();
    let matched = state.territories.filter(&filter);
    let bounds = TerritoryService::bounds(matched.iter().copied());

    let collection = feature_collection(&matched);
    let geojson_text = serde_json::to_string(&collection).map_err(anyhow::Error::from)?;
    let html = export::html_map(&geojson_text, basemap, params.fill, bounds);

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"mapa_formalizado.html\"",
            ),
        ],
        html,
    ))
}

// ─── Helpers ─────────────────────────────────────────────────

fn feature_collection(territories: &[&Territory]) -> geojson::FeatureCollection {
    let features = territories
        .iter()
        .map(|t| {
            let mut properties = geojson::JsonObject::new();
            properties.insert("id".to_string(), t.id.clone().into());
            properties.insert("name".to_string(), t.name.clone().into());
            properties.insert("type_raw".to_string(), t.type_raw.clone().into());
            properties.insert("department".to_string(), t.department.clone().into());
            properties.insert("municipality".to_string(), t.municipality.clone().into());
            properties.insert("area_total_ha".to_string(), t.area_total_ha.into());
            properties.insert("color".to_string(), t.kind().color().into());

            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&t.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(Some("Cauca, Chocó".to_string())),
            vec!["Cauca", "Chocó"]
        );
        assert!(split_list(Some(" , ".to_string())).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_filter_query_drops_empty_strings() {
        let query = FilterQuery {
            id: Some(String::new()),
            name: Some("Palenque".to_string()),
            ..Default::default()
        };
        let filter = query.into_filter();
        assert!(filter.id_contains.is_none());
        assert_eq!(filter.name.as_deref(), Some("Palenque"));
    }
}

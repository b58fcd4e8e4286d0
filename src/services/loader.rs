// SPDX-License-Identifier: MIT

//! Shapefile-from-ZIP loading.
//!
//! Formalized-territory data ships as a single ZIP archive bundling the
//! multi-file shapefile components (.shp geometry, .shx index, .dbf
//! attributes). The loader accepts a local path or an HTTP(S) URL, requires
//! exactly one file per needed extension, and maps the ANT attribute schema
//! (`ID_ANT`, `NOMBRE`, `Tipo`, `DEPARTAMEN`, `MUNICIPIO`, `AREA_TOTAL`) onto
//! [`Territory`] records in EPSG:4326.

use crate::models::territory::Territory;
use crate::services::projection::{ProjectionError, Projector};
use geo::MultiPolygon;
use shapefile::dbase::{self, FieldValue};
use std::io::{self, Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// Errors from loading territory or query-polygon archives.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("required .{extension} file not found in archive")]
    MissingFile { extension: String },

    #[error("more than one .{extension} file in archive")]
    TooManyFiles { extension: String },

    #[error("no polygon features found in archive")]
    NoPolygons,

    #[error("failed to read archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to read shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("failed to fetch remote archive: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Fetch the archive bytes from a local path or an HTTP(S) URL.
///
/// Remote failures surface synchronously; there is no retry.
pub async fn fetch_archive(source: &str) -> Result<Vec<u8>, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        tracing::info!(url = source, "Fetching territory archive");
        let response = reqwest::get(source)
            .await
            .map_err(|e| LoadError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| LoadError::Http(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    } else {
        Ok(std::fs::read(source)?)
    }
}

/// Read the territory collection from ZIP archive bytes.
///
/// Requires one .shp and one .dbf member (.shx is used when present).
/// Geometry is reprojected to EPSG:4326 when the archive ships planar
/// coordinates.
pub fn read_territories(archive_bytes: &[u8]) -> Result<Vec<Territory>, LoadError> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;

    let shp_bytes = read_member(&mut archive, "shp")?.ok_or(LoadError::MissingFile {
        extension: "shp".to_string(),
    })?;
    let dbf_bytes = read_member(&mut archive, "dbf")?.ok_or(LoadError::MissingFile {
        extension: "dbf".to_string(),
    })?;
    let shx_bytes = read_member(&mut archive, "shx")?;

    let shape_reader = match shx_bytes {
        Some(shx) => {
            shapefile::ShapeReader::with_shx(Cursor::new(shp_bytes), Cursor::new(shx))?
        }
        None => shapefile::ShapeReader::new(Cursor::new(shp_bytes))?,
    };
    let dbase_reader =
        dbase::Reader::new(Cursor::new(dbf_bytes)).map_err(shapefile::Error::from)?;
    let mut reader = shapefile::Reader::new(shape_reader, dbase_reader);

    let mut territories = Vec::new();
    for row in reader.iter_shapes_and_records() {
        let (shape, record) = row?;
        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.into(),
            other => {
                tracing::warn!(shape_type = %other.shapetype(), "Skipping non-polygon feature");
                continue;
            }
        };

        territories.push(Territory {
            id: field_string(&record, "ID_ANT"),
            name: field_string(&record, "NOMBRE"),
            type_raw: field_string(&record, "Tipo"),
            department: field_string(&record, "DEPARTAMEN"),
            municipality: field_string(&record, "MUNICIPIO"),
            area_total_ha: field_f64(&record, "AREA_TOTAL"),
            geometry,
        });
    }

    if territories.is_empty() {
        return Err(LoadError::NoPolygons);
    }

    if looks_planar(territories.iter().map(|t| &t.geometry)) {
        tracing::warn!("Territory coordinates look planar; reprojecting to EPSG:4326");
        let to_wgs84 = Projector::planar_to_wgs84()?;
        for territory in &mut territories {
            territory.geometry = to_wgs84.project_multi_polygon(&territory.geometry)?;
        }
    }

    tracing::info!(count = territories.len(), "Loaded territories");
    Ok(territories)
}

/// Read a query polygon from an uploaded ZIP archive.
///
/// Only the .shp member is required; attributes are ignored. All polygon
/// features are collected into one multipolygon (disjoint predios stay
/// separate parts; the analyzer dissolves them).
pub fn read_query_geometry(archive_bytes: &[u8]) -> Result<MultiPolygon<f64>, LoadError> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;

    let shp_bytes = read_member(&mut archive, "shp")?.ok_or(LoadError::MissingFile {
        extension: "shp".to_string(),
    })?;

    let shape_reader = shapefile::ShapeReader::new(Cursor::new(shp_bytes))?;

    let mut parts = Vec::new();
    for shape in shape_reader.read()? {
        if let shapefile::Shape::Polygon(polygon) = shape {
            let multi: MultiPolygon<f64> = polygon.into();
            parts.extend(multi.0);
        }
    }

    if parts.is_empty() {
        return Err(LoadError::NoPolygons);
    }

    let mut query = MultiPolygon::new(parts);
    if looks_planar(std::iter::once(&query)) {
        tracing::warn!("Query coordinates look planar; reprojecting to EPSG:4326");
        query = Projector::planar_to_wgs84()?.project_multi_polygon(&query)?;
    }

    Ok(query)
}

/// Find the single archive member with the given extension and read it out.
/// Returns `Ok(None)` when absent, an error when ambiguous.
fn read_member<R: Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    extension: &str,
) -> Result<Option<Vec<u8>>, LoadError> {
    let matching: Vec<String> = archive
        .file_names()
        .filter(|name| {
            Path::new(name)
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect();

    let name = match matching.as_slice() {
        [] => return Ok(None),
        [single] => single.clone(),
        _ => {
            return Err(LoadError::TooManyFiles {
                extension: extension.to_string(),
            })
        }
    };

    let mut member = archive.by_name(&name)?;
    let mut bytes = Vec::with_capacity(member.size() as usize);
    member.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Heuristic CRS detection: geographic coordinates fit in ±180/±90, planar
/// ones (EPSG:9377 eastings run in the millions) never do. The ANT archives
/// carry no usable .prj reader on this path, so the coordinates decide.
fn looks_planar<'a>(geometries: impl Iterator<Item = &'a MultiPolygon<f64>>) -> bool {
    for multi in geometries {
        for polygon in multi {
            for coord in polygon.exterior().coords() {
                if coord.x.abs() > 180.0 || coord.y.abs() > 90.0 {
                    return true;
                }
            }
        }
    }
    false
}

fn field_string(record: &dbase::Record, name: &str) -> String {
    match record.get(name) {
        Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
        Some(FieldValue::Numeric(Some(n))) if n.fract() == 0.0 => format!("{}", *n as i64),
        Some(FieldValue::Numeric(Some(n))) => n.to_string(),
        Some(FieldValue::Integer(i)) => i.to_string(),
        _ => String::new(),
    }
}

fn field_f64(record: &dbase::Record, name: &str) -> f64 {
    match record.get(name) {
        Some(FieldValue::Numeric(Some(n))) => *n,
        Some(FieldValue::Float(Some(f))) => f64::from(*f),
        Some(FieldValue::Double(d)) => *d,
        Some(FieldValue::Integer(i)) => f64::from(*i),
        Some(FieldValue::Character(Some(s))) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

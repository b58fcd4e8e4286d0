// SPDX-License-Identifier: MIT

//! Result exports: attribute CSV, packaged shapefile ZIP and a standalone
//! interactive HTML map.

use crate::models::territory::Territory;
use geo::MultiPolygon;
use geo_types::Rect;
use serde::Serialize;
use shapefile::dbase::{self, FieldValue};
use std::io::{self, Cursor, Write};
use zip::write::SimpleFileOptions;

/// WKT written to the .prj member so GIS tools read the export as WGS84.
const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// Errors from export generation.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("invalid attribute field name: {0}")]
    InvalidField(String),

    #[error("failed to write CSV: {0}")]
    Csv(String),

    #[error("failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A named background-map tile provider, as offered by the original viewer.
#[derive(Debug, Clone, Serialize)]
pub struct Basemap {
    pub key: &'static str,
    pub label: &'static str,
    pub tiles: &'static str,
    pub attribution: &'static str,
}

pub const BASEMAPS: &[Basemap] = &[
    Basemap {
        key: "openstreetmap",
        label: "OpenStreetMap",
        tiles: "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        attribution: "&copy; OpenStreetMap contributors",
    },
    Basemap {
        key: "carto-positron",
        label: "CartoDB Claro (Positron)",
        tiles: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
        attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
    },
    Basemap {
        key: "carto-dark",
        label: "CartoDB Oscuro",
        tiles: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
        attribution: "&copy; OpenStreetMap contributors &copy; CARTO",
    },
    Basemap {
        key: "esri-imagery",
        label: "Satélite (Esri)",
        tiles: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        attribution: "Tiles &copy; Esri",
    },
    Basemap {
        key: "esri-gray",
        label: "Gris claro (Esri Gray Canvas)",
        tiles: "https://server.arcgisonline.com/ArcGIS/rest/services/Canvas/World_Light_Gray_Base/MapServer/tile/{z}/{y}/{x}",
        attribution: "Tiles &copy; Esri",
    },
];

pub fn basemap_by_key(key: &str) -> Option<&'static Basemap> {
    BASEMAPS.iter().find(|b| b.key == key)
}

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "ID_ANT")]
    id: &'a str,
    #[serde(rename = "NOMBRE")]
    name: &'a str,
    #[serde(rename = "Tipo")]
    type_raw: &'a str,
    #[serde(rename = "DEPARTAMEN")]
    department: &'a str,
    #[serde(rename = "MUNICIPIO")]
    municipality: &'a str,
    #[serde(rename = "AREA_TOTAL")]
    area_total_ha: f64,
}

/// Delimited-text table of territory attributes, geometry excluded.
/// Column headers follow the ANT schema so exports round-trip with the
/// source data.
pub fn territories_csv<'a>(
    territories: impl IntoIterator<Item = &'a Territory>,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for t in territories {
        writer
            .serialize(CsvRow {
                id: &t.id,
                name: &t.name,
                type_raw: &t.type_raw,
                department: &t.department,
                municipality: &t.municipality,
                area_total_ha: t.area_total_ha,
            })
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))
}

/// Package the territories as a shapefile ZIP with .shp/.shx/.dbf/.prj/.cpg
/// members, the same bundle the source data ships in.
pub fn territories_shapefile_zip<'a>(
    territories: impl IntoIterator<Item = &'a Territory>,
    base_name: &str,
) -> Result<Vec<u8>, ExportError> {
    let dir = tempfile::tempdir()?;
    let shp_path = dir.path().join(format!("{base_name}.shp"));

    let table = dbase::TableWriterBuilder::new()
        .add_character_field(field_name("ID_ANT")?, 30)
        .add_character_field(field_name("NOMBRE")?, 100)
        .add_character_field(field_name("Tipo")?, 60)
        .add_character_field(field_name("DEPARTAMEN")?, 60)
        .add_character_field(field_name("MUNICIPIO")?, 60)
        .add_numeric_field(field_name("AREA_TOTAL")?, 18, 4);

    let mut writer = shapefile::Writer::from_path(&shp_path, table)?;
    for t in territories {
        let mut record = dbase::Record::default();
        record.insert("ID_ANT".to_string(), character(&t.id));
        record.insert("NOMBRE".to_string(), character(&t.name));
        record.insert("Tipo".to_string(), character(&t.type_raw));
        record.insert("DEPARTAMEN".to_string(), character(&t.department));
        record.insert("MUNICIPIO".to_string(), character(&t.municipality));
        record.insert(
            "AREA_TOTAL".to_string(),
            FieldValue::Numeric(Some(t.area_total_ha)),
        );
        writer.write_shape_and_record(&to_shapefile_polygon(&t.geometry), &record)?;
    }
    drop(writer);

    std::fs::write(dir.path().join(format!("{base_name}.prj")), WGS84_PRJ)?;
    std::fs::write(dir.path().join(format!("{base_name}.cpg")), "UTF-8")?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for ext in ["shp", "shx", "dbf", "prj", "cpg"] {
        let path = dir.path().join(format!("{base_name}.{ext}"));
        if !path.exists() {
            continue;
        }
        zip.start_file(format!("{base_name}.{ext}"), options)?;
        zip.write_all(&std::fs::read(path)?)?;
    }
    Ok(zip.finish()?.into_inner())
}

fn character(value: &str) -> FieldValue {
    FieldValue::Character(Some(value.to_string()))
}

fn field_name(name: &str) -> Result<dbase::FieldName, ExportError> {
    name.try_into()
        .map_err(|_| ExportError::InvalidField(name.to_string()))
}

fn to_shapefile_polygon(multi: &MultiPolygon<f64>) -> shapefile::Polygon {
    let mut rings = Vec::new();
    for polygon in multi {
        rings.push(shapefile::PolygonRing::Outer(ring_points(
            polygon.exterior(),
        )));
        for interior in polygon.interiors() {
            rings.push(shapefile::PolygonRing::Inner(ring_points(interior)));
        }
    }
    shapefile::Polygon::with_rings(rings)
}

fn ring_points(ring: &geo::LineString<f64>) -> Vec<shapefile::Point> {
    ring.coords()
        .map(|c| shapefile::Point::new(c.x, c.y))
        .collect()
}

/// Render a standalone Leaflet page with the features embedded, the chosen
/// basemap and fit-to-bounds. This is the static HTML export of the viewer.
pub fn html_map(
    feature_collection_json: &str,
    basemap: &Basemap,
    fill: bool,
    bounds: Option<Rect<f64>>,
) -> String {
    let fit = match bounds {
        Some(rect) => format!(
            "map.fitBounds([[{}, {}], [{}, {}]]);",
            rect.min().y,
            rect.min().x,
            rect.max().y,
            rect.max().x
        ),
        None => "map.setView([4.0, -73.0], 6);".to_string(),
    };
    let fill_opacity = if fill { 0.5 } else { 0.0 };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Visor de Territorios Formalizados</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map');
L.tileLayer('{tiles}', {{ attribution: '{attribution}' }}).addTo(map);
var data = {geojson};
L.geoJSON(data, {{
  style: function (feature) {{
    var color = feature.properties.color || '#8B4513';
    return {{ color: color, fillColor: color, weight: 2, fillOpacity: {fill_opacity} }};
  }},
  onEachFeature: function (feature, layer) {{
    var p = feature.properties;
    layer.bindTooltip(
      'ID: ' + p.id + '<br>Nombre: ' + p.name +
      '<br>Departamento: ' + p.department + '<br>Municipio: ' + p.municipality +
      '<br>Tipo: ' + p.type_raw + '<br>Área total (ha): ' + p.area_total_ha
    );
  }}
}}).addTo(map);
{fit}
</script>
</body>
</html>
"#,
        tiles = basemap.tiles,
        attribution = basemap.attribution,
        geojson = feature_collection_json,
        fill_opacity = fill_opacity,
        fit = fit,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn sample_territory() -> Territory {
        Territory {
            id: "RI001".to_string(),
            name: "Alto Río".to_string(),
            type_raw: "Resguardo Indígena".to_string(),
            department: "Cauca".to_string(),
            municipality: "Popayán".to_string(),
            area_total_ha: 1234.56,
            geometry: MultiPolygon::new(vec![polygon![
                (x: -73.0, y: 4.0),
                (x: -72.9, y: 4.0),
                (x: -72.9, y: 4.1),
                (x: -73.0, y: 4.1),
            ]]),
        }
    }

    #[test]
    fn test_csv_uses_ant_headers() {
        let t = sample_territory();
        let bytes = territories_csv([&t]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ID_ANT,NOMBRE,Tipo,DEPARTAMEN,MUNICIPIO,AREA_TOTAL"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("RI001"));
        assert!(row.contains("1234.56"));
        // Geometry never appears in the table export
        assert!(!text.contains("-72.9"));
    }

    #[test]
    fn test_shapefile_zip_contains_all_members() {
        let t = sample_territory();
        let bytes = territories_shapefile_zip([&t], "territorios_filtrados").unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        for ext in ["shp", "shx", "dbf", "prj", "cpg"] {
            assert!(
                names.iter().any(|n| n.ends_with(ext)),
                "missing .{ext} member: {names:?}"
            );
        }

        // The archive must load back as a query geometry
        let mut shp_bytes = Vec::new();
        {
            use std::io::Read;
            let mut member = archive.by_name("territorios_filtrados.shp").unwrap();
            member.read_to_end(&mut shp_bytes).unwrap();
        }
        assert!(!shp_bytes.is_empty());
    }

    #[test]
    fn test_html_map_embeds_features_and_basemap() {
        let basemap = basemap_by_key("carto-positron").unwrap();
        let html = html_map(r#"{"type":"FeatureCollection","features":[]}"#, basemap, true, None);
        assert!(html.contains("basemaps.cartocdn.com"));
        assert!(html.contains("FeatureCollection"));
        assert!(html.contains("fillOpacity: 0.5"));
    }

    #[test]
    fn test_basemap_catalog_matches_original_options() {
        assert_eq!(BASEMAPS.len(), 5);
        assert!(basemap_by_key("openstreetmap").is_some());
        assert!(basemap_by_key("not-a-basemap").is_none());
    }
}

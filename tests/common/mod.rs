// SPDX-License-Identifier: MIT

use geo::{polygon, MultiPolygon, Polygon};
use shapefile::dbase::{self, FieldValue};
use std::io::{Cursor, Write};
use std::sync::Arc;
use territorio_visor::config::Config;
use territorio_visor::models::territory::Territory;
use territorio_visor::routes::create_router;
use territorio_visor::services::TerritoryService;
use territorio_visor::AppState;

/// Axis-aligned square in geographic coordinates.
#[allow(dead_code)]
pub fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: max_x, y: min_y),
        (x: max_x, y: max_y),
        (x: min_x, y: max_y),
    ]
}

#[allow(dead_code)]
pub fn territory(
    id: &str,
    name: &str,
    tipo: &str,
    area_total_ha: f64,
    geometry: Polygon<f64>,
) -> Territory {
    Territory {
        id: id.to_string(),
        name: name.to_string(),
        type_raw: tipo.to_string(),
        department: "Meta".to_string(),
        municipality: "Puerto López".to_string(),
        area_total_ha,
        geometry: MultiPolygon::new(vec![geometry]),
    }
}

/// Synthetic collection near the EPSG:9377 projection origin (lon -73, lat 4):
/// two adjacent squares sharing the meridian at -73.0, plus one far away.
///
/// Declared areas are intentionally inconsistent with the measured geometry
/// (a 0.1° square near the equator measures roughly 12,300 ha): "Alto Río"
/// declares only 100 ha, which is how the source data behaves.
#[allow(dead_code)]
pub fn test_territories() -> Vec<Territory> {
    vec![
        territory(
            "RI001",
            "Alto Río",
            "Resguardo Indígena",
            100.0,
            square(-73.10, 3.95, -73.00, 4.05),
        ),
        territory(
            "CC002",
            "Palenque",
            "Consejo Comunitario",
            12_000.0,
            square(-73.00, 3.95, -72.90, 4.05),
        ),
        territory(
            "RI003",
            "Lejanía",
            "Resguardo Indígena",
            12_000.0,
            square(-70.00, 1.00, -69.90, 1.10),
        ),
    ]
}

/// Create a test app over the synthetic collection.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config: Config::default(),
        territories: TerritoryService::from_territories(test_territories()),
    });
    (create_router(state.clone()), state)
}

/// Build a shapefile ZIP archive in memory for the given polygons, the way a
/// user-uploaded predio archive looks.
#[allow(dead_code)]
pub fn shapefile_zip(polygons: &[Polygon<f64>]) -> Vec<u8> {
    let dir = tempfile::tempdir().expect("tempdir");
    let shp_path = dir.path().join("predio.shp");

    let table = dbase::TableWriterBuilder::new()
        .add_character_field("NAME".try_into().expect("field name"), 50);
    let mut writer = shapefile::Writer::from_path(&shp_path, table).expect("shapefile writer");

    for (i, polygon) in polygons.iter().enumerate() {
        let points: Vec<shapefile::Point> = polygon
            .exterior()
            .coords()
            .map(|c| shapefile::Point::new(c.x, c.y))
            .collect();
        let shape = shapefile::Polygon::with_rings(vec![shapefile::PolygonRing::Outer(points)]);

        let mut record = dbase::Record::default();
        record.insert(
            "NAME".to_string(),
            FieldValue::Character(Some(format!("predio {i}"))),
        );
        writer.write_shape_and_record(&shape, &record).expect("write shape");
    }
    drop(writer);

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for ext in ["shp", "shx", "dbf"] {
        let path = dir.path().join(format!("predio.{ext}"));
        if !path.exists() {
            continue;
        }
        zip.start_file(format!("predio.{ext}"), options).expect("zip entry");
        zip.write_all(&std::fs::read(path).expect("read member"))
            .expect("zip write");
    }
    zip.finish().expect("zip finish").into_inner()
}

/// A ZIP archive that contains no shapefile at all.
#[allow(dead_code)]
pub fn zip_without_shapefile() -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("readme.txt", options).expect("zip entry");
    zip.write_all(b"no geometry here").expect("zip write");
    zip.finish().expect("zip finish").into_inner()
}

// SPDX-License-Identifier: MIT

//! Formalized territory model and type classification.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// A formalized territory (ANT registry) with its boundary geometry.
///
/// `area_total_ha` is the declared administrative area in hectares. It is the
/// legal record, not the geometric area of `geometry`, and the two may
/// legitimately disagree.
#[derive(Debug, Clone)]
pub struct Territory {
    /// Administrative identifier (`ID_ANT` in the source shapefile)
    pub id: String,
    /// Territory name (`NOMBRE`)
    pub name: String,
    /// Raw type string from the source data (`Tipo`)
    pub type_raw: String,
    /// Department (`DEPARTAMEN`)
    pub department: String,
    /// Municipality (`MUNICIPIO`)
    pub municipality: String,
    /// Declared area in hectares (`AREA_TOTAL`)
    pub area_total_ha: f64,
    /// Boundary in geographic coordinates (EPSG:4326, lon/lat)
    pub geometry: MultiPolygon<f64>,
}

impl Territory {
    pub fn kind(&self) -> TerritoryKind {
        TerritoryKind::classify(&self.type_raw)
    }

    pub fn summary(&self) -> TerritorySummary {
        TerritorySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind(),
            type_raw: self.type_raw.clone(),
            department: self.department.clone(),
            municipality: self.municipality.clone(),
            area_total_ha: self.area_total_ha,
        }
    }
}

/// Classification of a territory's `Tipo` attribute.
///
/// The source data carries free-text type strings ("Resguardo Indígena",
/// "Consejo Comunitario", with inconsistent casing and accents). Matching is a
/// substring test after lowercasing and stripping accents: "indigena" marks an
/// indigenous reserve, "comunitario" a community council. This is a convention
/// of the ANT export, not a stable vocabulary; anything else maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryKind {
    Indigenous,
    CommunityCouncil,
    Other,
}

impl TerritoryKind {
    pub fn classify(type_raw: &str) -> Self {
        let normalized = normalize(type_raw);
        if normalized.contains("indigena") {
            TerritoryKind::Indigenous
        } else if normalized.contains("comunitario") {
            TerritoryKind::CommunityCouncil
        } else {
            TerritoryKind::Other
        }
    }

    /// Map fill/stroke color used by the viewer and the HTML export.
    pub fn color(&self) -> &'static str {
        match self {
            TerritoryKind::Indigenous => "#228B22",
            TerritoryKind::CommunityCouncil | TerritoryKind::Other => "#8B4513",
        }
    }
}

/// Lowercase, trim and fold the accented vowels that appear in the source data.
fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            _ => c,
        })
        .collect()
}

/// Territory attributes without geometry, for API responses and tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritorySummary {
    pub id: String,
    pub name: String,
    pub kind: TerritoryKind,
    pub type_raw: String,
    pub department: String,
    pub municipality: String,
    pub area_total_ha: f64,
}

/// Aggregate statistics over a filtered set of territories.
///
/// The declared-area total is split into whole hectares plus the remainder in
/// square meters, the way the original viewer displays it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritoryStats {
    pub count: u32,
    pub indigenous: u32,
    pub community_councils: u32,
    pub area_total_ha: u64,
    pub area_remainder_m2: u64,
}

impl TerritoryStats {
    pub fn from_territories<'a>(territories: impl IntoIterator<Item = &'a Territory>) -> Self {
        let mut count = 0;
        let mut indigenous = 0;
        let mut community_councils = 0;
        let mut area_sum_ha = 0.0_f64;

        for t in territories {
            count += 1;
            match t.kind() {
                TerritoryKind::Indigenous => indigenous += 1,
                TerritoryKind::CommunityCouncil => community_councils += 1,
                TerritoryKind::Other => {}
            }
            area_sum_ha += t.area_total_ha;
        }

        let whole_ha = area_sum_ha.floor();
        let remainder_m2 = ((area_sum_ha - whole_ha) * 10_000.0).round();

        Self {
            count,
            indigenous,
            community_councils,
            area_total_ha: whole_ha as u64,
            area_remainder_m2: remainder_m2 as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_indigenous_variants() {
        assert_eq!(
            TerritoryKind::classify("Resguardo Indígena"),
            TerritoryKind::Indigenous
        );
        assert_eq!(
            TerritoryKind::classify("  resguardo indigena "),
            TerritoryKind::Indigenous
        );
        assert_eq!(
            TerritoryKind::classify("RESGUARDO INDIGENA"),
            TerritoryKind::Indigenous
        );
    }

    #[test]
    fn test_classify_community_council() {
        assert_eq!(
            TerritoryKind::classify("Consejo Comunitario"),
            TerritoryKind::CommunityCouncil
        );
        assert_eq!(
            TerritoryKind::classify("consejo comunitario de comunidades negras"),
            TerritoryKind::CommunityCouncil
        );
    }

    #[test]
    fn test_classify_unknown_is_other() {
        assert_eq!(TerritoryKind::classify(""), TerritoryKind::Other);
        assert_eq!(TerritoryKind::classify("Zona de Reserva"), TerritoryKind::Other);
    }

    #[test]
    fn test_stats_area_split() {
        use geo::{polygon, MultiPolygon};

        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let make = |area_ha: f64, tipo: &str| Territory {
            id: "T".to_string(),
            name: "T".to_string(),
            type_raw: tipo.to_string(),
            department: "D".to_string(),
            municipality: "M".to_string(),
            area_total_ha: area_ha,
            geometry: MultiPolygon::new(vec![square.clone()]),
        };

        let territories = vec![
            make(10.25, "Resguardo Indígena"),
            make(5.50, "Consejo Comunitario"),
        ];
        let stats = TerritoryStats::from_territories(&territories);

        assert_eq!(stats.count, 2);
        assert_eq!(stats.indigenous, 1);
        assert_eq!(stats.community_councils, 1);
        // 15.75 ha = 15 ha + 7500 m²
        assert_eq!(stats.area_total_ha, 15);
        assert_eq!(stats.area_remainder_m2, 7_500);
    }
}

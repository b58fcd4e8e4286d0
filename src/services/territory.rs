// SPDX-License-Identifier: MIT

//! Territory collection service: loading, caching and attribute filtering.

use crate::models::territory::{Territory, TerritoryStats};
use crate::services::loader::{self, LoadError};
use geo::BoundingRect;
use geo_types::Rect;

/// Immutable territory collection, loaded once per process and shared
/// read-only across requests.
#[derive(Default, Clone)]
pub struct TerritoryService {
    territories: Vec<Territory>,
}

/// Attribute filters, matching the original viewer's sidebar controls.
/// All fields are optional; an empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct TerritoryFilter {
    /// Substring match on the administrative identifier
    pub id_contains: Option<String>,
    /// Exact match on the territory name
    pub name: Option<String>,
    /// Multi-select on the raw type string
    pub types: Vec<String>,
    /// Multi-select on department
    pub departments: Vec<String>,
    /// Multi-select on municipality
    pub municipalities: Vec<String>,
}

impl TerritoryFilter {
    pub fn matches(&self, territory: &Territory) -> bool {
        if let Some(fragment) = &self.id_contains {
            if !territory.id.contains(fragment.as_str()) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if territory.name != *name {
                return false;
            }
        }
        if !self.types.is_empty() && !self.types.contains(&territory.type_raw) {
            return false;
        }
        if !self.departments.is_empty() && !self.departments.contains(&territory.department) {
            return false;
        }
        if !self.municipalities.is_empty()
            && !self.municipalities.contains(&territory.municipality)
        {
            return false;
        }
        true
    }
}

impl TerritoryService {
    /// Load the collection from a ZIP archive at a local path or URL.
    pub async fn load(source: &str) -> Result<Self, LoadError> {
        let bytes = loader::fetch_archive(source).await?;
        let territories = loader::read_territories(&bytes)?;
        Ok(Self { territories })
    }

    /// Build a service from an in-memory collection (tests, benchmarks).
    pub fn from_territories(territories: Vec<Territory>) -> Self {
        Self { territories }
    }

    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    /// Territories matching the filter, in collection order.
    pub fn filter<'a>(&'a self, filter: &TerritoryFilter) -> Vec<&'a Territory> {
        self.territories
            .iter()
            .filter(|t| filter.matches(t))
            .collect()
    }

    pub fn stats(&self, filter: &TerritoryFilter) -> TerritoryStats {
        TerritoryStats::from_territories(self.filter(filter).into_iter())
    }

    /// Sorted distinct values for the sidebar selectors.
    pub fn distinct_names(&self) -> Vec<String> {
        self.distinct(|t| &t.name)
    }

    pub fn distinct_types(&self) -> Vec<String> {
        self.distinct(|t| &t.type_raw)
    }

    pub fn distinct_departments(&self) -> Vec<String> {
        self.distinct(|t| &t.department)
    }

    pub fn distinct_municipalities(&self) -> Vec<String> {
        self.distinct(|t| &t.municipality)
    }

    fn distinct(&self, field: impl Fn(&Territory) -> &String) -> Vec<String> {
        let mut values: Vec<String> = self
            .territories
            .iter()
            .map(|t| field(t).clone())
            .filter(|v| !v.is_empty())
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Combined bounding rectangle of the given territories (map centering).
    pub fn bounds<'a>(territories: impl IntoIterator<Item = &'a Territory>) -> Option<Rect<f64>> {
        let mut merged: Option<Rect<f64>> = None;
        for territory in territories {
            let Some(rect) = territory.geometry.bounding_rect() else {
                continue;
            };
            merged = Some(match merged {
                None => rect,
                Some(acc) => Rect::new(
                    geo_types::coord! {
                        x: acc.min().x.min(rect.min().x),
                        y: acc.min().y.min(rect.min().y),
                    },
                    geo_types::coord! {
                        x: acc.max().x.max(rect.max().x),
                        y: acc.max().y.max(rect.max().y),
                    },
                ),
            });
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn territory(id: &str, name: &str, tipo: &str, dept: &str, mpio: &str) -> Territory {
        Territory {
            id: id.to_string(),
            name: name.to_string(),
            type_raw: tipo.to_string(),
            department: dept.to_string(),
            municipality: mpio.to_string(),
            area_total_ha: 100.0,
            geometry: MultiPolygon::new(vec![polygon![
                (x: -73.0, y: 4.0),
                (x: -72.9, y: 4.0),
                (x: -72.9, y: 4.1),
                (x: -73.0, y: 4.1),
            ]]),
        }
    }

    fn service() -> TerritoryService {
        TerritoryService::from_territories(vec![
            territory("RI001", "Alto Río", "Resguardo Indígena", "Cauca", "Popayán"),
            territory("CC002", "Palenque", "Consejo Comunitario", "Chocó", "Quibdó"),
            territory("RI003", "Bajo Río", "Resguardo Indígena", "Cauca", "Timbiquí"),
        ])
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let s = service();
        assert_eq!(s.filter(&TerritoryFilter::default()).len(), 3);
    }

    #[test]
    fn test_id_substring_filter() {
        let s = service();
        let filter = TerritoryFilter {
            id_contains: Some("RI".to_string()),
            ..Default::default()
        };
        let matched = s.filter(&filter);
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|t| t.id.starts_with("RI")));
    }

    #[test]
    fn test_name_exact_filter() {
        let s = service();
        let filter = TerritoryFilter {
            name: Some("Palenque".to_string()),
            ..Default::default()
        };
        let matched = s.filter(&filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "CC002");

        // Partial names never match
        let partial = TerritoryFilter {
            name: Some("Palen".to_string()),
            ..Default::default()
        };
        assert!(s.filter(&partial).is_empty());
    }

    #[test]
    fn test_multi_select_filters_combine() {
        let s = service();
        let filter = TerritoryFilter {
            departments: vec!["Cauca".to_string()],
            municipalities: vec!["Timbiquí".to_string()],
            ..Default::default()
        };
        let matched = s.filter(&filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "RI003");
    }

    #[test]
    fn test_distinct_values_sorted_and_deduped() {
        let s = service();
        assert_eq!(s.distinct_departments(), vec!["Cauca", "Chocó"]);
        assert_eq!(
            s.distinct_types(),
            vec!["Consejo Comunitario", "Resguardo Indígena"]
        );
    }

    #[test]
    fn test_stats_counts_kinds() {
        let s = service();
        let stats = s.stats(&TerritoryFilter::default());
        assert_eq!(stats.count, 3);
        assert_eq!(stats.indigenous, 2);
        assert_eq!(stats.community_councils, 1);
    }
}

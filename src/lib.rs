// SPDX-License-Identifier: MIT

//! Visor de Territorios Formalizados — backend API.
//!
//! This crate serves the formalized-territory collection (ANT): attribute
//! filtering, overlay analysis against uploaded query polygons, and CSV /
//! shapefile / HTML exports.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::TerritoryService;

/// Shared application state.
///
/// The territory collection is loaded once at startup and never mutated, so
/// it is shared across requests without locking.
pub struct AppState {
    pub config: Config,
    pub territories: TerritoryService,
}

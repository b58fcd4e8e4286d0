// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod export;
pub mod loader;
pub mod overlay;
pub mod projection;
pub mod territory;

pub use loader::LoadError;
pub use overlay::{OverlayAnalyzer, OverlayError};
pub use projection::{ProjectionError, Projector};
pub use territory::{TerritoryFilter, TerritoryService};

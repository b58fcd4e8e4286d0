// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod overlay;
pub mod territory;

pub use overlay::{IntersectionRecord, OverlayReport};
pub use territory::{Territory, TerritoryKind, TerritoryStats, TerritorySummary};

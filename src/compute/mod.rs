//! Compute layer: grid access, geometry helpers and the analytics engine.
//!
//! Everything here is stateless. The presence index layers state on top of
//! [`grid`] and [`geodesy`]; [`analytics`] works on plain location slices and
//! only depends on [`grid`] and [`projection`].

pub mod analytics;
pub mod geodesy;
pub mod geojson;
pub mod grid;
pub mod projection;
pub mod validation;

pub use geodesy::{Direction, cardinal_direction, distance_km};
pub use grid::{CellId, DEFAULT_RESOLUTION, ResolutionInfo};
pub use projection::WebMercator;

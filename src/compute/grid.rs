//! Adapter over the `h3o` hexagonal grid.
//!
//! The grid itself is never reimplemented here: every id, centroid, boundary
//! and disk comes straight from `h3o`. This module only converts between the
//! library's types and [`GeoPoint`], and maps its errors into [`HexError`].

use crate::error::{HexError, Result};
use h3o::{CellIndex, LatLng, Resolution};
use hexloc_types::GeoPoint;
use serde::Serialize;

/// Opaque identifier of a grid cell.
pub type CellId = CellIndex;

/// Resolution used for neighborhood chats (~0.7 km² hexagons).
pub const DEFAULT_RESOLUTION: u8 = 8;

/// Human-facing description of a supported resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolutionInfo {
    pub level: u8,
    pub name: &'static str,
    pub approximate_area_km2: f64,
    pub description: &'static str,
}

const RESOLUTIONS: [ResolutionInfo; 5] = [
    ResolutionInfo {
        level: 6,
        name: "City",
        approximate_area_km2: 100.0,
        description: "City-wide chat rooms",
    },
    ResolutionInfo {
        level: 7,
        name: "District",
        approximate_area_km2: 5.0,
        description: "District or borough level",
    },
    ResolutionInfo {
        level: 8,
        name: "Neighborhood",
        approximate_area_km2: 0.7,
        description: "Standard neighborhood chat (default)",
    },
    ResolutionInfo {
        level: 9,
        name: "Block",
        approximate_area_km2: 0.1,
        description: "City block or small area",
    },
    ResolutionInfo {
        level: 10,
        name: "Building",
        approximate_area_km2: 0.015,
        description: "Building or venue level",
    },
];

/// Catalog of the resolutions offered to users, coarsest first.
pub fn resolutions() -> &'static [ResolutionInfo] {
    &RESOLUTIONS
}

/// Convert a raw level into an `h3o` resolution without applying any band.
pub fn to_resolution(level: u8) -> Result<Resolution> {
    Resolution::try_from(level).map_err(|_| HexError::InvalidResolution {
        resolution: level,
        min: 0,
        max: 15,
    })
}

/// Cell containing `point` at `resolution`.
pub fn cell_for(point: GeoPoint, resolution: Resolution) -> Result<CellId> {
    let lat_lng = LatLng::new(point.lat, point.lon).map_err(|_| HexError::InvalidCoordinate {
        lat: point.lat,
        lon: point.lon,
    })?;
    Ok(lat_lng.to_cell(resolution))
}

/// Canonical centroid of a cell.
pub fn cell_center(cell: CellId) -> GeoPoint {
    let center = LatLng::from(cell);
    GeoPoint::from_lat_lon(center.lat(), center.lng())
}

/// Boundary vertices exactly as the grid yields them (6 for hexagons, 5 for
/// the twelve pentagons per resolution).
pub fn cell_boundary(cell: CellId) -> Vec<GeoPoint> {
    cell.boundary()
        .iter()
        .map(|vertex| GeoPoint::from_lat_lon(vertex.lat(), vertex.lng()))
        .collect()
}

pub fn cell_resolution(cell: CellId) -> u8 {
    u8::from(cell.resolution())
}

/// All cells within `k` grid steps of `cell`, the cell itself included.
pub fn grid_disk(cell: CellId, k: u32) -> Vec<CellId> {
    cell.grid_disk::<Vec<_>>(k)
}

/// Cells within `k` steps, excluding `cell`, in ascending id order.
pub fn neighbors(cell: CellId, k: u32) -> Vec<CellId> {
    let mut cells: Vec<CellId> = grid_disk(cell, k)
        .into_iter()
        .filter(|c| *c != cell)
        .collect();
    cells.sort_unstable();
    cells.dedup();
    cells
}

/// Whether `child` lies inside `ancestor` (a cell is its own descendant).
pub fn is_descendant(child: CellId, ancestor: CellId) -> bool {
    child.parent(ancestor.resolution()) == Some(ancestor)
}

/// Parse the hexadecimal string form of a cell id.
pub fn parse_cell_id(text: &str) -> Result<CellId> {
    text.trim()
        .parse::<CellIndex>()
        .map_err(|_| HexError::InvalidCellId(text.to_string()))
}

//! Great-circle helpers: distance, bearing and coarse cardinal direction.

use hexloc_types::GeoPoint;
use serde::{Deserialize, Serialize};

/// Coarse compass direction between two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Haversine distance in kilometers.
pub fn distance_km(from: &GeoPoint, to: &GeoPoint) -> f64 {
    from.haversine_distance(to) / 1000.0
}

/// Initial great-circle bearing from `from` to `to`, in degrees `[0, 360)`.
pub fn bearing_degrees(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let dlon = (to.lon - from.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Direction along the dominant axis of the raw degree deltas.
///
/// A latitude delta strictly larger than the longitude delta classifies as
/// north/south; everything else (ties and zero deltas included) as
/// east/west, with a zero or negative longitude delta reading as west.
pub fn cardinal_direction(from: &GeoPoint, to: &GeoPoint) -> Direction {
    let dlat = to.lat - from.lat;
    let dlon = to.lon - from.lon;

    if dlat.abs() > dlon.abs() {
        if dlat > 0.0 {
            Direction::North
        } else {
            Direction::South
        }
    } else if dlon > 0.0 {
        Direction::East
    } else {
        Direction::West
    }
}

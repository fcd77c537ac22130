//! Boundary validation for coordinates, resolutions and analytic parameters.
//!
//! The presence index and analytics functions assume valid input; these
//! checks run at the public entry points so that malformed coordinates never
//! reach the algorithms.

use crate::error::{HexError, Result};
use geo::Polygon;
use h3o::Resolution;
use hexloc_types::{GeoPoint, Location};

/// Validates latitude `[-90, 90]` and longitude `[-180, 180]`.
///
/// # Examples
///
/// ```
/// use hexloc::compute::validation::validate_coordinate;
///
/// assert!(validate_coordinate(40.7128, -74.0060).is_ok());
/// assert!(validate_coordinate(95.0, -74.0).is_err());
/// assert!(validate_coordinate(40.0, 200.0).is_err());
/// ```
pub fn validate_coordinate(lat: f64, lon: f64) -> Result<GeoPoint> {
    let point = GeoPoint::from_lat_lon(lat, lon);
    if !point.is_valid() {
        return Err(HexError::InvalidCoordinate { lat, lon });
    }
    Ok(point)
}

pub fn validate_point(point: &GeoPoint) -> Result<()> {
    validate_coordinate(point.lat, point.lon).map(|_| ())
}

/// Validates a resolution against an inclusive band.
///
/// ```
/// use hexloc::compute::validation::validate_resolution;
///
/// assert!(validate_resolution(8, 6, 10).is_ok());
/// assert!(validate_resolution(5, 6, 10).is_err());
/// assert!(validate_resolution(11, 6, 10).is_err());
/// ```
pub fn validate_resolution(resolution: u8, min: u8, max: u8) -> Result<Resolution> {
    if !(min..=max).contains(&resolution) {
        return Err(HexError::InvalidResolution {
            resolution,
            min,
            max,
        });
    }
    Resolution::try_from(resolution).map_err(|_| HexError::InvalidResolution {
        resolution,
        min,
        max,
    })
}

/// Validates every location's coordinates.
pub fn validate_locations(locations: &[Location]) -> Result<()> {
    for (idx, location) in locations.iter().enumerate() {
        validate_point(&location.coordinates).map_err(|e| {
            HexError::InvalidInput(format!("Location at index {} ({}): {}", idx, location.id, e))
        })?;
    }
    Ok(())
}

/// Validates all polygon coordinates (exterior and interior rings), given
/// in `geo` order (x = longitude, y = latitude).
pub fn validate_polygon(polygon: &Polygon<f64>) -> Result<()> {
    for (idx, coord) in polygon.exterior().coords().enumerate() {
        validate_point(&GeoPoint::from(*coord)).map_err(|e| {
            HexError::InvalidInput(format!("Exterior ring point at index {}: {}", idx, e))
        })?;
    }

    for (ring_idx, interior) in polygon.interiors().iter().enumerate() {
        for (idx, coord) in interior.coords().enumerate() {
            validate_point(&GeoPoint::from(*coord)).map_err(|e| {
                HexError::InvalidInput(format!(
                    "Interior ring {} point at index {}: {}",
                    ring_idx, idx, e
                ))
            })?;
        }
    }

    Ok(())
}

/// Validates a metric distance parameter (finite and non-negative).
pub fn validate_distance(name: &str, meters: f64) -> Result<()> {
    if !meters.is_finite() || meters < 0.0 {
        return Err(HexError::InvalidInput(format!(
            "{} must be a finite, non-negative distance in meters, got: {}",
            name, meters
        )));
    }
    Ok(())
}

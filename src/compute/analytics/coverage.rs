//! Coverage analytics: buffered service areas and distribution statistics.

use super::{SQUARE_METERS_PER_KM2, density, hull_area_km2};
use crate::compute::projection::WebMercator;
use crate::compute::validation::{validate_distance, validate_locations};
use crate::error::Result;
use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use hexloc_types::Location;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::Serialize;

/// Segments used to approximate each circular buffer.
const BUFFER_SEGMENTS: usize = 64;

/// Mean nearest-neighbor distance below which a set counts as clustered.
pub const CLUSTERED_THRESHOLD_METERS: f64 = 500.0;

/// Union of per-location buffers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceArea {
    /// Geographic (x = longitude, y = latitude) union, `None` for empty input
    pub polygon: Option<MultiPolygon<f64>>,
    /// Planar area of the union in km²
    pub area_km2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Clustered,
    Dispersed,
}

impl Distribution {
    fn from_mean_distance(meters: f64) -> Self {
        if meters < CLUSTERED_THRESHOLD_METERS {
            Self::Clustered
        } else {
            Self::Dispersed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialStatistics {
    pub count: usize,
    /// Convex hull area of all locations in km²
    pub coverage_area_km2: f64,
    /// Locations per km² of coverage, zero when the coverage is zero
    pub density_per_km2: f64,
    /// Mean distance from each location to its nearest other location
    pub mean_nearest_neighbor_m: f64,
    pub distribution: Distribution,
}

/// Area served by a set of locations.
///
/// Every location is buffered by `buffer_meters` in planar space, the
/// buffers are unioned into one (possibly multi-part) polygon, and the
/// union is reprojected to degrees. Empty input yields no polygon and zero
/// area.
///
/// # Errors
///
/// `InvalidInput` if `buffer_meters` is negative or not finite, or if a
/// location is out of range.
pub fn service_area(locations: &[Location], buffer_meters: f64) -> Result<ServiceArea> {
    validate_distance("buffer_meters", buffer_meters)?;
    validate_locations(locations)?;

    if locations.is_empty() {
        return Ok(ServiceArea {
            polygon: None,
            area_km2: 0.0,
        });
    }

    let buffers: Vec<MultiPolygon<f64>> = WebMercator::project_all(locations.iter().map(|l| &l.coordinates))
        .into_iter()
        .map(|center| MultiPolygon::new(vec![circle(center, buffer_meters)]))
        .collect();

    let planar_union = union_all(buffers);
    let area_km2 = planar_union.unsigned_area() / SQUARE_METERS_PER_KM2;

    log::debug!(
        "service area of {} locations with {}m buffers: {} parts, {:.3} km²",
        locations.len(),
        buffer_meters,
        planar_union.0.len(),
        area_km2
    );

    Ok(ServiceArea {
        polygon: Some(WebMercator::multi_polygon_to_geographic(&planar_union)),
        area_km2,
    })
}

/// Regular polygon approximating a circle of `radius` meters.
fn circle(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..BUFFER_SEGMENTS)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / BUFFER_SEGMENTS as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Pairwise (balanced) union, keeping each boolean op small.
fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while parts.len() > 1 {
        let mut merged = Vec::with_capacity(parts.len().div_ceil(2));
        let mut iter = parts.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => merged.push(left.union(&right)),
                None => merged.push(left),
            }
        }
        parts = merged;
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

/// Summary statistics for a location set.
///
/// Coverage is the planar convex hull area; the distribution is
/// [`Distribution::Clustered`] when the mean nearest-neighbor distance is
/// below [`CLUSTERED_THRESHOLD_METERS`]. With one location or none the mean
/// distance is zero.
///
/// # Errors
///
/// `InvalidInput` if a location is out of range.
pub fn statistics(locations: &[Location]) -> Result<SpatialStatistics> {
    validate_locations(locations)?;
    let coords = WebMercator::project_all(locations.iter().map(|l| &l.coordinates));

    let coverage_area_km2 = hull_area_km2(&coords);
    let mean_nearest_neighbor_m = mean_nearest_neighbor(&coords);

    Ok(SpatialStatistics {
        count: locations.len(),
        coverage_area_km2,
        density_per_km2: density(locations.len(), coverage_area_km2),
        mean_nearest_neighbor_m,
        distribution: Distribution::from_mean_distance(mean_nearest_neighbor_m),
    })
}

fn mean_nearest_neighbor(coords: &[Coord<f64>]) -> f64 {
    if coords.len() < 2 {
        return 0.0;
    }

    let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
        coords
            .iter()
            .enumerate()
            .map(|(i, c)| GeomWithData::new([c.x, c.y], i))
            .collect(),
    );

    let total: f64 = coords
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            tree.nearest_neighbor_iter(&[c.x, c.y])
                .find(|other| other.data != i)
                .map(|other| {
                    let [x, y] = *other.geom();
                    (x - c.x).hypot(y - c.y)
                })
        })
        .sum();

    total / coords.len() as f64
}

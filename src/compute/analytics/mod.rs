//! Spatial analytics over finite, in-memory location sets.
//!
//! Every function here is a pure function of its arguments. Distance and area
//! math happens in [`WebMercator`] meters; results that carry coordinates are
//! reprojected to degrees. Degenerate geometry (empty input, single points,
//! collinear hulls) yields documented zero/empty values instead of errors or
//! NaN.
//!
//! ```rust
//! use hexloc::compute::analytics;
//! use hexloc_types::{GeoPoint, Location};
//!
//! let locations = vec![
//!     Location::new("a", "A", GeoPoint::from_lat_lon(40.7484, -73.9857)),
//!     Location::new("b", "B", GeoPoint::from_lat_lon(40.7536, -73.9832)),
//! ];
//! let clusters = analytics::cluster(&locations, 1000.0, 2)?;
//! assert_eq!(clusters.len(), 1);
//! # Ok::<(), hexloc::HexError>(())
//! ```

mod cluster;
mod coverage;

pub use cluster::cluster;
pub use coverage::{
    CLUSTERED_THRESHOLD_METERS, Distribution, ServiceArea, SpatialStatistics, service_area,
    statistics,
};

use crate::compute::grid::{self, CellId};
use crate::compute::projection::WebMercator;
use crate::compute::validation::{validate_locations, validate_point, validate_polygon};
use crate::error::Result;
use geo::{Area, ConvexHull, Coord, Intersects, MultiPoint, Polygon};
use hexloc_types::{GeoPoint, Location};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

const SQUARE_METERS_PER_KM2: f64 = 1_000_000.0;

/// Hull areas below this (m²) are rounding noise from collinear input.
const MIN_HULL_AREA_M2: f64 = 1e-6;

/// Convex hull area of planar coordinates, in km². Zero for fewer than three
/// points or collinear input.
pub(crate) fn hull_area_km2(coords: &[Coord<f64>]) -> f64 {
    if coords.len() < 3 {
        return 0.0;
    }
    let multi_point: MultiPoint<f64> = coords.iter().map(|c| geo::Point::from(*c)).collect();
    let area_m2 = multi_point.convex_hull().unsigned_area();
    if area_m2.is_finite() && area_m2 >= MIN_HULL_AREA_M2 {
        area_m2 / SQUARE_METERS_PER_KM2
    } else {
        0.0
    }
}

/// Density of `count` items over `area_km2`, zero when the area is zero.
pub(crate) fn density(count: usize, area_km2: f64) -> f64 {
    if area_km2 > 0.0 {
        count as f64 / area_km2
    } else {
        0.0
    }
}

/// Hex-grid density surface.
///
/// Buckets every location into its cell at `resolution` and divides each
/// cell's count by the largest count, so the densest cell reads `1.0`.
///
/// # Examples
///
/// ```
/// use hexloc::compute::analytics::heatmap;
/// use hexloc_types::{GeoPoint, Location};
///
/// let one = vec![Location::new("a", "A", GeoPoint::from_lat_lon(40.7580, -73.9855))];
/// let map = heatmap(&one, 7)?;
/// assert_eq!(map.len(), 1);
/// assert_eq!(map.values().next().copied(), Some(1.0));
/// # Ok::<(), hexloc::HexError>(())
/// ```
pub fn heatmap(locations: &[Location], resolution: u8) -> Result<BTreeMap<CellId, f64>> {
    let resolution = grid::to_resolution(resolution)?;
    validate_locations(locations)?;

    let mut counts: BTreeMap<CellId, usize> = BTreeMap::new();
    for location in locations {
        let cell = grid::cell_for(location.coordinates, resolution)?;
        *counts.entry(cell).or_default() += 1;
    }

    let Some(max_count) = counts.values().copied().max() else {
        return Ok(BTreeMap::new());
    };

    Ok(counts
        .into_iter()
        .map(|(cell, count)| (cell, count as f64 / max_count as f64))
        .collect())
}

/// Max-heap entry: the worst candidate (largest distance, then latest input
/// position) sits on top and is evicted first.
struct KnnEntry {
    distance: f64,
    index: usize,
}

impl PartialEq for KnnEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KnnEntry {}

impl PartialOrd for KnnEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KnnEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// The `k` locations closest to `target`, with planar distances in meters.
///
/// Results are sorted by ascending distance; equal distances keep their
/// input order. If `k` exceeds the population, every location is returned.
/// Uses a bounded max-heap, O(n log k).
///
/// # Errors
///
/// `InvalidCoordinate` for an out-of-range target, `InvalidInput` for an
/// out-of-range location.
pub fn nearest_neighbors(
    target: &GeoPoint,
    locations: &[Location],
    k: usize,
) -> Result<Vec<(Location, f64)>> {
    validate_point(target)?;
    validate_locations(locations)?;

    if k == 0 || locations.is_empty() {
        return Ok(Vec::new());
    }

    let origin = WebMercator::to_planar(target);
    let mut heap = BinaryHeap::with_capacity(k.min(locations.len()));

    for (index, location) in locations.iter().enumerate() {
        let c = WebMercator::to_planar(&location.coordinates);
        let distance = (c.x - origin.x).hypot(c.y - origin.y);

        let entry = KnnEntry { distance, index };
        if heap.len() < k {
            heap.push(entry);
        } else if let Some(worst) = heap.peek()
            && entry < *worst
        {
            heap.pop();
            heap.push(entry);
        }
    }

    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .map(|entry| (locations[entry.index].clone(), entry.distance))
        .collect())
}

/// Locations whose coordinate lies inside `polygon` or on its boundary.
///
/// The polygon is in geographic `geo` order (x = longitude, y = latitude).
/// Input order is preserved.
///
/// # Errors
///
/// `InvalidInput` if a polygon vertex or a location is out of range.
pub fn points_in_polygon(locations: &[Location], polygon: &Polygon<f64>) -> Result<Vec<Location>> {
    validate_polygon(polygon)?;
    validate_locations(locations)?;

    Ok(locations
        .iter()
        .filter(|location| polygon.intersects(&location.coordinates.to_geo()))
        .cloned()
        .collect())
}

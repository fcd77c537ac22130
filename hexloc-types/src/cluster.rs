use crate::location::Location;
use crate::point::GeoPoint;
use serde::{Deserialize, Serialize};

/// A density-connected group of locations.
///
/// Noise points never appear in a cluster, so `cluster_id` is always a
/// non-negative label assigned in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: usize,
    /// Planar centroid of the members, reprojected to degrees
    pub centroid: GeoPoint,
    pub locations: Vec<Location>,
    /// Largest planar distance from the centroid to a member, in meters
    pub radius_meters: f64,
    /// Members per square kilometer of the convex hull; 0 for a zero-area hull
    pub density_per_km2: f64,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Whether a location with the given id belongs to this cluster.
    pub fn contains_id(&self, id: &str) -> bool {
        self.locations.iter().any(|l| l.id == id)
    }
}

//! Geocoding seam.
//!
//! The presence index never talks to a geocoding provider directly. It holds
//! an `Arc<dyn Geocoder>` and uses it to resolve addresses for
//! [`join_address`](crate::PresenceIndex::join_address) and to label new
//! cells with a locality.

use crate::error::Result;
use hexloc_types::{GeoPoint, Location};
use parking_lot::RwLock;

/// Address resolution provider.
pub trait Geocoder: Send + Sync {
    /// Best match for a free-form address, if any.
    fn geocode(&self, address: &str) -> Result<Option<Location>>;

    /// Closest known place to a coordinate, if any.
    fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Location>>;

    /// Up to `limit` places matching `query`.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Location>>;

    fn batch_geocode(&self, addresses: &[&str]) -> Result<Vec<Option<Location>>> {
        addresses.iter().map(|a| self.geocode(a)).collect()
    }
}

/// Human label for a geocoded place: its city, else its full address.
pub fn locality_label(location: &Location) -> String {
    location
        .components
        .city
        .clone()
        .unwrap_or_else(|| location.address.clone())
}

/// Geocoder over a fixed in-memory table of places.
///
/// Addresses match case-insensitively on the full address or the id. Reverse
/// lookups return the nearest entry within `reverse_radius_m`.
pub struct StaticGeocoder {
    places: RwLock<Vec<Location>>,
    reverse_radius_m: f64,
}

impl StaticGeocoder {
    const DEFAULT_REVERSE_RADIUS_M: f64 = 5_000.0;

    pub fn new() -> Self {
        Self {
            places: RwLock::new(Vec::new()),
            reverse_radius_m: Self::DEFAULT_REVERSE_RADIUS_M,
        }
    }

    pub fn from_locations(places: impl IntoIterator<Item = Location>) -> Self {
        Self {
            places: RwLock::new(places.into_iter().collect()),
            reverse_radius_m: Self::DEFAULT_REVERSE_RADIUS_M,
        }
    }

    pub fn with_reverse_radius(mut self, meters: f64) -> Self {
        self.reverse_radius_m = meters;
        self
    }

    pub fn insert(&self, place: Location) {
        self.places.write().push(place);
    }

    pub fn len(&self) -> usize {
        self.places.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.read().is_empty()
    }
}

impl Default for StaticGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, address: &str) -> Result<Option<Location>> {
        let needle = address.trim();
        Ok(self
            .places
            .read()
            .iter()
            .find(|p| p.address.eq_ignore_ascii_case(needle) || p.id.eq_ignore_ascii_case(needle))
            .cloned())
    }

    fn reverse_geocode(&self, point: GeoPoint) -> Result<Option<Location>> {
        let places = self.places.read();
        let nearest = places
            .iter()
            .map(|p| (p, point.haversine_distance(&p.coordinates)))
            .filter(|(_, d)| *d <= self.reverse_radius_m)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        Ok(nearest.map(|(p, _)| p.clone()))
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<Location>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .places
            .read()
            .iter()
            .filter(|p| p.address.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }
}

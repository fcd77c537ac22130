use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees (WGS84).
///
/// Unlike `geo::Point`, which is ordered `(x, y)` = `(lon, lat)`, this type
/// names its fields so that callers never have to remember the axis order.
///
/// # Examples
///
/// ```
/// use hexloc_types::GeoPoint;
///
/// let nyc = GeoPoint::from_lat_lon(40.7128, -74.0060);
/// assert_eq!(nyc.lon, -74.0060);
/// assert_eq!(nyc.to_geo().x(), -74.0060);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, `[-90, 90]`
    pub lat: f64,
    /// Longitude in degrees, `[-180, 180]`
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude (in that order).
    #[inline]
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Create a point from x (longitude) and y (latitude), the `geo` ordering.
    #[inline]
    pub fn from_xy(x: f64, y: f64) -> Self {
        Self { lat: y, lon: x }
    }

    /// Convert into a `geo::Point` (x = longitude, y = latitude).
    #[inline]
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }

    /// Whether both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to another point in meters (haversine).
    ///
    /// ```
    /// use hexloc_types::GeoPoint;
    ///
    /// let nyc = GeoPoint::from_lat_lon(40.7128, -74.0060);
    /// let la = GeoPoint::from_lat_lon(34.0522, -118.2437);
    /// assert!(nyc.haversine_distance(&la) > 3_900_000.0);
    /// ```
    #[inline]
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        use geo::Distance;
        geo::Haversine.distance(self.to_geo(), other.to_geo())
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(point: geo::Point<f64>) -> Self {
        Self::from_xy(point.x(), point.y())
    }
}

impl From<geo::Coord<f64>> for GeoPoint {
    fn from(coord: geo::Coord<f64>) -> Self {
        Self::from_xy(coord.x, coord.y)
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        point.to_geo()
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_order() {
        let p = GeoPoint::from_lat_lon(40.7, -74.0);
        let g = p.to_geo();
        assert_eq!(g.x(), -74.0);
        assert_eq!(g.y(), 40.7);
        assert_eq!(GeoPoint::from(g), p);
    }

    #[test]
    fn test_validity() {
        assert!(GeoPoint::from_lat_lon(90.0, 180.0).is_valid());
        assert!(GeoPoint::from_lat_lon(-90.0, -180.0).is_valid());
        assert!(!GeoPoint::from_lat_lon(90.1, 0.0).is_valid());
        assert!(!GeoPoint::from_lat_lon(0.0, -180.5).is_valid());
        assert!(!GeoPoint::from_lat_lon(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_zero_distance_to_self() {
        let p = GeoPoint::from_lat_lon(51.5074, -0.1278);
        assert_eq!(p.haversine_distance(&p), 0.0);
    }
}

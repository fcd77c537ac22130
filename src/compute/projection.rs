//! Planar projection used for metric distance and area math.
//!
//! Analytics project geographic coordinates into spherical Web Mercator
//! (EPSG:3857) meters, do all distance/area arithmetic there, and reproject
//! results back to degrees. The projection is exact on the sphere, so a
//! forward/inverse round trip reproduces the input to floating point noise.

use geo::{Coord, MapCoords, MultiPolygon};
use hexloc_types::GeoPoint;

/// Spherical Web Mercator (EPSG:3857).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebMercator;

impl WebMercator {
    /// Semi-major axis of WGS84, the sphere radius EPSG:3857 uses.
    pub const EARTH_RADIUS: f64 = 6_378_137.0;

    /// `y` diverges at the poles, so only exactly ±90° is pulled back onto
    /// this latitude.
    pub const MAX_LATITUDE: f64 = 90.0 - 1e-9;

    /// Project degrees to planar meters (x east, y north).
    pub fn to_planar(point: &GeoPoint) -> Coord<f64> {
        let lat = point.lat.clamp(-Self::MAX_LATITUDE, Self::MAX_LATITUDE);
        let x = Self::EARTH_RADIUS * point.lon.to_radians();
        let y = Self::EARTH_RADIUS
            * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
                .tan()
                .ln();
        Coord { x, y }
    }

    /// Reproject planar meters back to degrees.
    pub fn to_geographic(coord: Coord<f64>) -> GeoPoint {
        let lon = (coord.x / Self::EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (coord.y / Self::EARTH_RADIUS).exp().atan()
            - std::f64::consts::FRAC_PI_2)
            .to_degrees();
        GeoPoint::from_lat_lon(lat, lon)
    }

    pub fn project_all<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Vec<Coord<f64>> {
        points.into_iter().map(Self::to_planar).collect()
    }

    /// Reproject planar polygons to geographic `(x = lon, y = lat)` coordinates.
    pub fn multi_polygon_to_geographic(polygons: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        polygons.map_coords(|c| {
            let p = Self::to_geographic(c);
            Coord { x: p.lon, y: p.lat }
        })
    }
}

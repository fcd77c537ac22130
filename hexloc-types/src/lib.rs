//! # hexloc-types
//!
//! Core value types shared by the hexloc presence index and analytics engine.
//!
//! - **Points**: [`GeoPoint`], a latitude/longitude pair in degrees
//! - **Locations**: [`Location`] and [`AddressComponents`], the immutable input
//!   of every analytics operation
//! - **Clusters**: [`Cluster`], the output of a density clustering run
//!
//! All types are serializable with Serde and convert to the `geo` crate's
//! primitives where geometry is involved.
//!
//! ## Examples
//!
//! ```rust
//! use hexloc_types::{GeoPoint, Location};
//!
//! let times_square = GeoPoint::from_lat_lon(40.7580, -73.9855);
//! let location = Location::new("ts", "Times Square, New York, NY", times_square);
//! assert_eq!(location.coordinates.lat, 40.7580);
//! ```

pub mod cluster;
pub mod location;
pub mod point;

pub use cluster::Cluster;
pub use location::{AddressComponents, Location};
pub use point::GeoPoint;

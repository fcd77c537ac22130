//! Hexagonal presence index and spatial analytics.
//!
//! ## Features
//! - **Presence**: map coordinates onto H3 cells, track who is in which cell,
//!   list active neighbouring cells with distance and direction
//! - **Inactivity sweep**: occupancies not refreshed within a timeout are
//!   removed and cell counts decremented atomically
//! - **Analytics**: DBSCAN clustering, heatmaps, nearest neighbours,
//!   point-in-polygon, service areas and summary statistics over location sets
//! - **Persistence**: optional snapshot file for the in-memory store
//!
//! ```rust
//! use hexloc::PresenceBuilder;
//!
//! let index = PresenceBuilder::new().build()?;
//! let joined = index.join("alice", 40.7580, -73.9855, 8)?;
//! assert_eq!(joined.cell.record.active_users, 1);
//! assert_eq!(joined.cell.boundary.len(), 6);
//!
//! let neighbors = index.active_neighbors(joined.cell.record.id, 1)?;
//! assert!(neighbors.is_empty());
//! # Ok::<(), hexloc::HexError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod presence;
pub mod storage;

pub use builder::PresenceBuilder;
pub use config::{Config, SnapshotConfig};
pub use error::{HexError, Result};
pub use geocoding::{Geocoder, StaticGeocoder};
pub use presence::{CellView, ExpiredStats, JoinResult, NeighborInfo, PresenceIndex};
pub use storage::{
    CellEviction, CellRecord, JoinOutcome, Landmark, MemoryStore, OccupancyRecord, PresenceStore,
    StoreStats,
};

pub use compute::analytics::{
    Distribution, ServiceArea, SpatialStatistics, cluster, heatmap, nearest_neighbors,
    points_in_polygon, service_area, statistics,
};
pub use compute::{CellId, DEFAULT_RESOLUTION, Direction, ResolutionInfo};

pub use hexloc_types::{AddressComponents, Cluster, GeoPoint, Location};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{HexError, PresenceBuilder, PresenceIndex, Result};

    pub use crate::{Config, Geocoder, MemoryStore, PresenceStore, StaticGeocoder};

    pub use crate::{CellId, DEFAULT_RESOLUTION, Direction, JoinOutcome, JoinResult};

    pub use crate::{AddressComponents, Cluster, GeoPoint, Location};

    pub use crate::compute::analytics;
}

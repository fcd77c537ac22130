//! Store abstraction for cells, occupancies and landmarks.
//!
//! The presence index only talks to a [`PresenceStore`]. A store must give
//! two guarantees: at most one occupancy per `(user, cell)` pair, and atomic
//! per-cell updates of the active user count. [`MemoryStore`] is the bundled
//! implementation; with a snapshot file attached it survives restarts.

use crate::compute::grid::CellId;
use crate::error::Result;
use hexloc_types::GeoPoint;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

mod memory;
#[cfg(feature = "snapshot")]
pub mod snapshot;

pub use memory::MemoryStore;
#[cfg(feature = "snapshot")]
pub use snapshot::SnapshotFile;

/// A grid cell that has been occupied at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: CellId,
    pub resolution: u8,
    /// Always the grid centroid of `id`
    pub center: GeoPoint,
    pub display_name: Option<String>,
    /// Reverse-geocoded label, display only
    pub locality: Option<String>,
    pub active_users: u32,
    pub created_at: SystemTime,
    pub last_activity: SystemTime,
}

/// One user's presence in one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyRecord {
    pub user_id: String,
    pub cell: CellId,
    pub joined_at: SystemTime,
    pub last_seen: SystemTime,
}

/// A named place inside a cell, used to name the cell's chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: String,
    pub cell: CellId,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: SystemTime,
}

/// Whether a join created a new occupancy or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinOutcome {
    Created,
    Refreshed,
}

/// Result of [`PresenceStore::upsert_occupancy`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub outcome: JoinOutcome,
    /// The cell row after the update
    pub cell: CellRecord,
}

/// Occupancies removed from a single cell by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellEviction {
    pub cell: CellId,
    pub removed: usize,
    pub active_users: u32,
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub cell_count: usize,
    pub occupancy_count: usize,
    pub landmark_count: usize,
    /// Mutations applied since the store was opened
    pub operations_count: u64,
    /// Automatic snapshots that failed to write
    pub snapshot_failures: u64,
}

/// Everything a store holds, in a form that can be written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreContents {
    pub cells: Vec<CellRecord>,
    pub occupancies: Vec<OccupancyRecord>,
    pub landmarks: Vec<Landmark>,
}

/// Persistence seam of the presence index.
///
/// Implementations take `&self` and handle their own synchronization; the
/// index is shared across threads behind an `Arc`.
pub trait PresenceStore: Send + Sync {
    fn get_cell(&self, id: CellId) -> Result<Option<CellRecord>>;

    /// Stored records for the given ids; unknown ids are skipped.
    fn get_cells(&self, ids: &[CellId]) -> Result<Vec<CellRecord>>;

    /// Insert-if-absent. Returns the stored row and whether this call created it.
    fn create_cell(&self, record: CellRecord) -> Result<(CellRecord, bool)>;

    /// Create or refresh the occupancy of `user_id` in `cell`.
    ///
    /// On creation the cell's `active_users` is recomputed from the occupant
    /// count while the occupancy set is still locked. On refresh only
    /// `last_seen` moves. `last_activity` is set to `now` either way. Fails
    /// with `NotFound` if the cell row does not exist.
    fn upsert_occupancy(&self, user_id: &str, cell: CellId, now: SystemTime)
    -> Result<UpsertOutcome>;

    /// Remove one occupancy, recounting the cell. Returns the new count, or
    /// `None` if there was nothing to remove.
    fn remove_occupancy(&self, user_id: &str, cell: CellId) -> Result<Option<u32>>;

    /// Delete every occupancy whose `last_seen` is strictly before `cutoff`
    /// and decrement the affected cells, floored at zero.
    fn expire_occupancies(&self, cutoff: SystemTime) -> Result<Vec<CellEviction>>;

    fn add_landmark(&self, landmark: Landmark) -> Result<()>;

    /// Landmarks of a cell in insertion order.
    fn landmarks(&self, cell: CellId) -> Result<Vec<Landmark>>;

    fn occupancies_for_user(&self, user_id: &str) -> Result<Vec<OccupancyRecord>>;

    fn stats(&self) -> Result<StoreStats>;

    /// Flush pending writes to durable storage, if any.
    fn sync(&self) -> Result<()>;
}

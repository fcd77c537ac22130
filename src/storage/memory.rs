//! In-memory presence store.

use super::{
    CellEviction, CellRecord, JoinOutcome, Landmark, OccupancyRecord, PresenceStore,
    StoreContents, StoreStats, UpsertOutcome,
};
use crate::compute::grid::CellId;
use crate::error::{HexError, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

#[cfg(feature = "snapshot")]
use super::SnapshotFile;
#[cfg(feature = "snapshot")]
use crate::config::SnapshotConfig;
#[cfg(feature = "snapshot")]
use parking_lot::Mutex;
#[cfg(feature = "snapshot")]
use std::path::Path;

/// Occupants of one cell, keyed by user id
type OccupantSet = FxHashMap<String, OccupancyRecord>;

/// Presence store backed by concurrent hash maps.
///
/// Occupancies are sharded per cell, so the `(user, cell)` uniqueness is
/// structural. Every count update happens while the cell's occupant set is
/// locked. Lock order is occupant set, then cell row.
pub struct MemoryStore {
    cells: DashMap<CellId, CellRecord>,
    occupancies: DashMap<CellId, OccupantSet>,
    landmarks: DashMap<CellId, Vec<Landmark>>,
    operations: AtomicU64,
    snapshot_failures: AtomicU64,
    #[cfg(feature = "snapshot")]
    snapshot: Option<Mutex<SnapshotFile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
            occupancies: DashMap::new(),
            landmarks: DashMap::new(),
            operations: AtomicU64::new(0),
            snapshot_failures: AtomicU64::new(0),
            #[cfg(feature = "snapshot")]
            snapshot: None,
        }
    }

    /// Open a store persisted to `path`, loading the existing snapshot if
    /// there is one.
    #[cfg(feature = "snapshot")]
    pub fn with_snapshot<P: AsRef<Path>>(path: P, config: SnapshotConfig) -> Result<Self> {
        let file = SnapshotFile::new(path, config);
        let contents = file.load()?;

        let mut store = Self::from_contents(contents);
        store.snapshot = Some(Mutex::new(file));
        Ok(store)
    }

    /// Rebuild a store from previously exported contents.
    ///
    /// Each cell's `active_users` is recounted from the loaded occupancies,
    /// whatever the stored value says.
    pub fn from_contents(contents: StoreContents) -> Self {
        let store = Self::new();

        for cell in contents.cells {
            store.cells.insert(cell.id, cell);
        }
        for occupancy in contents.occupancies {
            store
                .occupancies
                .entry(occupancy.cell)
                .or_default()
                .insert(occupancy.user_id.clone(), occupancy);
        }
        for landmark in contents.landmarks {
            store
                .landmarks
                .entry(landmark.cell)
                .or_default()
                .push(landmark);
        }

        for mut row in store.cells.iter_mut() {
            let count = store
                .occupancies
                .get(row.key())
                .map_or(0, |occupants| Self::count(&occupants));
            if row.active_users != count {
                log::warn!(
                    "Cell {} stored {} active users, recounted {}",
                    row.key(),
                    row.active_users,
                    count
                );
                row.active_users = count;
            }
        }

        store
    }

    /// Copy of everything in the store, sorted for stable output.
    pub fn contents(&self) -> StoreContents {
        let mut cells: Vec<CellRecord> = self.cells.iter().map(|r| r.value().clone()).collect();
        cells.sort_by_key(|c| c.id);

        let mut occupancies: Vec<OccupancyRecord> = self
            .occupancies
            .iter()
            .flat_map(|set| set.value().values().cloned().collect::<Vec<_>>())
            .collect();
        occupancies.sort_by(|a, b| a.cell.cmp(&b.cell).then_with(|| a.user_id.cmp(&b.user_id)));

        let mut cell_ids: Vec<CellId> = self.landmarks.iter().map(|r| *r.key()).collect();
        cell_ids.sort_unstable();
        let landmarks = cell_ids
            .into_iter()
            .filter_map(|id| self.landmarks.get(&id).map(|l| l.value().clone()))
            .flatten()
            .collect();

        StoreContents {
            cells,
            occupancies,
            landmarks,
        }
    }

    /// Write a snapshot now. No-op for a store without a snapshot file.
    #[cfg(feature = "snapshot")]
    pub fn snapshot(&self) -> Result<()> {
        if let Some(file) = &self.snapshot {
            let contents = self.contents();
            file.lock().save(&contents)?;
        }
        Ok(())
    }

    #[cfg(not(feature = "snapshot"))]
    pub fn snapshot(&self) -> Result<()> {
        Ok(())
    }

    /// Called with no map guard held, after the mutation is committed. A
    /// failed automatic snapshot is logged and counted, never returned.
    fn record_mutation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.auto_snapshot() {
            self.snapshot_failures.fetch_add(1, Ordering::Relaxed);
            log::warn!("Automatic snapshot failed: {}", e);
        }
    }

    #[cfg(feature = "snapshot")]
    fn auto_snapshot(&self) -> Result<()> {
        let Some(file) = &self.snapshot else {
            return Ok(());
        };

        let due = {
            let mut file = file.lock();
            file.record_operation();
            file.should_snapshot()
        };
        if due {
            let contents = self.contents();
            file.lock().save(&contents)?;
        }
        Ok(())
    }

    #[cfg(not(feature = "snapshot"))]
    fn auto_snapshot(&self) -> Result<()> {
        Ok(())
    }

    fn count(set: &OccupantSet) -> u32 {
        u32::try_from(set.len()).unwrap_or(u32::MAX)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceStore for MemoryStore {
    fn get_cell(&self, id: CellId) -> Result<Option<CellRecord>> {
        Ok(self.cells.get(&id).map(|r| r.value().clone()))
    }

    fn get_cells(&self, ids: &[CellId]) -> Result<Vec<CellRecord>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.cells.get(id).map(|r| r.value().clone()))
            .collect())
    }

    fn create_cell(&self, record: CellRecord) -> Result<(CellRecord, bool)> {
        let (stored, created) = match self.cells.entry(record.id) {
            Entry::Occupied(existing) => (existing.get().clone(), false),
            Entry::Vacant(slot) => {
                let stored = slot.insert(record).value().clone();
                (stored, true)
            }
        };

        if created {
            log::debug!("Created cell {} ({:?})", stored.id, stored.display_name);
            self.record_mutation();
        }
        Ok((stored, created))
    }

    fn upsert_occupancy(
        &self,
        user_id: &str,
        cell: CellId,
        now: SystemTime,
    ) -> Result<UpsertOutcome> {
        if !self.cells.contains_key(&cell) {
            return Err(HexError::NotFound(cell));
        }

        let result = {
            let mut occupants = self.occupancies.entry(cell).or_default();

            let outcome = match occupants.get_mut(user_id) {
                Some(existing) => {
                    existing.last_seen = now;
                    JoinOutcome::Refreshed
                }
                None => {
                    occupants.insert(
                        user_id.to_string(),
                        OccupancyRecord {
                            user_id: user_id.to_string(),
                            cell,
                            joined_at: now,
                            last_seen: now,
                        },
                    );
                    JoinOutcome::Created
                }
            };

            let mut row = self.cells.get_mut(&cell).ok_or(HexError::NotFound(cell))?;
            if outcome == JoinOutcome::Created {
                row.active_users = Self::count(&occupants);
            }
            row.last_activity = now;

            UpsertOutcome {
                outcome,
                cell: row.value().clone(),
            }
        };

        log::debug!(
            "Occupancy {:?} for {} in {} ({} active)",
            result.outcome,
            user_id,
            cell,
            result.cell.active_users
        );
        self.record_mutation();
        Ok(result)
    }

    fn remove_occupancy(&self, user_id: &str, cell: CellId) -> Result<Option<u32>> {
        let remaining = {
            let Some(mut occupants) = self.occupancies.get_mut(&cell) else {
                return Ok(None);
            };
            if occupants.remove(user_id).is_none() {
                return Ok(None);
            }

            let count = Self::count(&occupants);
            if let Some(mut row) = self.cells.get_mut(&cell) {
                row.active_users = count;
            }
            count
        };

        log::debug!("Removed {} from {} ({} active)", user_id, cell, remaining);
        self.record_mutation();
        Ok(Some(remaining))
    }

    fn expire_occupancies(&self, cutoff: SystemTime) -> Result<Vec<CellEviction>> {
        let cells: Vec<CellId> = self.occupancies.iter().map(|r| *r.key()).collect();
        let mut evictions = Vec::new();

        for cell in cells {
            let Some(mut occupants) = self.occupancies.get_mut(&cell) else {
                continue;
            };

            let before = occupants.len();
            occupants.retain(|_, occupancy| occupancy.last_seen >= cutoff);
            let removed = before - occupants.len();
            if removed == 0 {
                continue;
            }

            let active_users = Self::count(&occupants);
            if let Some(mut row) = self.cells.get_mut(&cell) {
                row.active_users = active_users;
            }

            evictions.push(CellEviction {
                cell,
                removed,
                active_users,
            });
        }

        if !evictions.is_empty() {
            self.record_mutation();
        }
        Ok(evictions)
    }

    fn add_landmark(&self, landmark: Landmark) -> Result<()> {
        self.landmarks
            .entry(landmark.cell)
            .or_default()
            .push(landmark);
        self.record_mutation();
        Ok(())
    }

    fn landmarks(&self, cell: CellId) -> Result<Vec<Landmark>> {
        Ok(self
            .landmarks
            .get(&cell)
            .map(|l| l.value().clone())
            .unwrap_or_default())
    }

    fn occupancies_for_user(&self, user_id: &str) -> Result<Vec<OccupancyRecord>> {
        let mut found: Vec<OccupancyRecord> = self
            .occupancies
            .iter()
            .filter_map(|set| set.value().get(user_id).cloned())
            .collect();
        found.sort_by_key(|o| o.cell);
        Ok(found)
    }

    fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            cell_count: self.cells.len(),
            occupancy_count: self.occupancies.iter().map(|s| s.value().len()).sum(),
            landmark_count: self.landmarks.iter().map(|l| l.value().len()).sum(),
            operations_count: self.operations.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
        })
    }

    fn sync(&self) -> Result<()> {
        self.snapshot()
    }
}

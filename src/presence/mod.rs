//! Presence index: which users are in which hexagonal cell.
//!
//! Cells are created lazily the first time somebody joins them and are never
//! deleted. Occupancies are refreshed by repeated joins and removed by the
//! inactivity sweep or an explicit [`leave`](PresenceIndex::leave). A user
//! may be present in several cells at once.

mod naming;

pub use naming::{display_name, fallback_name};

use crate::compute::geodesy::{self, Direction};
use crate::compute::grid::{self, CellId, ResolutionInfo};
use crate::compute::validation;
use crate::config::Config;
use crate::error::{HexError, Result};
use crate::geocoding::{self, Geocoder};
use crate::storage::{
    CellEviction, CellRecord, JoinOutcome, Landmark, MemoryStore, PresenceStore, StoreStats,
};
use dashmap::DashMap;
use hexloc_types::GeoPoint;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A stored cell together with its boundary polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellView {
    #[serde(flatten)]
    pub record: CellRecord,
    pub boundary: Vec<GeoPoint>,
}

/// An active cell near the one being looked at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborInfo {
    pub cell: CellId,
    pub name: String,
    pub active_users: u32,
    /// Great-circle distance between the two cell centers
    pub distance_km: f64,
    pub direction: Direction,
}

/// Response to a join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinResult {
    pub cell: CellView,
    pub neighbors: Vec<NeighborInfo>,
    /// The coordinate the user joined from, not the cell center
    pub position: GeoPoint,
    pub outcome: JoinOutcome,
}

/// Summary of an inactivity sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiredStats {
    pub cutoff: SystemTime,
    pub removed_occupancies: usize,
    pub evictions: Vec<CellEviction>,
}

impl ExpiredStats {
    pub fn cells_touched(&self) -> usize {
        self.evictions.len()
    }
}

/// Tracks user presence on the hexagonal grid.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct PresenceIndex<S: PresenceStore = MemoryStore> {
    store: S,
    config: Config,
    geocoder: Option<Arc<dyn Geocoder>>,
    /// 1-ring of cells created by this process
    neighbor_cache: DashMap<CellId, Vec<CellId>>,
}

impl<S: PresenceStore> PresenceIndex<S> {
    pub fn new(store: S, config: Config) -> Result<Self> {
        config.validate().map_err(HexError::Config)?;

        Ok(Self {
            store,
            config,
            geocoder: None,
            neighbor_cache: DashMap::new(),
        })
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Supported resolutions, coarsest first.
    pub fn resolutions(&self) -> &'static [ResolutionInfo] {
        grid::resolutions()
    }

    /// Cell containing a coordinate. Pure; touches no state.
    pub fn resolve_cell(&self, lat: f64, lon: f64, resolution: u8) -> Result<CellId> {
        let resolution = validation::validate_resolution(
            resolution,
            self.config.min_resolution,
            self.config.max_resolution,
        )?;
        let point = validation::validate_coordinate(lat, lon)?;
        grid::cell_for(point, resolution)
    }

    pub fn parse_cell_id(&self, text: &str) -> Result<CellId> {
        grid::parse_cell_id(text)
    }

    /// Boundary vertices as the grid yields them.
    pub fn cell_boundary(&self, cell: CellId) -> Vec<GeoPoint> {
        grid::cell_boundary(cell)
    }

    /// Stored cell with its boundary; `NotFound` for cells nobody joined.
    pub fn cell(&self, cell: CellId) -> Result<CellView> {
        let record = self.store.get_cell(cell)?.ok_or(HexError::NotFound(cell))?;
        Ok(self.view(record))
    }

    /// Stored record for the cell containing the coordinate, created on first
    /// use.
    pub fn ensure_cell(&self, lat: f64, lon: f64, resolution: u8) -> Result<CellRecord> {
        let cell = self.resolve_cell(lat, lon, resolution)?;
        self.ensure_cell_id(cell, SystemTime::now())
    }

    fn ensure_cell_id(&self, cell: CellId, now: SystemTime) -> Result<CellRecord> {
        if let Some(existing) = self.store.get_cell(cell)? {
            return Ok(existing);
        }

        let resolution = grid::cell_resolution(cell);
        let center = grid::cell_center(cell);
        let landmarks = self.store.landmarks(cell)?;

        let record = CellRecord {
            id: cell,
            resolution,
            center,
            display_name: Some(naming::display_name(resolution, &landmarks)),
            locality: self.locality(center),
            active_users: 0,
            created_at: now,
            last_activity: now,
        };

        let (stored, created) = self.store.create_cell(record)?;
        if created && self.config.precompute_neighbors {
            self.neighbor_cache.insert(cell, grid::neighbors(cell, 1));
        }
        Ok(stored)
    }

    fn locality(&self, center: GeoPoint) -> Option<String> {
        let geocoder = self.geocoder.as_ref()?;
        match geocoder.reverse_geocode(center) {
            Ok(place) => place.as_ref().map(geocoding::locality_label),
            Err(e) => {
                log::warn!("Reverse geocoding {} failed: {}", center, e);
                None
            }
        }
    }

    /// Join at the configured default resolution.
    pub fn join_default(&self, user_id: &str, lat: f64, lon: f64) -> Result<JoinResult> {
        self.join(user_id, lat, lon, self.config.default_resolution)
    }

    /// Put `user_id` in the cell containing the coordinate, or refresh their
    /// presence there.
    pub fn join(&self, user_id: &str, lat: f64, lon: f64, resolution: u8) -> Result<JoinResult> {
        self.join_at(user_id, lat, lon, resolution, SystemTime::now())
    }

    pub fn join_at(
        &self,
        user_id: &str,
        lat: f64,
        lon: f64,
        resolution: u8,
        now: SystemTime,
    ) -> Result<JoinResult> {
        if user_id.trim().is_empty() {
            return Err(HexError::InvalidInput("User id must not be empty".to_string()));
        }

        let cell = self.resolve_cell(lat, lon, resolution)?;
        self.ensure_cell_id(cell, now)?;

        let upserted = self.store.upsert_occupancy(user_id, cell, now)?;
        log::debug!(
            "User {} joined {} ({:?}, {} active)",
            user_id,
            cell,
            upserted.outcome,
            upserted.cell.active_users
        );

        let neighbors = self.active_neighbors(cell, self.config.neighbor_rings)?;

        Ok(JoinResult {
            cell: self.view(upserted.cell),
            neighbors,
            position: GeoPoint::from_lat_lon(lat, lon),
            outcome: upserted.outcome,
        })
    }

    /// Resolve an address through the geocoder and join at its coordinate.
    pub fn join_address(
        &self,
        user_id: &str,
        address: &str,
        resolution: u8,
    ) -> Result<JoinResult> {
        let geocoder = self.geocoder.as_ref().ok_or(HexError::GeocoderUnavailable)?;
        let place = geocoder
            .geocode(address)?
            .ok_or_else(|| HexError::Geocoding(format!("No match for address '{}'", address)))?;

        let point = place.coordinates;
        self.join(user_id, point.lat, point.lon, resolution)
    }

    /// Remove one occupancy. Returns whether the user was present.
    pub fn leave(&self, user_id: &str, cell: CellId) -> Result<bool> {
        let remaining = self.store.remove_occupancy(user_id, cell)?;
        if let Some(count) = remaining {
            log::debug!("User {} left {} ({} active)", user_id, cell, count);
        }
        Ok(remaining.is_some())
    }

    /// Every cell the user is currently present in.
    pub fn cells_for_user(&self, user_id: &str) -> Result<Vec<CellRecord>> {
        let cells: Vec<CellId> = self
            .store
            .occupancies_for_user(user_id)?
            .into_iter()
            .map(|o| o.cell)
            .collect();
        self.store.get_cells(&cells)
    }

    /// Active cells within `rings` grid steps, nearest first.
    ///
    /// Cells that were never created or have nobody in them are skipped, as
    /// is `cell` itself. Ties in distance are broken by cell id. `rings` may
    /// not exceed the configured `max_neighbor_rings`.
    pub fn active_neighbors(&self, cell: CellId, rings: u32) -> Result<Vec<NeighborInfo>> {
        if rings > self.config.max_neighbor_rings {
            return Err(HexError::InvalidInput(format!(
                "Ring count {} exceeds the maximum of {}",
                rings, self.config.max_neighbor_rings
            )));
        }

        let candidates = match self.neighbor_cache.get(&cell) {
            Some(cached) if rings == 1 => cached.value().clone(),
            _ => grid::neighbors(cell, rings),
        };

        let origin = grid::cell_center(cell);
        let mut neighbors: Vec<NeighborInfo> = self
            .store
            .get_cells(&candidates)?
            .into_iter()
            .filter(|record| record.active_users > 0 && record.id != cell)
            .map(|record| NeighborInfo {
                cell: record.id,
                name: record
                    .display_name
                    .unwrap_or_else(|| naming::fallback_name(record.id)),
                active_users: record.active_users,
                distance_km: geodesy::distance_km(&origin, &record.center),
                direction: geodesy::cardinal_direction(&origin, &record.center),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.cell.cmp(&b.cell))
        });
        Ok(neighbors)
    }

    /// Attach a landmark to a cell. Only cells created afterwards pick it up
    /// as their name.
    pub fn add_landmark(
        &self,
        cell: CellId,
        name: &str,
        category: Option<&str>,
        description: Option<&str>,
    ) -> Result<Landmark> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HexError::InvalidInput(
                "Landmark name must not be empty".to_string(),
            ));
        }

        let landmark = Landmark {
            id: uuid::Uuid::new_v4().to_string(),
            cell,
            name: name.to_string(),
            category: category.map(str::to_string),
            description: description.map(str::to_string),
            created_at: SystemTime::now(),
        };
        self.store.add_landmark(landmark.clone())?;
        Ok(landmark)
    }

    /// Sweep occupancies idle for longer than the configured timeout.
    pub fn expire_stale(&self) -> Result<ExpiredStats> {
        self.expire_inactive(self.config.inactivity_timeout())
    }

    pub fn expire_inactive(&self, timeout: Duration) -> Result<ExpiredStats> {
        self.expire_inactive_at(timeout, SystemTime::now())
    }

    /// Remove occupancies whose `last_seen` is strictly before `now - timeout`.
    pub fn expire_inactive_at(&self, timeout: Duration, now: SystemTime) -> Result<ExpiredStats> {
        let cutoff = now
            .checked_sub(timeout)
            .ok_or(HexError::InvalidTimestamp)?;

        let evictions = self.store.expire_occupancies(cutoff)?;
        let removed_occupancies = evictions.iter().map(|e| e.removed).sum();

        if removed_occupancies > 0 {
            log::info!(
                "Expired {} inactive occupancies across {} cells",
                removed_occupancies,
                evictions.len()
            );
        }

        Ok(ExpiredStats {
            cutoff,
            removed_occupancies,
            evictions,
        })
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.store.stats()
    }

    /// Flush the store to durable storage.
    pub fn sync(&self) -> Result<()> {
        self.store.sync()
    }

    fn view(&self, record: CellRecord) -> CellView {
        let boundary = grid::cell_boundary(record.id);
        CellView { record, boundary }
    }
}

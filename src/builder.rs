//! Builder for a [`PresenceIndex`] over the in-memory store.

use crate::config::Config;
use crate::error::{HexError, Result};
use crate::geocoding::Geocoder;
use crate::presence::PresenceIndex;
use crate::storage::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Assembles a presence index from a configuration, an optional snapshot
/// path and an optional geocoder.
#[derive(Default)]
pub struct PresenceBuilder {
    config: Config,
    snapshot_path: Option<PathBuf>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl PresenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Persist the store to a snapshot file, loading it if it already exists.
    pub fn snapshot_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Keep everything in memory.
    pub fn in_memory(mut self) -> Self {
        self.snapshot_path = None;
        self
    }

    pub fn geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn build(self) -> Result<PresenceIndex<MemoryStore>> {
        self.config.validate().map_err(HexError::Config)?;

        let store = match self.snapshot_path {
            Some(path) => Self::open_store(path, &self.config)?,
            None => MemoryStore::new(),
        };

        let index = PresenceIndex::new(store, self.config)?;
        Ok(match self.geocoder {
            Some(geocoder) => index.with_geocoder(geocoder),
            None => index,
        })
    }

    #[cfg(feature = "snapshot")]
    fn open_store(path: PathBuf, config: &Config) -> Result<MemoryStore> {
        MemoryStore::with_snapshot(path, config.snapshot.clone())
    }

    #[cfg(not(feature = "snapshot"))]
    fn open_store(path: PathBuf, _config: &Config) -> Result<MemoryStore> {
        Err(HexError::Config(format!(
            "Snapshot path {:?} given but the snapshot feature is disabled",
            path
        )))
    }
}

impl std::fmt::Debug for PresenceBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceBuilder")
            .field("config", &self.config)
            .field("snapshot_path", &self.snapshot_path)
            .field("geocoder", &self.geocoder.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_default() {
        let builder = PresenceBuilder::new();
        assert!(builder.snapshot_path.is_none());
        assert!(builder.geocoder.is_none());
    }

    #[test]
    fn test_builder_in_memory() {
        let index = PresenceBuilder::new().in_memory().build().unwrap();
        let joined = index.join("alice", 40.7580, -73.9855, 8).unwrap();
        assert_eq!(joined.cell.record.active_users, 1);
    }

    #[test]
    fn test_builder_applies_config() {
        let config = Config::default().with_inactivity_timeout(Duration::from_secs(60));
        let index = PresenceBuilder::new().config(config).build().unwrap();
        assert_eq!(index.config().inactivity_timeout_secs, 60);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = Config::default().with_default_resolution(3);
        assert!(matches!(
            PresenceBuilder::new().config(config).build(),
            Err(HexError::Config(_))
        ));
    }

    #[cfg(feature = "snapshot")]
    #[test]
    fn test_builder_with_snapshot_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presence.snapshot");

        let index = PresenceBuilder::new().snapshot_path(&path).build().unwrap();
        index.join("alice", 40.7580, -73.9855, 8).unwrap();
        index.sync().unwrap();
        assert!(path.exists());
    }
}

//! Snapshot persistence for [`MemoryStore`](super::MemoryStore).
//!
//! A snapshot is the whole store written at once: a magic header, a version
//! byte, the write timestamp and a bincode payload. It is written to a
//! sibling temp file, fsynced and renamed over the previous snapshot.

use super::StoreContents;
use crate::config::SnapshotConfig;
use crate::error::{HexError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SNAPSHOT_MAGIC: &[u8] = b"HEXLOC_SNAPSHOT";
const SNAPSHOT_VERSION: u8 = 1;

pub struct SnapshotFile {
    path: PathBuf,
    config: SnapshotConfig,
    ops_since_snapshot: usize,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P, config: SnapshotConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            ops_since_snapshot: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the snapshot. A missing or empty file yields empty contents.
    pub fn load(&self) -> Result<StoreContents> {
        if !self.exists() {
            return Ok(StoreContents::default());
        }

        let file = File::open(&self.path)?;
        if file.metadata()?.len() == 0 {
            return Ok(StoreContents::default());
        }

        let mut reader = BufReader::new(file);

        let mut magic = vec![0u8; SNAPSHOT_MAGIC.len()];
        reader
            .read_exact(&mut magic)
            .map_err(|_| HexError::InvalidFormat)?;
        if magic != SNAPSHOT_MAGIC {
            return Err(HexError::InvalidFormat);
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(HexError::InvalidFormat);
        }

        let mut timestamp = [0u8; 12];
        reader.read_exact(&mut timestamp)?;
        let written_at = decode_timestamp(&timestamp);

        let contents: StoreContents = bincode::deserialize_from(&mut reader)?;
        log::debug!(
            "Loaded snapshot {:?} written at {:?}: {} cells, {} occupancies",
            self.path,
            written_at,
            contents.cells.len(),
            contents.occupancies.len()
        );
        Ok(contents)
    }

    pub fn save(&mut self, contents: &StoreContents) -> Result<()> {
        let temp_path = self.temp_path();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        let mut writer = BufWriter::new(file);

        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&[SNAPSHOT_VERSION])?;
        writer.write_all(&encode_timestamp(SystemTime::now())?)?;
        bincode::serialize_into(&mut writer, contents)?;

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&temp_path, &self.path)?;
        self.sync_parent_dir()?;

        self.ops_since_snapshot = 0;
        log::info!(
            "Saved snapshot {:?}: {} cells, {} occupancies, {} landmarks",
            self.path,
            contents.cells.len(),
            contents.occupancies.len(),
            contents.landmarks.len()
        );

        Ok(())
    }

    pub fn record_operation(&mut self) {
        self.ops_since_snapshot += 1;
    }

    pub fn should_snapshot(&self) -> bool {
        self.config
            .auto_snapshot_ops
            .is_some_and(|threshold| self.ops_since_snapshot >= threshold)
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        if let Some(name) = temp.file_name() {
            let mut new_name = name.to_string_lossy().into_owned();
            new_name.push_str(".tmp");
            temp.set_file_name(new_name);
        }
        temp
    }

    fn sync_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }
}

fn encode_timestamp(time: SystemTime) -> Result<[u8; 12]> {
    let since_epoch = time
        .duration_since(UNIX_EPOCH)
        .map_err(|_| HexError::InvalidTimestamp)?;
    let mut buf = [0u8; 12];
    buf[0..8].copy_from_slice(&since_epoch.as_secs().to_le_bytes());
    buf[8..12].copy_from_slice(&since_epoch.subsec_nanos().to_le_bytes());
    Ok(buf)
}

fn decode_timestamp(buf: &[u8; 12]) -> SystemTime {
    let mut secs = [0u8; 8];
    let mut nanos = [0u8; 4];
    secs.copy_from_slice(&buf[0..8]);
    nanos.copy_from_slice(&buf[8..12]);
    UNIX_EPOCH + Duration::new(u64::from_le_bytes(secs), u32::from_le_bytes(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::grid;
    use crate::storage::{CellRecord, Landmark, OccupancyRecord};
    use hexloc_types::GeoPoint;
    use tempfile::NamedTempFile;

    fn sample_contents() -> StoreContents {
        let now = SystemTime::now();
        let cell = grid::cell_for(
            GeoPoint::from_lat_lon(40.7580, -73.9855),
            grid::to_resolution(8).unwrap(),
        )
        .unwrap();

        StoreContents {
            cells: vec![CellRecord {
                id: cell,
                resolution: 8,
                center: grid::cell_center(cell),
                display_name: Some("Neighborhood Chat".to_string()),
                locality: None,
                active_users: 1,
                created_at: now,
                last_activity: now,
            }],
            occupancies: vec![OccupancyRecord {
                user_id: "alice".to_string(),
                cell,
                joined_at: now,
                last_seen: now,
            }],
            landmarks: vec![Landmark {
                id: "ts".to_string(),
                cell,
                name: "Times Square".to_string(),
                category: Some("plaza".to_string()),
                description: None,
                created_at: now,
            }],
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let temp = NamedTempFile::new().unwrap();
        let mut snapshot = SnapshotFile::new(temp.path(), SnapshotConfig::default());

        let contents = sample_contents();
        snapshot.save(&contents).unwrap();

        let loaded = snapshot.load().unwrap();
        assert_eq!(loaded, contents);
    }

    #[test]
    fn test_auto_snapshot_threshold() {
        let temp = NamedTempFile::new().unwrap();
        let config = SnapshotConfig {
            auto_snapshot_ops: Some(3),
        };
        let mut snapshot = SnapshotFile::new(temp.path(), config);

        assert!(!snapshot.should_snapshot());
        snapshot.record_operation();
        snapshot.record_operation();
        assert!(!snapshot.should_snapshot());
        snapshot.record_operation();
        assert!(snapshot.should_snapshot());

        snapshot.save(&StoreContents::default()).unwrap();
        assert!(!snapshot.should_snapshot());
    }

    #[test]
    fn test_load_nonexistent() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().with_extension("missing");
        let snapshot = SnapshotFile::new(&path, SnapshotConfig::default());

        assert_eq!(snapshot.load().unwrap(), StoreContents::default());
    }

    #[test]
    fn test_invalid_magic() {
        let temp = NamedTempFile::new().unwrap();
        let mut file = File::create(temp.path()).unwrap();
        file.write_all(b"NOT_A_SNAPSHOT_AT_ALL").unwrap();
        file.sync_all().unwrap();
        drop(file);

        let snapshot = SnapshotFile::new(temp.path(), SnapshotConfig::default());
        assert!(matches!(snapshot.load(), Err(HexError::InvalidFormat)));
    }

    #[test]
    fn test_timestamp_encoding() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123);
        let encoded = encode_timestamp(time).unwrap();
        assert_eq!(decode_timestamp(&encoded), time);
    }
}

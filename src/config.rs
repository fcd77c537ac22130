//! Configuration for the presence index and its store.
use serde::de::Error;
use std::time::Duration;

/// H3 supports resolutions 0 (coarsest) through 15 (finest).
const H3_MAX_RESOLUTION: u8 = 15;

/// Presence index configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Resolution used when a caller does not ask for one
    #[serde(default = "Config::default_resolution")]
    pub default_resolution: u8,

    /// Coarsest resolution accepted at the boundary
    #[serde(default = "Config::default_min_resolution")]
    pub min_resolution: u8,

    /// Finest resolution accepted at the boundary
    #[serde(default = "Config::default_max_resolution")]
    pub max_resolution: u8,

    /// Occupancies not refreshed within this many seconds are swept
    #[serde(default = "Config::default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,

    /// Rings searched for the neighbor list returned by a join
    #[serde(default = "Config::default_neighbor_rings")]
    pub neighbor_rings: u32,

    /// Largest ring count a neighbor query may ask for
    #[serde(default = "Config::default_max_neighbor_rings")]
    pub max_neighbor_rings: u32,

    /// Cache the 1-ring of every newly created cell
    #[serde(default = "Config::default_precompute_neighbors")]
    pub precompute_neighbors: bool,

    /// Snapshot persistence settings
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

/// Configuration for snapshot persistence of the in-memory store
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Write a snapshot automatically after this many mutations
    #[serde(default)]
    pub auto_snapshot_ops: Option<usize>,
}

impl Config {
    const fn default_resolution() -> u8 {
        8
    }

    const fn default_min_resolution() -> u8 {
        6
    }

    const fn default_max_resolution() -> u8 {
        10
    }

    const fn default_inactivity_timeout_secs() -> u64 {
        30 * 60
    }

    const fn default_neighbor_rings() -> u32 {
        1
    }

    const fn default_max_neighbor_rings() -> u32 {
        10
    }

    const fn default_precompute_neighbors() -> bool {
        true
    }

    pub fn with_default_resolution(mut self, resolution: u8) -> Self {
        self.default_resolution = resolution;
        self
    }

    pub fn with_resolution_band(mut self, min: u8, max: u8) -> Self {
        self.min_resolution = min;
        self.max_resolution = max;
        self
    }

    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_neighbor_rings(mut self, rings: u32) -> Self {
        assert!(rings > 0, "Neighbor rings must be greater than zero");

        if rings > Self::default_max_neighbor_rings() {
            log::warn!(
                "Neighbor ring count of {} covers {} cells per query and may be slow",
                rings,
                3 * rings * (rings + 1) + 1
            );
        }

        self.neighbor_rings = rings;
        self
    }

    pub fn with_max_neighbor_rings(mut self, rings: u32) -> Self {
        self.max_neighbor_rings = rings;
        self
    }

    pub fn with_precompute_neighbors(mut self, enabled: bool) -> Self {
        self.precompute_neighbors = enabled;
        self
    }

    pub fn with_auto_snapshot_ops(mut self, ops: usize) -> Self {
        self.snapshot.auto_snapshot_ops = Some(ops);
        self
    }

    /// Inactivity timeout as a `Duration`.
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_resolution > H3_MAX_RESOLUTION {
            return Err(format!(
                "Maximum resolution {} exceeds the grid's finest resolution {}",
                self.max_resolution, H3_MAX_RESOLUTION
            ));
        }

        if self.min_resolution > self.max_resolution {
            return Err(format!(
                "Minimum resolution {} is greater than maximum resolution {}",
                self.min_resolution, self.max_resolution
            ));
        }

        if !(self.min_resolution..=self.max_resolution).contains(&self.default_resolution) {
            return Err(format!(
                "Default resolution {} is outside the band {}..={}",
                self.default_resolution, self.min_resolution, self.max_resolution
            ));
        }

        if self.inactivity_timeout_secs == 0 {
            return Err("Inactivity timeout must be greater than zero".to_string());
        }

        if self.neighbor_rings == 0 {
            return Err("Neighbor rings must be greater than zero".to_string());
        }

        if self.neighbor_rings > self.max_neighbor_rings {
            return Err(format!(
                "Neighbor rings {} exceed the maximum of {}",
                self.neighbor_rings, self.max_neighbor_rings
            ));
        }

        if let Some(ops) = self.snapshot.auto_snapshot_ops
            && ops == 0
        {
            return Err("Auto snapshot interval must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_resolution: Self::default_resolution(),
            min_resolution: Self::default_min_resolution(),
            max_resolution: Self::default_max_resolution(),
            inactivity_timeout_secs: Self::default_inactivity_timeout_secs(),
            neighbor_rings: Self::default_neighbor_rings(),
            max_neighbor_rings: Self::default_max_neighbor_rings(),
            precompute_neighbors: Self::default_precompute_neighbors(),
            snapshot: SnapshotConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_resolution, 8);
        assert_eq!(config.min_resolution, 6);
        assert_eq!(config.max_resolution, 10);
        assert_eq!(config.inactivity_timeout(), Duration::from_secs(1800));
        assert_eq!(config.neighbor_rings, 1);
        assert_eq!(config.max_neighbor_rings, 10);
        assert!(config.precompute_neighbors);
        assert!(config.snapshot.auto_snapshot_ops.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default()
            .with_default_resolution(9)
            .with_inactivity_timeout(Duration::from_secs(120))
            .with_auto_snapshot_ops(50);

        let json = config.to_json().unwrap();
        let deserialized = Config::from_json(&json).unwrap();

        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json(r#"{ "default_resolution": 7 }"#).unwrap();
        assert_eq!(config.default_resolution, 7);
        assert_eq!(config.max_resolution, 10);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::from_json(r#"{ "resolution": 7 }"#).is_err());
    }

    #[test]
    fn test_config_validation() {
        let inverted = Config::default().with_resolution_band(10, 6);
        assert!(inverted.validate().is_err());

        let outside = Config::default().with_default_resolution(11);
        assert!(outside.validate().is_err());

        let too_fine = Config::default()
            .with_resolution_band(6, 16)
            .with_default_resolution(8);
        assert!(too_fine.validate().is_err());

        let zero_timeout = Config::default().with_inactivity_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());

        let wide = Config::default()
            .with_neighbor_rings(4)
            .with_max_neighbor_rings(3);
        assert!(wide.validate().is_err());
        assert!(wide.with_max_neighbor_rings(4).validate().is_ok());

        assert!(Config::from_json(r#"{ "default_resolution": 12 }"#).is_err());
    }

    #[test]
    #[should_panic(expected = "Neighbor rings must be greater than zero")]
    fn test_zero_rings_panics() {
        let _ = Config::default().with_neighbor_rings(0);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_round_trip() {
        let config = Config::default().with_precompute_neighbors(false);
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}

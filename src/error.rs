//! Error types for the presence index and analytics engine.

use h3o::CellIndex;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HexError>;

#[derive(Debug, Error)]
pub enum HexError {
    #[error("Invalid coordinate: latitude {lat}, longitude {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Invalid resolution {resolution}: must be between {min} and {max}")]
    InvalidResolution { resolution: u8, min: u8, max: u8 },

    #[error("Invalid cell id: {0}")]
    InvalidCellId(String),

    #[error("Cell not found: {0}")]
    NotFound(CellIndex),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("No geocoder configured")]
    GeocoderUnavailable,

    #[error("Geocoding failed: {0}")]
    Geocoding(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid snapshot format")]
    InvalidFormat,

    #[error("Invalid timestamp")]
    InvalidTimestamp,
}

impl HexError {
    /// Whether the error was caused by the caller's input rather than a
    /// failing collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCoordinate { .. }
                | Self::InvalidResolution { .. }
                | Self::InvalidCellId(_)
                | Self::NotFound(_)
                | Self::InvalidInput(_)
        )
    }
}

#[cfg(feature = "snapshot")]
impl From<bincode::Error> for HexError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for HexError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

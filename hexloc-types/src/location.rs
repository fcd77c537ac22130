use crate::point::GeoPoint;
use serde::{Deserialize, Serialize};

/// Structured address parts returned by a geocoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

/// An immutable, geocoded point of interest.
///
/// Locations are the input of every analytics operation. The engine never
/// mutates them; results hand back clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Opaque identity
    pub id: String,
    /// Provider-specific place identifier, if any
    #[serde(default)]
    pub place_id: Option<String>,
    /// Formatted address string
    pub address: String,
    pub coordinates: GeoPoint,
    #[serde(default)]
    pub components: AddressComponents,
}

impl Location {
    pub fn new(id: impl Into<String>, address: impl Into<String>, coordinates: GeoPoint) -> Self {
        Self {
            id: id.into(),
            place_id: None,
            address: address.into(),
            coordinates,
            components: AddressComponents::default(),
        }
    }

    pub fn with_place_id(mut self, place_id: impl Into<String>) -> Self {
        self.place_id = Some(place_id.into());
        self
    }

    pub fn with_components(mut self, components: AddressComponents) -> Self {
        self.components = components;
        self
    }
}

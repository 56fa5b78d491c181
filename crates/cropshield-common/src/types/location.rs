//! Registered geographic locations

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Operator-assigned location identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub u64);

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable geographic record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    /// Degrees north, -90..=90
    pub latitude: Decimal,
    /// Degrees east, -180..=180
    pub longitude: Decimal,
}

impl Location {
    /// Build a location, rejecting coordinates off the globe
    pub fn new(id: LocationId, latitude: Decimal, longitude: Decimal) -> Result<Self, RegistryError> {
        let lat_ok = latitude >= Decimal::from(-90) && latitude <= Decimal::from(90);
        let lon_ok = longitude >= Decimal::from(-180) && longitude <= Decimal::from(180);
        if !lat_ok || !lon_ok {
            return Err(RegistryError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            id,
            latitude,
            longitude,
        })
    }
}

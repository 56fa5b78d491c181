//! Location registry
//!
//! Immutable geographic records keyed by location id. A duplicate
//! registration is rejected and never overwrites the stored record.

use std::collections::BTreeMap;

use cropshield_common::{Location, LocationId, RegistryError};

#[derive(Debug, Default, Clone)]
pub struct LocationRegistry {
    locations: BTreeMap<LocationId, Location>,
}

impl LocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, location: Location) -> Result<(), RegistryError> {
        if self.locations.contains_key(&location.id) {
            return Err(RegistryError::AlreadyExists(location.id));
        }
        self.locations.insert(location.id, location);
        Ok(())
    }

    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn contains(&self, id: LocationId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Fails with `UnknownLocation` if `id` was never registered
    pub fn ensure_exists(&self, id: LocationId) -> Result<(), RegistryError> {
        if !self.contains(id) {
            return Err(RegistryError::UnknownLocation(id));
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.locations.len()
    }
}

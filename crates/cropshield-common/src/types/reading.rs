//! Weather readings injected by the oracle

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{condition::ConditionKind, location::LocationId};

/// Single observation for a (location, condition) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub location_id: LocationId,
    pub condition: ConditionKind,
    pub value: Decimal,
    /// Unix milliseconds, as reported by the oracle
    pub timestamp: i64,
    /// Unix milliseconds from the engine clock when the reading was stored
    pub received_at: i64,
}

impl WeatherReading {
    pub fn new(
        location_id: LocationId,
        condition: ConditionKind,
        value: Decimal,
        timestamp: i64,
        received_at: i64,
    ) -> Self {
        Self {
            location_id,
            condition,
            value,
            timestamp,
            received_at,
        }
    }

    /// Key under which the feed keeps the latest reading
    pub fn key(&self) -> (LocationId, ConditionKind) {
        (self.location_id, self.condition)
    }
}

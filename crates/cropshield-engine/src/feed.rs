//! Weather oracle feed
//!
//! Keeps only the most recent reading per (location, condition).
//! Last write wins; no history is retained here.

use std::collections::HashMap;

use cropshield_common::{ConditionKind, LocationId, WeatherReading};

#[derive(Debug, Default, Clone)]
pub struct WeatherFeed {
    latest: HashMap<(LocationId, ConditionKind), WeatherReading>,
}

impl WeatherFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `reading`, returning the one it replaced
    pub fn record(&mut self, reading: WeatherReading) -> Option<WeatherReading> {
        self.latest.insert(reading.key(), reading)
    }

    pub fn latest(&self, location_id: LocationId, condition: ConditionKind) -> Option<&WeatherReading> {
        self.latest.get(&(location_id, condition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_last_write_wins() {
        let mut feed = WeatherFeed::new();
        let first = WeatherReading::new(LocationId(1), ConditionKind::ExcessRain, dec!(85), 10, 10);
        let second = WeatherReading::new(LocationId(1), ConditionKind::ExcessRain, dec!(60), 20, 20);

        assert!(feed.record(first.clone()).is_none());
        assert_eq!(feed.record(second.clone()), Some(first));
        assert_eq!(
            feed.latest(LocationId(1), ConditionKind::ExcessRain),
            Some(&second)
        );
    }

    #[test]
    fn test_conditions_are_independent() {
        let mut feed = WeatherFeed::new();
        feed.record(WeatherReading::new(LocationId(1), ConditionKind::Frost, dec!(-2), 1, 1));
        assert!(feed.latest(LocationId(1), ConditionKind::Drought).is_none());
        assert!(feed.latest(LocationId(2), ConditionKind::Frost).is_none());
    }
}

//! Insured weather conditions
//!
//! Each condition fixes the direction in which an observed value must
//! cross a policy's threshold to trigger it. Equality never triggers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of the threshold comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Triggers when `observed > threshold`
    Above,
    /// Triggers when `observed < threshold`
    Below,
}

impl Comparison {
    #[inline]
    pub fn is_satisfied(self, observed: Decimal, threshold: Decimal) -> bool {
        match self {
            Comparison::Above => observed > threshold,
            Comparison::Below => observed < threshold,
        }
    }
}

/// Weather condition a policy insures against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    ExcessRain,
    Drought,
    Frost,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 3] = [
        ConditionKind::ExcessRain,
        ConditionKind::Drought,
        ConditionKind::Frost,
    ];

    pub fn comparison(self) -> Comparison {
        match self {
            ConditionKind::ExcessRain => Comparison::Above,
            ConditionKind::Drought | ConditionKind::Frost => Comparison::Below,
        }
    }

    /// Whether `observed` triggers a policy with this condition and `threshold`
    pub fn is_triggered(self, observed: Decimal, threshold: Decimal) -> bool {
        self.comparison().is_satisfied(observed, threshold)
    }

    /// Wire code used by the interaction tooling (0 = ExcessRain, 1 = Drought, 2 = Frost)
    pub fn code(self) -> u8 {
        match self {
            ConditionKind::ExcessRain => 0,
            ConditionKind::Drought => 1,
            ConditionKind::Frost => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ConditionKind::ExcessRain),
            1 => Some(ConditionKind::Drought),
            2 => Some(ConditionKind::Frost),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionKind::ExcessRain => write!(f, "excess_rain"),
            ConditionKind::Drought => write!(f, "drought"),
            ConditionKind::Frost => write!(f, "frost"),
        }
    }
}

use crate::ingredient::ComponentKind;
use serde::{Deserialize, Serialize};

/// Server-wide limits applied when properties are validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Highest item rate a binding may be configured with.
    pub item_rate_limit: i64,
    /// Highest fluid rate, in millibuckets per tick.
    pub fluid_rate_limit: i64,
    /// Highest energy rate per tick.
    pub energy_rate_limit: i64,
}

impl GeneralConfig {
    pub fn rate_limit(&self, kind: ComponentKind) -> i64 {
        match kind {
            ComponentKind::Item => self.item_rate_limit,
            ComponentKind::Fluid => self.fluid_rate_limit,
            ComponentKind::Energy => self.energy_rate_limit,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            item_rate_limit: i32::MAX as i64,
            fluid_rate_limit: i32::MAX as i64,
            energy_rate_limit: i32::MAX as i64,
        }
    }
}

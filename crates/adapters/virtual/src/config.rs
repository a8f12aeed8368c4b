//! Simulation settings for the virtual world.

use serde::Deserialize;

/// Starting conditions and odds of the simulated world.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Name of the NPC to pickpocket. Empty blocks the catalog.
    pub target: String,
    /// Name of the food item. Empty blocks the catalog.
    pub food: String,
    /// Food items in the inventory at start.
    pub food_count: u32,
    pub max_hp: u32,
    /// Eat as soon as hitpoints drop below this.
    pub eat_below_hp: u32,
    /// Open coin pouches once this many are held.
    pub max_pouches: u32,
    /// Chance of a successful pickpocket, in percent.
    pub success_percent: u32,
    /// Fix the world's dice for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            target: "Man".to_string(),
            food: "Bread".to_string(),
            food_count: 10,
            max_hp: 10,
            eat_below_hp: 5,
            max_pouches: 28,
            success_percent: 80,
            seed: None,
        }
    }
}

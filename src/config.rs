use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::PitwallError;

const CONFIG_FILE_NAME: &str = "config.json";

/// Seconds of lap time gained per lap of fuel burned off.
pub const DEFAULT_FUEL_EFFECT_PER_LAP: f64 = 0.055;
/// Pit lane transit plus stationary time for circuits not in the table.
pub const DEFAULT_PIT_LOSS_S: f64 = 22.0;

/// Tuning knobs for the race analysis engine.
///
/// Every bound that shapes the search (fit sample minimum, stop-count range,
/// stint discretization, candidate cap, the two-dry-compound rule) is a
/// configuration value rather than a hidden constant, so it can be adjusted
/// per season without touching the engine.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EngineConfig {
    /// Lap time reduction per lap of fuel burned, in seconds
    pub fuel_effect_per_lap: f64,
    /// Circuit-specific pit loss overrides, keyed by race/circuit name
    pub pit_loss_s: HashMap<String, f64>,
    /// Pit loss for circuits missing from the table
    pub default_pit_loss_s: f64,
    /// Minimum samples per compound before a curve is fitted
    pub min_fit_samples: usize,
    /// Minimum stint length in laps
    pub min_stint_laps: u32,
    /// Fewest pit stops to enumerate
    pub min_stops: u32,
    /// Most pit stops to enumerate
    pub max_stops: u32,
    /// Initial stint-length discretization step, in laps
    pub stint_step_laps: u32,
    /// Candidate cap; the enumerator coarsens the step until it fits
    pub max_candidates: usize,
    /// Require two distinct dry compounds in a dry race
    pub require_two_dry_compounds: bool,
    /// How many ranked strategies the response exposes
    pub displayed_strategies: usize,
    /// Wall-clock budget for a single analysis request
    pub analysis_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let pit_loss_s = HashMap::from([
            ("Monza".to_string(), 22.5),
            ("Monaco".to_string(), 24.0),
            ("Spa".to_string(), 21.0),
            ("Bahrain".to_string(), 22.0),
            ("Silverstone".to_string(), 21.5),
        ]);
        Self {
            fuel_effect_per_lap: DEFAULT_FUEL_EFFECT_PER_LAP,
            pit_loss_s,
            default_pit_loss_s: DEFAULT_PIT_LOSS_S,
            min_fit_samples: 5,
            min_stint_laps: 5,
            min_stops: 1,
            max_stops: 3,
            stint_step_laps: 1,
            max_candidates: 2000,
            require_two_dry_compounds: true,
            displayed_strategies: 5,
            analysis_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join("pitwall").join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let file = std::fs::File::open(config_path).expect("Could not open config file");
            Some(serde_json::from_reader(file).expect("Could not parse config file"))
        } else {
            None
        }
    }

    pub fn save(&self) -> Result<(), PitwallError> {
        let config_path = dirs::config_dir()
            .ok_or(PitwallError::NoConfigDir)?
            .join("pitwall")
            .join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            std::fs::create_dir_all(config_path.parent().unwrap())
                .map_err(|e| PitwallError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PitwallError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| PitwallError::ConfigSerializeError { source: e })
    }

    /// Pit loss for a circuit, falling back to the default when the table
    /// has no entry.
    pub fn pit_loss_for(&self, race: &str) -> f64 {
        self.pit_loss_s
            .get(race)
            .copied()
            .unwrap_or(self.default_pit_loss_s)
    }
}

mod enumerator;
mod ranker;
mod simulator;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use enumerator::{EnumerationRules, enumerate};
pub use ranker::{RankedStrategies, rank};
pub use simulator::{simulate, simulate_all};

use crate::laps::Compound;

/// A single pit stop within a strategy. `lap` is the first lap run on the
/// new tyre set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PitStop {
    pub lap: u32,
    pub compound_before: Compound,
    pub compound_after: Compound,
}

/// A contiguous run of laps on one tyre set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stint {
    pub compound: Compound,
    pub start_lap: u32,
    pub end_lap: u32,
    pub laps: u32,
}

/// A fully simulated strategy. Stints are contiguous, non-overlapping, and
/// sum to the race distance; `pit_stops.len() == stints.len() - 1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Strategy {
    pub strategy_name: String,
    pub stops: usize,
    pub pit_stops: Vec<PitStop>,
    pub stints: Vec<Stint>,
    pub predicted_time: f64,
    pub time_delta: f64,
}

/// An enumerated candidate before simulation: just the compound and length
/// of each stint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrategySkeleton {
    pub compounds: Vec<Compound>,
    pub stint_laps: Vec<u32>,
}

impl StrategySkeleton {
    pub fn stops(&self) -> usize {
        self.compounds.len() - 1
    }

    /// Display name in the `"SOFT-MEDIUM (1-stop)"` convention.
    pub fn name(&self) -> String {
        format!(
            "{} ({}-stop)",
            self.compounds.iter().map(Compound::to_string).join("-"),
            self.stops()
        )
    }
}

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::degradation::{self, CurveSet, DegradationCurve};
use crate::errors::PitwallError;
use crate::laps::{self, RawLap};
use crate::strategy::{self, EnumerationRules, Strategy};

/// Identifies the session to analyze. Passed explicitly on every call;
/// the engine holds no current-race state between requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub year: u16,
    pub race: String,
    /// Session type: "R", "Q", "FP1", "FP2", "FP3", "S"
    pub session: String,
}

impl AnalysisRequest {
    pub fn new(year: u16, race: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            year,
            race: race.into(),
            session: session.into(),
        }
    }

    /// Shorthand for the race session.
    pub fn race_session(year: u16, race: impl Into<String>) -> Self {
        Self::new(year, race, "R")
    }
}

/// Degradation curves for the presentation layer. Field names are the wire
/// contract; renaming or reordering is a breaking change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DegradationResponse {
    pub race_name: String,
    pub year: u16,
    pub curves: Vec<DegradationCurve>,
    pub fuel_effect_per_lap: f64,
}

/// Ranked strategies for the presentation layer. Same wire-contract rules
/// as [`DegradationResponse`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrategyResponse {
    pub race_name: String,
    pub year: u16,
    pub total_laps: u32,
    pub pit_loss_seconds: f64,
    pub strategies: Vec<Strategy>,
    pub fastest_strategy: String,
}

/// Optional overrides for a strategy request. Missing values fall back to
/// lap-set detection (total laps) and the circuit table (pit loss).
#[derive(Clone, Debug, Default)]
pub struct StrategyOptions {
    pub total_laps: Option<u32>,
    pub pit_loss_seconds: Option<f64>,
}

/// The race analysis engine: a pure function of its inputs plus the
/// configured circuit constants. Construct once and share freely; every
/// request gets fresh value objects and identical inputs produce identical
/// outputs.
pub struct RaceAnalysisEngine {
    config: EngineConfig,
}

impl RaceAnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fit per-compound degradation curves for a session.
    pub fn degradation(
        &self,
        request: &AnalysisRequest,
        raw_laps: &[RawLap],
    ) -> Result<DegradationResponse, PitwallError> {
        let normalized = laps::normalize(raw_laps);
        if normalized.samples.is_empty() {
            return Err(PitwallError::NoValidLaps {
                race: request.race.clone(),
            });
        }

        let curves = degradation::fit_all(&normalized.samples, &self.config);
        if curves.is_empty() {
            return Err(PitwallError::InsufficientData {
                race: request.race.clone(),
            });
        }

        Ok(DegradationResponse {
            race_name: request.race.clone(),
            year: request.year,
            curves,
            fuel_effect_per_lap: self.config.fuel_effect_per_lap,
        })
    }

    /// Enumerate, simulate, and rank pit strategies for a session.
    pub fn strategy(
        &self,
        request: &AnalysisRequest,
        raw_laps: &[RawLap],
        options: &StrategyOptions,
    ) -> Result<StrategyResponse, PitwallError> {
        let normalized = laps::normalize(raw_laps);
        if normalized.samples.is_empty() {
            return Err(PitwallError::NoValidLaps {
                race: request.race.clone(),
            });
        }

        let total_laps = options.total_laps.unwrap_or(normalized.total_laps);
        if total_laps == 0 {
            return Err(PitwallError::NoValidLaps {
                race: request.race.clone(),
            });
        }
        let pit_loss_seconds = options
            .pit_loss_seconds
            .unwrap_or_else(|| self.config.pit_loss_for(&request.race));

        let curves = CurveSet::new(degradation::fit_all(&normalized.samples, &self.config));
        if curves.is_empty() {
            return Err(PitwallError::InsufficientData {
                race: request.race.clone(),
            });
        }

        let candidates = strategy::enumerate(
            total_laps,
            &curves.compounds(),
            &EnumerationRules::from(&self.config),
        );
        log::debug!(
            "{} candidate strategies for {} laps at {}",
            candidates.len(),
            total_laps,
            request.race
        );

        let simulated = strategy::simulate_all(
            &candidates,
            &curves,
            total_laps,
            self.config.fuel_effect_per_lap,
            pit_loss_seconds,
        );

        let ranked = strategy::rank(simulated, self.config.displayed_strategies)
            .ok_or(PitwallError::NoFeasibleStrategy)?;

        Ok(StrategyResponse {
            race_name: request.race.clone(),
            year: request.year,
            total_laps,
            pit_loss_seconds,
            strategies: ranked.strategies,
            fastest_strategy: ranked.fastest_strategy,
        })
    }

    /// Run the degradation analysis on a worker thread and surface
    /// [`PitwallError::AnalysisTimeout`] when the budget elapses, so the
    /// caller never observes partial state.
    pub fn degradation_with_timeout(
        &self,
        request: &AnalysisRequest,
        raw_laps: &[RawLap],
        timeout: Duration,
    ) -> Result<DegradationResponse, PitwallError> {
        let engine = RaceAnalysisEngine::new(self.config.clone());
        let request = request.clone();
        let raw_laps = raw_laps.to_vec();
        run_with_timeout(timeout, move || engine.degradation(&request, &raw_laps))
    }

    /// Timeout-wrapped variant of [`RaceAnalysisEngine::strategy`].
    pub fn strategy_with_timeout(
        &self,
        request: &AnalysisRequest,
        raw_laps: &[RawLap],
        options: &StrategyOptions,
        timeout: Duration,
    ) -> Result<StrategyResponse, PitwallError> {
        let engine = RaceAnalysisEngine::new(self.config.clone());
        let request = request.clone();
        let raw_laps = raw_laps.to_vec();
        let options = options.clone();
        run_with_timeout(timeout, move || {
            engine.strategy(&request, &raw_laps, &options)
        })
    }
}

fn run_with_timeout<T: Send + 'static>(
    timeout: Duration,
    analysis: impl FnOnce() -> Result<T, PitwallError> + Send + 'static,
) -> Result<T, PitwallError> {
    let (result_tx, result_rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = result_tx.send(analysis());
    });

    result_rx
        .recv_timeout(timeout)
        .map_err(|_| PitwallError::AnalysisTimeout)?
}

// Library interface for pitwall
// This allows integration tests to access internal modules

pub mod config;
pub mod degradation;
pub mod engine;
pub mod errors;
pub mod laps;
pub mod loader;
pub mod strategy;

// Re-export commonly used types
pub use config::EngineConfig;
pub use degradation::{CurveSet, DegradationCurve};
pub use engine::{
    AnalysisRequest, DegradationResponse, RaceAnalysisEngine, StrategyOptions, StrategyResponse,
};
pub use errors::PitwallError;
pub use laps::{Compound, LapSample, NormalizedLaps, RawLap};
pub use strategy::{PitStop, Stint, Strategy};

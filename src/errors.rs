// Error types for pitwall

use crate::laps::Compound;
use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum PitwallError {
    // Fatal analysis errors, surfaced to the caller
    #[snafu(display("No usable laps in session: {race}"))]
    NoValidLaps { race: String },
    #[snafu(display("Not enough samples to fit a degradation curve for any compound: {race}"))]
    InsufficientData { race: String },
    #[snafu(display("No strategy candidate survived simulation"))]
    NoFeasibleStrategy,
    #[snafu(display("Race analysis did not complete within the configured timeout"))]
    AnalysisTimeout,

    // Per-candidate simulation errors, absorbed by the ranker
    #[snafu(display("No degradation curve fitted for compound {compound}"))]
    UnmodeledCompound { compound: Compound },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Lap file loader errors
    #[snafu(display("Invalid lap file: {path}"))]
    InvalidLapFile { path: String },
    #[snafu(display("Error loading lap file"))]
    LapLoaderError { source: io::Error },
}

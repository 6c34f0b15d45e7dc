use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use pitwall::{
    AnalysisRequest, EngineConfig, PitwallError, RaceAnalysisEngine, StrategyOptions, loader,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit tyre degradation curves from a recorded session
    Degradation {
        /// JSON-lines lap recording
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        year: u16,

        #[arg(short, long)]
        race: String,

        #[arg(short, long, default_value = "R")]
        session: String,

        /// Print the raw response contract instead of a report
        #[arg(long)]
        json: bool,
    },
    /// Enumerate, simulate, and rank pit strategies
    Strategy {
        /// JSON-lines lap recording
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        year: u16,

        #[arg(short, long)]
        race: String,

        #[arg(short, long, default_value = "R")]
        session: String,

        /// Override the detected race distance
        #[arg(long)]
        total_laps: Option<u32>,

        /// Override the circuit pit loss in seconds
        #[arg(long)]
        pit_loss: Option<f64>,

        /// Print the raw response contract instead of a report
        #[arg(long)]
        json: bool,
    },
}

fn degradation(
    engine: &RaceAnalysisEngine,
    input: &PathBuf,
    request: &AnalysisRequest,
    json: bool,
) -> Result<(), PitwallError> {
    let raw_laps = loader::load_laps(input)?;
    let timeout = Duration::from_millis(engine.config().analysis_timeout_ms);
    let response = engine.degradation_with_timeout(request, &raw_laps, timeout)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).expect("response serialization failed")
        );
        return Ok(());
    }

    println!(
        "Degradation — {} {} ({})",
        response.race_name, response.year, request.session
    );
    println!("Fuel effect: {:.3} s/lap", response.fuel_effect_per_lap);
    for curve in &response.curves {
        let [a, b, c] = curve.coefficients;
        println!(
            "  {:<12} deg/lap {:+.3}s  r² {:.3}  ({} samples)  [a={:+.5}, b={:+.4}, c={:.3}]",
            curve.compound.to_string(),
            curve.deg_per_lap,
            curve.r_squared,
            curve.sample_size,
            a,
            b,
            c
        );
    }
    Ok(())
}

fn strategy(
    engine: &RaceAnalysisEngine,
    input: &PathBuf,
    request: &AnalysisRequest,
    options: &StrategyOptions,
    json: bool,
) -> Result<(), PitwallError> {
    let raw_laps = loader::load_laps(input)?;
    let timeout = Duration::from_millis(engine.config().analysis_timeout_ms);
    let response = engine.strategy_with_timeout(request, &raw_laps, options, timeout)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).expect("response serialization failed")
        );
        return Ok(());
    }

    println!(
        "Strategies — {} {} ({}), {} laps, pit loss {:.1}s",
        response.race_name,
        response.year,
        request.session,
        response.total_laps,
        response.pit_loss_seconds
    );
    for (position, strategy) in response.strategies.iter().enumerate() {
        println!(
            "  {}. {:<28} {:>9.2}s  +{:.2}s",
            position + 1,
            strategy.strategy_name,
            strategy.predicted_time,
            strategy.time_delta
        );
        for stop in &strategy.pit_stops {
            println!(
                "       lap {:>2}: {} -> {}",
                stop.lap, stop.compound_before, stop.compound_after
            );
        }
    }
    println!("Fastest: {}", response.fastest_strategy);
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let config = EngineConfig::from_local_file().unwrap_or_default();
    let engine = RaceAnalysisEngine::new(config);

    match &cli.command {
        Commands::Degradation {
            input,
            year,
            race,
            session,
            json,
        } => {
            let request = AnalysisRequest::new(*year, race.clone(), session.clone());
            degradation(&engine, input, &request, *json)
                .expect("Error while analyzing degradation");
        }
        Commands::Strategy {
            input,
            year,
            race,
            session,
            total_laps,
            pit_loss,
            json,
        } => {
            let request = AnalysisRequest::new(*year, race.clone(), session.clone());
            let options = StrategyOptions {
                total_laps: *total_laps,
                pit_loss_seconds: *pit_loss,
            };
            strategy(&engine, input, &request, &options, *json)
                .expect("Error while simulating strategies");
        }
    };
}

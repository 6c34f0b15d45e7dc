use std::thread;

use crate::degradation::CurveSet;
use crate::errors::PitwallError;

use super::{PitStop, Stint, Strategy, StrategySkeleton};

/// Simulate one candidate lap by lap.
///
/// Each lap costs the compound curve evaluated at the tyre life within the
/// stint, plus the fuel term `fuel_effect_per_lap * laps_remaining` so the
/// heavy early laps are slower. Pit loss is charged once per stop. A stint
/// on a compound with no fitted curve fails the candidate with
/// [`PitwallError::UnmodeledCompound`]; no default curve is substituted.
pub fn simulate(
    skeleton: &StrategySkeleton,
    curves: &CurveSet,
    total_laps: u32,
    fuel_effect_per_lap: f64,
    pit_loss_seconds: f64,
) -> Result<Strategy, PitwallError> {
    debug_assert_eq!(skeleton.stint_laps.iter().sum::<u32>(), total_laps);

    let mut predicted_time = 0.0;
    let mut current_lap: u32 = 1;
    let mut pit_stops = Vec::with_capacity(skeleton.stops());
    let mut stints = Vec::with_capacity(skeleton.compounds.len());

    for (stint_idx, (&compound, &stint_laps)) in skeleton
        .compounds
        .iter()
        .zip(skeleton.stint_laps.iter())
        .enumerate()
    {
        let curve = curves
            .get(compound)
            .ok_or(PitwallError::UnmodeledCompound { compound })?;

        if stint_idx > 0 {
            predicted_time += pit_loss_seconds;
            pit_stops.push(PitStop {
                lap: current_lap,
                compound_before: skeleton.compounds[stint_idx - 1],
                compound_after: compound,
            });
        }

        let start_lap = current_lap;
        for tyre_life in 1..=stint_laps {
            let laps_remaining = total_laps - current_lap;
            predicted_time +=
                curve.lap_time_at(tyre_life) + fuel_effect_per_lap * laps_remaining as f64;
            current_lap += 1;
        }

        stints.push(Stint {
            compound,
            start_lap,
            end_lap: current_lap - 1,
            laps: stint_laps,
        });
    }

    Ok(Strategy {
        strategy_name: skeleton.name(),
        stops: skeleton.stops(),
        pit_stops,
        stints,
        predicted_time,
        time_delta: 0.0,
    })
}

/// Simulate every candidate, fanning out over worker threads.
///
/// Candidates are embarrassingly parallel: each simulation reads only the
/// shared immutable curves. Results are joined in chunk order so the output
/// sequence matches the input sequence regardless of scheduling. Candidates
/// that reference an unmodeled compound are dropped here.
pub fn simulate_all(
    skeletons: &[StrategySkeleton],
    curves: &CurveSet,
    total_laps: u32,
    fuel_effect_per_lap: f64,
    pit_loss_seconds: f64,
) -> Vec<Strategy> {
    let workers = thread::available_parallelism().map(usize::from).unwrap_or(1);
    let chunk_size = skeletons.len().div_ceil(workers).max(1);

    let results: Vec<Result<Strategy, PitwallError>> = thread::scope(|scope| {
        let handles: Vec<_> = skeletons
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|skeleton| {
                            simulate(
                                skeleton,
                                curves,
                                total_laps,
                                fuel_effect_per_lap,
                                pit_loss_seconds,
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("simulation worker panicked"))
            .collect()
    });

    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(strategy) => Some(strategy),
            Err(e) => {
                log::debug!("candidate dropped: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::degradation::DegradationCurve;
    use crate::laps::Compound;

    fn linear_curve(compound: Compound, base: f64, per_lap: f64) -> DegradationCurve {
        DegradationCurve {
            compound,
            coefficients: [0.0, per_lap, base],
            deg_per_lap: per_lap,
            r_squared: 1.0,
            sample_size: 20,
        }
    }

    fn curves() -> CurveSet {
        CurveSet::new(vec![
            linear_curve(Compound::Soft, 90.0, 0.1),
            linear_curve(Compound::Medium, 91.0, 0.05),
        ])
    }

    fn skeleton(compounds: Vec<Compound>, stint_laps: Vec<u32>) -> StrategySkeleton {
        StrategySkeleton {
            compounds,
            stint_laps,
        }
    }

    #[test]
    fn test_predicted_time_matches_hand_computation() {
        let skeleton = skeleton(vec![Compound::Soft, Compound::Medium], vec![5, 5]);
        let strategy = simulate(&skeleton, &curves(), 10, 0.0, 20.0).unwrap();

        // SOFT lives 1..=5: 90.1 + 90.2 + 90.3 + 90.4 + 90.5 = 451.5
        // MEDIUM lives 1..=5: 91.05 + 91.10 + ... + 91.25 = 455.75
        let expected = 451.5 + 455.75 + 20.0;
        assert!((strategy.predicted_time - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fuel_term_charges_heavy_early_laps() {
        let skeleton = skeleton(vec![Compound::Soft, Compound::Medium], vec![5, 5]);
        let dry = simulate(&skeleton, &curves(), 10, 0.0, 20.0).unwrap();
        let fueled = simulate(&skeleton, &curves(), 10, 0.055, 20.0).unwrap();

        // laps_remaining over the race: 9 + 8 + ... + 0 = 45
        let expected_fuel = 0.055 * 45.0;
        assert!((fueled.predicted_time - dry.predicted_time - expected_fuel).abs() < 1e-9);
    }

    #[test]
    fn test_stint_and_pit_bookkeeping() {
        let skeleton = skeleton(
            vec![Compound::Soft, Compound::Medium, Compound::Soft],
            vec![4, 3, 3],
        );
        let strategy = simulate(&skeleton, &curves(), 10, 0.0, 22.0).unwrap();

        assert_eq!(strategy.stops, 2);
        assert_eq!(strategy.pit_stops.len(), strategy.stints.len() - 1);

        assert_eq!(strategy.stints[0].start_lap, 1);
        assert_eq!(strategy.stints[0].end_lap, 4);
        assert_eq!(strategy.stints[1].start_lap, 5);
        assert_eq!(strategy.stints[1].end_lap, 7);
        assert_eq!(strategy.stints[2].start_lap, 8);
        assert_eq!(strategy.stints[2].end_lap, 10);

        assert_eq!(strategy.pit_stops[0].lap, 5);
        assert_eq!(strategy.pit_stops[0].compound_before, Compound::Soft);
        assert_eq!(strategy.pit_stops[0].compound_after, Compound::Medium);
        assert_eq!(strategy.pit_stops[1].lap, 8);
    }

    #[test]
    fn test_unmodeled_compound_fails_candidate() {
        let skeleton = skeleton(vec![Compound::Soft, Compound::Hard], vec![5, 5]);
        let result = simulate(&skeleton, &curves(), 10, 0.0, 20.0);
        assert!(matches!(
            result,
            Err(PitwallError::UnmodeledCompound {
                compound: Compound::Hard
            })
        ));
    }

    #[test]
    fn test_simulate_all_drops_unmodeled_and_keeps_order() {
        let skeletons = vec![
            skeleton(vec![Compound::Soft, Compound::Medium], vec![5, 5]),
            skeleton(vec![Compound::Soft, Compound::Hard], vec![5, 5]),
            skeleton(vec![Compound::Medium, Compound::Soft], vec![6, 4]),
        ];
        let strategies = simulate_all(&skeletons, &curves(), 10, 0.0, 20.0);

        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].strategy_name, "SOFT-MEDIUM (1-stop)");
        assert_eq!(strategies[1].strategy_name, "MEDIUM-SOFT (1-stop)");
    }
}

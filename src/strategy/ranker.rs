use super::Strategy;

/// Ranked, delta-annotated strategies for a request. `fastest_strategy`
/// always names the global minimum, even when the exposed list is capped.
#[derive(Clone, Debug)]
pub struct RankedStrategies {
    pub strategies: Vec<Strategy>,
    pub fastest_strategy: String,
}

/// Order simulated strategies by predicted time, breaking ties on fewer
/// stops and then on name so the ranking is fully deterministic. Deltas
/// are computed against the head entry; the list is then truncated to the
/// display cap. Returns None when no candidate survived simulation.
pub fn rank(mut strategies: Vec<Strategy>, display_cap: usize) -> Option<RankedStrategies> {
    if strategies.is_empty() {
        return None;
    }

    strategies.sort_by(|a, b| {
        a.predicted_time
            .total_cmp(&b.predicted_time)
            .then_with(|| a.stops.cmp(&b.stops))
            .then_with(|| a.strategy_name.cmp(&b.strategy_name))
    });

    let fastest_time = strategies[0].predicted_time;
    for strategy in &mut strategies {
        strategy.time_delta = strategy.predicted_time - fastest_time;
    }

    // the head entry is the global minimum; truncation never drops it
    strategies.truncate(display_cap.max(1));

    let fastest_strategy = strategies[0].strategy_name.clone();
    Some(RankedStrategies {
        strategies,
        fastest_strategy,
    })
}

use std::collections::HashSet;

use itertools::Itertools;

use crate::config::EngineConfig;
use crate::laps::Compound;

use super::StrategySkeleton;

/// Bounds and regulatory rules for strategy enumeration. All values come
/// from [`EngineConfig`]; nothing here is a hidden constant.
#[derive(Clone, Debug)]
pub struct EnumerationRules {
    pub min_stops: u32,
    pub max_stops: u32,
    pub min_stint_laps: u32,
    pub stint_step_laps: u32,
    pub max_candidates: usize,
    pub require_two_dry_compounds: bool,
}

impl From<&EngineConfig> for EnumerationRules {
    fn from(config: &EngineConfig) -> Self {
        Self {
            min_stops: config.min_stops,
            max_stops: config.max_stops,
            min_stint_laps: config.min_stint_laps,
            stint_step_laps: config.stint_step_laps,
            max_candidates: config.max_candidates,
            require_two_dry_compounds: config.require_two_dry_compounds,
        }
    }
}

/// Generate the legal strategy skeletons for a race.
///
/// Stop counts in `[min_stops, max_stops]`, stint-length partitions on a
/// discretization step, and every compound assignment drawn from
/// `available_compounds`. Consecutive stints may repeat a compound (that
/// models a fresh set of the same rubber). When the candidate count
/// exceeds the cap, the stint step is doubled and, once the step is
/// saturated, the stop range is tightened from the top rather than
/// truncating the candidate list.
pub fn enumerate(
    total_laps: u32,
    available_compounds: &[Compound],
    rules: &EnumerationRules,
) -> Vec<StrategySkeleton> {
    if total_laps == 0 || available_compounds.is_empty() {
        return Vec::new();
    }

    let mut step = rules.stint_step_laps.max(1);
    let mut max_stops = rules.max_stops.max(rules.min_stops);
    loop {
        let candidates =
            enumerate_bounded(total_laps, available_compounds, rules, step, max_stops);
        if candidates.len() <= rules.max_candidates {
            return candidates;
        }
        if step < total_laps {
            step = step.saturating_mul(2);
            log::debug!(
                "candidate cap {} exceeded, coarsening stint step to {} laps",
                rules.max_candidates,
                step
            );
        } else if max_stops > rules.min_stops {
            max_stops -= 1;
            log::debug!(
                "stint step saturated, tightening stop range to {}..={}",
                rules.min_stops,
                max_stops
            );
        } else {
            log::warn!(
                "candidate cap {} unreachable at minimal bounds, keeping {} candidates",
                rules.max_candidates,
                candidates.len()
            );
            return candidates;
        }
    }
}

fn enumerate_bounded(
    total_laps: u32,
    available_compounds: &[Compound],
    rules: &EnumerationRules,
    step: u32,
    max_stops: u32,
) -> Vec<StrategySkeleton> {
    let mut seen: HashSet<StrategySkeleton> = HashSet::new();
    let mut candidates = Vec::new();

    for stops in rules.min_stops..=max_stops {
        let stint_count = stops + 1;
        if total_laps < rules.min_stint_laps.saturating_mul(stint_count) {
            continue;
        }

        let splits = partitions(total_laps, stint_count, rules.min_stint_laps, step);
        let assignments = (0..stint_count)
            .map(|_| available_compounds.iter().copied())
            .multi_cartesian_product();

        for compounds in assignments {
            if !satisfies_compound_rule(&compounds, rules) {
                continue;
            }
            for stint_laps in &splits {
                let skeleton = StrategySkeleton {
                    compounds: compounds.clone(),
                    stint_laps: stint_laps.clone(),
                };
                if seen.insert(skeleton.clone()) {
                    candidates.push(skeleton);
                }
                // anything past the cap is discarded by the caller
                if candidates.len() > rules.max_candidates {
                    return candidates;
                }
            }
        }
    }

    candidates
}

/// Dry races must use at least two distinct dry compounds; any wet-weather
/// stint exempts the whole strategy from the rule.
fn satisfies_compound_rule(compounds: &[Compound], rules: &EnumerationRules) -> bool {
    if !rules.require_two_dry_compounds {
        return true;
    }
    if compounds.iter().any(|c| !c.is_dry()) {
        return true;
    }
    compounds.iter().unique().count() >= 2
}

/// All ways to split `total` laps into `parts` contiguous stints of at
/// least `min_len` laps, stepping every length but the last by `step`
/// (the last stint absorbs the remainder).
fn partitions(total: u32, parts: u32, min_len: u32, step: u32) -> Vec<Vec<u32>> {
    let mut splits = Vec::new();
    let mut current = Vec::with_capacity(parts as usize);
    fill_partition(total, parts, min_len, step, &mut current, &mut splits);
    splits
}

fn fill_partition(
    remaining: u32,
    parts: u32,
    min_len: u32,
    step: u32,
    current: &mut Vec<u32>,
    splits: &mut Vec<Vec<u32>>,
) {
    if parts == 1 {
        if remaining >= min_len {
            current.push(remaining);
            splits.push(current.clone());
            current.pop();
        }
        return;
    }

    let reserved = min_len * (parts - 1);
    let mut len = min_len;
    while len + reserved <= remaining {
        current.push(len);
        fill_partition(remaining - len, parts - 1, min_len, step, current, splits);
        current.pop();
        len += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DRY: [Compound; 3] = [Compound::Soft, Compound::Medium, Compound::Hard];

    fn rules() -> EnumerationRules {
        EnumerationRules::from(&EngineConfig::default())
    }

    #[test]
    fn test_stint_laps_sum_to_race_distance() {
        let candidates = enumerate(50, &DRY, &rules());
        assert!(!candidates.is_empty());
        for candidate in &candidates {
            let total: u32 = candidate.stint_laps.iter().sum();
            assert_eq!(total, 50, "bad split in {}", candidate.name());
            assert_eq!(candidate.compounds.len(), candidate.stint_laps.len());
        }
    }

    #[test]
    fn test_min_stint_length_respected() {
        let candidates = enumerate(50, &DRY, &rules());
        for candidate in &candidates {
            assert!(candidate.stint_laps.iter().all(|&laps| laps >= 5));
        }
    }

    #[test]
    fn test_includes_one_and_two_stop_strategies() {
        let mut bounded = rules();
        bounded.min_stops = 1;
        bounded.max_stops = 2;
        let candidates = enumerate(50, &DRY, &bounded);
        assert!(candidates.iter().any(|c| c.stops() == 1));
        assert!(candidates.iter().any(|c| c.stops() == 2));
    }

    #[test]
    fn test_single_dry_compound_strategies_rejected() {
        let candidates = enumerate(50, &DRY, &rules());
        assert!(
            candidates
                .iter()
                .all(|c| c.compounds.iter().unique().count() >= 2
                    || c.compounds.iter().any(|comp| !comp.is_dry()))
        );
        // SOFT-SOFT would mean only one dry compound for the whole race
        assert!(
            !candidates
                .iter()
                .any(|c| c.compounds.iter().all(|&comp| comp == Compound::Soft))
        );
    }

    #[test]
    fn test_consecutive_repeats_allowed_with_second_compound() {
        let mut bounded = rules();
        bounded.max_stops = 2;
        let candidates = enumerate(50, &DRY, &bounded);
        // MEDIUM-HARD-HARD: two sets of hards is a legitimate strategy
        assert!(candidates.iter().any(|c| {
            c.compounds == vec![Compound::Medium, Compound::Hard, Compound::Hard]
        }));
    }

    #[test]
    fn test_wet_strategies_exempt_from_dry_rule() {
        let wet_only = [Compound::Intermediate, Compound::Wet];
        let candidates = enumerate(40, &wet_only, &rules());
        assert!(candidates.iter().any(|c| {
            c.compounds
                .iter()
                .all(|&comp| comp == Compound::Intermediate)
        }));
    }

    #[test]
    fn test_rule_flag_disables_two_compound_requirement() {
        let mut relaxed = rules();
        relaxed.require_two_dry_compounds = false;
        let candidates = enumerate(40, &[Compound::Soft, Compound::Medium], &relaxed);
        assert!(
            candidates
                .iter()
                .any(|c| c.compounds.iter().all(|&comp| comp == Compound::Soft))
        );
    }

    #[test]
    fn test_candidate_cap_triggers_coarsening() {
        let mut capped = rules();
        capped.max_candidates = 200;
        let candidates = enumerate(60, &DRY, &capped);
        assert!(candidates.len() <= 200);
        assert!(!candidates.is_empty());
    }

    #[test]
    fn test_short_race_yields_no_multi_stop_candidates() {
        // 12 laps cannot host 4 stints of at least 5 laps
        let candidates = enumerate(12, &DRY, &rules());
        assert!(candidates.iter().all(|c| c.stops() == 1));
    }

    #[test]
    fn test_no_compounds_no_candidates() {
        assert!(enumerate(50, &[], &rules()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_splits_always_sum(total_laps in 15u32..70, max_stops in 1u32..4) {
            let mut bounded = rules();
            bounded.max_stops = max_stops;
            bounded.max_candidates = 500;
            for candidate in enumerate(total_laps, &DRY, &bounded) {
                prop_assert_eq!(candidate.stint_laps.iter().sum::<u32>(), total_laps);
                prop_assert_eq!(candidate.compounds.len() - 1, candidate.stops());
            }
        }
    }
}

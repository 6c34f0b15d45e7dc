use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How much slower than the driver's median lap a tyre_life = 0 lap must be
/// before it is treated as an out-lap.
pub(crate) const OUT_LAP_TOLERANCE_S: f64 = 2.0;

/// Green-flag track status reported by the ingestion layer.
const TRACK_STATUS_GREEN: &str = "1";

/// Tyre compound fitted for a stint.
///
/// Closed set so compound handling in the fitter and the strategy rules is
/// exhaustiveness-checked at compile time.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
}

impl Compound {
    pub const ALL: [Compound; 5] = [
        Compound::Soft,
        Compound::Medium,
        Compound::Hard,
        Compound::Intermediate,
        Compound::Wet,
    ];

    /// Slick compounds, as opposed to the wet-weather ones.
    pub fn is_dry(&self) -> bool {
        matches!(self, Compound::Soft | Compound::Medium | Compound::Hard)
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compound::Soft => write!(f, "SOFT"),
            Compound::Medium => write!(f, "MEDIUM"),
            Compound::Hard => write!(f, "HARD"),
            Compound::Intermediate => write!(f, "INTERMEDIATE"),
            Compound::Wet => write!(f, "WET"),
        }
    }
}

/// A lap record as delivered by the ingestion layer.
///
/// Everything nullable or loosely typed from the upstream source stays
/// nullable here; this is the strict boundary where records are validated
/// before anything downstream sees them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawLap {
    pub driver: String,
    pub lap_number: u32,
    /// None when the lap was not completed or was flagged invalid
    pub lap_time: Option<f64>,
    pub compound: Compound,
    /// Laps since this tyre set was fitted; None when unknown
    pub tyre_life: Option<u32>,
    #[serde(default)]
    pub is_personal_best: bool,
    /// Race control status while the lap ran; "1" is green flag
    #[serde(default)]
    pub track_status: Option<String>,
}

/// A validated lap sample. `lap_time_s` is non-nullable by construction;
/// laps without a time never become samples.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LapSample {
    pub driver: String,
    pub lap_number: u32,
    pub lap_time_s: f64,
    pub compound: Compound,
    pub tyre_life: Option<u32>,
    pub is_personal_best: bool,
}

/// Why a raw lap was excluded during normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionReason {
    MissingLapTime,
    NotGreenFlag,
    OutLap,
}

/// An excluded lap, retained for audit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExcludedLap {
    pub driver: String,
    pub lap_number: u32,
    pub reason: ExclusionReason,
}

/// Output of [`normalize`]: the usable samples plus the audit trail of
/// everything that was dropped.
#[derive(Clone, Debug, Default)]
pub struct NormalizedLaps {
    pub samples: Vec<LapSample>,
    pub excluded: Vec<ExcludedLap>,
    /// Highest lap number observed in the raw record set, before filtering
    pub total_laps: u32,
}

/// Normalize raw lap records into typed, filtered samples.
///
/// Drops laps with no time, laps run under a non-green track status, and
/// out-laps (tyre_life 0 with an anomalously slow time for that driver).
/// Pure transform: returns empty samples rather than erroring when nothing
/// survives, and callers decide whether that is fatal.
pub fn normalize(raw_laps: &[RawLap]) -> NormalizedLaps {
    let medians = driver_medians(raw_laps);
    let total_laps = raw_laps.iter().map(|l| l.lap_number).max().unwrap_or(0);

    let mut normalized = NormalizedLaps {
        total_laps,
        ..Default::default()
    };

    for raw in raw_laps {
        let Some(lap_time_s) = raw.lap_time else {
            normalized.exclude(raw, ExclusionReason::MissingLapTime);
            continue;
        };
        if !is_green_flag(raw) {
            normalized.exclude(raw, ExclusionReason::NotGreenFlag);
            continue;
        }
        if is_out_lap(raw, lap_time_s, &medians) {
            normalized.exclude(raw, ExclusionReason::OutLap);
            continue;
        }
        normalized.samples.push(LapSample {
            driver: raw.driver.clone(),
            lap_number: raw.lap_number,
            lap_time_s,
            compound: raw.compound,
            tyre_life: raw.tyre_life,
            is_personal_best: raw.is_personal_best,
        });
    }

    log::debug!(
        "normalized {} raw laps into {} samples ({} excluded)",
        raw_laps.len(),
        normalized.samples.len(),
        normalized.excluded.len()
    );
    normalized
}

impl NormalizedLaps {
    fn exclude(&mut self, raw: &RawLap, reason: ExclusionReason) {
        self.excluded.push(ExcludedLap {
            driver: raw.driver.clone(),
            lap_number: raw.lap_number,
            reason,
        });
    }
}

fn is_green_flag(raw: &RawLap) -> bool {
    raw.track_status
        .as_deref()
        .is_none_or(|status| status == TRACK_STATUS_GREEN)
}

/// A fresh set can legitimately report tyre_life 0 on a clean flying lap,
/// so a zero life alone is not enough to drop the sample.
fn is_out_lap(raw: &RawLap, lap_time_s: f64, medians: &HashMap<&str, f64>) -> bool {
    if raw.tyre_life != Some(0) {
        return false;
    }
    match medians.get(raw.driver.as_str()) {
        Some(median) => lap_time_s > median + OUT_LAP_TOLERANCE_S,
        None => false,
    }
}

/// Median green-flag lap time per driver, used as the out-lap baseline.
fn driver_medians(raw_laps: &[RawLap]) -> HashMap<&str, f64> {
    let mut times_by_driver: HashMap<&str, Vec<f64>> = HashMap::new();
    for raw in raw_laps {
        if let Some(time) = raw.lap_time {
            if is_green_flag(raw) {
                times_by_driver
                    .entry(raw.driver.as_str())
                    .or_default()
                    .push(time);
            }
        }
    }

    times_by_driver
        .into_iter()
        .map(|(driver, mut times)| {
            times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let middle = times.len() / 2;
            let median = if times.len() % 2 == 0 {
                (times[middle - 1] + times[middle]) / 2.0
            } else {
                times[middle]
            };
            (driver, median)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(driver: &str, lap_number: u32, lap_time: Option<f64>, tyre_life: Option<u32>) -> RawLap {
        RawLap {
            driver: driver.to_string(),
            lap_number,
            lap_time,
            compound: Compound::Soft,
            tyre_life,
            is_personal_best: false,
            track_status: None,
        }
    }

    #[test]
    fn test_missing_lap_time_excluded() {
        let laps = vec![
            raw("VER", 1, Some(90.0), Some(1)),
            raw("VER", 2, None, Some(2)),
        ];
        let normalized = normalize(&laps);
        assert_eq!(normalized.samples.len(), 1);
        assert_eq!(normalized.excluded.len(), 1);
        assert_eq!(normalized.excluded[0].reason, ExclusionReason::MissingLapTime);
    }

    #[test]
    fn test_non_green_flag_excluded() {
        let mut safety_car_lap = raw("VER", 2, Some(105.0), Some(2));
        safety_car_lap.track_status = Some("4".to_string());
        let mut green_lap = raw("VER", 1, Some(90.0), Some(1));
        green_lap.track_status = Some("1".to_string());

        let normalized = normalize(&[green_lap, safety_car_lap]);
        assert_eq!(normalized.samples.len(), 1);
        assert_eq!(normalized.excluded[0].reason, ExclusionReason::NotGreenFlag);
    }

    #[test]
    fn test_slow_out_lap_excluded() {
        let laps = vec![
            raw("VER", 10, Some(95.0), Some(0)), // out-lap, well above median
            raw("VER", 11, Some(90.0), Some(1)),
            raw("VER", 12, Some(90.2), Some(2)),
            raw("VER", 13, Some(90.4), Some(3)),
        ];
        let normalized = normalize(&laps);
        assert_eq!(normalized.samples.len(), 3);
        assert_eq!(normalized.excluded[0].reason, ExclusionReason::OutLap);
    }

    #[test]
    fn test_fast_zero_life_lap_kept() {
        // tyre_life 0 with a normal time is a legitimate first flying lap
        let laps = vec![
            raw("VER", 10, Some(90.1), Some(0)),
            raw("VER", 11, Some(90.0), Some(1)),
            raw("VER", 12, Some(90.2), Some(2)),
        ];
        let normalized = normalize(&laps);
        assert_eq!(normalized.samples.len(), 3);
        assert!(normalized.excluded.is_empty());
    }

    #[test]
    fn test_total_laps_counts_excluded_laps() {
        let laps = vec![raw("VER", 1, Some(90.0), Some(1)), raw("VER", 53, None, None)];
        let normalized = normalize(&laps);
        assert_eq!(normalized.total_laps, 53);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let normalized = normalize(&[]);
        assert!(normalized.samples.is_empty());
        assert!(normalized.excluded.is_empty());
        assert_eq!(normalized.total_laps, 0);
    }

    #[test]
    fn test_compound_wire_names() {
        assert_eq!(
            serde_json::to_string(&Compound::Intermediate).unwrap(),
            "\"INTERMEDIATE\""
        );
        let parsed: Compound = serde_json::from_str("\"SOFT\"").unwrap();
        assert_eq!(parsed, Compound::Soft);
        assert_eq!(Compound::Medium.to_string(), "MEDIUM");
    }

    #[test]
    fn test_dry_compound_classification() {
        assert!(Compound::Soft.is_dry());
        assert!(Compound::Hard.is_dry());
        assert!(!Compound::Intermediate.is_dry());
        assert!(!Compound::Wet.is_dry());
    }
}

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::laps::{Compound, LapSample};

/// Sentinel r² reported when the fit is undefined: constant lap times with
/// nonzero residuals leave no variance to explain. Negative values are
/// inside the contract ("worse than the mean"), and unlike NaN this
/// survives JSON serialization.
pub const R_SQUARED_UNDEFINED: f64 = -1.0;

/// Residual tolerance below which a zero-variance fit counts as exact.
const RESIDUAL_EPSILON: f64 = 1e-9;

/// Fitted degradation curve for one compound: lap time as a quadratic in
/// tyre life, `a*x^2 + b*x + c`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DegradationCurve {
    pub compound: Compound,
    /// Quadratic coefficients [a, b, c]
    pub coefficients: [f64; 3],
    /// Curve slope at the mean observed tyre life, seconds per lap.
    /// A single representative scalar, comparable across compounds with
    /// different data ranges.
    pub deg_per_lap: f64,
    pub r_squared: f64,
    pub sample_size: usize,
}

impl DegradationCurve {
    pub fn lap_time_at(&self, tyre_life: u32) -> f64 {
        let x = tyre_life as f64;
        let [a, b, c] = self.coefficients;
        a * x * x + b * x + c
    }

    pub fn slope_at(&self, tyre_life: f64) -> f64 {
        let [a, b, _] = self.coefficients;
        2.0 * a * tyre_life + b
    }
}

/// Fitted curves for a session, kept in fitting order for deterministic
/// responses.
#[derive(Clone, Debug, Default)]
pub struct CurveSet {
    curves: Vec<DegradationCurve>,
}

impl CurveSet {
    pub fn new(curves: Vec<DegradationCurve>) -> Self {
        Self { curves }
    }

    pub fn get(&self, compound: Compound) -> Option<&DegradationCurve> {
        self.curves.iter().find(|c| c.compound == compound)
    }

    pub fn compounds(&self) -> Vec<Compound> {
        self.curves.iter().map(|c| c.compound).collect()
    }

    pub fn curves(&self) -> &[DegradationCurve] {
        &self.curves
    }

    pub fn into_curves(self) -> Vec<DegradationCurve> {
        self.curves
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Fit a degradation curve for every compound with enough samples.
///
/// Compounds below the sample threshold are omitted, never zero-filled.
/// Iterates compounds in declaration order so the output is deterministic.
pub fn fit_all(samples: &[LapSample], config: &EngineConfig) -> Vec<DegradationCurve> {
    Compound::ALL
        .iter()
        .filter_map(|&compound| fit_compound(samples, compound, config))
        .collect()
}

/// Fit the least-squares quadratic of lap time against tyre life for one
/// compound. Returns None below the sample threshold or when the normal
/// equations are singular (e.g. every sample at the same tyre life).
pub fn fit_compound(
    samples: &[LapSample],
    compound: Compound,
    config: &EngineConfig,
) -> Option<DegradationCurve> {
    let points: Vec<(f64, f64)> = samples
        .iter()
        .filter(|s| s.compound == compound)
        .filter_map(|s| s.tyre_life.map(|life| (life as f64, s.lap_time_s)))
        .collect();

    if points.len() < config.min_fit_samples {
        log::debug!(
            "{} has {} usable samples, need {}; compound omitted",
            compound,
            points.len(),
            config.min_fit_samples
        );
        return None;
    }

    let Some(coefficients) = polyfit_quadratic(&points) else {
        log::warn!("degenerate sample distribution for {compound}, fit skipped");
        return None;
    };

    let mean_life = points.iter().map(|(x, _)| x).sum::<f64>() / points.len() as f64;
    let mut curve = DegradationCurve {
        compound,
        coefficients,
        deg_per_lap: 0.0,
        r_squared: r_squared(&points, &coefficients),
        sample_size: points.len(),
    };
    curve.deg_per_lap = curve.slope_at(mean_life);

    Some(curve)
}

/// Degree-2 least squares via the normal equations, solved with a 3x3 LU
/// decomposition. Plain summation in input order keeps coefficients
/// deterministic for identical input ordering.
fn polyfit_quadratic(points: &[(f64, f64)]) -> Option<[f64; 3]> {
    let mut sx = [0.0f64; 5]; // sums of x^0 .. x^4
    let mut sy = [0.0f64; 3]; // sums of y * x^0 .. y * x^2
    for &(x, y) in points {
        let x2 = x * x;
        sx[0] += 1.0;
        sx[1] += x;
        sx[2] += x2;
        sx[3] += x2 * x;
        sx[4] += x2 * x2;
        sy[0] += y;
        sy[1] += y * x;
        sy[2] += y * x2;
    }

    let normal = Matrix3::new(
        sx[4], sx[3], sx[2], //
        sx[3], sx[2], sx[1], //
        sx[2], sx[1], sx[0],
    );
    let rhs = Vector3::new(sy[2], sy[1], sy[0]);

    let solution = normal.lu().solve(&rhs)?;
    Some([solution[0], solution[1], solution[2]])
}

fn r_squared(points: &[(f64, f64)], coefficients: &[f64; 3]) -> f64 {
    let [a, b, c] = *coefficients;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / points.len() as f64;

    let mut rss = 0.0;
    let mut tss = 0.0;
    for &(x, y) in points {
        let predicted = a * x * x + b * x + c;
        rss += (y - predicted) * (y - predicted);
        tss += (y - mean_y) * (y - mean_y);
    }

    if tss == 0.0 {
        if rss < RESIDUAL_EPSILON {
            1.0
        } else {
            R_SQUARED_UNDEFINED
        }
    } else {
        1.0 - rss / tss
    }
}

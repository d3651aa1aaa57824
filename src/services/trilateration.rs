//! Per-floor position solve from planar range measurements
//!
//! With two or more live sensors the solve is a weighted centroid seed
//! followed by a fixed number of Gauss-Newton style corrections. The
//! iteration count is fixed rather than convergence-checked so worst-case
//! latency per reading is bounded; the loop is cheap enough that checking
//! residuals buys nothing.
//!
//! With a single live sensor no geometric solve exists. The estimate is the
//! sensor position nudged along the depth axis, and the provenance tag lets
//! consumers treat it accordingly.

use crate::domain::types::EstimateSource;

/// Fixed correction-iteration count for the multi-sensor solve
pub const SOLVER_ITERATIONS: usize = 15;

/// One sensor's contribution: position on the floor plane and the
/// projected (planar) range to the occupant
#[derive(Debug, Clone, Copy)]
pub struct PlanarMeasurement {
    pub x: f64,
    pub z: f64,
    pub radius: f64,
}

/// Solver output. Coordinates may be non-finite for degenerate input;
/// callers must check and discard the floor for the cycle.
#[derive(Debug, Clone, Copy)]
pub struct Solution {
    pub x: f64,
    pub z: f64,
    pub source: EstimateSource,
}

/// Estimate a planar position from the floor's live measurements
///
/// Returns `None` only for an empty input slice.
pub fn solve(measurements: &[PlanarMeasurement], single_sensor_bias: f64) -> Option<Solution> {
    match measurements {
        [] => None,
        [only] => Some(Solution {
            x: only.x,
            z: only.z + single_sensor_bias,
            source: EstimateSource::SingleSensorEstimate,
        }),
        _ => {
            let (x, z) = refine(weighted_centroid(measurements), measurements);
            Some(Solution { x, z, source: EstimateSource::Trilateration })
        }
    }
}

/// Initial guess: centroid weighted by inverse radius, so near sensors
/// dominate. The 0.01 pad keeps a zero radius from dividing by zero.
fn weighted_centroid(measurements: &[PlanarMeasurement]) -> (f64, f64) {
    let mut x = 0.0;
    let mut z = 0.0;
    let mut total_weight = 0.0;
    for m in measurements {
        let w = 1.0 / (m.radius + 0.01);
        x += m.x * w;
        z += m.z * w;
        total_weight += w;
    }
    (x / total_weight, z / total_weight)
}

/// Fixed-count weighted correction loop
///
/// Each pass accumulates a range-residual gradient per sensor and moves the
/// working point by the weight-normalized sum. Sensors coincident with the
/// working point carry no direction information and are skipped.
fn refine((mut x, mut z): (f64, f64), measurements: &[PlanarMeasurement]) -> (f64, f64) {
    for _ in 0..SOLVER_ITERATIONS {
        let mut dx = 0.0;
        let mut dz = 0.0;
        let mut total_weight = 0.0;
        for m in measurements {
            let d = (x - m.x).hypot(z - m.z);
            if d < 1e-6 {
                continue;
            }
            let residual = d - m.radius;
            let w = 1.0 / (d + 0.1);
            dx += w * residual * (x - m.x) / d;
            dz += w * residual * (z - m.z) / d;
            total_weight += w;
        }
        if total_weight < 1e-9 {
            break;
        }
        x -= dx / total_weight;
        z -= dz / total_weight;
    }
    (x, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(x: f64, z: f64, radius: f64) -> PlanarMeasurement {
        PlanarMeasurement { x, z, radius }
    }

    /// Exact radii from each sensor to the given point
    fn radii_for(sensors: &[(f64, f64)], px: f64, pz: f64) -> Vec<PlanarMeasurement> {
        sensors
            .iter()
            .map(|&(x, z)| m(x, z, (px - x).hypot(pz - z)))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(solve(&[], 0.5).is_none());
    }

    #[test]
    fn test_single_sensor_offset_estimate() {
        let solution = solve(&[m(2.2, 2.05, 1.4)], 0.5).unwrap();
        assert_eq!(solution.source, EstimateSource::SingleSensorEstimate);
        assert_eq!(solution.x, 2.2);
        assert!((solution.z - 2.55).abs() < 1e-9);
    }

    #[test]
    fn test_three_sensor_convergence_within_1cm() {
        let measurements = radii_for(&[(0.0, 0.0), (5.0, 0.0), (0.0, 5.0)], 2.0, 2.0);
        let solution = solve(&measurements, 0.5).unwrap();

        assert_eq!(solution.source, EstimateSource::Trilateration);
        assert!(
            (solution.x - 2.0).abs() < 0.01 && (solution.z - 2.0).abs() < 0.01,
            "solved to ({}, {})",
            solution.x,
            solution.z
        );
    }

    #[test]
    fn test_four_sensor_convergence() {
        let measurements =
            radii_for(&[(0.0, 0.0), (4.95, 0.0), (0.0, 9.3), (4.95, 9.3)], 1.5, 6.0);
        let solution = solve(&measurements, 0.5).unwrap();
        assert!((solution.x - 1.5).abs() < 0.01);
        assert!((solution.z - 6.0).abs() < 0.01);
    }

    #[test]
    fn test_two_sensor_result_is_finite() {
        // Two ranges underdetermine the point; the solve still has to
        // return something finite between the circles
        let solution = solve(&[m(0.0, 0.0, 2.0), m(4.0, 0.0, 2.0)], 0.5).unwrap();
        assert!(solution.x.is_finite() && solution.z.is_finite());
        assert!((solution.x - 2.0).abs() < 0.5);
    }

    #[test]
    fn test_near_sensor_dominates_seed() {
        // A near-zero radius should pull the centroid hard toward that sensor
        let (x, z) = weighted_centroid(&[m(1.0, 1.0, 0.0), m(9.0, 9.0, 5.0)]);
        assert!(x < 2.0 && z < 2.0);
    }

    #[test]
    fn test_coincident_sensors_do_not_nan() {
        // All sensors stacked at one point with zero radius: every
        // correction is skipped and the seed point comes back unchanged
        let solution = solve(&[m(1.0, 1.0, 0.0), m(1.0, 1.0, 0.0)], 0.5).unwrap();
        assert!(solution.x.is_finite() && solution.z.is_finite());
        assert!((solution.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nan_radius_propagates_for_caller_discard() {
        // Degenerate input is not masked; the caller checks finiteness and
        // drops the floor for the cycle
        let solution = solve(&[m(0.0, 0.0, f64::NAN), m(5.0, 0.0, 3.0)], 0.5).unwrap();
        assert!(!solution.x.is_finite() || !solution.z.is_finite());
    }
}

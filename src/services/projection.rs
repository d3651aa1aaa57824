//! Slant-distance to planar-distance conversion
//!
//! Radar nodes report the straight-line 3D distance to the target. The
//! solver works in the 2D floor plane, so each reading is projected onto
//! the horizontal plane at the assumed occupant height before use.

use crate::infra::config::Config;

/// Minimum planar distance returned, meters. Also the fallback when the
/// slant is shorter than the height delta (sensor directly overhead, or an
/// inconsistent measurement).
pub const MIN_PLANAR_M: f64 = 0.15;

/// Lower bound on the radicand, guards the sqrt against float error
const EPSILON_FLOOR: f64 = 0.01;

/// Project a slant distance onto the floor plane
///
/// `sensor_height` is the node's absolute mounting height; the occupant is
/// assumed at floor base plus the configured person height. Output is
/// always >= [`MIN_PLANAR_M`] and non-decreasing in `slant` for a fixed
/// height delta.
pub fn planar_distance(config: &Config, slant: f64, sensor_height: f64, floor: u8) -> f64 {
    let occupant_height = config.floor_height(floor) + config.person_height_m();
    let height_delta = (sensor_height - occupant_height).abs();

    if slant <= height_delta {
        return MIN_PLANAR_M;
    }

    let radicand = (slant * slant - height_delta * height_delta).max(EPSILON_FLOOR);
    radicand.sqrt().max(MIN_PLANAR_M)
}

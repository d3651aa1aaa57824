//! Valid-rooms confidence gate
//!
//! Each sensor's registry entry lists the rooms it can plausibly see into.
//! An estimate classified into a room none of its contributing sensors
//! expects is suspect (reflection, solve pulled across a wall) and gets the
//! reduced score. This is a binary trust gate, not a confidence interval.

use crate::services::sensor_state::SensorStateEntry;

/// Score an estimate against the contributing sensors' expected coverage
///
/// 1.0 when at least one contributing sensor lists the classified room in
/// its `valid_rooms`, 0.5 otherwise. The outside-area sentinel never
/// matches, so unlocated estimates always score 0.5.
pub fn score(classified_room: &str, contributing: &[&SensorStateEntry]) -> f64 {
    let expected = contributing
        .iter()
        .any(|entry| entry.sensor.valid_rooms.iter().any(|room| room == classified_room));
    if expected {
        1.0
    } else {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{NodeId, SensorDefinition, OUTSIDE_AREA};
    use std::sync::Arc;
    use std::time::Instant;

    fn entry(valid_rooms: &[&str]) -> SensorStateEntry {
        SensorStateEntry {
            sensor: Arc::new(SensorDefinition {
                node: NodeId(15),
                label: "Hall".to_string(),
                x: 2.2,
                y: 0.5,
                z: 2.05,
                floor: 0,
                valid_rooms: valid_rooms.iter().map(|s| s.to_string()).collect(),
            }),
            dist_m: 1.5,
            presence: true,
            last_seen: Instant::now(),
        }
    }

    #[test]
    fn test_expected_room_scores_full() {
        let a = entry(&["hall", "toilet"]);
        let b = entry(&["kitchen"]);
        assert_eq!(score("hall", &[&a, &b]), 1.0);
    }

    #[test]
    fn test_unexpected_room_scores_half() {
        let a = entry(&["hall", "toilet"]);
        assert_eq!(score("kitchen", &[&a]), 0.5);
    }

    #[test]
    fn test_outside_area_scores_half() {
        let a = entry(&["hall"]);
        assert_eq!(score(OUTSIDE_AREA, &[&a]), 0.5);
    }

    #[test]
    fn test_empty_valid_rooms_scores_half() {
        let a = entry(&[]);
        assert_eq!(score("hall", &[&a]), 0.5);
    }
}

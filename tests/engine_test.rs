//! End-to-end tests over the shipped house configuration
//!
//! Loads config/dev.toml and drives the tracker with synthetic readings,
//! the same way the radar-sim binary does.

use radar_tracker::domain::types::{EstimateSource, NodeId, RadarReading};
use radar_tracker::infra::{Config, Metrics};
use radar_tracker::services::PersonTracker;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn tracker() -> (Config, PersonTracker) {
    let config = Config::from_file("config/dev.toml").expect("dev config loads");
    let tracker = PersonTracker::new(config.clone(), Arc::new(Metrics::new()), None);
    (config, tracker)
}

/// Device-unit slant a sensor would report for an occupant at planar
/// (px, pz) on the given floor
fn raw_dist(config: &Config, node: u32, px: f64, pz: f64, floor: u8) -> f64 {
    let sensor = config.sensor(NodeId(node)).expect("registered sensor");
    let planar = (px - sensor.x).hypot(pz - sensor.z);
    let dy = sensor.y - (config.floor_height(floor) + config.person_height_m());
    (planar * planar + dy * dy).sqrt() / config.dist_unit()
}

fn present(config: &Config, node: u32, px: f64, pz: f64, floor: u8) -> RadarReading {
    RadarReading {
        node: NodeId(node),
        raw_dist: raw_dist(config, node, px, pz, floor),
        presence: true,
    }
}

#[test]
fn test_ground_floor_occupant_lands_in_hall() {
    let (config, mut tracker) = tracker();
    let now = Instant::now();

    // Occupant at (1.5, 2.0), seen by all three ground-floor nodes
    tracker.process_reading(&present(&config, 15, 1.5, 2.0, 0), now);
    tracker.process_reading(&present(&config, 24, 1.5, 2.0, 0), now);
    let update = tracker.process_reading(&present(&config, 25, 1.5, 2.0, 0), now);

    assert!(update.presence);
    assert_eq!(update.persons.len(), 1);
    let person = &update.persons[0];
    assert_eq!(person.source, EstimateSource::Trilateration);
    assert_eq!(person.floor, 0);
    assert_eq!(person.room, "hall");
    assert_eq!(person.confidence, 1.0);
    assert!((person.x - 1.5).abs() < 0.1, "x = {}", person.x);
    assert!((person.z - 2.0).abs() < 0.1, "z = {}", person.z);
    // Ground floor occupant height
    assert!((person.y - 0.9).abs() < 1e-9);
}

#[test]
fn test_attic_occupant_lands_in_bedroom() {
    let (config, mut tracker) = tracker();
    let now = Instant::now();

    let mut update = None;
    for node in [4, 9, 20, 21, 22, 23] {
        update = Some(tracker.process_reading(&present(&config, node, 2.5, 5.0, 2), now));
    }

    let update = update.unwrap();
    assert_eq!(update.persons.len(), 1);
    let person = &update.persons[0];
    assert_eq!(person.floor, 2);
    assert_eq!(person.room, "bedroom");
    assert_eq!(person.confidence, 1.0);
    assert!((person.x - 2.5).abs() < 0.1, "x = {}", person.x);
    assert!((person.z - 5.0).abs() < 0.1, "z = {}", person.z);
    // Attic occupant height: 5.26m floor base + 0.90m person
    assert!((person.y - 6.16).abs() < 1e-9);
}

#[test]
fn test_two_floors_tracked_simultaneously() {
    let (config, mut tracker) = tracker();
    let now = Instant::now();

    tracker.process_reading(&present(&config, 15, 1.5, 2.0, 0), now);
    tracker.process_reading(&present(&config, 24, 1.5, 2.0, 0), now);
    let update = tracker.process_reading(&present(&config, 4, 2.5, 5.0, 2), now);

    assert!(update.presence);
    assert_eq!(update.persons.len(), 2);
    let floors: Vec<u8> = update.persons.iter().map(|p| p.floor).collect();
    assert!(floors.contains(&0) && floors.contains(&2));
}

#[test]
fn test_lone_sensor_reports_biased_estimate() {
    let (config, mut tracker) = tracker();

    // Only the stairs node sees someone
    let update = tracker.process_reading(&present(&config, 25, 0.6, 6.2, 0), Instant::now());

    assert_eq!(update.persons.len(), 1);
    let person = &update.persons[0];
    assert_eq!(person.source, EstimateSource::SingleSensorEstimate);
    // Node 25 sits at (0.50, 5.90); the fallback offsets depth by 0.5m
    assert_eq!(person.x, 0.5);
    assert_eq!(person.z, 6.4);
}

#[test]
fn test_silence_expires_presence() {
    let (config, mut tracker) = tracker();
    let now = Instant::now();

    tracker.process_reading(&present(&config, 15, 1.5, 2.0, 0), now);

    // 6s of silence, then an absence report from another node: the old
    // presence entry is past its 5s TTL and must not resurface
    let later = now + Duration::from_millis(6000);
    let absent =
        RadarReading { node: NodeId(24), raw_dist: 0.0, presence: false };
    let update = tracker.process_reading(&absent, later);

    assert!(!update.presence);
    assert!(update.persons.is_empty());
}

//! Per-reading orchestration of the positioning pipeline
//!
//! The PersonTracker is the single owner of the sensor cache. Each reading
//! is processed end-to-end before the next one is taken off the channel:
//! cache upsert, TTL sweep, per-floor solve, classification, scoring, and
//! the output event. There is no cross-cycle state beyond the cache itself;
//! every update is a fresh recomputation, so a lost reading self-heals on
//! the next one.


use crate::domain::types::{
    epoch_ms, EstimateSource, PersonEstimate, PositionUpdate, RadarReading, OUTSIDE_AREA,
};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::EgressSender;
use crate::services::confidence;
use crate::services::projection::planar_distance;
use crate::services::rooms;
use crate::services::sensor_state::{SensorStateEntry, SensorStateStore};
use crate::services::trilateration::{self, PlanarMeasurement};
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Central per-reading processor
pub struct PersonTracker {
    /// Latest-reading cache, owned exclusively by this tracker
    store: SensorStateStore,
    /// Application configuration
    config: Config,
    /// Metrics collector
    metrics: Arc<Metrics>,
    /// MQTT egress sender (optional)
    egress: Option<EgressSender>,
}

/// Round a coordinate to millimeters for emission
#[inline]
fn round_mm(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

impl PersonTracker {
    pub fn new(config: Config, metrics: Arc<Metrics>, egress: Option<EgressSender>) -> Self {
        let store = SensorStateStore::new(&config);
        Self { store, config, metrics, egress }
    }

    /// Consume readings from the channel until it closes
    pub async fn run(&mut self, mut reading_rx: mpsc::Receiver<RadarReading>) {
        while let Some(reading) = reading_rx.recv().await {
            let process_start = Instant::now();
            let update = self.process_reading(&reading, process_start);

            debug!(
                node = %reading.node,
                presence = %update.presence,
                persons = %update.persons.len(),
                "position_update"
            );

            if let Some(ref sender) = self.egress {
                sender.send_update(&update);
            }
            self.metrics.record_update_emitted();
            self.metrics.record_reading_processed(process_start.elapsed().as_micros() as u64);
        }
    }

    /// Process one reading and produce the cycle's output event
    ///
    /// Every reading produces exactly one update, including readings for
    /// unregistered nodes (the sweep and recomputation still run).
    pub fn process_reading(&mut self, reading: &RadarReading, now: Instant) -> PositionUpdate {
        if !self.store.upsert(reading.node, reading.raw_dist, reading.presence, now) {
            self.metrics.record_unknown_node();
            debug!(node = %reading.node, "reading_for_unregistered_node");
        }

        let evicted = self.store.sweep(now);
        self.metrics.record_sweep_evictions(evicted as u64);

        let ts = epoch_ms();
        let by_floor = self.store.active_by_floor();
        if by_floor.is_empty() {
            return PositionUpdate { presence: false, persons: Vec::new(), updated_at: ts };
        }

        let mut persons: SmallVec<[PersonEstimate; 4]> = SmallVec::new();
        for (floor, entries) in &by_floor {
            if let Some(estimate) = self.locate_on_floor(*floor, entries, ts) {
                persons.push(estimate);
            }
        }

        persons.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        persons.truncate(self.config.max_persons());

        PositionUpdate { presence: true, persons: persons.into_vec(), updated_at: ts }
    }

    /// Solve one floor's live sensors into a person estimate
    ///
    /// Returns None when the floor has no usable solve this cycle; other
    /// floors and later cycles are unaffected.
    fn locate_on_floor(
        &self,
        floor: u8,
        entries: &[&SensorStateEntry],
        ts: u64,
    ) -> Option<PersonEstimate> {
        let measurements: Vec<PlanarMeasurement> = entries
            .iter()
            .map(|entry| PlanarMeasurement {
                x: entry.sensor.x,
                z: entry.sensor.z,
                radius: planar_distance(&self.config, entry.dist_m, entry.sensor.y, floor),
            })
            .collect();

        let solution = trilateration::solve(&measurements, self.config.single_sensor_bias_m())?;

        if !solution.x.is_finite() || !solution.z.is_finite() {
            self.metrics.record_solve_discarded();
            warn!(floor = %floor, sensors = %entries.len(), "solve_discarded_non_finite");
            return None;
        }

        match solution.source {
            EstimateSource::SingleSensorEstimate => self.metrics.record_estimate_single(),
            EstimateSource::Trilateration => self.metrics.record_estimate_multi(),
        }

        let room = rooms::classify(self.config.rooms_on_floor(floor), solution.x, solution.z)
            .unwrap_or(OUTSIDE_AREA)
            .to_string();
        let confidence = confidence::score(&room, entries);
        let occupant_height = self.config.floor_height(floor) + self.config.person_height_m();

        Some(PersonEstimate {
            x: round_mm(solution.x),
            y: round_mm(occupant_height),
            z: round_mm(solution.z),
            room,
            floor,
            confidence,
            source: solution.source,
            ts,
        })
    }

    /// Number of currently cached sensor entries
    pub fn cached_entries(&self) -> usize {
        self.store.len()
    }
}

//! TTL cache of the latest reading per radar node
//!
//! This is the single source of truth for which sensors are currently live.
//! Every incoming reading replaces the node's entry; a sweep before each
//! recomputation evicts anything past its TTL so stale nodes can never pull
//! an estimate toward a room nobody is in.
//!
//! Key behaviors:
//! - Unknown node ids are ignored (not a fault - nodes get flashed and
//!   registered independently)
//! - Raw distances are scaled to meters and clamped to >= 0 on the way in
//! - Presence-active entries tolerate a longer TTL than absence entries,
//!   since presence firmware only reports on transitions
//! - Absence entries stay cached for freshness accounting but are excluded
//!   from the per-floor grouping

use crate::domain::types::{NodeId, SensorDefinition};
use crate::infra::config::Config;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cached state for one radar node
#[derive(Debug, Clone)]
pub struct SensorStateEntry {
    /// Resolved registry entry for the reporting node
    pub sensor: Arc<SensorDefinition>,
    /// Last reported distance, meters
    pub dist_m: f64,
    /// Last reported presence flag
    pub presence: bool,
    /// When the last reading for this node arrived
    pub last_seen: Instant,
}

/// Latest-reading cache keyed by node id
pub struct SensorStateStore {
    entries: FxHashMap<u32, SensorStateEntry>,
    config: Config,
}

impl SensorStateStore {
    pub fn new(config: &Config) -> Self {
        Self { entries: FxHashMap::default(), config: config.clone() }
    }

    /// Insert or refresh the entry for a node
    ///
    /// Returns false when the node is not in the sensor registry; the
    /// reading is dropped without touching the cache.
    pub fn upsert(&mut self, node: NodeId, raw_dist: f64, presence: bool, now: Instant) -> bool {
        let Some(sensor) = self.config.sensor(node) else {
            return false;
        };

        let dist_m = raw_dist.max(0.0) * self.config.dist_unit();
        self.entries.insert(
            node.0,
            SensorStateEntry { sensor: Arc::clone(sensor), dist_m, presence, last_seen: now },
        );
        true
    }

    /// Evict every entry older than its presence-dependent TTL
    ///
    /// Returns the number of evicted entries. Runs before each
    /// recomputation, so no stale entry can influence an estimate.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let ttl_presence = Duration::from_millis(self.config.ttl_presence_ms());
        let ttl_absence = Duration::from_millis(self.config.ttl_absence_ms());

        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            let ttl = if entry.presence { ttl_presence } else { ttl_absence };
            now.duration_since(entry.last_seen) <= ttl
        });
        before - self.entries.len()
    }

    /// Presence-active entries grouped by floor
    ///
    /// Floors ascend and entries within a floor are ordered by node id, so
    /// a given cache state always produces the same solver input.
    pub fn active_by_floor(&self) -> BTreeMap<u8, Vec<&SensorStateEntry>> {
        let mut by_floor: BTreeMap<u8, Vec<&SensorStateEntry>> = BTreeMap::new();
        for entry in self.entries.values() {
            if entry.presence {
                by_floor.entry(entry.sensor.floor).or_default().push(entry);
            }
        }
        for entries in by_floor.values_mut() {
            entries.sort_by_key(|e| e.sensor.node.0);
        }
        by_floor
    }

    /// Entry for a node, if cached
    pub fn get(&self, node: NodeId) -> Option<&SensorStateEntry> {
        self.entries.get(&node.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

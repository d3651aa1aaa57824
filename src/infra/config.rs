//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument
//! (default: config/dev.toml).
//!
//! The sensor registry, room polygons, and sensor groups are loaded once at
//! startup and are immutable for the process lifetime.

use crate::domain::types::{NodeId, RoomPolygon, SensorDefinition, SensorGroup};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_mqtt_topic")]
    pub topic: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_mqtt_topic() -> String {
    "radar/+/reading".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_enabled")]
    pub enabled: bool,
    #[serde(default = "default_broker_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
}

fn default_broker_enabled() -> bool {
    true
}

fn default_broker_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: default_broker_enabled(),
            bind_address: default_broker_bind_address(),
            port: default_broker_port(),
        }
    }
}

/// Tunables for the positioning pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// TTL for cached entries whose last reading had presence set
    #[serde(default = "default_ttl_presence_ms")]
    pub ttl_presence_ms: u64,
    /// TTL for cached entries whose last reading reported absence
    #[serde(default = "default_ttl_absence_ms")]
    pub ttl_absence_ms: u64,
    /// Device-unit to meter scale (current firmware reports centimeters)
    #[serde(default = "default_dist_unit")]
    pub dist_unit: f64,
    /// Assumed occupant torso height above the floor base
    #[serde(default = "default_person_height_m")]
    pub person_height_m: f64,
    /// Base height of each floor above ground, indexed by floor number
    #[serde(default = "default_floor_heights")]
    pub floor_heights: Vec<f64>,
    /// Depth-axis offset applied to the single-sensor fallback estimate
    #[serde(default = "default_single_sensor_bias_m")]
    pub single_sensor_bias_m: f64,
    /// Cap on simultaneously reported persons per update
    #[serde(default = "default_max_persons")]
    pub max_persons: usize,
}

fn default_ttl_presence_ms() -> u64 {
    5000
}

fn default_ttl_absence_ms() -> u64 {
    3000
}

fn default_dist_unit() -> f64 {
    0.01
}

fn default_person_height_m() -> f64 {
    0.90
}

fn default_floor_heights() -> Vec<f64> {
    vec![0.00, 2.63, 5.26]
}

fn default_single_sensor_bias_m() -> f64 {
    0.5
}

fn default_max_persons() -> usize {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl_presence_ms: default_ttl_presence_ms(),
            ttl_absence_ms: default_ttl_absence_ms(),
            dist_unit: default_dist_unit(),
            person_height_m: default_person_height_m(),
            floor_heights: default_floor_heights(),
            single_sensor_bias_m: default_single_sensor_bias_m(),
            max_persons: default_max_persons(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// Enable MQTT egress publishing
    #[serde(default = "default_egress_enabled")]
    pub enabled: bool,
    /// Topic for per-cycle position updates (QoS 0)
    #[serde(default = "default_updates_topic")]
    pub updates_topic: String,
    /// Topic for periodic metrics snapshots (QoS 0)
    #[serde(default = "default_metrics_topic")]
    pub metrics_topic: String,
    /// Interval for publishing metrics (seconds)
    #[serde(default = "default_metrics_publish_interval")]
    pub metrics_publish_interval_secs: u64,
}

fn default_egress_enabled() -> bool {
    true
}

fn default_updates_topic() -> String {
    "radar/position".to_string()
}

fn default_metrics_topic() -> String {
    "radar/metrics".to_string()
}

fn default_metrics_publish_interval() -> u64 {
    5
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            enabled: default_egress_enabled(),
            updates_topic: default_updates_topic(),
            metrics_topic: default_metrics_topic(),
            metrics_publish_interval_secs: default_metrics_publish_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
    /// Prometheus metrics HTTP port (0 to disable)
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

fn default_metrics_interval() -> u64 {
    10
}

fn default_prometheus_port() -> u16 {
    9464
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval(), prometheus_port: default_prometheus_port() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Unique site identifier included in egress payloads
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "radar".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub sensors: Vec<SensorDefinition>,
    #[serde(default)]
    pub rooms: Vec<RoomPolygon>,
    #[serde(default)]
    pub groups: HashMap<String, SensorGroup>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_topic: String,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    broker_enabled: bool,
    broker_bind_address: String,
    broker_port: u16,
    engine: EngineConfig,
    egress_enabled: bool,
    egress_updates_topic: String,
    egress_metrics_topic: String,
    egress_metrics_interval_secs: u64,
    metrics_interval_secs: u64,
    prometheus_port: u16,
    config_file: String,
    /// Sensor registry keyed by node id
    sensors: HashMap<u32, Arc<SensorDefinition>>,
    /// Room polygons per floor, preserving declaration order (the
    /// classification tie-break for overlapping polygons)
    rooms_by_floor: HashMap<u8, Vec<RoomPolygon>>,
    groups: HashMap<String, SensorGroup>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            mqtt_host: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_topic: default_mqtt_topic(),
            mqtt_username: None,
            mqtt_password: None,
            broker_enabled: true,
            broker_bind_address: default_broker_bind_address(),
            broker_port: default_broker_port(),
            engine: EngineConfig::default(),
            egress_enabled: true,
            egress_updates_topic: default_updates_topic(),
            egress_metrics_topic: default_metrics_topic(),
            egress_metrics_interval_secs: default_metrics_publish_interval(),
            metrics_interval_secs: default_metrics_interval(),
            prometheus_port: default_prometheus_port(),
            config_file: "default".to_string(),
            sensors: HashMap::new(),
            rooms_by_floor: HashMap::new(),
            groups: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let mut sensors = HashMap::with_capacity(toml_config.sensors.len());
        for sensor in toml_config.sensors {
            sensors.insert(sensor.node.0, Arc::new(sensor));
        }

        // File order within a floor is the classification order
        let mut rooms_by_floor: HashMap<u8, Vec<RoomPolygon>> = HashMap::new();
        for room in toml_config.rooms {
            rooms_by_floor.entry(room.floor).or_default().push(room);
        }

        Ok(Self {
            site_id: toml_config.site.id,
            mqtt_host: toml_config.mqtt.host,
            mqtt_port: toml_config.mqtt.port,
            mqtt_topic: toml_config.mqtt.topic,
            mqtt_username: toml_config.mqtt.username,
            mqtt_password: toml_config.mqtt.password,
            broker_enabled: toml_config.broker.enabled,
            broker_bind_address: toml_config.broker.bind_address,
            broker_port: toml_config.broker.port,
            engine: toml_config.engine,
            egress_enabled: toml_config.egress.enabled,
            egress_updates_topic: toml_config.egress.updates_topic,
            egress_metrics_topic: toml_config.egress.metrics_topic,
            egress_metrics_interval_secs: toml_config.egress.metrics_publish_interval_secs,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            prometheus_port: toml_config.metrics.prometheus_port,
            config_file: path.display().to_string(),
            sensors,
            rooms_by_floor,
            groups: toml_config.groups,
        })
    }

    /// Load configuration - tries the TOML file, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Look up a sensor definition by node id
    pub fn sensor(&self, node: NodeId) -> Option<&Arc<SensorDefinition>> {
        self.sensors.get(&node.0)
    }

    /// Registered sensors on a floor, ordered by node id
    pub fn sensors_on_floor(&self, floor: u8) -> Vec<&Arc<SensorDefinition>> {
        let mut sensors: Vec<&Arc<SensorDefinition>> =
            self.sensors.values().filter(|s| s.floor == floor).collect();
        sensors.sort_by_key(|s| s.node.0);
        sensors
    }

    /// Room polygons for a floor, in declaration order
    pub fn rooms_on_floor(&self, floor: u8) -> &[RoomPolygon] {
        self.rooms_by_floor.get(&floor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Base height of a floor above ground; unknown floors map to 0.0
    pub fn floor_height(&self, floor: u8) -> f64 {
        self.engine.floor_heights.get(floor as usize).copied().unwrap_or(0.0)
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_topic(&self) -> &str {
        &self.mqtt_topic
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn broker_enabled(&self) -> bool {
        self.broker_enabled
    }

    pub fn broker_bind_address(&self) -> &str {
        &self.broker_bind_address
    }

    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    pub fn ttl_presence_ms(&self) -> u64 {
        self.engine.ttl_presence_ms
    }

    pub fn ttl_absence_ms(&self) -> u64 {
        self.engine.ttl_absence_ms
    }

    pub fn dist_unit(&self) -> f64 {
        self.engine.dist_unit
    }

    pub fn person_height_m(&self) -> f64 {
        self.engine.person_height_m
    }

    pub fn single_sensor_bias_m(&self) -> f64 {
        self.engine.single_sensor_bias_m
    }

    pub fn max_persons(&self) -> usize {
        self.engine.max_persons
    }

    pub fn egress_enabled(&self) -> bool {
        self.egress_enabled
    }

    pub fn egress_updates_topic(&self) -> &str {
        &self.egress_updates_topic
    }

    pub fn egress_metrics_topic(&self) -> &str {
        &self.egress_metrics_topic
    }

    pub fn egress_metrics_interval_secs(&self) -> u64 {
        self.egress_metrics_interval_secs
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn prometheus_port(&self) -> u16 {
        self.prometheus_port
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms_by_floor.values().map(Vec::len).sum()
    }

    pub fn groups(&self) -> &HashMap<String, SensorGroup> {
        &self.groups
    }

    /// Builder method for tests to install a sensor registry
    #[cfg(test)]
    pub fn with_sensors(mut self, sensors: Vec<SensorDefinition>) -> Self {
        self.sensors = sensors.into_iter().map(|s| (s.node.0, Arc::new(s))).collect();
        self
    }

    /// Builder method for tests to install room polygons
    #[cfg(test)]
    pub fn with_rooms(mut self, rooms: Vec<RoomPolygon>) -> Self {
        self.rooms_by_floor.clear();
        for room in rooms {
            self.rooms_by_floor.entry(room.floor).or_default().push(room);
        }
        self
    }

    /// Builder method for tests to override the cache TTLs
    #[cfg(test)]
    pub fn with_ttls(mut self, presence_ms: u64, absence_ms: u64) -> Self {
        self.engine.ttl_presence_ms = presence_ms;
        self.engine.ttl_absence_ms = absence_ms;
        self
    }
}

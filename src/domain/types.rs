//! Shared types for the radar tracker

use serde::{Deserialize, Deserializer, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Room id reported when the solved point falls outside every polygon
pub const OUTSIDE_AREA: &str = "outside_area";

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Newtype wrapper for radar node ids to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static registry entry for one mounted radar node
///
/// Coordinates follow the floor-plan convention: `x` runs along the width
/// axis, `z` along the depth axis, `y` is the mounting height in meters
/// measured from the ground floor (absolute, not per-floor).
#[derive(Debug, Clone, Deserialize)]
pub struct SensorDefinition {
    pub node: NodeId,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub floor: u8,
    /// Room ids this node is expected to see into. Used by confidence
    /// scoring only, never to filter readings.
    #[serde(default)]
    pub valid_rooms: Vec<String>,
}

/// A named floor-plan region
///
/// Polygons on the same floor may overlap; classification picks the first
/// containing polygon in declaration order.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomPolygon {
    pub id: String,
    pub floor: u8,
    /// Ordered `[x, z]` vertices, implicitly closed
    pub polygon: Vec<[f64; 2]>,
}

/// A group of sensors jointly watching one area
///
/// Parsed from configuration and surfaced at startup. The threshold is not
/// enforced by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorGroup {
    pub floor: u8,
    pub min_sensors: usize,
}

/// Raw MQTT reading payload from a radar node
///
/// Firmware variants disagree on the `pres` encoding (bool vs 0/1), so the
/// field accepts both. `dist` is in device units (centimeters on current
/// hardware) and may be omitted on pure presence transitions.
#[derive(Debug, Deserialize)]
pub struct RadarMessage {
    pub node: u32,
    #[serde(default)]
    pub dist: f64,
    #[serde(default, deserialize_with = "deserialize_presence")]
    pub pres: bool,
}

fn deserialize_presence<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct PresenceVisitor;

    impl<'de> Visitor<'de> for PresenceVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a boolean or integer presence flag")
        }

        fn visit_bool<E>(self, value: bool) -> Result<bool, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<bool, E>
        where
            E: de::Error,
        {
            Ok(value != 0)
        }

        fn visit_i64<E>(self, value: i64) -> Result<bool, E>
        where
            E: de::Error,
        {
            Ok(value != 0)
        }
    }

    deserializer.deserialize_any(PresenceVisitor)
}

/// Parsed reading ready for the tracker
#[derive(Debug, Clone)]
pub struct RadarReading {
    pub node: NodeId,
    /// Raw distance in device units, not yet scaled to meters
    pub raw_dist: f64,
    pub presence: bool,
}

impl RadarReading {
    pub fn from_message(msg: &RadarMessage) -> Self {
        Self { node: NodeId(msg.node), raw_dist: msg.dist, presence: msg.pres }
    }
}

/// Which solve path produced an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// One active sensor on the floor - position is the sensor location
    /// plus a fixed bias, not a geometric solve
    SingleSensorEstimate,
    /// Two or more sensors, iterative weighted solve
    Trilateration,
}

impl EstimateSource {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateSource::SingleSensorEstimate => "single_sensor_estimate",
            EstimateSource::Trilateration => "trilateration",
        }
    }
}

/// Solved occupant position for one floor
///
/// `x`/`z` are planar floor-plan coordinates; `y` is the absolute occupant
/// height (floor base plus assumed person height). All three are rounded
/// to millimeters before emission.
#[derive(Debug, Clone, Serialize)]
pub struct PersonEstimate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub room: String,
    pub floor: u8,
    pub confidence: f64,
    pub source: EstimateSource,
    /// Epoch milliseconds of the cycle that produced this estimate
    pub ts: u64,
}

/// Output event, one per processed reading
#[derive(Debug, Clone, Serialize)]
pub struct PositionUpdate {
    pub presence: bool,
    pub persons: Vec<PersonEstimate>,
    pub updated_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_accepts_bool_and_int() {
        let m: RadarMessage = serde_json::from_str(r#"{"node": 15, "dist": 230, "pres": true}"#).unwrap();
        assert!(m.pres);
        assert_eq!(m.dist, 230.0);

        let m: RadarMessage = serde_json::from_str(r#"{"node": 15, "dist": 230, "pres": 1}"#).unwrap();
        assert!(m.pres);

        let m: RadarMessage = serde_json::from_str(r#"{"node": 15, "dist": 230, "pres": 0}"#).unwrap();
        assert!(!m.pres);
    }

    #[test]
    fn test_missing_fields_default() {
        // Presence-only transition messages omit dist
        let m: RadarMessage = serde_json::from_str(r#"{"node": 24, "pres": true}"#).unwrap();
        assert_eq!(m.dist, 0.0);
        assert!(m.pres);

        let m: RadarMessage = serde_json::from_str(r#"{"node": 24}"#).unwrap();
        assert!(!m.pres);
    }

    #[test]
    fn test_node_required() {
        assert!(serde_json::from_str::<RadarMessage>(r#"{"dist": 100, "pres": true}"#).is_err());
    }

    #[test]
    fn test_estimate_source_serializes_snake_case() {
        let json = serde_json::to_string(&EstimateSource::SingleSensorEstimate).unwrap();
        assert_eq!(json, r#""single_sensor_estimate""#);
        assert_eq!(EstimateSource::Trilateration.as_str(), "trilateration");
    }
}

//! Domain models - core types of the positioning engine
//!
//! This module contains the canonical data types used throughout the system:
//! - `SensorDefinition` - a mounted radar node (static registry entry)
//! - `RoomPolygon` - a named floor-plan region for classification
//! - `RadarReading` - one parsed distance/presence report from a node
//! - `PersonEstimate` - a solved occupant position with room and confidence
//! - `PositionUpdate` - the per-cycle output event

pub mod types;

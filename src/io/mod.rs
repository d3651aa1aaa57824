//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `mqtt` - MQTT client for receiving radar node readings
//! - `mqtt_egress` - MQTT publisher for egress events
//! - `egress_channel` - Typed channel for MQTT egress messages
//! - `prometheus` - Prometheus metrics HTTP endpoint

pub mod egress_channel;
pub mod mqtt;
pub mod mqtt_egress;
pub mod prometheus;

// Re-export commonly used types
pub use egress_channel::{create_egress_channel, EgressSender, UpdatePayload};
pub use mqtt_egress::MqttPublisher;

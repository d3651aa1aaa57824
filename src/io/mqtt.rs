//! MQTT client for receiving radar node readings
//!
//! Each radar node publishes one JSON reading per message. Readings are
//! parsed here and forwarded to the tracker channel with `try_send` so a
//! slow consumer can never stall the MQTT eventloop.

use crate::domain::types::{RadarMessage, RadarReading};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Start the MQTT client and send parsed readings to the channel
///
/// Dropped readings are counted in metrics and logged (rate-limited).
pub async fn start_mqtt_client(
    config: &Config,
    reading_tx: mpsc::Sender<RadarReading>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut mqttoptions = MqttOptions::new("radar-tracker", config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));

    // Set credentials if configured
    if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
        mqttoptions.set_credentials(username, password);
    }

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);
    client.subscribe(config.mqtt_topic(), QoS::AtMostOnce).await?;

    info!(topic = %config.mqtt_topic(), host = %config.mqtt_host(), port = %config.mqtt_port(), "MQTT client subscribed");

    // Rate-limit drop warnings to 1 per second
    let mut last_drop_warn = Instant::now() - Duration::from_secs(2);

    loop {
        tokio::select! {
            // Check for shutdown signal
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mqtt_shutdown");
                    return Ok(());
                }
            }
            // Process MQTT events
            result = eventloop.poll() => {
                match result {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let Some(reading) = parse_reading(&publish.payload) else {
                            metrics.record_reading_invalid();
                            debug!(topic = %publish.topic, "unparseable_reading_payload");
                            continue;
                        };

                        debug!(node = %reading.node, dist = %reading.raw_dist, presence = %reading.presence, "reading_received");
                        metrics.record_reading_received();
                        if let Err(e) = reading_tx.try_send(reading) {
                            match e {
                                TrySendError::Full(_) => {
                                    metrics.record_reading_dropped();
                                    if last_drop_warn.elapsed() > Duration::from_secs(1) {
                                        warn!("reading_dropped: channel full");
                                        last_drop_warn = Instant::now();
                                    }
                                }
                                TrySendError::Closed(_) => {
                                    warn!("Reading channel closed");
                                    return Ok(());
                                }
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "MQTT error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

/// Parse one reading payload
///
/// Returns None for payloads that are not valid UTF-8 JSON or lack the
/// node id; those never reach the store.
pub fn parse_reading(payload: &[u8]) -> Option<RadarReading> {
    let message: RadarMessage = serde_json::from_slice(payload).ok()?;
    Some(RadarReading::from_message(&message))
}

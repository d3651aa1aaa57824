//! Typed channel for MQTT egress messages
//!
//! Provides a non-blocking way to send events to the MQTT publisher.
//! Uses bounded mpsc channels to prevent unbounded memory growth.

use crate::domain::types::{epoch_ms, PersonEstimate, PositionUpdate};
use crate::infra::metrics::MetricsSummary;
use serde::Serialize;
use tokio::sync::mpsc;

/// Messages that can be sent to the MQTT publisher
#[derive(Debug)]
pub enum EgressMessage {
    /// Per-cycle position update for downstream consumers
    Update(UpdatePayload),
    /// Periodic metrics snapshot
    Metrics(MetricsPayload),
}

/// Payload for position updates
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePayload {
    /// Site identifier
    pub site: String,
    /// Whether any registered sensor currently reports presence
    pub presence: bool,
    /// Ranked person estimates, at most the configured cap
    pub persons: Vec<PersonEstimate>,
    /// Timestamp of the producing cycle (epoch ms)
    pub updated_at: u64,
}

/// Payload for metrics snapshot
#[derive(Debug, Serialize)]
pub struct MetricsPayload {
    /// Site identifier
    pub site: String,
    /// Timestamp (epoch ms)
    pub ts: u64,
    #[serde(flatten)]
    pub summary: MetricsSummary,
}

/// Sender handle for egress messages
///
/// Clone this to share across multiple producers.
/// Non-blocking - if the channel is full, messages are dropped.
#[derive(Clone)]
pub struct EgressSender {
    tx: mpsc::Sender<EgressMessage>,
    site_id: String,
}

impl EgressSender {
    /// Create a new sender from an mpsc sender
    pub fn new(tx: mpsc::Sender<EgressMessage>, site_id: String) -> Self {
        Self { tx, site_id }
    }

    /// Send a position update for publishing
    /// Includes site_id in the payload
    pub fn send_update(&self, update: &PositionUpdate) {
        let payload = UpdatePayload {
            site: self.site_id.clone(),
            presence: update.presence,
            persons: update.persons.clone(),
            updated_at: update.updated_at,
        };
        // Use try_send to avoid blocking - drop if channel full
        let _ = self.tx.try_send(EgressMessage::Update(payload));
    }

    /// Send a metrics snapshot
    pub fn send_metrics(&self, summary: MetricsSummary) {
        let payload = MetricsPayload { site: self.site_id.clone(), ts: epoch_ms(), summary };
        let _ = self.tx.try_send(EgressMessage::Metrics(payload));
    }
}

/// Create a new egress channel pair
///
/// Returns (sender, receiver) where sender can be cloned and shared.
/// Buffer size determines how many messages can be queued.
/// site_id is included in every payload for downstream consumers.
pub fn create_egress_channel(
    buffer_size: usize,
    site_id: String,
) -> (EgressSender, mpsc::Receiver<EgressMessage>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (EgressSender::new(tx, site_id), rx)
}

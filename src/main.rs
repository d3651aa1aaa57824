//! Radar tracker - indoor positioning engine for mmWave radar nodes
//!
//! Consumes per-node distance/presence readings over MQTT, maintains a TTL
//! cache of the latest reading per node, and recomputes occupant position
//! estimates on every reading.
//!
//! Module structure:
//! - `domain/` - Core types (SensorDefinition, RadarReading, PersonEstimate)
//! - `io/` - External interfaces (MQTT ingest/egress, Prometheus)
//! - `services/` - Positioning pipeline (store, solver, classifier, tracker)
//! - `infra/` - Infrastructure (Config, Metrics, Broker)

use clap::Parser;
use radar_tracker::infra::{Config, Metrics};
use radar_tracker::io::create_egress_channel;
use radar_tracker::io::MqttPublisher;
use radar_tracker::services::PersonTracker;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Radar tracker - multi-floor occupant positioning from radar readings
#[derive(Parser, Debug)]
#[command(name = "radar-tracker", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for per-reading visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "radar-tracker starting");

    // Parse command line arguments using clap
    let args = Args::parse();

    // Load configuration from TOML file
    let config = Config::load_from_path(&args.config);

    // Start embedded MQTT broker unless an external one is configured
    if config.broker_enabled() {
        radar_tracker::infra::broker::start_embedded_broker(&config);
    }

    info!(
        config_file = %config.config_file(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        mqtt_topic = %config.mqtt_topic(),
        sensors = %config.sensor_count(),
        rooms = %config.room_count(),
        ttl_presence_ms = %config.ttl_presence_ms(),
        ttl_absence_ms = %config.ttl_absence_ms(),
        max_persons = %config.max_persons(),
        prometheus_port = %config.prometheus_port(),
        "config_loaded"
    );

    // Sensor groups are configuration-only for now; surface them so a
    // missing group stands out in the log
    for (area, group) in config.groups() {
        info!(area = %area, floor = %group.floor, min_sensors = %group.min_sensors, "sensor_group");
    }

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Create shared metrics
    let metrics = Arc::new(Metrics::new());

    // Create reading channel (bounded for backpressure)
    let (reading_tx, reading_rx) = mpsc::channel(1000);

    // Start MQTT ingest client
    let mqtt_config = config.clone();
    let mqtt_metrics = metrics.clone();
    let mqtt_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) =
            radar_tracker::io::mqtt::start_mqtt_client(&mqtt_config, reading_tx, mqtt_metrics, mqtt_shutdown)
                .await
        {
            tracing::error!(error = %e, "MQTT client error");
        }
    });

    // Start Prometheus metrics HTTP server (if port > 0)
    let prometheus_port = config.prometheus_port();
    if prometheus_port > 0 {
        let prom_metrics = metrics.clone();
        let prom_site = config.site_id().to_string();
        let prom_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = radar_tracker::io::prometheus::start_metrics_server(
                prometheus_port,
                prom_metrics,
                prom_site,
                prom_shutdown,
            )
            .await
            {
                tracing::error!(error = %e, "Prometheus metrics server error");
            }
        });
    }

    // Start metrics reporter (lock-free reads with full summary)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Create MQTT egress channel and publisher (if enabled)
    let egress_sender = if config.egress_enabled() {
        let (egress_sender, egress_rx) = create_egress_channel(1000, config.site_id().to_string());

        // Start MQTT egress publisher
        let publisher = MqttPublisher::new(&config, egress_rx);
        let publisher_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            publisher.run(publisher_shutdown).await;
        });

        // Publish metrics snapshots on the egress topic as well
        let metrics_egress = egress_sender.clone();
        let metrics_for_egress = metrics.clone();
        let egress_interval = config.egress_metrics_interval_secs();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(egress_interval));
            loop {
                interval.tick().await;
                metrics_egress.send_metrics(metrics_for_egress.report());
            }
        });

        Some(egress_sender)
    } else {
        None
    };

    // Start tracker (main reading processing loop)
    let mut tracker = PersonTracker::new(config, metrics, egress_sender);
    info!("tracker_started");

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run tracker - consumes readings until channel closes
    tracker.run(reading_rx).await;

    info!("radar-tracker shutdown complete");
    Ok(())
}

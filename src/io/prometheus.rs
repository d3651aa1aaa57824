//! Prometheus metrics HTTP endpoint
//!
//! Exposes tracker metrics in Prometheus text format at /metrics.
//! Uses hyper for the HTTP server.

use crate::infra::metrics::{Metrics, MetricsSummary};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Render all tracker metrics in Prometheus text format
fn format_prometheus_metrics(summary: &MetricsSummary, site: &str) -> String {
    let mut output = String::with_capacity(2048);

    write_metric(
        &mut output,
        "radar_readings_received_total",
        "Readings parsed from MQTT",
        MetricType::Counter,
        site,
        summary.readings_received,
    );
    write_metric(
        &mut output,
        "radar_readings_invalid_total",
        "Payloads that failed to parse",
        MetricType::Counter,
        site,
        summary.readings_invalid,
    );
    write_metric(
        &mut output,
        "radar_readings_dropped_total",
        "Readings dropped on a full tracker channel",
        MetricType::Counter,
        site,
        summary.readings_dropped,
    );
    write_metric(
        &mut output,
        "radar_readings_unknown_node_total",
        "Readings for unregistered node ids",
        MetricType::Counter,
        site,
        summary.readings_unknown_node,
    );
    write_metric(
        &mut output,
        "radar_sweep_evictions_total",
        "Cache entries evicted by the TTL sweep",
        MetricType::Counter,
        site,
        summary.sweep_evictions,
    );
    write_metric(
        &mut output,
        "radar_updates_emitted_total",
        "Position updates emitted",
        MetricType::Counter,
        site,
        summary.updates_emitted,
    );
    write_metric(
        &mut output,
        "radar_estimates_single_total",
        "Estimates from the single-sensor fallback",
        MetricType::Counter,
        site,
        summary.estimates_single,
    );
    write_metric(
        &mut output,
        "radar_estimates_multi_total",
        "Estimates from the multi-sensor solve",
        MetricType::Counter,
        site,
        summary.estimates_multi,
    );
    write_metric(
        &mut output,
        "radar_solves_discarded_total",
        "Floor solves discarded for non-finite coordinates",
        MetricType::Counter,
        site,
        summary.solves_discarded,
    );
    write_metric(
        &mut output,
        "radar_process_latency_avg_us",
        "Average per-reading processing latency",
        MetricType::Gauge,
        site,
        summary.avg_process_latency_us,
    );
    write_metric(
        &mut output,
        "radar_process_latency_max_us",
        "Max per-reading processing latency",
        MetricType::Gauge,
        site,
        summary.max_process_latency_us,
    );

    output
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    metrics: Arc<Metrics>,
    site_id: Arc<String>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let output = format_prometheus_metrics(&metrics.report(), &site_id);
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(output)))
                .expect("static response should not fail"))
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

/// Start the Prometheus metrics HTTP server
pub async fn start_metrics_server(
    port: u16,
    metrics: Arc<Metrics>,
    site_id: String,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    let site_id = Arc::new(site_id);

    info!(port = %port, site = %site_id, "prometheus_metrics_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let metrics = metrics.clone();
                        let site_id = site_id.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let metrics = metrics.clone();
                                let site_id = site_id.clone();
                                async move { handle_request(req, metrics, site_id).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "prometheus_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "prometheus_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("prometheus_metrics_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Metrics::new();
        metrics.record_reading_received();
        metrics.record_reading_received();
        metrics.record_update_emitted();
        metrics.record_reading_processed(150);

        let output = format_prometheus_metrics(&metrics.report(), "home");

        assert!(output.contains("radar_readings_received_total{site=\"home\"} 2"));
        assert!(output.contains("radar_updates_emitted_total{site=\"home\"} 1"));
        assert!(output.contains("# TYPE radar_process_latency_avg_us gauge"));
        assert!(output.contains("radar_process_latency_max_us{site=\"home\"} 150"));
    }
}

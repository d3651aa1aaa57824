//! Radar simulation - synthetic reading publisher
//!
//! Walks a virtual occupant along a scripted path and publishes the
//! readings the registered sensors would produce, for local testing
//! against a running tracker.
//!
//! Usage:
//!   cargo run --bin radar-sim -- --config config/dev.toml

use clap::Parser;
use radar_tracker::domain::types::SensorDefinition;
use radar_tracker::infra::Config;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde_json::json;
use std::time::Duration;

/// Sensors farther than this from the virtual occupant report absence,
/// mirroring real node behavior
const DETECT_RANGE_M: f64 = 6.0;

/// Assumed occupant height used to synthesize slant distances
const PERSON_HEIGHT_M: f64 = 0.90;

#[derive(Parser, Debug)]
#[command(name = "radar-sim")]
#[command(about = "Synthetic radar reading publisher for local testing")]
struct Args {
    /// Config file path (sensor registry and broker address)
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Floor the virtual occupant walks on
    #[arg(long, default_value = "0")]
    floor: u8,

    /// Milliseconds between walk steps
    #[arg(long, default_value = "500")]
    interval_ms: u64,

    /// Number of laps around the path (0 = forever)
    #[arg(long, default_value = "1")]
    laps: u32,
}

/// Waypoints of the scripted walk, planar (x, z)
const PATH: &[(f64, f64)] = &[
    (2.0, 1.0),
    (2.0, 2.5),
    (1.5, 4.0),
    (2.0, 6.0),
    (3.0, 8.0),
    (3.5, 9.5),
    (3.0, 8.0),
    (2.0, 6.0),
    (1.5, 4.0),
    (2.0, 2.5),
];

/// Slant distance in device units from a sensor to the occupant
fn raw_slant(sensor: &SensorDefinition, px: f64, pz: f64, floor_height: f64) -> f64 {
    let planar = (px - sensor.x).hypot(pz - sensor.z);
    let dy = sensor.y - (floor_height + PERSON_HEIGHT_M);
    let slant = (planar * planar + dy * dy).sqrt();
    (slant * 100.0).round()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    let sensors: Vec<SensorDefinition> = config
        .sensors_on_floor(args.floor)
        .iter()
        .map(|s| s.as_ref().clone())
        .collect();
    if sensors.is_empty() {
        eprintln!("no sensors registered on floor {}", args.floor);
        std::process::exit(1);
    }
    let floor_height = config.floor_height(args.floor);

    let mut mqttoptions =
        MqttOptions::new("radar-sim", config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 64);

    // Keep the eventloop alive in the background
    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                eprintln!("mqtt error: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    });

    println!(
        "publishing walk on floor {} ({} sensors, {}ms steps)",
        args.floor,
        sensors.len(),
        args.interval_ms
    );

    let mut lap = 0u32;
    loop {
        for &(px, pz) in PATH {
            for sensor in &sensors {
                let planar = (px - sensor.x).hypot(pz - sensor.z);
                let present = planar <= DETECT_RANGE_M;
                let payload = json!({
                    "node": sensor.node.0,
                    "dist": if present { raw_slant(sensor, px, pz, floor_height) } else { 0.0 },
                    "pres": present,
                });
                let topic = format!("radar/{}/reading", sensor.node.0);
                client.publish(topic, QoS::AtMostOnce, false, payload.to_string()).await?;
            }
            println!("occupant at ({:.1}, {:.1})", px, pz);
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }

        lap += 1;
        if args.laps != 0 && lap >= args.laps {
            break;
        }
    }

    // Let the final publishes flush before dropping the client
    tokio::time::sleep(Duration::from_millis(250)).await;
    Ok(())
}

//! Integration tests for configuration loading

use radar_tracker::domain::types::NodeId;
use radar_tracker::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[site]
id = "test-site"

[mqtt]
host = "test-host"
port = 1884
topic = "test/+/reading"

[engine]
ttl_presence_ms = 4000
ttl_absence_ms = 2000
person_height_m = 1.10
max_persons = 2

[metrics]
interval_secs = 15
prometheus_port = 9091

[groups.landing]
floor = 1
min_sensors = 2

[[sensors]]
node = 15
label = "Hallway"
x = 2.20
y = 0.50
z = 2.05
floor = 0
valid_rooms = ["hall", "toilet"]

[[rooms]]
id = "hall"
floor = 0
polygon = [[0.0, 0.0], [2.4, 0.0], [2.4, 2.9], [0.0, 2.9]]
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "test-site");
    assert_eq!(config.mqtt_host(), "test-host");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.mqtt_topic(), "test/+/reading");
    assert_eq!(config.ttl_presence_ms(), 4000);
    assert_eq!(config.ttl_absence_ms(), 2000);
    assert_eq!(config.person_height_m(), 1.10);
    assert_eq!(config.max_persons(), 2);
    assert_eq!(config.prometheus_port(), 9091);

    let sensor = config.sensor(NodeId(15)).expect("sensor 15 registered");
    assert_eq!(sensor.label, "Hallway");
    assert_eq!(sensor.floor, 0);
    assert_eq!(sensor.valid_rooms, vec!["hall", "toilet"]);

    assert_eq!(config.rooms_on_floor(0).len(), 1);
    assert_eq!(config.rooms_on_floor(0)[0].id, "hall");

    let group = &config.groups()["landing"];
    assert_eq!(group.floor, 1);
    assert_eq!(group.min_sensors, 2);
}

#[test]
fn test_engine_defaults_when_section_omitted() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(
            br#"
[mqtt]
host = "localhost"
port = 1883
"#,
        )
        .unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.ttl_presence_ms(), 5000);
    assert_eq!(config.ttl_absence_ms(), 3000);
    assert_eq!(config.dist_unit(), 0.01);
    assert_eq!(config.single_sensor_bias_m(), 0.5);
    assert_eq!(config.max_persons(), 3);
    assert_eq!(config.mqtt_topic(), "radar/+/reading");
    assert!(config.broker_enabled());
    assert!(config.egress_enabled());
}

#[test]
fn test_room_declaration_order_preserved() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(
            br#"
[mqtt]
host = "localhost"
port = 1883

[[rooms]]
id = "toilet"
floor = 0
polygon = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.3], [0.0, 1.3]]

[[rooms]]
id = "hall"
floor = 0
polygon = [[0.0, 0.0], [2.4, 0.0], [2.4, 2.9], [0.0, 2.9]]

[[rooms]]
id = "gym"
floor = 1
polygon = [[0.0, 0.0], [4.9, 0.0], [4.9, 2.9], [0.0, 2.9]]
"#,
        )
        .unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    // Order within a floor is the classification tie-break; it must
    // survive loading exactly as declared
    let floor0: Vec<&str> = config.rooms_on_floor(0).iter().map(|r| r.id.as_str()).collect();
    assert_eq!(floor0, vec!["toilet", "hall"]);
    assert_eq!(config.rooms_on_floor(1).len(), 1);
    assert_eq!(config.room_count(), 3);
}

#[test]
fn test_load_from_path_fallback() {
    // Missing file falls back to defaults instead of failing startup
    let config = Config::load_from_path("/nonexistent/path/config.toml");
    assert_eq!(config.mqtt_host(), "localhost");
    assert_eq!(config.sensor_count(), 0);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_malformed_toml_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[mqtt\nhost = ").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

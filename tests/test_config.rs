//! Tests for `tco::config` - TOML parsing, threshold defaults,
//! device settings and error handling.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

use tco::config::{GestureThresholds, HostConfig, OverlayConfig, parse_config_file};

// ── Helpers ──────────────────────────────────────────────────

/// Write TOML to a temp file and parse it.
fn load(toml_content: &str) -> HostConfig {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(toml_content.as_bytes()).unwrap();
    f.flush().unwrap();
    parse_config_file(f.path()).unwrap()
}

/// Parse raw TOML that is expected to fail.
fn load_err(toml_content: &str) -> String {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(toml_content.as_bytes()).unwrap();
    f.flush().unwrap();
    parse_config_file(f.path()).unwrap_err().to_string()
}

// ── Error handling ───────────────────────────────────────────

#[test]
fn test_file_not_found() {
    let msg = parse_config_file(std::path::Path::new("/no/such/file.toml"))
        .unwrap_err()
        .to_string();
    assert!(msg.contains("Failed to read config file"));
    assert!(msg.contains("/no/such/file.toml"));
}

#[test]
fn test_invalid_toml() {
    let msg = load_err("this is not valid toml [[[");
    assert!(msg.contains("Failed to parse config file"));
}

#[test]
fn test_wrong_type_is_parse_error() {
    let msg = load_err("[overlay]\nmax_controls = \"eight\"\n");
    assert!(msg.contains("Failed to parse config file"));
}

#[test]
fn test_zero_max_controls_rejected() {
    let msg = load_err("[overlay]\nmax_controls = 0\n");
    assert!(msg.contains("max_controls must be greater than 0"));
}

#[test]
fn test_huge_max_controls_rejected() {
    let msg = load_err("[overlay]\nmax_controls = 100000000000\n");
    assert!(msg.contains("max_controls must be at most 256"));
    assert_eq!(load("[overlay]\nmax_controls = 256\n").overlay.max_controls, 256);
}

#[test]
fn test_zero_tap_time_rejected() {
    let msg = load_err("[thresholds]\ntap_time_ms = 0\n");
    assert!(msg.contains("tap_time_ms"));
}

#[test]
fn test_negative_jitter_rejected() {
    let msg = load_err("[thresholds]\njitter_distance = -1\n");
    assert!(msg.contains("jitter_distance must not be negative"));
}

#[test]
fn test_swipe_pct_out_of_range_rejected() {
    let msg = load_err("[device]\nswipe_distance_pct = 1.5\n");
    assert!(msg.contains("swipe_distance_pct"));
}

// ── Defaults ─────────────────────────────────────────────────

#[test]
fn test_empty_file_uses_defaults() {
    let config = load("");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.log_file, None);
    assert_eq!(config.overlay, OverlayConfig::default());
    assert_eq!(config.overlay.max_controls, 8);
    assert_eq!(config.default_layout, None);
    assert_eq!(config.user_layout, None);
    assert_eq!(config.device.device_usb_id, None);
    assert_eq!(config.device.edge_band, 30);
    assert_eq!(config.device.swipe_time_max, Duration::from_millis(900));
}

#[test]
fn test_default_thresholds() {
    let thresholds = GestureThresholds::default();
    assert_eq!(thresholds.tap, Duration::from_millis(150));
    assert_eq!(thresholds.jitter, 10);
    assert_eq!(thresholds.hold, Duration::from_millis(300));
}

#[test]
fn test_hold_defaults_to_twice_tap() {
    let config = load("[thresholds]\ntap_time_ms = 200\n");
    assert_eq!(config.overlay.thresholds.tap, Duration::from_millis(200));
    assert_eq!(config.overlay.thresholds.hold, Duration::from_millis(400));
}

// ── Full file ────────────────────────────────────────────────

#[test]
fn test_full_config() {
    let config = load(
        r#"
[global]
log_level = "debug"
log_file = "/tmp/tco.log"

[overlay]
max_controls = 12
default_layout = "/usr/share/tco/controls.json"
user_layout = "/home/user/.config/tco/controls.json"

[thresholds]
tap_time_ms = 100
jitter_distance = 4
hold_time_ms = 500

[device]
device_usb_id = "USB:1234:ABCD"
edge_band = 40
swipe_distance_pct = 0.2
swipe_time_max_ms = 600
"#,
    );

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.log_file.as_deref(), Some("/tmp/tco.log"));
    assert_eq!(config.overlay.max_controls, 12);
    assert_eq!(
        config.overlay.thresholds,
        GestureThresholds {
            tap: Duration::from_millis(100),
            jitter: 4,
            hold: Duration::from_millis(500),
        }
    );
    assert_eq!(
        config.default_layout,
        Some(PathBuf::from("/usr/share/tco/controls.json"))
    );
    assert_eq!(
        config.user_layout,
        Some(PathBuf::from("/home/user/.config/tco/controls.json"))
    );
    assert_eq!(config.device.device_usb_id.as_deref(), Some("USB:1234:ABCD"));
    assert_eq!(config.device.edge_band, 40);
    assert!((config.device.swipe_distance_pct - 0.2).abs() < f64::EPSILON);
    assert_eq!(config.device.swipe_time_max, Duration::from_millis(600));
}

#[test]
fn test_empty_usb_id_means_any_device() {
    let config = load("[device]\ndevice_usb_id = \"\"\n");
    assert_eq!(config.device.device_usb_id, None);
}

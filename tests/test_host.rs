//! Tests for the device-independent half of `tco::host`: building the
//! overlay from a config and routing assembled touches through edge-swipe
//! detection.
use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use tco::config::{DeviceSettings, HostConfig, OverlayConfig};
use tco::event::TouchPhase::{Move, Release, Touch};
use tco::event::{EdgeSwipeDetector, TouchEvent};
use tco::host::{build_overlay, log_actions, route_touch};
use tco::sink::{InputAction, ScreenGesture};

// -- Helpers --------------------------------------------------

const SCREEN_LAYOUT: &str = r#"{ "version": 1, "controls": [
    { "type": "touchscreen", "id": 1, "x": 0, "y": 0, "width": 480, "height": 800 }
] }"#;

fn config(dir: &TempDir) -> HostConfig {
    let default = dir.path().join("controls.json");
    fs::write(&default, SCREEN_LAYOUT).unwrap();
    HostConfig {
        log_level: "info".into(),
        log_file: None,
        overlay: OverlayConfig::default(),
        default_layout: Some(default),
        user_layout: Some(dir.path().join("user.json")),
        device: DeviceSettings::default(),
    }
}

fn at(phase: tco::event::TouchPhase, x: i32, y: i32, ms: u64) -> TouchEvent {
    TouchEvent::new(phase, 0, x, y, Duration::from_millis(ms))
}

fn detector() -> EdgeSwipeDetector {
    EdgeSwipeDetector::new(30, 120, Duration::from_millis(900))
}

// -- Tests ----------------------------------------------------

#[test]
fn test_build_overlay_loads_configured_layout() {
    let dir = TempDir::new().unwrap();
    let (overlay, host) = build_overlay(&config(&dir), 480, 800);
    assert_eq!(overlay.controls().len(), 1);
    assert_eq!(
        overlay.compositor().window(host).unwrap().geometry.buffer_size,
        (480, 800)
    );
}

#[test]
fn test_build_overlay_without_layout_has_no_controls() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.default_layout = None;
    config.user_layout = None;
    let (overlay, _) = build_overlay(&config, 480, 800);
    assert!(overlay.controls().is_empty());
}

#[test]
fn test_plain_touches_reach_controls() {
    let dir = TempDir::new().unwrap();
    let (mut overlay, host) = build_overlay(&config(&dir), 480, 800);
    let mut det = detector();

    route_touch(&mut overlay, host, &mut det, at(Touch, 100, 100, 0));
    route_touch(&mut overlay, host, &mut det, at(Release, 100, 100, 50));
    assert_eq!(
        overlay.sink_mut().drain(),
        vec![InputAction::TouchScreen(100, 100, ScreenGesture::Tap)]
    );
}

#[test]
fn test_edge_swipe_toggles_editing_and_saves() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let (mut overlay, host) = build_overlay(&config, 480, 800);
    let mut det = detector();

    route_touch(&mut overlay, host, &mut det, at(Touch, 200, 5, 0));
    route_touch(&mut overlay, host, &mut det, at(Move, 200, 200, 100));
    assert!(overlay.is_editing());
    route_touch(&mut overlay, host, &mut det, at(Release, 200, 220, 150));
    assert!(overlay.sink().is_empty());

    route_touch(&mut overlay, host, &mut det, at(Touch, 200, 5, 1000));
    route_touch(&mut overlay, host, &mut det, at(Move, 200, 200, 1100));
    assert!(!overlay.is_editing());
    assert!(config.user_layout.as_ref().unwrap().exists());

    log_actions(&mut overlay);
    assert!(overlay.sink().is_empty());
}

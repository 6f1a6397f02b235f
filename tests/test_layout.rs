//! Tests for `tco::layout` - JSON layout parsing, validation, load
//! precedence and save round-trips.
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use tco::config::{OverlayConfig, OverlayError};
use tco::control::ControlKind;
use tco::geometry::Rect;
use tco::layout::{LAYOUT_VERSION, LabelDoc, parse_layout, read_layout, resolve_layout, write_layout};
use tco::overlay::Overlay;
use tco::sink::{KeyBinding, MouseBinding, QueuedSink};
use tco::surface::HeadlessCompositor;

// -- Helpers --------------------------------------------------

const FULL_LAYOUT: &str = r#"{
  "version": 1,
  "controls": [
    { "type": "key", "id": 1, "x": 10, "y": 600, "width": 80, "height": 80,
      "symbol": 32, "modifier": 4, "scancode": 57, "unicode": 32,
      "label": { "x": 0, "y": 0, "width": 80, "height": 80, "alpha": 128,
                 "image": "space.png" } },
    { "type": "dpad", "id": 2, "x": 20, "y": 300, "width": 150, "height": 150 },
    { "type": "toucharea", "id": 3, "x": 200, "y": 0, "width": 280, "height": 300,
      "tapSensitive": 1 },
    { "type": "mousebutton", "id": 4, "x": 380, "y": 600, "width": 60, "height": 60,
      "button": 1, "mask": 256 },
    { "type": "touchscreen", "id": 5, "x": 0, "y": 0, "width": 480, "height": 200 }
  ]
}"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn layout_with_ids(ids: &[i32]) -> String {
    let controls: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                r#"{{ "type": "dpad", "id": {id}, "x": 0, "y": 0, "width": 10, "height": 10 }}"#
            )
        })
        .collect();
    format!(
        r#"{{ "version": {LAYOUT_VERSION}, "controls": [{}] }}"#,
        controls.join(",")
    )
}

fn ids(path: &Path) -> Vec<i32> {
    read_layout(path).unwrap().iter().map(|d| d.id).collect()
}

// -- Parsing --------------------------------------------------

#[test]
fn test_parse_every_control_type() {
    let defs = parse_layout(FULL_LAYOUT).unwrap();
    assert_eq!(defs.len(), 5);

    assert_eq!(
        defs[0].kind,
        ControlKind::Key(KeyBinding {
            symbol: 32,
            modifier: 4,
            scancode: 57,
            unicode: 32,
        })
    );
    assert_eq!(defs[0].rect, Rect::new(10, 600, 80, 80));
    let label = defs[0].label.as_ref().unwrap();
    assert_eq!(label.rect, Rect::new(0, 0, 80, 80));
    assert_eq!(label.alpha, 128);
    assert_eq!(label.image.as_deref(), Some(Path::new("space.png")));

    assert_eq!(defs[1].kind, ControlKind::DPad);
    assert!(defs[1].label.is_none());
    assert_eq!(
        defs[2].kind,
        ControlKind::TouchArea {
            tap_sensitive: true
        }
    );
    assert_eq!(
        defs[3].kind,
        ControlKind::MouseButton(MouseBinding {
            button: 1,
            mask: 256
        })
    );
    assert_eq!(defs[4].kind, ControlKind::TouchScreen);
}

#[test]
fn test_missing_properties_default_to_zero() {
    let defs =
        parse_layout(r#"{ "version": 1, "controls": [ { "type": "key", "id": 9 } ] }"#).unwrap();
    assert_eq!(defs[0].kind, ControlKind::Key(KeyBinding::default()));
    assert_eq!(defs[0].rect, Rect::default());
}

#[test]
fn test_touch_area_taps_unless_disabled() {
    let defs = parse_layout(
        r#"{ "version": 1, "controls": [
            { "type": "toucharea", "id": 1 },
            { "type": "toucharea", "id": 2, "tapSensitive": 0 }
        ] }"#,
    )
    .unwrap();
    assert_eq!(
        defs[0].kind,
        ControlKind::TouchArea {
            tap_sensitive: true
        }
    );
    assert_eq!(
        defs[1].kind,
        ControlKind::TouchArea {
            tap_sensitive: false
        }
    );
}

#[test]
fn test_empty_label_size_is_rejected() {
    let err = parse_layout(
        r#"{ "version": 1, "controls": [
            { "type": "key", "id": 4, "width": 10, "height": 10,
              "label": { "width": 0, "height": 20, "alpha": 255 } }
        ] }"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("label of control 4 has invalid size 0x20"));
}

#[test]
fn test_version_mismatch_is_rejected() {
    let err = parse_layout(r#"{ "version": 2, "controls": [] }"#).unwrap_err();
    assert!(matches!(
        err,
        OverlayError::VersionMismatch {
            found: 2,
            expected: LAYOUT_VERSION
        }
    ));
}

#[test]
fn test_missing_version_is_rejected() {
    let err = parse_layout(r#"{ "controls": [] }"#).unwrap_err();
    assert!(matches!(err, OverlayError::VersionMismatch { found: 0, .. }));
}

#[test]
fn test_unknown_type_fails_whole_document() {
    let err = parse_layout(
        r#"{ "version": 1, "controls": [
            { "type": "dpad", "id": 1 },
            { "type": "joystick", "id": 2 }
        ] }"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("unknown control type 'joystick'"));
}

#[test]
fn test_malformed_json() {
    let err = parse_layout("{ not json").unwrap_err();
    assert!(matches!(err, OverlayError::LayoutParse { .. }));
}

#[test]
fn test_parse_error_names_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "broken.json", "[]");
    let msg = read_layout(&path).unwrap_err().to_string();
    assert!(msg.contains("broken.json"));
}

#[test]
fn test_label_alpha_is_clamped() {
    let doc = LabelDoc {
        alpha: 300,
        ..Default::default()
    };
    assert_eq!(doc.to_spec().alpha, 255);
    let doc = LabelDoc {
        alpha: -4,
        image: Some(String::new()),
        ..Default::default()
    };
    let spec = doc.to_spec();
    assert_eq!(spec.alpha, 0);
    assert_eq!(spec.image, None);
}

// -- Load precedence ------------------------------------------

#[test]
fn test_user_layout_wins() {
    let dir = TempDir::new().unwrap();
    let default = write_file(&dir, "default.json", &layout_with_ids(&[1]));
    let user = write_file(&dir, "user.json", &layout_with_ids(&[2, 3]));

    let (defs, source) = resolve_layout(Some(default.as_path()), Some(user.as_path())).unwrap();
    assert_eq!(defs.iter().map(|d| d.id).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(source, user);
}

#[test]
fn test_invalid_user_layout_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let default = write_file(&dir, "default.json", &layout_with_ids(&[1]));
    let user = write_file(&dir, "user.json", r#"{ "version": 0, "controls": [] }"#);

    let (defs, source) = resolve_layout(Some(default.as_path()), Some(user.as_path())).unwrap();
    assert_eq!(defs.len(), 1);
    assert_eq!(source, default);

    let sizeless_label = write_file(
        &dir,
        "labelled.json",
        r#"{ "version": 1, "controls": [
            { "type": "key", "id": 9, "width": 10, "height": 10, "label": {} }
        ] }"#,
    );
    let mut overlay = Overlay::new(
        OverlayConfig::default(),
        HeadlessCompositor::new(),
        QueuedSink::new(),
    );
    assert_eq!(
        overlay
            .load_controls(Some(default.as_path()), Some(sizeless_label.as_path()))
            .unwrap(),
        1
    );
    assert_eq!(overlay.controls()[0].id(), 1);

    let missing = dir.path().join("missing.json");
    let (_, source) = resolve_layout(Some(default.as_path()), Some(missing.as_path())).unwrap();
    assert_eq!(source, default);
}

#[test]
fn test_no_layout_paths() {
    let err = resolve_layout(None, None).unwrap_err();
    assert!(matches!(err, OverlayError::NoLayout));
}

#[test]
fn test_no_readable_layout_reports_last_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let err = resolve_layout(Some(missing.as_path()), None).unwrap_err();
    assert!(matches!(err, OverlayError::LayoutRead { .. }));
}

// -- Saving ---------------------------------------------------

#[test]
fn test_save_and_reload_round_trip() {
    let dir = TempDir::new().unwrap();
    let original = write_file(&dir, "original.json", FULL_LAYOUT);
    let saved = dir.path().join("nested").join("saved.json");

    let mut compositor = HeadlessCompositor::new();
    compositor.create_host_window((0, 0), (480, 800), (480, 800));
    let mut overlay = Overlay::new(OverlayConfig::default(), compositor, QueuedSink::new());
    assert_eq!(overlay.load_controls(Some(original.as_path()), None).unwrap(), 5);
    overlay.save_controls(Some(saved.as_path())).unwrap();

    assert_eq!(read_layout(&saved).unwrap(), read_layout(&original).unwrap());

    let text = fs::read_to_string(&saved).unwrap();
    assert!(text.contains("\"tapSensitive\": 1"));
    assert!(text.contains("\"version\": 1"));
}

#[test]
fn test_save_without_path_is_noop() {
    let overlay = Overlay::new(
        OverlayConfig::default(),
        HeadlessCompositor::new(),
        QueuedSink::new(),
    );
    assert!(overlay.save_controls(None).is_ok());
}

#[test]
fn test_save_defaults_to_user_layout_path() {
    let dir = TempDir::new().unwrap();
    let default = write_file(&dir, "default.json", &layout_with_ids(&[4, 5]));
    let user = dir.path().join("user.json");

    let mut overlay = Overlay::new(
        OverlayConfig::default(),
        HeadlessCompositor::new(),
        QueuedSink::new(),
    );
    overlay
        .load_controls(Some(default.as_path()), Some(user.as_path()))
        .unwrap();
    overlay.save_controls(None).unwrap();
    assert_eq!(ids(&user), vec![4, 5]);
}

#[test]
fn test_write_empty_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.json");
    write_layout(&path, &[]).unwrap();
    assert!(read_layout(&path).unwrap().is_empty());
}

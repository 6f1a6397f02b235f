//! Configuration data structures, TOML parsing and the crate error type.
//!
//! The host config file uses TOML format. Example:
//!
//! ```toml
//! [global]
//! log_level = "info"
//!
//! [overlay]
//! max_controls = 8
//! default_layout = "/usr/share/tco/controls.json"
//! user_layout = "/home/user/.config/tco/controls.json"
//!
//! [thresholds]
//! tap_time_ms = 150
//! jitter_distance = 10
//! hold_time_ms = 300
//!
//! [device]
//! device_usb_id = "1234:5678"
//! edge_band = 30
//! swipe_distance_pct = 0.15
//! swipe_time_max_ms = 900
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// Top-level error type used throughout the crate.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read layout file {path}: {source}")]
    LayoutRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse layout file {path}: {message}")]
    LayoutParse { path: PathBuf, message: String },

    #[error("Invalid layout file version: {found} (expected {expected})")]
    VersionMismatch { found: i64, expected: i64 },

    #[error("No layout file could be loaded")]
    NoLayout,

    #[error("Failed to write layout file {path}: {source}")]
    LayoutWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Too many controls defined (maximum {max})")]
    CapacityExceeded { max: usize },

    #[error("Compositor error: {0}")]
    Surface(String),

    #[error("Failed to load image {path}: {message}")]
    Image { path: PathBuf, message: String },
}

// -- Library-facing configuration -----------------------------

/// Timing and distance thresholds for touch-area and touchscreen gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureThresholds {
    /// Releases sooner than this after touch-down are taps.
    pub tap: Duration,
    /// Manhattan distance (px) a touchscreen contact may wander and still tap.
    pub jitter: i32,
    /// Stationary contacts older than this become holds.
    pub hold: Duration,
}

impl GestureThresholds {
    pub const TAP: Duration = Duration::from_millis(150);
    pub const JITTER: i32 = 10;
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            tap: Self::TAP,
            jitter: Self::JITTER,
            hold: Self::TAP * 2,
        }
    }
}

/// Settings consumed by [`crate::overlay::Overlay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Controls beyond this count are rejected.
    pub max_controls: usize,
    pub thresholds: GestureThresholds,
}

impl OverlayConfig {
    pub const DEFAULT_MAX_CONTROLS: usize = 8;
    /// Largest accepted `max_controls`.
    pub const MAX_CONTROLS_LIMIT: usize = 256;
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            max_controls: Self::DEFAULT_MAX_CONTROLS,
            thresholds: GestureThresholds::default(),
        }
    }
}

// -- Raw TOML -------------------------------------------------

/// Root of the TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    global: RawGlobal,
    overlay: RawOverlay,
    thresholds: RawThresholds,
    device: RawDevice,
}

/// The `[global]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobal {
    log_level: Option<String>,
    log_file: Option<String>,
}

/// The `[overlay]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawOverlay {
    max_controls: Option<usize>,
    default_layout: Option<PathBuf>,
    user_layout: Option<PathBuf>,
}

/// Threshold values - all optional, missing ones take the built-in defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawThresholds {
    tap_time_ms: Option<u64>,
    jitter_distance: Option<i32>,
    hold_time_ms: Option<u64>,
}

/// The `[device]` section, only used by the demo host.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDevice {
    device_usb_id: Option<String>,
    edge_band: Option<i32>,
    swipe_distance_pct: Option<f64>,
    swipe_time_max_ms: Option<u64>,
}

/// Touchscreen settings for the demo host.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettings {
    pub device_usb_id: Option<String>,
    /// Height (px) of the top band a swipe-down must start in.
    pub edge_band: i32,
    /// Fraction of the screen height a swipe-down must travel.
    pub swipe_distance_pct: f64,
    pub swipe_time_max: Duration,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            device_usb_id: None,
            edge_band: 30,
            swipe_distance_pct: 0.15,
            swipe_time_max: Duration::from_millis(900),
        }
    }
}

/// Top-level parsed configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub overlay: OverlayConfig,
    pub default_layout: Option<PathBuf>,
    pub user_layout: Option<PathBuf>,
    pub device: DeviceSettings,
}

impl RawThresholds {
    fn into_validated(self) -> Result<GestureThresholds, OverlayError> {
        let defaults = GestureThresholds::default();
        let tap = self
            .tap_time_ms
            .map_or(defaults.tap, Duration::from_millis);
        if tap.is_zero() {
            return Err(OverlayError::InvalidConfig(
                "tap_time_ms must be greater than 0".into(),
            ));
        }

        let jitter = self.jitter_distance.unwrap_or(defaults.jitter);
        if jitter < 0 {
            return Err(OverlayError::InvalidConfig(format!(
                "jitter_distance must not be negative (got {jitter})"
            )));
        }

        Ok(GestureThresholds {
            tap,
            jitter,
            hold: self.hold_time_ms.map_or(tap * 2, Duration::from_millis),
        })
    }
}

impl RawDevice {
    fn into_validated(self) -> Result<DeviceSettings, OverlayError> {
        let defaults = DeviceSettings::default();
        let swipe_distance_pct = self
            .swipe_distance_pct
            .unwrap_or(defaults.swipe_distance_pct);
        if !(0.0..=1.0).contains(&swipe_distance_pct) {
            return Err(OverlayError::InvalidConfig(format!(
                "swipe_distance_pct must be within 0..1 (got {swipe_distance_pct})"
            )));
        }

        Ok(DeviceSettings {
            device_usb_id: self.device_usb_id.filter(|s| !s.is_empty()),
            edge_band: self.edge_band.unwrap_or(defaults.edge_band),
            swipe_distance_pct,
            swipe_time_max: self
                .swipe_time_max_ms
                .map_or(defaults.swipe_time_max, Duration::from_millis),
        })
    }
}

/// Parse a TOML config file and return the fully resolved `HostConfig`.
pub fn parse_config_file(path: &Path) -> Result<HostConfig, OverlayError> {
    let raw: RawConfig =
        toml::from_str(
            &fs::read_to_string(path).map_err(|e| OverlayError::ConfigRead {
                path: path.to_path_buf(),
                source: e,
            })?,
        )
        .map_err(|e| OverlayError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let max_controls = raw
        .overlay
        .max_controls
        .unwrap_or(OverlayConfig::DEFAULT_MAX_CONTROLS);
    if max_controls == 0 {
        return Err(OverlayError::InvalidConfig(
            "max_controls must be greater than 0".into(),
        ));
    }
    if max_controls > OverlayConfig::MAX_CONTROLS_LIMIT {
        return Err(OverlayError::InvalidConfig(format!(
            "max_controls must be at most {}, got {max_controls}",
            OverlayConfig::MAX_CONTROLS_LIMIT
        )));
    }

    let thresholds = raw.thresholds.into_validated()?;
    debug!(
        "Thresholds: tap {:?}, jitter {}px, hold {:?}",
        thresholds.tap, thresholds.jitter, thresholds.hold
    );

    Ok(HostConfig {
        log_level: raw.global.log_level.unwrap_or_else(|| "info".to_string()),
        log_file: raw.global.log_file,
        overlay: OverlayConfig {
            max_controls,
            thresholds,
        },
        default_layout: raw.overlay.default_layout,
        user_layout: raw.overlay.user_layout,
        device: raw.device.into_validated()?,
    })
}

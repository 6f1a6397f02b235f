//! Demo host: drives an overlay from a Linux touchscreen (I/O layer).
//!
//! Pure event-processing logic lives in [`crate::event`]; this module only
//! finds the device, pumps its events and logs what the overlay emits.
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use evdev::{AbsoluteAxisType, Device};
use log::{debug, error, info, warn};

use crate::config::{DeviceSettings, HostConfig, OverlayError, parse_config_file};
use crate::event::{
    EdgeSwipeDetector, EdgeVerdict, OverlayEvent, TouchEvent, TouchFrameAssembler, classify_event,
};
use crate::overlay::Overlay;
use crate::sink::QueuedSink;
use crate::surface::{HeadlessCompositor, WindowId};

/// Overlay as driven by the demo host.
pub type HostOverlay = Overlay<HeadlessCompositor, QueuedSink>;

// -- OverlayHost (top-level orchestrator) ---------------------

/// Runs one overlay against one touchscreen until stopped.
pub struct OverlayHost {
    config: HostConfig,
    running: Arc<AtomicBool>,
}

impl OverlayHost {
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self, OverlayError> {
        Ok(Self {
            config: parse_config_file(config_path.as_ref())?,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Open the touchscreen and process events until stopped.
    pub fn start(&mut self) -> ExitCode {
        let Some(device) = find_device(&self.config.device) else {
            error!("No touchscreen found, exiting");
            return ExitCode::FAILURE;
        };

        self.running.store(true, Ordering::Relaxed);
        info!("Starting overlay host");
        run_device_loop(device, &self.config, &self.running);
        ExitCode::SUCCESS
    }

    /// Stop processing events.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("Overlay host stopped");
    }

    /// Get a reference to the running flag for signal handling.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Load from and save to `path` instead of the configured user layout.
    pub fn set_user_layout(&mut self, path: PathBuf) {
        self.config.user_layout = Some(path);
    }

    /// Get the log level from the parsed configuration.
    pub fn config_log_level(&self) -> &str {
        &self.config.log_level
    }

    /// Get the optional log file path from the parsed configuration.
    pub fn config_log_file(&self) -> Option<&str> {
        self.config.log_file.as_deref()
    }
}

// -- Overlay plumbing -----------------------------------------

/// Build an overlay over a fresh headless host window of `width × height`
/// and load the configured layout into it.
pub fn build_overlay(config: &HostConfig, width: i32, height: i32) -> (HostOverlay, WindowId) {
    let mut compositor = HeadlessCompositor::new();
    let host = compositor.create_host_window((0, 0), (width, height), (width, height));
    let mut overlay = Overlay::new(config.overlay, compositor, QueuedSink::new());

    match overlay.load_controls(
        config.default_layout.as_deref(),
        config.user_layout.as_deref(),
    ) {
        Ok(count) => info!("{count} control(s) ready"),
        Err(e) => warn!("Running without controls: {e}"),
    }
    if let Err(e) = overlay.draw(host) {
        warn!("Failed to draw labels: {e}");
    }
    (overlay, host)
}

/// Pass one assembled touch report through edge-swipe detection into the overlay.
pub fn route_touch(
    overlay: &mut HostOverlay,
    host: WindowId,
    detector: &mut EdgeSwipeDetector,
    touch: TouchEvent,
) {
    let event = match detector.inspect(&touch) {
        EdgeVerdict::Forward => OverlayEvent::Touch(touch),
        EdgeVerdict::Consume => return,
        EdgeVerdict::SwipeDown => OverlayEvent::SwipeDown,
    };

    match overlay.handle_event(host, &event) {
        Ok(status) => debug!("{event:?} -> {status:?}"),
        Err(e) => error!("Overlay failed on {event:?}: {e}"),
    }

    if event == OverlayEvent::SwipeDown && !overlay.is_editing() {
        if let Err(e) = overlay.draw(host) {
            warn!("Failed to redraw labels: {e}");
        }
    }
}

/// Log and discard everything the overlay emitted.
pub fn log_actions(overlay: &mut HostOverlay) {
    for action in overlay.sink_mut().drain() {
        info!("{action}");
    }
}

// -- Device I/O -----------------------------------------------

/// Check if a device has multi-touch capabilities.
fn is_touch_device(device: &Device) -> bool {
    let Some(abs_axes) = device.supported_absolute_axes() else {
        return false;
    };
    abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
        && abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
}

/// Parse a USB vendor:product ID string into `(vendor, product)`.
///
/// Accepts formats like `"1234:5678"` or `"USB:1234:5678"` (case-insensitive).
pub fn parse_usb_id(raw: &str) -> Option<(u16, u16)> {
    let cleaned = raw.to_lowercase().replace("usb:", "");
    let (vendor_str, product_str) = cleaned.split_once(':')?;
    let vendor = u16::from_str_radix(vendor_str, 16).ok()?;
    let product = u16::from_str_radix(product_str, 16).ok()?;
    Some((vendor, product))
}

/// Find the configured touchscreen, or the first one if none is configured.
fn find_device(settings: &DeviceSettings) -> Option<Device> {
    let wanted = match settings.device_usb_id.as_deref() {
        Some(raw) => match parse_usb_id(raw) {
            Some(id) => Some(id),
            None => {
                warn!("Invalid USB ID format '{raw}' (expected vendor:product)");
                return None;
            }
        },
        None => None,
    };

    for (path, device) in evdev::enumerate() {
        if !is_touch_device(&device) {
            continue;
        }
        let id = device.input_id();
        if wanted.is_none_or(|(vendor, product)| id.vendor() == vendor && id.product() == product)
        {
            info!(
                "Using touchscreen {:04x}:{:04x}: {} ({})",
                id.vendor(),
                id.product(),
                device.name().unwrap_or("unknown"),
                path.display()
            );
            return Some(device);
        }
    }

    warn!(
        "No touch device matching {} found",
        settings.device_usb_id.as_deref().unwrap_or("any USB ID")
    );
    None
}

/// Size the host window from the device axes and start the event loop.
fn run_device_loop(mut device: Device, config: &HostConfig, running: &Arc<AtomicBool>) {
    let abs = match device.get_abs_state() {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to get abs state: {e}");
            return;
        }
    };

    let x = &abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize];
    let y = &abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize];
    let width = (x.maximum - x.minimum + 1).max(1);
    let height = (y.maximum - y.minimum + 1).max(1);
    debug!(
        "  X range: {}..{}, Y range: {}..{}",
        x.minimum, x.maximum, y.minimum, y.maximum
    );

    let (mut overlay, host) = build_overlay(config, width, height);
    let mut detector = EdgeSwipeDetector::new(
        config.device.edge_band,
        (f64::from(height) * config.device.swipe_distance_pct) as i32,
        config.device.swipe_time_max,
    );
    let mut assembler = TouchFrameAssembler::with_origin(x.minimum, y.minimum);

    event_loop(
        &mut device,
        &mut overlay,
        host,
        &mut assembler,
        &mut detector,
        config,
        running,
    );

    if let Err(e) = overlay.handle_event(host, &OverlayEvent::Exit) {
        error!("Failed to leave overlay cleanly: {e}");
    }
    log_actions(&mut overlay);
    overlay.shutdown();
}

/// Blocking event loop - reads from the device and feeds the overlay.
fn event_loop(
    device: &mut Device,
    overlay: &mut HostOverlay,
    host: WindowId,
    assembler: &mut TouchFrameAssembler,
    detector: &mut EdgeSwipeDetector,
    config: &HostConfig,
    running: &Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        match device.fetch_events().map(|iter| iter.collect::<Vec<_>>()) {
            Ok(events) => {
                for event in &events {
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    let Some(mt) = classify_event(event) else {
                        continue;
                    };
                    for touch in assembler.feed(mt) {
                        route_touch(overlay, host, detector, touch);
                    }
                }
                if let Err(e) = overlay.handle_event(host, &OverlayEvent::Idle) {
                    error!("Overlay failed to flush: {e}");
                }
                log_actions(overlay);
            }
            Err(e) => {
                if running.load(Ordering::Relaxed) {
                    warn!("Touchscreen disconnected: {e}");
                    attempt_reconnect(device, overlay, host, assembler, detector, config, running);
                }
                break;
            }
        }
    }
}

/// Attempt to reconnect to the touchscreen after it disconnects.
fn attempt_reconnect(
    device: &mut Device,
    overlay: &mut HostOverlay,
    host: WindowId,
    assembler: &mut TouchFrameAssembler,
    detector: &mut EdgeSwipeDetector,
    config: &HostConfig,
    running: &Arc<AtomicBool>,
) {
    const MAX_RETRIES: usize = 10;
    const RETRY_INTERVAL: Duration = Duration::from_secs(5);

    for attempt in 1..=MAX_RETRIES {
        if !running.load(Ordering::Relaxed) {
            return;
        }
        info!("Reconnect attempt {attempt}/{MAX_RETRIES}...");
        thread::sleep(RETRY_INTERVAL);

        if let Some(new_device) = find_device(&config.device) {
            info!("Reconnected");
            *device = new_device;
            let (min_x, min_y) = assembler.origin();
            *assembler = TouchFrameAssembler::with_origin(min_x, min_y);
            event_loop(device, overlay, host, assembler, detector, config, running);
            return;
        }
    }
    error!("Failed to reconnect after {MAX_RETRIES} attempts");
}

/// List all multi-touch capable devices.
pub fn list_touch_devices() -> ExitCode {
    println!("\n=== tco: Available Touchscreen Devices ===\n");
    let mut touch_count = 0;

    for (path, device) in evdev::enumerate() {
        if !is_touch_device(&device) {
            continue;
        }

        touch_count += 1;
        println!(
            "Device {touch_count}:\n\
             \x20 Path:      {}\n\
             \x20 Name:      {}\n\
             \x20 USB ID:    {:04x}:{:04x}\n\
             \x20 Phys:      {}\n",
            path.display(),
            device.name().unwrap_or("unknown"),
            device.input_id().vendor(),
            device.input_id().product(),
            device.physical_path().unwrap_or("N/A"),
        );
    }

    if touch_count == 0 {
        println!(
            "No multi-touch devices found.\n\n\
             Troubleshooting:\n\
             \x20 - Check if touchscreen is connected\n\
             \x20 - Run 'libinput list-devices' to see all devices\n\
             \x20 - Run as root if devices are not visible"
        );
        return ExitCode::FAILURE;
    }

    println!(
        "Found {touch_count} touch device(s).\n\n\
         Pin one in your tco.toml:\n\
         \x20 [device]\n\
         \x20 device_usb_id = \"<USB ID>\""
    );
    ExitCode::SUCCESS
}

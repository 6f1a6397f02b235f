//! tco – touch-control overlay for touchscreens.
//!
//! Runs an overlay against a Linux touchscreen and logs the input it produces.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::time::SystemTime;

use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};

use tco::host::{OverlayHost, list_touch_devices};

#[derive(Parser)]
#[command(name = "tco", about = "Touch-control overlay for touchscreens")]
struct Cli {
    /// Path to configuration file
    #[arg(default_value = "/etc/tco/tco.toml")]
    config: PathBuf,

    /// Layout file to load from and save to, instead of the configured user layout
    #[arg(short, long, value_name = "PATH")]
    user_layout: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List available touchscreen devices and exit
    #[arg(short, long)]
    list_devices: bool,
}

/// Writes `[secs.millis LEVEL module] message` lines to stderr and,
/// when configured, to a log file.
struct TcoLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl TcoLogger {
    fn format(record: &Record) -> String {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        let module = record
            .target()
            .strip_prefix("tco::")
            .unwrap_or(record.target());
        format!(
            "[{}.{:03} {:<5} {module}] {}\n",
            now.as_secs(),
            now.subsec_millis(),
            record.level(),
            record.args()
        )
    }
}

impl Log for TcoLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("tco")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        eprint!("{line}");

        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_devices {
        return list_touch_devices();
    }

    // The config decides the log level, so it is parsed before the logger exists.
    let mut host = match OverlayHost::new(&cli.config) {
        Ok(h) => h,
        Err(e) => {
            eprintln!(
                "Error: {e}\n\n\
                 An empty file is a valid configuration; see the [overlay] section\n\
                 for layout paths and [device] for picking a touchscreen."
            );
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = cli.user_layout {
        host.set_user_layout(path);
    }

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        host.config_log_level().parse().unwrap_or(LevelFilter::Info)
    };

    let file = host.config_log_file().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Warning: cannot open log file '{path}': {e}"))
            .ok()
            .map(Mutex::new)
    });

    log::set_boxed_logger(Box::new(TcoLogger { level, file })).expect("Failed to set logger");
    log::set_max_level(level);

    let running = host.running_flag();
    ctrlc::set_handler(move || running.store(false, Ordering::Relaxed))
        .expect("Error setting Ctrl-C handler");

    log::info!("Configuration: {}", cli.config.display());
    host.start()
}

//! Window ROI Capture
//!
//! Captures the contents of a top-level window (even when it is minimized or
//! covered by other windows), crops it to a per-window region of interest and
//! hands it to a polling consumer as a normalized float RGB frame.
//!
//! Each poll runs: window lookup → off-screen capture → buffer decode →
//! region lookup/selection → crop and normalize.

pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod normalize;
pub mod paths;
pub mod region;
pub mod selector;
pub mod source;

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

pub use error::{CaptureError, Result};
pub use normalize::{OutputFrame, PLACEHOLDER_SIZE};
pub use region::{RegionCache, RegionSelector, RoiRect, SelectedRect};
pub use source::{CaptureRequest, WindowCaptureSource};

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("window_roi_capture.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}
